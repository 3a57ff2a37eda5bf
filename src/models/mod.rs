//! Data models for EliteMinds.
//!
//! Every table row has one schema type here; the database layer converts rows into
//! these types in exactly one place per entity.

mod argument;
mod debate;
mod events;
mod profile;
mod search;
mod session;
mod vote;

pub use argument::*;
pub use debate::*;
pub use events::*;
pub use profile::*;
pub use search::*;
pub use session::*;
pub use vote::*;
