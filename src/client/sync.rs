//! Live refresh of an open debate page.

use std::sync::Arc;

use tokio::task::JoinHandle;

use super::{ClientContext, QueryCache, QueryKey};
use crate::models::{ChannelFilter, Table};
use crate::realtime::{Delivery, Subscription};

/// Keeps the argument and vote queries of one debate fresh while alive.
///
/// Every change event invalidates the matching query; nothing is patched locally.
/// Dropping it closes both channels.
pub struct DebateSync {
    debate_id: String,
    tasks: Vec<JoinHandle<()>>,
}

impl DebateSync {
    pub fn start(ctx: &ClientContext, debate_id: impl Into<String>) -> Self {
        let debate_id = debate_id.into();

        let arguments = ctx
            .remote
            .subscribe(ChannelFilter::debate(Table::Arguments, &debate_id));
        // Votes are followed table-wide, not narrowed to this debate
        let votes = ctx.remote.subscribe(ChannelFilter::table(Table::Votes));

        let tasks = vec![
            spawn_listener(
                arguments,
                ctx.cache.clone(),
                vec![
                    QueryKey::Arguments(debate_id.clone()),
                    QueryKey::Debate(debate_id.clone()),
                ],
            ),
            spawn_listener(
                votes,
                ctx.cache.clone(),
                vec![QueryKey::Votes(debate_id.clone())],
            ),
        ];

        tracing::debug!(%debate_id, "Realtime sync started");
        Self { debate_id, tasks }
    }

    pub fn debate_id(&self) -> &str {
        &self.debate_id
    }
}

impl Drop for DebateSync {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        tracing::debug!(debate_id = %self.debate_id, "Realtime sync stopped");
    }
}

fn spawn_listener(
    mut subscription: Subscription,
    cache: Arc<QueryCache>,
    keys: Vec<QueryKey>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(delivery) = subscription.recv().await {
            match delivery {
                Delivery::Event(event) => {
                    tracing::trace!(table = event.table.as_str(), record_id = %event.record_id, "Change received");
                }
                Delivery::Missed(n) => {
                    tracing::warn!(missed = n, "Realtime events missed, refetching");
                }
            }
            cache.invalidate_where(|key| keys.contains(key));
        }
    })
}
