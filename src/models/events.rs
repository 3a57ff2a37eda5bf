//! Row-level change notifications pushed over realtime channels.

use serde::{Deserialize, Serialize};

/// Tables that emit change events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Debates,
    Arguments,
    Votes,
    Profiles,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Debates => "debates",
            Table::Arguments => "arguments",
            Table::Votes => "votes",
            Table::Profiles => "profiles",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "debates" => Some(Table::Debates),
            "arguments" => Some(Table::Arguments),
            "votes" => Some(Table::Votes),
            "profiles" => Some(Table::Profiles),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single row change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub record_id: String,
    /// Debate the row belongs to, when it belongs to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debate_id: Option<String>,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind, record_id: impl Into<String>) -> Self {
        Self {
            table,
            kind,
            record_id: record_id.into(),
            debate_id: None,
        }
    }

    pub fn in_debate(mut self, debate_id: impl Into<String>) -> Self {
        self.debate_id = Some(debate_id.into());
        self
    }
}

/// Which events a subscriber wants: one table, optionally narrowed to one debate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelFilter {
    pub table: Table,
    #[serde(default)]
    pub debate_id: Option<String>,
}

impl ChannelFilter {
    pub fn table(table: Table) -> Self {
        Self {
            table,
            debate_id: None,
        }
    }

    pub fn debate(table: Table, debate_id: impl Into<String>) -> Self {
        Self {
            table,
            debate_id: Some(debate_id.into()),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        match &self.debate_id {
            Some(wanted) => event.debate_id.as_deref() == Some(wanted.as_str()),
            None => true,
        }
    }
}
