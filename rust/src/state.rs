use serde::{Deserialize, Serialize};

/// Full snapshot pushed to the host on every change.
#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct AppState {
    pub rev: u64,
    pub history: HistoryListState,
    pub toast: Option<String>,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            rev: 0,
            history: HistoryListState::empty(),
            toast: None,
        }
    }
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct HistoryListState {
    /// Grouped sequence: headers interleaved with conversations.
    pub rows: Vec<HistoryRow>,
    pub refreshing: bool,
    pub show_loading_footer: bool,
    pub loading_more: bool,
    /// Conversations fetched so far, headers excluded.
    pub loaded_count: u32,
}

impl HistoryListState {
    pub fn empty() -> Self {
        Self {
            rows: vec![],
            refreshing: false,
            show_loading_footer: true,
            loading_more: false,
            loaded_count: 0,
        }
    }
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct HistoryRow {
    pub key: String,
    pub record: ConversationRecord,
    pub is_header: bool,
}

/// A conversation (or a synthetic section header when `id` is negative).
#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: i64,
    /// Milliseconds since the Unix epoch; `0` for headers.
    pub timestamp: i64,
    pub title: String,
    #[serde(default)]
    pub mode: String,
}

impl ConversationRecord {
    pub fn is_group_header(&self) -> bool {
        self.id < 0
    }
}
