use std::sync::{Arc, RwLock};

use crate::state::ConversationRecord;

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u32,
    pub limit: u32,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct HistoryPage {
    /// Newest first.
    pub records: Vec<ConversationRecord>,
    pub has_more: bool,
}

#[derive(uniffi::Error, thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {message}")]
    Network { message: String },
    #[error("not authorized")]
    Unauthorized,
    #[error("unexpected error: {message}")]
    Unexpected { message: String },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for FetchError {
    fn from(err: uniffi::UnexpectedUniFFICallbackError) -> Self {
        FetchError::Unexpected {
            message: err.reason,
        }
    }
}

/// Conversation history backend, implemented by the host app on top of its HTTP
/// client. Called from a blocking worker thread, never from the UI thread.
#[uniffi::export(callback_interface)]
pub trait HistorySource: Send + Sync + 'static {
    fn fetch_page(&self, request: PageRequest) -> Result<HistoryPage, FetchError>;
}

pub(crate) type SharedHistorySource = Arc<RwLock<Option<Arc<dyn HistorySource>>>>;
