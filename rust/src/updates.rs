use crate::list::LoadTicket;
use crate::source::{FetchError, HistoryPage};
use crate::state::AppState;
use crate::AppAction;

#[derive(uniffi::Enum, Clone, Debug)]
pub enum AppUpdate {
    /// Always a full state snapshot; hosts reconcile by `rev`.
    FullState(AppState),
}

impl AppUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            AppUpdate::FullState(s) => s.rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(AppAction),
    Internal(Box<InternalEvent>),
}

#[derive(Debug)]
pub enum InternalEvent {
    // Async results
    HistoryPageLoaded {
        ticket: LoadTicket,
        result: Result<HistoryPage, FetchError>,
    },

    // Timers
    ToastAutoDismiss {
        token: u64,
    },
}
