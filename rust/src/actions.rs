#[derive(uniffi::Enum, Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    // History
    RefreshHistory,
    HistoryEndReached,
    ResetHistory,

    // UI
    ClearToast,

    // Lifecycle
    Foregrounded,
}

impl AppAction {
    /// Log-safe action tag.
    pub fn tag(&self) -> &'static str {
        match self {
            // History
            AppAction::RefreshHistory => "RefreshHistory",
            AppAction::HistoryEndReached => "HistoryEndReached",
            AppAction::ResetHistory => "ResetHistory",

            // UI
            AppAction::ClearToast => "ClearToast",

            // Lifecycle
            AppAction::Foregrounded => "Foregrounded",
        }
    }
}
