mod config;
mod history;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use flume::Sender;

use crate::actions::AppAction;
use crate::list::ListController;
use crate::source::{HistorySource, SharedHistorySource};
use crate::state::{AppState, ConversationRecord};
use crate::updates::{AppUpdate, CoreMsg, InternalEvent};

pub struct AppCore {
    pub state: AppState,
    rev: u64,

    update_sender: Sender<AppUpdate>,
    core_sender: Sender<CoreMsg>,
    shared_state: Arc<RwLock<AppState>>,
    history_source: SharedHistorySource,

    config: config::AppConfig,
    runtime: tokio::runtime::Runtime,

    // Conversation history paging; the grouped rows in `state.history` are derived from it.
    history: ListController<ConversationRecord>,
    toast_dismiss_token: u64,
}

impl AppCore {
    pub fn new(
        update_sender: Sender<AppUpdate>,
        core_sender: Sender<CoreMsg>,
        data_dir: String,
        shared_state: Arc<RwLock<AppState>>,
        history_source: SharedHistorySource,
    ) -> Self {
        let config = config::load_app_config(&data_dir);
        tracing::info!(
            page_size = config.history_page_size,
            toast_dismiss_secs = config.toast_dismiss_secs,
            "app config loaded"
        );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .build()
            .expect("tokio runtime");

        Self {
            state: AppState::empty(),
            rev: 0,
            update_sender,
            core_sender,
            shared_state,
            history_source,
            config,
            runtime,
            history: ListController::new(),
            toast_dismiss_token: 0,
        }
    }

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.state.rev = self.rev;
        self.rev
    }

    fn commit_state_snapshot(&self, snapshot: &AppState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    fn emit_state(&mut self) {
        self.next_rev();
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(AppUpdate::FullState(snapshot));
    }

    fn emit_history(&mut self) {
        self.rebuild_history_snapshot();
        self.emit_state();
    }

    fn emit_toast(&mut self) {
        self.emit_state();
    }

    fn toast(&mut self, msg: impl Into<String>) {
        self.state.toast = Some(msg.into());
        self.toast_dismiss_token = self.toast_dismiss_token.saturating_add(1);
        self.schedule_toast_auto_dismiss(self.toast_dismiss_token);
        self.emit_toast();
    }

    fn schedule_toast_auto_dismiss(&self, token: u64) {
        let tx = self.core_sender.clone();
        let delay = Duration::from_secs(self.config.toast_dismiss_secs);
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(
                InternalEvent::ToastAutoDismiss { token },
            )));
        });
    }

    fn history_source(&self) -> Option<Arc<dyn HistorySource>> {
        match self.history_source.read() {
            Ok(slot) => slot.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    pub fn handle_message(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::Action(action) => {
                tracing::info!(action = action.tag(), "dispatch");
                self.handle_action(action);
            }
            CoreMsg::Internal(internal) => self.handle_internal(*internal),
        }
    }

    fn handle_action(&mut self, action: AppAction) {
        match action {
            AppAction::RefreshHistory => self.refresh_history(),
            AppAction::HistoryEndReached => self.history_end_reached(),
            AppAction::ResetHistory => self.reset_history(),
            AppAction::ClearToast => {
                if self.state.toast.take().is_some() {
                    self.emit_toast();
                }
            }
            // Day buckets are relative to "now"; a resumed app may have crossed midnight.
            AppAction::Foregrounded => self.emit_history(),
        }
    }

    fn handle_internal(&mut self, internal: InternalEvent) {
        match internal {
            InternalEvent::HistoryPageLoaded { ticket, result } => {
                self.handle_history_page_loaded(ticket, result)
            }
            InternalEvent::ToastAutoDismiss { token } => self.handle_toast_auto_dismiss(token),
        }
    }

    fn handle_toast_auto_dismiss(&mut self, token: u64) {
        if token != self.toast_dismiss_token {
            return;
        }
        if self.state.toast.is_some() {
            self.state.toast = None;
            self.emit_toast();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppCore;
    use crate::actions::AppAction;
    use crate::source::{FetchError, HistoryPage, HistorySource, PageRequest, SharedHistorySource};
    use crate::state::{AppState, ConversationRecord};
    use crate::updates::{AppUpdate, CoreMsg};
    use std::sync::{Arc, Mutex, OnceLock, RwLock};
    use std::time::Duration;

    struct ScriptedSource {
        requests: Mutex<Vec<PageRequest>>,
        pages: Mutex<Vec<Result<HistoryPage, FetchError>>>,
    }

    impl HistorySource for ScriptedSource {
        fn fetch_page(&self, request: PageRequest) -> Result<HistoryPage, FetchError> {
            self.requests.lock().unwrap().push(request);
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                return Ok(HistoryPage {
                    records: vec![],
                    has_more: false,
                });
            }
            pages.remove(0)
        }
    }

    struct Harness {
        core: AppCore,
        core_rx: flume::Receiver<CoreMsg>,
        update_rx: flume::Receiver<AppUpdate>,
        source: Arc<ScriptedSource>,
        _dir: tempfile::TempDir,
    }

    impl Harness {
        fn new(pages: Vec<Result<HistoryPage, FetchError>>) -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            let (update_tx, update_rx) = flume::unbounded();
            let (core_tx, core_rx) = flume::unbounded();
            let source = Arc::new(ScriptedSource {
                requests: Mutex::new(vec![]),
                pages: Mutex::new(pages),
            });
            let shared_source: SharedHistorySource =
                Arc::new(RwLock::new(Some(source.clone() as Arc<dyn HistorySource>)));
            let core = AppCore::new(
                update_tx,
                core_tx,
                dir.path().to_string_lossy().into_owned(),
                Arc::new(RwLock::new(AppState::empty())),
                shared_source,
            );
            Self {
                core,
                core_rx,
                update_rx,
                source,
                _dir: dir,
            }
        }

        fn dispatch(&mut self, action: AppAction) {
            self.core.handle_message(CoreMsg::Action(action));
        }

        /// Feeds the next async result back into the actor, like the actor loop would.
        fn pump_one(&mut self) {
            let msg = self
                .core_rx
                .recv_timeout(Duration::from_secs(5))
                .expect("internal event");
            self.core.handle_message(msg);
        }

        fn requests(&self) -> Vec<PageRequest> {
            self.source.requests.lock().unwrap().clone()
        }
    }

    /// One hour after today's local midnight, fixed for the whole test run so every
    /// fixture record lands in the same bucket even if the run crosses midnight.
    fn anchor_ms() -> i64 {
        static ANCHOR: OnceLock<i64> = OnceLock::new();
        *ANCHOR.get_or_init(|| {
            crate::grouping::start_of_day(&chrono::Local::now()) + 60 * 60 * 1000
        })
    }

    fn record(id: i64) -> ConversationRecord {
        ConversationRecord {
            id,
            timestamp: anchor_ms() - id,
            title: format!("conversation {id}"),
            mode: "chat".into(),
        }
    }

    fn page(ids: std::ops::RangeInclusive<i64>, has_more: bool) -> Result<HistoryPage, FetchError> {
        Ok(HistoryPage {
            records: ids.map(record).collect(),
            has_more,
        })
    }

    #[test]
    fn refresh_then_load_more_appends_grouped_rows() {
        let mut h = Harness::new(vec![page(1..=3, true), page(4..=5, false)]);

        h.dispatch(AppAction::RefreshHistory);
        assert!(h.core.state.history.refreshing);
        h.pump_one();
        assert!(!h.core.state.history.refreshing);
        assert_eq!(h.core.state.history.loaded_count, 3);
        let rows = &h.core.state.history.rows;
        assert!(rows[0].is_header && rows[0].key.starts_with("header:"));
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys[1..], ["record:1", "record:2", "record:3"]);

        h.dispatch(AppAction::HistoryEndReached);
        assert!(h.core.state.history.loading_more);
        h.pump_one();

        let history = &h.core.state.history;
        assert_eq!(history.loaded_count, 5);
        assert!(!history.show_loading_footer);
        assert_eq!(history.rows.len(), 6);
        assert_eq!(history.rows[5].key, "record:5");
        assert_eq!(
            h.requests(),
            vec![
                PageRequest {
                    offset: 0,
                    limit: 20
                },
                PageRequest {
                    offset: 3,
                    limit: 20
                },
            ]
        );
    }

    #[test]
    fn duplicate_end_reached_issues_one_request() {
        let mut h = Harness::new(vec![page(1..=2, true), page(3..=4, true)]);
        h.dispatch(AppAction::RefreshHistory);
        h.pump_one();

        h.dispatch(AppAction::HistoryEndReached);
        h.dispatch(AppAction::HistoryEndReached);
        h.pump_one();
        assert!(h
            .core_rx
            .recv_timeout(Duration::from_millis(200))
            .is_err());
        assert_eq!(h.requests().len(), 2);
        assert_eq!(h.core.state.history.loaded_count, 4);
    }

    #[test]
    fn load_more_skips_conversations_already_loaded() {
        // A new conversation arrived between pages, so offset 2 repeats id 2.
        let mut h = Harness::new(vec![page(1..=2, true), page(2..=4, true)]);
        h.dispatch(AppAction::RefreshHistory);
        h.pump_one();
        h.dispatch(AppAction::HistoryEndReached);
        h.pump_one();

        let history = &h.core.state.history;
        assert_eq!(history.loaded_count, 4);
        let keys: Vec<&str> = history.rows.iter().map(|r| r.key.as_str()).collect();
        let distinct: std::collections::HashSet<&str> = keys.iter().copied().collect();
        assert_eq!(keys.len(), distinct.len());
        assert_eq!(keys.iter().filter(|k| **k == "record:2").count(), 1);
    }

    #[test]
    fn end_reached_on_empty_history_does_nothing() {
        let mut h = Harness::new(vec![]);
        h.dispatch(AppAction::HistoryEndReached);
        assert!(h.requests().is_empty());
        assert!(h.core_rx.try_recv().is_err());
    }

    #[test]
    fn failed_fetch_raises_toast_and_keeps_rows() {
        let mut h = Harness::new(vec![
            page(1..=2, true),
            Err(FetchError::Network {
                message: "timeout".into(),
            }),
        ]);
        h.dispatch(AppAction::RefreshHistory);
        h.pump_one();
        h.dispatch(AppAction::HistoryEndReached);
        h.pump_one();

        assert_eq!(h.core.state.history.loaded_count, 2);
        assert!(!h.core.state.history.loading_more);
        assert!(h
            .core
            .state
            .toast
            .as_deref()
            .is_some_and(|t| t.contains("timeout")));

        h.dispatch(AppAction::ClearToast);
        assert!(h.core.state.toast.is_none());
    }

    #[test]
    fn reset_drops_late_page() {
        let mut h = Harness::new(vec![page(1..=2, true)]);
        h.dispatch(AppAction::RefreshHistory);
        h.dispatch(AppAction::ResetHistory);
        h.pump_one();
        assert!(h.core.state.history.rows.is_empty());
        assert_eq!(h.core.state.history.loaded_count, 0);
    }

    #[test]
    fn missing_source_toasts_instead_of_fetching() {
        let mut h = Harness::new(vec![]);
        *h.core.history_source.write().unwrap() = None;
        h.dispatch(AppAction::RefreshHistory);
        assert!(!h.core.state.history.refreshing);
        assert!(h.core.state.toast.is_some());
    }

    #[test]
    fn every_emit_bumps_rev() {
        let mut h = Harness::new(vec![page(1..=1, false)]);
        h.dispatch(AppAction::RefreshHistory);
        h.pump_one();
        let revs: Vec<u64> = h.update_rx.try_iter().map(|u| u.rev()).collect();
        assert_eq!(revs, vec![1, 2]);
    }
}
