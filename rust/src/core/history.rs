use std::collections::HashSet;
use std::sync::Arc;

use flume::Sender;

use super::AppCore;
use crate::grouping::group_by_recency;
use crate::list::{render_rows, Completion, LoadKind, LoadTicket, Page};
use crate::source::{FetchError, HistoryPage, HistorySource, PageRequest};
use crate::state::{ConversationRecord, HistoryListState, HistoryRow};
use crate::updates::{CoreMsg, InternalEvent};

/// Delivers exactly one `HistoryPageLoaded` per ticket, even if the fetch unwinds,
/// so the list's in-flight guard is always released.
struct PendingPage {
    ticket: LoadTicket,
    tx: Sender<CoreMsg>,
    delivered: bool,
}

impl PendingPage {
    fn deliver(mut self, result: Result<HistoryPage, FetchError>) {
        self.delivered = true;
        let _ = self.tx.send(CoreMsg::Internal(Box::new(
            InternalEvent::HistoryPageLoaded {
                ticket: self.ticket,
                result,
            },
        )));
    }
}

impl Drop for PendingPage {
    fn drop(&mut self) {
        if self.delivered {
            return;
        }
        let _ = self.tx.send(CoreMsg::Internal(Box::new(
            InternalEvent::HistoryPageLoaded {
                ticket: self.ticket,
                result: Err(FetchError::Unexpected {
                    message: "history fetch aborted".into(),
                }),
            },
        )));
    }
}

pub(super) fn history_row_key(record: &ConversationRecord) -> String {
    if record.is_group_header() {
        format!("header:{}", record.title)
    } else {
        format!("record:{}", record.id)
    }
}

fn history_row(record: &ConversationRecord) -> HistoryRow {
    HistoryRow {
        key: history_row_key(record),
        record: record.clone(),
        is_header: record.is_group_header(),
    }
}

impl AppCore {
    pub(super) fn refresh_history(&mut self) {
        let Some(source) = self.history_source() else {
            tracing::warn!("refresh requested without a history source");
            self.toast("History is not available yet");
            return;
        };
        let Some(ticket) = self.history.begin_refresh() else {
            tracing::debug!("history refresh already in flight");
            return;
        };
        let request = PageRequest {
            offset: 0,
            limit: self.config.history_page_size,
        };
        self.spawn_history_fetch(source, ticket, request);
        self.emit_history();
    }

    pub(super) fn history_end_reached(&mut self) {
        let Some(source) = self.history_source() else {
            return;
        };
        let Some(ticket) = self.history.end_reached() else {
            return;
        };
        let request = PageRequest {
            offset: u32::try_from(self.history.items().len()).unwrap_or(u32::MAX),
            limit: self.config.history_page_size,
        };
        self.spawn_history_fetch(source, ticket, request);
        self.emit_history();
    }

    pub(super) fn reset_history(&mut self) {
        self.history.reset();
        self.emit_history();
    }

    fn spawn_history_fetch(
        &self,
        source: Arc<dyn HistorySource>,
        ticket: LoadTicket,
        request: PageRequest,
    ) {
        tracing::info!(
            kind = ?ticket.kind,
            token = ticket.token,
            offset = request.offset,
            limit = request.limit,
            "history fetch"
        );
        let pending = PendingPage {
            ticket,
            tx: self.core_sender.clone(),
            delivered: false,
        };
        // Host callbacks may block on network I/O.
        self.runtime.spawn_blocking(move || {
            let result = source.fetch_page(request);
            pending.deliver(result);
        });
    }

    pub(super) fn handle_history_page_loaded(
        &mut self,
        ticket: LoadTicket,
        result: Result<HistoryPage, FetchError>,
    ) {
        let failure = result.as_ref().err().cloned();
        let outcome = result.map(|page| {
            let items = match ticket.kind {
                LoadKind::Refresh => page.records,
                LoadKind::LoadMore => self.drop_already_loaded(page.records),
            };
            Page {
                items,
                has_more: page.has_more,
            }
        });
        match self.history.complete(ticket, outcome) {
            Completion::Stale => {
                tracing::debug!(token = ticket.token, "dropping stale history page");
            }
            Completion::Applied => {
                tracing::info!(
                    kind = ?ticket.kind,
                    loaded = self.history.items().len(),
                    has_more = self.history.has_more(),
                    "history page applied"
                );
                self.emit_history();
            }
            Completion::Failed => {
                let err = failure.map(|e| e.to_string()).unwrap_or_default();
                tracing::warn!(kind = ?ticket.kind, error = %err, "history fetch failed");
                self.rebuild_history_snapshot();
                let what = match ticket.kind {
                    LoadKind::Refresh => "refresh",
                    LoadKind::LoadMore => "load more",
                };
                self.toast(format!("Couldn't {what} history: {err}"));
            }
        }
    }

    /// Offset paging repeats a conversation when newer ones arrive between pages.
    fn drop_already_loaded(&self, records: Vec<ConversationRecord>) -> Vec<ConversationRecord> {
        let loaded: HashSet<i64> = self.history.items().iter().map(|r| r.id).collect();
        let before = records.len();
        let fresh: Vec<ConversationRecord> = records
            .into_iter()
            .filter(|r| !loaded.contains(&r.id))
            .collect();
        if fresh.len() < before {
            tracing::debug!(
                skipped = before - fresh.len(),
                "skipping conversations already loaded"
            );
        }
        fresh
    }

    pub(super) fn rebuild_history_snapshot(&mut self) {
        let grouped = group_by_recency(self.history.items());
        self.state.history = HistoryListState {
            rows: render_rows(&grouped, history_row, history_row_key)
                .into_iter()
                .map(|row| row.content)
                .collect(),
            refreshing: self.history.is_refreshing(),
            show_loading_footer: self.history.has_more(),
            loading_more: self.history.is_loading_more(),
            loaded_count: u32::try_from(self.history.items().len()).unwrap_or(u32::MAX),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, title: &str) -> ConversationRecord {
        ConversationRecord {
            id,
            timestamp: 0,
            title: title.into(),
            mode: String::new(),
        }
    }

    #[test]
    fn row_keys_distinguish_headers_from_records() {
        assert_eq!(history_row_key(&rec(-1, "Today")), "header:Today");
        assert_eq!(history_row_key(&rec(42, "Press line 3")), "record:42");
        assert!(history_row(&rec(-2, "Yesterday")).is_header);
    }

    #[test]
    fn dropped_pending_page_still_reports_back() {
        let (tx, rx) = flume::unbounded();
        let ticket = LoadTicket {
            kind: LoadKind::LoadMore,
            token: 7,
        };
        drop(PendingPage {
            ticket,
            tx,
            delivered: false,
        });
        match rx.try_recv().expect("event") {
            CoreMsg::Internal(event) => match *event {
                InternalEvent::HistoryPageLoaded { ticket: got, result } => {
                    assert_eq!(got, ticket);
                    assert!(result.is_err());
                }
                other => panic!("unexpected event: {other:?}"),
            },
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn delivered_pending_page_sends_once() {
        let (tx, rx) = flume::unbounded();
        let pending = PendingPage {
            ticket: LoadTicket {
                kind: LoadKind::Refresh,
                token: 1,
            },
            tx,
            delivered: false,
        };
        pending.deliver(Ok(HistoryPage {
            records: vec![],
            has_more: false,
        }));
        assert_eq!(rx.try_iter().count(), 1);
    }
}
