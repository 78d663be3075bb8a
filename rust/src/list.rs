//! Incremental list controller: pull-to-refresh plus reached-end pagination over a
//! caller-supplied data source.
//!
//! The controller never fetches anything itself. A trigger that fires hands back a
//! [`LoadTicket`]; the caller runs the fetch however it likes and reports the outcome
//! through [`ListController::complete`]. The in-flight guard is only released there,
//! so an async fetch that takes several ticks still blocks duplicate triggers.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState<T> {
    pub items: Vec<T>,
    pub is_refreshing: bool,
    pub has_more: bool,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            is_refreshing: false,
            has_more: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Refresh,
    LoadMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub kind: LoadKind,
    pub token: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Failed,
    /// The ticket was superseded (refresh, reset); nothing changed.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow<R> {
    pub key: String,
    pub content: R,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView<R> {
    pub rows: Vec<ListRow<R>>,
    pub refreshing: bool,
    pub show_loading_footer: bool,
}

#[derive(Debug)]
pub struct ListController<T> {
    state: ListState<T>,
    refresh_enabled: bool,
    load_more_enabled: bool,
    refresh_in_flight: Option<u64>,
    load_more_in_flight: Option<u64>,
    next_token: u64,
}

impl<T> Default for ListController<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListController<T> {
    pub fn new() -> Self {
        Self {
            state: ListState::default(),
            refresh_enabled: true,
            load_more_enabled: true,
            refresh_in_flight: None,
            load_more_in_flight: None,
            next_token: 0,
        }
    }

    /// No pull-to-refresh trigger; [`Self::begin_refresh`] never fires.
    pub fn without_refresh(mut self) -> Self {
        self.refresh_enabled = false;
        self
    }

    /// No pagination trigger; [`Self::end_reached`] never fires.
    pub fn without_load_more(mut self) -> Self {
        self.load_more_enabled = false;
        self
    }

    pub fn state(&self) -> &ListState<T> {
        &self.state
    }

    pub fn items(&self) -> &[T] {
        &self.state.items
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.is_refreshing
    }

    pub fn is_loading_more(&self) -> bool {
        self.load_more_in_flight.is_some()
    }

    pub fn has_more(&self) -> bool {
        self.state.has_more
    }

    fn issue_token(&mut self) -> u64 {
        self.next_token = self.next_token.wrapping_add(1);
        self.next_token
    }

    pub fn begin_refresh(&mut self) -> Option<LoadTicket> {
        if !self.refresh_enabled || self.refresh_in_flight.is_some() {
            return None;
        }
        // A page requested against the old first page must not be appended to the new one.
        self.load_more_in_flight = None;
        let token = self.issue_token();
        self.refresh_in_flight = Some(token);
        self.state.is_refreshing = true;
        Some(LoadTicket {
            kind: LoadKind::Refresh,
            token,
        })
    }

    /// Scroll position reached the end of the list.
    pub fn end_reached(&mut self) -> Option<LoadTicket> {
        if !self.load_more_enabled
            || self.load_more_in_flight.is_some()
            || !self.state.has_more
            || self.state.items.is_empty()
        {
            return None;
        }
        let token = self.issue_token();
        self.load_more_in_flight = Some(token);
        Some(LoadTicket {
            kind: LoadKind::LoadMore,
            token,
        })
    }

    pub fn complete<E>(&mut self, ticket: LoadTicket, outcome: Result<Page<T>, E>) -> Completion {
        match ticket.kind {
            LoadKind::Refresh => {
                if self.refresh_in_flight != Some(ticket.token) {
                    return Completion::Stale;
                }
                self.refresh_in_flight = None;
                self.load_more_in_flight = None;
                self.state.is_refreshing = false;
                match outcome {
                    Ok(page) => {
                        self.state.items = page.items;
                        self.state.has_more = page.has_more;
                        Completion::Applied
                    }
                    Err(_) => Completion::Failed,
                }
            }
            LoadKind::LoadMore => {
                if self.load_more_in_flight != Some(ticket.token) {
                    return Completion::Stale;
                }
                self.load_more_in_flight = None;
                match outcome {
                    Ok(mut page) => {
                        self.state.items.append(&mut page.items);
                        self.state.has_more = page.has_more;
                        Completion::Applied
                    }
                    Err(_) => Completion::Failed,
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = ListState::default();
        self.refresh_in_flight = None;
        self.load_more_in_flight = None;
    }

    pub fn view<R>(
        &self,
        render: impl FnMut(&T) -> R,
        key: impl FnMut(&T) -> String,
    ) -> ListView<R> {
        ListView {
            rows: render_rows(&self.state.items, render, key),
            refreshing: self.state.is_refreshing,
            show_loading_footer: self.state.has_more,
        }
    }
}

pub fn render_rows<T, R>(
    items: &[T],
    mut render: impl FnMut(&T) -> R,
    mut key: impl FnMut(&T) -> String,
) -> Vec<ListRow<R>> {
    items
        .iter()
        .map(|item| ListRow {
            key: key(item),
            content: render(item),
        })
        .collect()
}
