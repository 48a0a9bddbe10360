use std::collections::HashSet;

use tracing::{debug, warn};

use crate::omdb::{OmdbError, ResultItem, SearchPage, PAGE_SIZE};

pub const DEFAULT_TOPIC: &str = "Avengers";
pub const DEFAULT_LIMIT: usize = 20;
pub const SEARCH_INITIAL_LIMIT: usize = 15;
pub const SEARCH_LOAD_MORE_COUNT: usize = 10;
pub const MAX_BROWSE_PAGES: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPurpose {
    Browse,
    Reset,
    LoadMore,
}

/// A gateway call the controller wants executed. The result must be handed
/// back through [`SearchController::on_page_loaded`] with the same ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub query: String,
    pub page: u32,
    pub purpose: FetchPurpose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchView {
    pub mode: Mode,
    pub query: String,
    pub visible_items: Vec<ResultItem>,
    pub total_count: usize,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub can_load_more: bool,
}

#[derive(Debug, Default)]
struct Session {
    query: String,
    remote_page: u32,
    items: Vec<ResultItem>,
    seen: HashSet<String>,
    total_count: usize,
    display_window: usize,
}

impl Session {
    fn new(query: String, display_window: usize) -> Self {
        Self {
            query,
            display_window,
            ..Self::default()
        }
    }

    fn append(&mut self, items: Vec<ResultItem>) {
        for item in items {
            if self.seen.insert(item.id.clone()) {
                self.items.push(item);
            }
        }
    }

    fn clear(&mut self) {
        self.items.clear();
        self.seen.clear();
        self.total_count = 0;
    }

    fn total(&self) -> usize {
        self.total_count.max(self.items.len())
    }
}

#[derive(Debug)]
pub struct SearchController {
    default_topic: String,
    effective: Option<String>,
    mode: Mode,
    generation: u64,
    session: Session,
    pending: Option<FetchTicket>,
    error: Option<String>,
}

impl SearchController {
    pub fn new(default_topic: impl Into<String>) -> Self {
        let default_topic = default_topic.into();
        let default_topic = if default_topic.trim().is_empty() {
            DEFAULT_TOPIC.to_string()
        } else {
            default_topic.trim().to_string()
        };
        Self {
            default_topic,
            effective: None,
            mode: Mode::Browse,
            generation: 0,
            session: Session::default(),
            pending: None,
            error: None,
        }
    }

    pub fn on_query_changed(&mut self, raw: &str) -> Option<FetchTicket> {
        let query = raw.trim();
        if self.effective.as_deref() == Some(query) {
            debug!(query, "search: effective query unchanged");
            return None;
        }
        self.effective = Some(query.to_string());
        self.restart()
    }

    // Retry path after an error.
    pub fn on_refresh(&mut self) -> Option<FetchTicket> {
        self.effective.as_ref()?;
        self.restart()
    }

    pub fn on_load_more(&mut self) -> Option<FetchTicket> {
        if self.mode != Mode::Search || self.effective.is_none() {
            return None;
        }
        if let Some(pending) = &self.pending {
            debug!(page = pending.page, "search: load-more ignored, fetch in flight");
            return None;
        }
        if self.error.is_some() || self.visible_len() >= self.session.total() {
            return None;
        }

        let buffered = self.session.items.len();
        let window = self.session.display_window;
        self.session.display_window = window + SEARCH_LOAD_MORE_COUNT;

        if buffered >= window + SEARCH_LOAD_MORE_COUNT || buffered >= self.session.total() {
            debug!(
                window = self.session.display_window,
                buffered, "search: load-more served from buffer"
            );
            return None;
        }

        let page = (buffered / PAGE_SIZE) as u32 + 1;
        Some(self.issue(FetchPurpose::LoadMore, page))
    }

    pub fn on_page_loaded(
        &mut self,
        ticket: &FetchTicket,
        result: Result<SearchPage, OmdbError>,
    ) -> Option<FetchTicket> {
        if ticket.generation != self.generation || self.pending.as_ref() != Some(ticket) {
            debug!(
                query = %ticket.query,
                page = ticket.page,
                ticket_generation = ticket.generation,
                generation = self.generation,
                "search: dropping stale page"
            );
            return None;
        }
        self.pending = None;

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                warn!(query = %ticket.query, page = ticket.page, error = %err, "search: fetch failed");
                self.error = Some(err.user_message());
                self.session.clear();
                return None;
            }
        };

        self.session.remote_page = ticket.page;
        self.session.total_count = page.total_count;

        match ticket.purpose {
            FetchPurpose::Browse => {
                self.session.append(page.items);
                let buffered = self.session.items.len();
                if buffered >= DEFAULT_LIMIT
                    || buffered >= page.total_count
                    || ticket.page >= MAX_BROWSE_PAGES
                {
                    self.session.items.truncate(DEFAULT_LIMIT);
                    return None;
                }
                Some(self.issue(FetchPurpose::Browse, ticket.page + 1))
            }
            FetchPurpose::Reset | FetchPurpose::LoadMore => {
                if ticket.page == 1 {
                    self.session.items.clear();
                    self.session.seen.clear();
                }
                self.session.append(page.items);
                None
            }
        }
    }

    pub fn snapshot(&self) -> SearchView {
        let visible = self.visible_len();
        SearchView {
            mode: self.mode,
            query: self.effective.clone().unwrap_or_default(),
            visible_items: self.session.items[..visible].to_vec(),
            total_count: self.session.total(),
            is_loading: self.pending.is_some(),
            error_message: self.error.clone(),
            can_load_more: self.mode == Mode::Search
                && self.pending.is_none()
                && self.error.is_none()
                && visible < self.session.total(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    fn visible_len(&self) -> usize {
        let limit = match self.mode {
            Mode::Browse => DEFAULT_LIMIT,
            Mode::Search => self.session.display_window,
        };
        limit.min(self.session.items.len())
    }

    fn restart(&mut self) -> Option<FetchTicket> {
        let query = self.effective.clone().unwrap_or_default();
        self.generation = self.generation.wrapping_add(1);
        self.pending = None;
        self.error = None;
        if query.is_empty() {
            self.mode = Mode::Browse;
            self.session = Session::new(self.default_topic.clone(), DEFAULT_LIMIT);
            debug!(topic = %self.default_topic, "search: browse session started");
            Some(self.issue(FetchPurpose::Browse, 1))
        } else {
            self.mode = Mode::Search;
            self.session = Session::new(query, SEARCH_INITIAL_LIMIT);
            debug!(query = %self.session.query, "search: session started");
            Some(self.issue(FetchPurpose::Reset, 1))
        }
    }

    fn issue(&mut self, purpose: FetchPurpose, page: u32) -> FetchTicket {
        let ticket = FetchTicket {
            generation: self.generation,
            query: self.session.query.clone(),
            page,
            purpose,
        };
        self.pending = Some(ticket.clone());
        ticket
    }
}

impl Default for SearchController {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC)
    }
}
