use std::collections::{HashMap, HashSet};
use std::io::{self, Stdout};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tracing::{debug, warn};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::data::SearchService;
use crate::debounce::Debouncer;
use crate::details::DetailCache;
use crate::modal::{DetailTicket, ModalController};
use crate::omdb::{self, DetailRecord, OmdbError, ResultItem, SearchPage};
use crate::search::{FetchTicket, Mode, SearchController, SearchView};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_RATING: Color = Color::Rgb(249, 226, 175);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const TICK_RATE: Duration = Duration::from_millis(120);

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Focus {
    Search,
    Results,
}

enum AsyncResponse {
    Page {
        ticket: FetchTicket,
        result: Result<SearchPage, OmdbError>,
    },
    Details {
        ticket: DetailTicket,
        result: Result<Option<Arc<DetailRecord>>, OmdbError>,
    },
    RowDetail {
        id: String,
        withdrawn: Arc<AtomicBool>,
        failed: bool,
    },
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= TICK_RATE {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

/// Row metadata in the order the list shows it: rating, language, year.
fn row_meta(item: &ResultItem, detail: Option<&DetailRecord>) -> (String, String, String) {
    let rating = detail
        .and_then(DetailRecord::rating)
        .unwrap_or(omdb::NOT_AVAILABLE)
        .to_string();
    let language = detail
        .and_then(DetailRecord::primary_language)
        .unwrap_or(omdb::NOT_AVAILABLE)
        .to_string();
    let year = omdb::available(&item.year)
        .unwrap_or(omdb::NOT_AVAILABLE)
        .to_string();
    (rating, language, year)
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn row_line(item: &ResultItem, detail: Option<&DetailRecord>, width: usize) -> Line<'static> {
    let (rating, language, year) = row_meta(item, detail);
    let meta = format!("  ★ {rating} • {language} • {year}");
    let kind = if item.media_type.is_empty() {
        String::new()
    } else {
        format!(" • {}", item.media_type)
    };
    let reserved = UnicodeWidthStr::width(meta.as_str()) + UnicodeWidthStr::width(kind.as_str());
    let title = truncate_to_width(&item.title, width.saturating_sub(reserved).max(8));
    Line::from(vec![
        Span::styled(
            title,
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(meta, Style::default().fg(COLOR_RATING)),
        Span::styled(kind, Style::default().fg(COLOR_TEXT_SECONDARY)),
    ])
}

fn detail_lines(record: &DetailRecord) -> Vec<Line<'static>> {
    let label = Style::default()
        .fg(COLOR_ACCENT)
        .add_modifier(Modifier::BOLD);
    let value = Style::default().fg(COLOR_TEXT_PRIMARY);
    let field = |name: &str, text: &str| {
        Line::from(vec![
            Span::styled(format!("{name}: "), label),
            Span::styled(text.to_string(), value),
        ])
    };

    let mut lines = vec![
        Line::from(Span::styled(
            record.title.clone(),
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(
                format!("★ {}/10", record.rating().unwrap_or(omdb::NOT_AVAILABLE)),
                Style::default()
                    .fg(COLOR_RATING)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("   {}   {}   {}", record.rated, record.runtime, record.year),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
        ]),
    ];

    let genres = record.genres();
    if !genres.is_empty() {
        let mut spans = Vec::new();
        for genre in genres {
            spans.push(Span::styled(
                format!("[{genre}]"),
                Style::default().fg(COLOR_ACCENT),
            ));
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled("Overview", label)));
    lines.push(Line::from(Span::styled(record.plot.clone(), value)));
    lines.push(Line::default());
    lines.push(field("Release date", &record.released));
    lines.push(field("Director", &record.director));
    lines.push(field("Countries", &record.country));
    lines.push(field("Status", record.release_status()));
    lines.push(field("Language", &record.language));
    lines.push(field("Box office", &record.box_office));
    lines.push(field("Production", &record.production));
    lines.push(field("Poster", record.poster.as_str()));
    if let Some(url) = record.website_url() {
        lines.push(field("Website", &format!("{url}  (o to open)")));
    }
    lines
}

pub struct Options {
    pub status_message: String,
    pub search_service: Arc<dyn SearchService>,
    pub detail_cache: Arc<DetailCache>,
    pub default_topic: String,
    pub debounce: Duration,
}

pub struct Model {
    notice: Option<String>,
    status_message: String,
    query: String,
    focus: Focus,
    list_state: ListState,
    view: SearchView,
    search: SearchController,
    modal: ModalController,
    debouncer: Debouncer,
    search_service: Arc<dyn SearchService>,
    detail_cache: Arc<DetailCache>,
    pending_row_details: HashMap<String, Arc<AtomicBool>>,
    row_detail_failures: HashSet<String>,
    default_topic: String,
    spinner: Spinner,
    needs_redraw: bool,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let search = SearchController::new(opts.default_topic.clone());
        let view = search.snapshot();
        let mut model = Self {
            notice: Some(opts.status_message).filter(|notice| !notice.trim().is_empty()),
            status_message: String::new(),
            query: String::new(),
            focus: Focus::Search,
            list_state: ListState::default(),
            view,
            search,
            modal: ModalController::new(),
            debouncer: Debouncer::new(opts.debounce),
            search_service: opts.search_service,
            detail_cache: opts.detail_cache,
            pending_row_details: HashMap::new(),
            row_detail_failures: HashSet::new(),
            default_topic: opts.default_topic,
            spinner: Spinner::new(),
            needs_redraw: true,
            response_tx,
            response_rx,
        };
        let ticket = model.search.on_query_changed("");
        model.dispatch_page(ticket);
        model.refresh_view();
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }
            self.tick(Instant::now());

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let mut timeout = TICK_RATE
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));
            if let Some(remaining) = self.debouncer.remaining(Instant::now()) {
                timeout = timeout.min(remaining);
            }

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= TICK_RATE {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.search.is_loading() || self.modal.view().loading
    }

    /// Lets the debouncer settle a pending query edit.
    fn tick(&mut self, now: Instant) {
        if let Some(query) = self.debouncer.poll(now) {
            self.apply_query(&query);
        }
    }

    fn apply_query(&mut self, query: &str) {
        debug!(query, "ui: effective query changed");
        let ticket = self.search.on_query_changed(query);
        if ticket.is_some() {
            self.withdraw_row_interest();
            self.list_state.select(Some(0));
        }
        self.dispatch_page(ticket);
        self.refresh_view();
    }

    fn edit_query(&mut self, edit: impl FnOnce(&mut String)) {
        edit(&mut self.query);
        self.debouncer.update(self.query.clone(), Instant::now());
        self.mark_dirty();
    }

    fn load_more(&mut self) {
        let ticket = self.search.on_load_more();
        self.dispatch_page(ticket);
        self.refresh_view();
    }

    fn refresh(&mut self) {
        let ticket = self.search.on_refresh();
        if ticket.is_some() {
            self.withdraw_row_interest();
            self.row_detail_failures.clear();
            self.list_state.select(Some(0));
        }
        self.dispatch_page(ticket);
        self.refresh_view();
    }

    fn dispatch_page(&self, ticket: Option<FetchTicket>) {
        let Some(ticket) = ticket else {
            return;
        };
        let tx = self.response_tx.clone();
        let service = self.search_service.clone();
        thread::spawn(move || {
            let result = service.search(&ticket.query, ticket.page);
            let _ = tx.send(AsyncResponse::Page { ticket, result });
        });
    }

    fn refresh_view(&mut self) {
        self.view = self.search.snapshot();
        let rows = self.row_count();
        if rows == 0 {
            self.list_state.select(None);
        } else {
            match self.list_state.selected() {
                Some(idx) if idx >= rows => self.list_state.select(Some(rows - 1)),
                None => self.list_state.select(Some(0)),
                _ => {}
            }
        }
        self.status_message = self.compose_status();
        self.request_row_details();
        self.mark_dirty();
    }

    fn compose_status(&self) -> String {
        let view = &self.view;
        if view.is_loading {
            return match view.mode {
                Mode::Browse => format!("Loading popular titles for {}...", self.default_topic),
                Mode::Search => format!("Searching \"{}\"...", view.query),
            };
        }
        if let Some(message) = &view.error_message {
            return message.clone();
        }
        match view.mode {
            Mode::Browse => format!(
                "Showing {} titles for {}. Start typing to search.",
                view.visible_items.len(),
                self.default_topic
            ),
            Mode::Search => format!(
                "{} of {} results for \"{}\"",
                view.visible_items.len(),
                view.total_count,
                view.query
            ),
        }
    }

    fn row_count(&self) -> usize {
        self.view.visible_items.len() + usize::from(self.view.can_load_more)
    }

    fn request_row_details(&mut self) {
        let wanted: Vec<String> = self
            .view
            .visible_items
            .iter()
            .map(|item| item.id.clone())
            .filter(|id| {
                !self.pending_row_details.contains_key(id)
                    && !self.row_detail_failures.contains(id)
                    && self.detail_cache.get(id).is_none()
            })
            .collect();

        for id in wanted {
            let withdrawn = Arc::new(AtomicBool::new(false));
            self.pending_row_details.insert(id.clone(), withdrawn.clone());
            let cache = self.detail_cache.clone();
            let tx = self.response_tx.clone();
            thread::spawn(move || {
                let failed = !matches!(cache.get_or_fetch(&id), Ok(Some(_)));
                let _ = tx.send(AsyncResponse::RowDetail {
                    id,
                    withdrawn,
                    failed,
                });
            });
        }
    }

    fn withdraw_row_interest(&mut self) {
        for flag in self.pending_row_details.values() {
            flag.store(true, Ordering::SeqCst);
        }
        self.pending_row_details.clear();
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Page { ticket, result } => {
                let next = self.search.on_page_loaded(&ticket, result);
                self.dispatch_page(next);
                self.refresh_view();
            }
            AsyncResponse::Details { ticket, result } => {
                if self.modal.on_details(&ticket, result) {
                    self.mark_dirty();
                }
            }
            AsyncResponse::RowDetail {
                id,
                withdrawn,
                failed,
            } => {
                if withdrawn.load(Ordering::SeqCst) {
                    return;
                }
                let current = self
                    .pending_row_details
                    .get(&id)
                    .is_some_and(|flag| Arc::ptr_eq(flag, &withdrawn));
                if !current {
                    return;
                }
                self.pending_row_details.remove(&id);
                if failed {
                    self.row_detail_failures.insert(id);
                }
                self.mark_dirty();
            }
        }
    }

    fn selected_item(&self) -> Option<&ResultItem> {
        self.list_state
            .selected()
            .and_then(|idx| self.view.visible_items.get(idx))
    }

    fn activate_selection(&mut self) {
        let Some(idx) = self.list_state.selected() else {
            return;
        };
        if idx == self.view.visible_items.len() && self.view.can_load_more {
            self.load_more();
            return;
        }
        let Some(id) = self.selected_item().map(|item| item.id.clone()) else {
            return;
        };
        self.open_modal(&id);
    }

    fn open_modal(&mut self, id: &str) {
        let cached = self.detail_cache.get(id);
        let Some(ticket) = self.modal.open(id, cached) else {
            self.mark_dirty();
            return;
        };
        let cache = self.detail_cache.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = cache.get_or_fetch(&ticket.id);
            let _ = tx.send(AsyncResponse::Details { ticket, result });
        });
        self.spinner.reset();
        self.mark_dirty();
    }

    fn close_modal(&mut self) {
        self.modal.close();
        self.mark_dirty();
    }

    fn open_website(&mut self) {
        let Some(record) = self.modal.view().detail else {
            return;
        };
        let Some(url) = record.website_url() else {
            self.status_message = "No homepage listed for this title.".to_string();
            self.mark_dirty();
            return;
        };
        if let Err(err) = webbrowser::open(url) {
            warn!(url, error = %err, "ui: failed to open browser");
            self.status_message = format!("Failed to open {url}: {err}");
        } else {
            self.status_message = format!("Opened {url}");
        }
        self.mark_dirty();
    }

    fn move_selection(&mut self, delta: isize) {
        let rows = self.row_count();
        if rows == 0 {
            return;
        }
        let current = self.list_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, rows as isize - 1) as usize;
        self.list_state.select(Some(next));
        self.mark_dirty();
    }

    // The startup notice stays up until the first key press.
    fn status_line(&self) -> String {
        let status = match &self.notice {
            Some(notice) => format!("{notice} • {}", self.status_message),
            None => self.status_message.clone(),
        };
        if self.is_loading() {
            format!("{} {}", self.spinner.frame(), status)
        } else {
            status
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if self.notice.take().is_some() {
            self.mark_dirty();
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }

        if self.modal.is_open() {
            match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace | KeyCode::Char('q') => {
                    self.close_modal()
                }
                KeyCode::Char('o') => self.open_website(),
                _ => {}
            }
            return Ok(false);
        }

        match self.focus {
            Focus::Search => self.handle_search_key(key),
            Focus::Results => self.handle_results_key(key),
        }
        .map(|quit| {
            self.mark_dirty();
            quit
        })
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.edit_query(String::clear);
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.edit_query(|query| query.push(ch));
            }
            KeyCode::Backspace => {
                self.edit_query(|query| {
                    query.pop();
                });
            }
            KeyCode::Esc => {
                if self.query.is_empty() {
                    self.focus = Focus::Results;
                } else {
                    self.edit_query(String::clear);
                }
            }
            KeyCode::Enter => {
                if let Some(query) = self.debouncer.flush() {
                    self.apply_query(&query);
                }
                self.focus = Focus::Results;
            }
            KeyCode::Down | KeyCode::Tab => self.focus = Focus::Results,
            _ => {}
        }
        Ok(false)
    }

    fn handle_results_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('/') | KeyCode::Tab | KeyCode::Esc => self.focus = Focus::Search,
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => {
                if self.list_state.selected().unwrap_or(0) == 0 {
                    self.focus = Focus::Search;
                } else {
                    self.move_selection(-1);
                }
            }
            KeyCode::Char('g') | KeyCode::Home => self.move_selection(isize::MIN / 2),
            KeyCode::Char('G') | KeyCode::End => self.move_selection(isize::MAX / 2),
            KeyCode::Char('m') => self.load_more(),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Enter => self.activate_selection(),
            _ => {}
        }
        Ok(false)
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = self.status_line();
        let status_style = if self.view.error_message.is_some() && !self.view.is_loading {
            Style::default().fg(COLOR_ERROR).bg(COLOR_PANEL_FOCUSED_BG)
        } else {
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
        };
        frame.render_widget(
            Paragraph::new(status_text).style(status_style.add_modifier(Modifier::BOLD)),
            layout[0],
        );

        self.draw_search(frame, layout[1]);
        self.draw_results(frame, layout[2]);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[3]);

        if self.modal.is_open() {
            self.draw_modal(frame, layout[2]);
        }
    }

    fn pane_block(&self, title: String, focused: bool) -> Block<'static> {
        let border = if focused {
            COLOR_BORDER_FOCUSED
        } else {
            COLOR_BORDER_IDLE
        };
        Block::default()
            .title(Span::styled(
                title,
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(COLOR_PANEL_BG))
    }

    fn draw_search(&self, frame: &mut Frame<'_>, area: Rect) {
        let focused = self.focus == Focus::Search && !self.modal.is_open();
        let block = self.pane_block("Search movies".to_string(), focused);
        let inner = block.inner(area);
        let text = if self.query.is_empty() && !focused {
            Span::styled(
                "Search through thousands of movies",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )
        } else {
            Span::styled(self.query.clone(), Style::default().fg(COLOR_TEXT_PRIMARY))
        };
        frame.render_widget(Paragraph::new(Line::from(text)).block(block), area);
        if focused {
            let offset = UnicodeWidthStr::width(self.query.as_str()) as u16;
            frame.set_cursor(
                inner.x + offset.min(inner.width.saturating_sub(1)),
                inner.y,
            );
        }
    }

    fn draw_results(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let title = match self.view.mode {
            Mode::Browse => "All Movies".to_string(),
            Mode::Search => format!("Results for \"{}\"", self.view.query),
        };
        let block = self.pane_block(title, self.focus == Focus::Results);
        let inner = block.inner(area);

        let placeholder = if let Some(message) = &self.view.error_message {
            Some(Span::styled(
                message.clone(),
                Style::default()
                    .fg(COLOR_ERROR)
                    .add_modifier(Modifier::BOLD),
            ))
        } else if self.view.visible_items.is_empty() {
            let text = if self.view.is_loading {
                format!("{} Loading movies…", self.spinner.frame())
            } else {
                "No movies to show.".to_string()
            };
            Some(Span::styled(text, Style::default().fg(COLOR_TEXT_SECONDARY)))
        } else {
            None
        };
        if let Some(span) = placeholder {
            let paragraph = Paragraph::new(Line::from(span))
                .block(block)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }

        let width = inner.width.saturating_sub(2) as usize;
        let mut items: Vec<ListItem> = self
            .view
            .visible_items
            .iter()
            .map(|item| {
                let detail = self.detail_cache.get(&item.id);
                ListItem::new(row_line(item, detail.as_deref(), width))
            })
            .collect();
        if self.view.can_load_more {
            items.push(ListItem::new(Line::from(Span::styled(
                format!(
                    "⤓ Load more ({} of {})",
                    self.view.visible_items.len(),
                    self.view.total_count
                ),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))));
        } else if self.view.is_loading {
            items.push(ListItem::new(Line::from(Span::styled(
                format!("{} Loading more…", self.spinner.frame()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ))));
        }

        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .bg(COLOR_PANEL_SELECTED_BG)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn draw_modal(&self, frame: &mut Frame<'_>, area: Rect) {
        let popup = centered_rect(80, 85, area);
        frame.render_widget(Clear, popup);

        let view = self.modal.view();
        let body: Text<'static> = if view.loading {
            Text::from(Line::from(Span::styled(
                format!("{} Loading details…", self.spinner.frame()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )))
        } else if let Some(record) = &view.detail {
            Text::from(detail_lines(record))
        } else {
            Text::from(Line::from(Span::styled(
                "No details found.",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )))
        };

        let block = Block::default()
            .title(Span::styled(
                "Details",
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_ACCENT))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let paragraph = Paragraph::new(body)
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, popup);
    }

    fn footer_text(&self) -> &'static str {
        if self.modal.is_open() {
            return "Esc close • o open homepage • Ctrl-C quit";
        }
        match self.focus {
            Focus::Search => "Type to search • Enter search now • Esc clear • ↓/Tab results • Ctrl-C quit",
            Focus::Results => {
                "j/k move • Enter details • m load more • r refresh • / search • q quit"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sample_item, DetailService, ScriptedDetailService, ScriptedSearchService};
    use crate::modal::ModalState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn model_with(search: Arc<ScriptedSearchService>) -> Model {
        model_with_notice(search, "")
    }

    fn model_with_notice(search: Arc<ScriptedSearchService>, notice: &str) -> Model {
        let details = Arc::new(ScriptedDetailService::demo());
        Model::new(Options {
            status_message: notice.to_string(),
            search_service: search,
            detail_cache: Arc::new(DetailCache::new(details)),
            default_topic: "Avengers".into(),
            debounce: Duration::from_millis(500),
        })
    }

    fn settle(model: &mut Model) {
        for _ in 0..300 {
            model.poll_async();
            if !model.search.is_loading()
                && model.pending_row_details.is_empty()
                && !model.modal.view().loading
            {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("model did not settle");
    }

    fn type_query(model: &mut Model, text: &str) {
        for ch in text.chars() {
            model.handle_key(key(KeyCode::Char(ch))).unwrap();
        }
        model.tick(Instant::now() + Duration::from_secs(1));
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate_to_width("Casablanca", 20), "Casablanca");
        assert_eq!(truncate_to_width("Casablanca", 6), "Casab…");
        assert_eq!(truncate_to_width("Casablanca", 0), "");
    }

    #[test]
    fn row_meta_degrades_without_details() {
        let item = sample_item("tt1", "Alien", "1979");
        assert_eq!(
            row_meta(&item, None),
            ("N/A".to_string(), "N/A".to_string(), "1979".to_string())
        );

        let record = ScriptedDetailService::demo()
            .details("tt0100002")
            .unwrap()
            .unwrap();
        let (rating, language, _) = row_meta(&item, Some(&record));
        assert_eq!(rating, "6.1");
        assert_eq!(language, "English");
    }

    #[test]
    fn detail_lines_show_genres_and_status() {
        let record = ScriptedDetailService::demo()
            .details("tt0100001")
            .unwrap()
            .unwrap();
        let rendered: Vec<String> = detail_lines(&record)
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect();
        assert!(rendered.iter().any(|line| line.contains("[Action]")));
        assert!(rendered.iter().any(|line| line == "Status: Unknown"));
        assert!(rendered.iter().any(|line| line == "Poster: no-movie.png"));
        assert!(!rendered.iter().any(|line| line.starts_with("Website")));
    }

    #[test]
    fn startup_notice_shows_until_first_key() {
        let search = Arc::new(ScriptedSearchService::demo());
        let mut model = model_with_notice(search, "Demo catalog loaded. No network access.");
        assert!(model
            .status_line()
            .contains("Demo catalog loaded. No network access."));

        settle(&mut model);
        let line = model.status_line();
        assert!(line.starts_with("Demo catalog loaded. No network access."));
        assert!(line.contains("Showing 20 titles for Avengers"));

        model.handle_key(key(KeyCode::Tab)).unwrap();
        assert!(!model.status_line().contains("Demo catalog"));
        assert!(model.status_line().starts_with("Showing 20 titles"));
    }

    #[test]
    fn blank_notice_is_not_shown() {
        let search = Arc::new(ScriptedSearchService::demo());
        let mut model = model_with(search);
        settle(&mut model);
        assert!(model.status_line().starts_with("Showing 20 titles"));
    }

    #[test]
    fn starts_in_browse_mode_with_twenty_titles() {
        let search = Arc::new(ScriptedSearchService::demo());
        let mut model = model_with(search.clone());
        settle(&mut model);

        assert_eq!(model.view.mode, Mode::Browse);
        assert_eq!(model.view.visible_items.len(), 20);
        assert!(!model.view.can_load_more);
        assert_eq!(model.row_count(), 20);
        assert_eq!(search.calls().len(), 2);
        assert!(model
            .view
            .visible_items
            .iter()
            .all(|item| model.detail_cache.get(&item.id).is_some()));
    }

    #[test]
    fn typing_searches_after_debounce_and_loads_more() {
        let search = Arc::new(ScriptedSearchService::demo());
        let mut model = model_with(search.clone());
        settle(&mut model);

        type_query(&mut model, "batman");
        settle(&mut model);
        assert_eq!(model.view.mode, Mode::Search);
        assert_eq!(model.view.visible_items.len(), 10);
        assert!(model.view.can_load_more);
        assert_eq!(model.row_count(), 11);
        let batman_calls: Vec<_> = search
            .calls()
            .into_iter()
            .filter(|(query, _)| query == "batman")
            .collect();
        assert_eq!(batman_calls, vec![("batman".to_string(), 1)]);

        model.handle_key(key(KeyCode::Tab)).unwrap();
        model.handle_key(key(KeyCode::Char('m'))).unwrap();
        settle(&mut model);
        assert_eq!(model.view.visible_items.len(), 20);

        model.handle_key(key(KeyCode::Char('G'))).unwrap();
        model.handle_key(key(KeyCode::Enter)).unwrap();
        settle(&mut model);
        assert_eq!(model.view.visible_items.len(), 23);
        assert!(!model.view.can_load_more);
    }

    #[test]
    fn enter_opens_modal_and_escape_closes_it() {
        let search = Arc::new(ScriptedSearchService::demo());
        let mut model = model_with(search);
        settle(&mut model);

        model.handle_key(key(KeyCode::Down)).unwrap();
        model.handle_key(key(KeyCode::Enter)).unwrap();
        settle(&mut model);
        match model.modal.state() {
            ModalState::Loaded { record, .. } => assert_eq!(record.title, "Avengers"),
            other => panic!("unexpected modal state {other:?}"),
        }

        model.handle_key(key(KeyCode::Esc)).unwrap();
        assert_eq!(model.modal.state(), &ModalState::Closed);
    }

    #[test]
    fn not_found_shows_error_and_recovers() {
        let search = Arc::new(ScriptedSearchService::demo());
        let mut model = model_with(search);
        settle(&mut model);

        type_query(&mut model, "zzzqqq");
        settle(&mut model);
        assert_eq!(model.view.error_message.as_deref(), Some("Movie not found!"));
        assert_eq!(model.status_message, "Movie not found!");
        assert_eq!(model.row_count(), 0);

        model.handle_key(key(KeyCode::Esc)).unwrap();
        model.tick(Instant::now() + Duration::from_secs(1));
        settle(&mut model);
        assert_eq!(model.view.mode, Mode::Browse);
        assert_eq!(model.view.visible_items.len(), 20);
        assert!(model.view.error_message.is_none());
    }
}
