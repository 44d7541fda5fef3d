// App state and main event loop.
// Owns navigation, the query cache and view state, and maps keyboard input onto them.

use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::prelude::*;
use tokio::sync::mpsc;

use crate::cache::{Descriptor, QueryCache, ReferenceState};
use crate::state::{BackTarget, BreadcrumbNode, BrowseState, DetailState, NavigationState};
use crate::swapi::{Address, CatalogClient};
use crate::ui;

/// How long a status message stays in the status bar.
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Main application state.
pub struct App {
    pub cache: QueryCache<CatalogClient>,
    pub nav: NavigationState,
    pub browse: BrowseState,
    pub detail: DetailState,
    /// Whether the help overlay is visible.
    pub show_help: bool,
    /// Whether the app should exit.
    pub should_quit: bool,
    status: Option<(String, Instant)>,
    needs_redraw: bool,
}

impl App {
    pub fn new(cache: QueryCache<CatalogClient>, nav: NavigationState) -> Self {
        let mut app = Self {
            cache,
            nav,
            browse: BrowseState::new(),
            detail: DetailState::new(),
            show_help: false,
            should_quit: false,
            status: None,
            needs_redraw: true,
        };
        app.navigated();
        app
    }

    /// Whether a detail view is showing.
    pub fn in_detail(&self) -> bool {
        self.nav.can_go_back()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_ref().map(|(msg, _)| msg.as_str())
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some((msg.into(), Instant::now()));
    }

    /// Drop an expired status message. Returns true if one was dropped.
    pub fn clear_expired_status(&mut self) -> bool {
        match &self.status {
            Some((_, at)) if at.elapsed() >= STATUS_TTL => {
                self.status = None;
                true
            }
            _ => false,
        }
    }

    pub fn breadcrumbs(&self) -> Vec<BreadcrumbNode> {
        self.nav.breadcrumbs(|address| match self.cache.reference(address) {
            ReferenceState::Resolved { name, .. } => Some(name),
            _ => None,
        })
    }

    /// Main event loop.
    ///
    /// Multiplexes terminal input, settle notifications from the cache, and a
    /// periodic tick for status expiry.
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<impl Backend>,
        mut settled: mpsc::UnboundedReceiver<Descriptor>,
    ) -> std::io::Result<()> {
        let mut events = EventStream::new();
        let mut tick = tokio::time::interval(Duration::from_millis(250));

        while !self.should_quit {
            if self.needs_redraw {
                terminal.draw(|frame| ui::draw(frame, self))?;
                self.needs_redraw = false;
            }

            tokio::select! {
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) => self.handle_key(key),
                    Some(Ok(Event::Resize(..))) => self.needs_redraw = true,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e),
                    None => self.should_quit = true,
                },
                Some(descriptor) = settled.recv() => {
                    self.on_settled(&descriptor);
                    // Drain the burst a page of references produces before redrawing.
                    while let Ok(descriptor) = settled.try_recv() {
                        self.on_settled(&descriptor);
                    }
                }
                _ = tick.tick() => {
                    if self.clear_expired_status() {
                        self.needs_redraw = true;
                    }
                }
            }
        }
        Ok(())
    }

    /// Handle one key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.needs_redraw = true;

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if self.show_help {
            match key.code {
                KeyCode::Esc | KeyCode::Char('?') => self.show_help = false,
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Tab => {
                self.nav.set_active_category(self.nav.category().next());
                self.navigated();
            }
            KeyCode::BackTab => {
                self.nav.set_active_category(self.nav.category().prev());
                self.navigated();
            }
            KeyCode::Right | KeyCode::Char('l') if !self.in_detail() => self.next_page(),
            KeyCode::Left | KeyCode::Char('h') if !self.in_detail() => self.prev_page(),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.in_detail() {
                    self.detail.select_next();
                } else {
                    self.browse.select_next();
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.in_detail() {
                    self.detail.select_prev();
                } else {
                    self.browse.select_prev();
                }
            }
            KeyCode::Enter => self.open_selected(),
            KeyCode::Esc | KeyCode::Backspace => self.back(),
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
    }

    fn next_page(&mut self) {
        let moved = match self.browse.view().navigable() {
            Some(page) => self.nav.next_page(page),
            None => false,
        };
        if moved {
            self.navigated();
        }
    }

    fn prev_page(&mut self) {
        let moved = match self.browse.view().navigable() {
            Some(page) => self.nav.prev_page(page),
            None => false,
        };
        if moved {
            self.navigated();
        }
    }

    /// Open the selected card, or follow the selected reference.
    fn open_selected(&mut self) {
        let target: Option<(Address, bool)> = if self.in_detail() {
            self.detail.selected_target().map(|a| (a.clone(), false))
        } else {
            self.browse
                .selected_record()
                .map(|r| (r.address().clone(), true))
        };
        let Some((address, from_list)) = target else {
            return;
        };
        let return_context = from_list.then(|| self.nav.list_position());
        tracing::debug!(%address, ?return_context, "Opening record");
        self.nav.focus(address, return_context);
        self.detail.clear();
        self.navigated();
    }

    fn back(&mut self) {
        match self.nav.back() {
            BackTarget::ListPosition(ctx) => {
                tracing::debug!(category = %ctx.category, page = ctx.page, "Back to list position")
            }
            BackTarget::Detail(address) => tracing::debug!(%address, "Back to previous record"),
            BackTarget::Browse => {}
        }
        self.detail.clear();
        self.navigated();
    }

    /// Revalidate the current view. Failed references of a record are retried too.
    fn refresh(&mut self) {
        let descriptor = self.nav.descriptor();
        self.cache.refresh(descriptor.clone());
        if let Some(record) = self.cache.get(&descriptor).record() {
            for address in record.references() {
                if matches!(self.cache.reference(&address), ReferenceState::Failed(_)) {
                    self.cache.refresh(Descriptor::Address(address));
                }
            }
        }
        self.set_status(format!("Refreshing {}", descriptor));
        self.sync_view();
    }

    /// Navigation changed: make sure the new view's data is on its way.
    fn navigated(&mut self) {
        let descriptor = self.nav.descriptor();
        self.cache.ensure(descriptor.clone());
        // Records seeded by a page are already here; their references are not.
        if let Some(record) = self.cache.get(&descriptor).record() {
            self.cache.ensure_references(record);
        }
        self.sync_view();
    }

    /// A fetch settled somewhere in the cache.
    fn on_settled(&mut self, descriptor: &Descriptor) {
        tracing::trace!(%descriptor, "Settled");
        let focused = self
            .nav
            .focused_address()
            .is_some_and(|address| *descriptor == Descriptor::Address(address.clone()));
        if focused {
            if let Some(record) = self.cache.get(descriptor).record() {
                self.cache.ensure_references(record);
            }
        }
        self.sync_view();
    }

    /// Re-project cache snapshots into view state.
    fn sync_view(&mut self) {
        let list = self.nav.list_descriptor();
        self.browse
            .update(self.nav.category(), self.nav.page(), &self.cache.get(&list));

        match self.nav.focused_address() {
            Some(address) => {
                let state = self.cache.get(&Descriptor::Address(address.clone()));
                self.detail.update(state.record().map(|r| r.as_ref()));
            }
            None => self.detail.clear(),
        }
        self.needs_redraw = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RetryPolicy;
    use crate::swapi::{Category, DEFAULT_TIMEOUT};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn catalog() -> MockServer {
        let server = MockServer::start().await;
        let base = format!("{}/api", server.uri());
        for number in 1..=2u32 {
            let results: Vec<_> = (1..=3)
                .map(|i| {
                    let id = (number - 1) * 10 + i;
                    json!({
                        "name": format!("Person {id}"),
                        "birth_year": "19BBY",
                        "gender": "n/a",
                        "homeworld": format!("{base}/planets/1/"),
                        "url": format!("{base}/people/{id}/"),
                    })
                })
                .collect();
            Mock::given(method("GET"))
                .and(path("/api/people/"))
                .and(query_param("page", number.to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "count": 13,
                    "next": (number == 1).then(|| format!("{base}/people/?page=2")),
                    "previous": (number == 2).then(|| format!("{base}/people/?page=1")),
                    "results": results,
                })))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/api/planets/1/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Tatooine",
                "url": format!("{base}/planets/1/"),
            })))
            .mount(&server)
            .await;
        server
    }

    async fn app_for(server: &MockServer) -> (App, mpsc::UnboundedReceiver<Descriptor>) {
        let client = CatalogClient::new(&format!("{}/api", server.uri()), DEFAULT_TIMEOUT).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let cache = QueryCache::new(client)
            .with_retry(RetryPolicy::NONE)
            .with_notifier(tx);
        (App::new(cache, NavigationState::default()), rx)
    }

    /// Apply settle notifications until `done` holds.
    async fn settle_until(
        app: &mut App,
        rx: &mut mpsc::UnboundedReceiver<Descriptor>,
        done: impl Fn(&App) -> bool,
    ) {
        while !done(app) {
            let descriptor = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            app.on_settled(&descriptor);
        }
    }

    #[tokio::test]
    async fn test_open_record_and_return_to_page() {
        let server = catalog().await;
        let (mut app, mut rx) = app_for(&server).await;
        settle_until(&mut app, &mut rx, |a| a.browse.view().navigable().is_some()).await;

        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.nav.page(), 2);
        // Page 1 stands in until page 2 lands.
        assert!(app.browse.view().is_placeholder());
        settle_until(&mut app, &mut rx, |a| a.browse.view().navigable().is_some()).await;

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert!(app.in_detail());
        assert_eq!(
            app.nav.location().to_string(),
            "/people/12?tab=people&page=2"
        );

        // The record was seeded by the page, so its homeworld resolves next.
        let homeworld = app.detail.targets()[0].clone();
        settle_until(&mut app, &mut rx, |a| {
            matches!(a.cache.reference(&homeworld), ReferenceState::Resolved { .. })
        })
        .await;

        app.handle_key(key(KeyCode::Esc));
        assert!(!app.in_detail());
        assert_eq!((app.nav.category(), app.nav.page()), (Category::People, 2));
    }

    #[tokio::test]
    async fn test_paging_disabled_while_loading() {
        let server = catalog().await;
        let (mut app, _rx) = app_for(&server).await;
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.nav.page(), 1);
    }

    #[tokio::test]
    async fn test_tab_switch_resets_page() {
        let server = catalog().await;
        let (mut app, _rx) = app_for(&server).await;
        app.nav.set_active_page(3).unwrap();
        app.handle_key(key(KeyCode::Tab));
        assert_eq!((app.nav.category(), app.nav.page()), (Category::Planets, 1));
        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.nav.category(), Category::People);
    }

    #[tokio::test]
    async fn test_help_overlay_captures_keys() {
        let server = catalog().await;
        let (mut app, _rx) = app_for(&server).await;
        app.handle_key(key(KeyCode::Char('?')));
        assert!(app.show_help);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.nav.category(), Category::People);
        app.handle_key(key(KeyCode::Esc));
        assert!(!app.show_help);
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_status_expires() {
        let server = catalog().await;
        let (mut app, _rx) = app_for(&server).await;
        app.set_status("Refreshing");
        assert!(!app.clear_expired_status());
        app.status = Some(("old".into(), Instant::now() - STATUS_TTL));
        assert!(app.clear_expired_status());
        assert!(app.status().is_none());
    }
}
