// Browse view state.
// Projects the active page's cache entry into what the list shows, keeping the
// previous page on screen while the next one loads.

use std::sync::Arc;

use ratatui::widgets::ListState;

use crate::cache::{QueryState, QueryStatus};
use crate::error::CatalogError;
use crate::swapi::{Category, Page, Record};

/// What the list area should show for the active page.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PageView {
    /// Nothing to show yet, not even a placeholder.
    #[default]
    Loading,
    /// The first fetch failed and there is no earlier data.
    Failed(CatalogError),
    Ready {
        page: Arc<Page>,
        /// `page` belongs to an earlier position and stands in until the
        /// requested one arrives.
        placeholder: bool,
        refetching: bool,
        /// Error of the latest attempt, shown alongside kept data.
        error: Option<CatalogError>,
    },
}

impl PageView {
    /// Decide what to render for `(category, number)`.
    ///
    /// `shown` is the last real page rendered. It only stands in for pages of
    /// the same category.
    pub fn project(
        category: Category,
        number: u32,
        state: &QueryState,
        shown: Option<&Arc<Page>>,
    ) -> Self {
        if let Some(page) = state.page() {
            return PageView::Ready {
                page: page.clone(),
                placeholder: false,
                refetching: state.is_refetching(),
                error: state.error.clone(),
            };
        }

        let placeholder = shown.filter(|p| p.category == category && p.number != number);
        match (state.status, placeholder) {
            (QueryStatus::Error, _) => PageView::Failed(
                state
                    .error
                    .clone()
                    .unwrap_or_else(|| CatalogError::UnreachableService("unknown error".into())),
            ),
            (_, Some(page)) => PageView::Ready {
                page: page.clone(),
                placeholder: true,
                refetching: true,
                error: None,
            },
            (_, None) => PageView::Loading,
        }
    }

    pub fn page(&self) -> Option<&Arc<Page>> {
        match self {
            PageView::Ready { page, .. } => Some(page),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, PageView::Ready { placeholder: true, .. })
    }

    /// Prev/next controls are live only over real data.
    pub fn navigable(&self) -> Option<&Arc<Page>> {
        match self {
            PageView::Ready {
                page,
                placeholder: false,
                ..
            } => Some(page),
            _ => None,
        }
    }
}

/// List selection over the displayed page.
#[derive(Debug, Clone, Default)]
pub struct BrowseState {
    pub list_state: ListState,
    view: PageView,
    shown: Option<Arc<Page>>,
}

impl BrowseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &PageView {
        &self.view
    }

    /// Recompute the view for the wanted position from its cache snapshot.
    pub fn update(&mut self, category: Category, number: u32, state: &QueryState) {
        let view = PageView::project(category, number, state, self.shown.as_ref());

        if let PageView::Ready {
            page,
            placeholder: false,
            ..
        } = &view
        {
            let moved = self
                .shown
                .as_ref()
                .is_none_or(|p| p.category != page.category || p.number != page.number);
            self.shown = Some(page.clone());
            if moved {
                self.reset_selection();
            }
        }
        self.view = view;
        self.clamp_selection();
    }

    pub fn selected(&self) -> Option<usize> {
        self.list_state.selected()
    }

    pub fn select_next(&mut self) {
        let len = self.len();
        step(&mut self.list_state, len, 1);
    }

    pub fn select_prev(&mut self) {
        let len = self.len();
        step(&mut self.list_state, len, -1);
    }

    pub fn selected_record(&self) -> Option<&Arc<Record>> {
        let index = self.list_state.selected()?;
        self.view.page()?.results.get(index)
    }

    pub fn reset_selection(&mut self) {
        let first = (self.len() > 0).then_some(0);
        self.list_state.select(first);
    }

    fn len(&self) -> usize {
        self.view.page().map_or(0, |p| p.results.len())
    }

    fn clamp_selection(&mut self) {
        let len = self.len();
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            None => self.list_state.select(Some(0)),
            Some(_) => {}
        }
    }
}

/// Move a list selection by `delta`, staying within `0..len`.
pub(crate) fn step(list_state: &mut ListState, len: usize, delta: isize) {
    if len == 0 {
        list_state.select(None);
        return;
    }
    let i = match list_state.selected() {
        Some(i) => i.saturating_add_signed(delta).min(len - 1),
        None => 0,
    };
    list_state.select(Some(i));
}
