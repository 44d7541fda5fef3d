// Navigation state management.
// Tracks the active category and page, the stack of focused records, and the
// list position each detail view returns to.

use crate::cache::Descriptor;
use crate::error::{CatalogError, Result};
use crate::swapi::{Address, Category, Page};

use super::location::Location;

/// A list position to restore when leaving a detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnContext {
    pub category: Category,
    pub page: u32,
}

/// A focused record and where "back" should lead from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Focus {
    pub address: Address,
    pub return_context: Option<ReturnContext>,
}

/// Where a back action landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackTarget {
    /// Restored the exact list position the detail view was opened from.
    ListPosition(ReturnContext),
    /// Returned to the detail view underneath.
    Detail(Address),
    /// Generic back to the browse view.
    Browse,
}

/// A node in the navigation breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreadcrumbNode {
    pub label: String,
}

/// The user's position: category, page, and a stack of focused records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    category: Category,
    page: u32,
    /// Bottom = first detail opened from the list, top = current.
    stack: Vec<Focus>,
}

impl NavigationState {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            page: 1,
            stack: Vec::new(),
        }
    }

    /// Rebuild the state a location string describes.
    pub fn from_location(
        location: &Location,
        address_for: impl Fn(Category, &str) -> Result<Address>,
    ) -> Result<Self> {
        match location {
            Location::Browse(ctx) => Ok(Self {
                category: ctx.category,
                page: ctx.page.max(1),
                stack: Vec::new(),
            }),
            Location::Detail {
                category,
                id,
                return_context,
            } => {
                let address = address_for(*category, id)?;
                let list = return_context.unwrap_or(ReturnContext {
                    category: *category,
                    page: 1,
                });
                let mut state = Self {
                    category: list.category,
                    page: list.page.max(1),
                    stack: Vec::new(),
                };
                state.focus(address, *return_context);
                Ok(state)
            }
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Switch tabs. Always lands on page 1 of the list.
    pub fn set_active_category(&mut self, category: Category) {
        self.category = category;
        self.page = 1;
        self.stack.clear();
    }

    /// Jump to page `page`. Range is checked by the service, not here.
    pub fn set_active_page(&mut self, page: u32) -> Result<()> {
        if page == 0 {
            return Err(CatalogError::InvalidPage);
        }
        self.page = page;
        Ok(())
    }

    /// Advance if `current` links to a next page.
    pub fn next_page(&mut self, current: &Page) -> bool {
        if current.has_next() {
            self.page = current.number.saturating_add(1);
            true
        } else {
            false
        }
    }

    /// Go back a page if `current` links to a previous one.
    pub fn prev_page(&mut self, current: &Page) -> bool {
        if current.has_previous() && current.number > 1 {
            self.page = current.number - 1;
            true
        } else {
            false
        }
    }

    /// The list position a detail view opened now should return to.
    pub fn list_position(&self) -> ReturnContext {
        ReturnContext {
            category: self.category,
            page: self.page,
        }
    }

    /// Open a detail view on `address`.
    pub fn focus(&mut self, address: Address, return_context: Option<ReturnContext>) {
        self.stack.push(Focus {
            address,
            return_context,
        });
    }

    pub fn focused(&self) -> Option<&Focus> {
        self.stack.last()
    }

    pub fn focused_address(&self) -> Option<&Address> {
        self.focused().map(|f| &f.address)
    }

    pub fn resolve_return_context(&self) -> Option<ReturnContext> {
        self.focused().and_then(|f| f.return_context)
    }

    /// Leave the current detail view.
    pub fn back(&mut self) -> BackTarget {
        let Some(top) = self.stack.pop() else {
            return BackTarget::Browse;
        };
        if let Some(ctx) = top.return_context {
            self.category = ctx.category;
            self.page = ctx.page;
            self.stack.clear();
            return BackTarget::ListPosition(ctx);
        }
        match self.stack.last() {
            Some(previous) => BackTarget::Detail(previous.address.clone()),
            None => BackTarget::Browse,
        }
    }

    /// True while a detail view is showing.
    pub fn can_go_back(&self) -> bool {
        !self.stack.is_empty()
    }

    /// The fetchable unit the current view needs.
    pub fn descriptor(&self) -> Descriptor {
        match self.focused() {
            Some(focus) => Descriptor::Address(focus.address.clone()),
            None => Descriptor::Page {
                category: self.category,
                page: self.page,
            },
        }
    }

    /// The descriptor of the list underneath any detail views.
    pub fn list_descriptor(&self) -> Descriptor {
        Descriptor::Page {
            category: self.category,
            page: self.page,
        }
    }

    /// Shareable form of the current position.
    pub fn location(&self) -> Location {
        match self.focused() {
            Some(focus) => Location::Detail {
                category: focus.address.category().unwrap_or(self.category),
                id: focus.address.id().unwrap_or_default().to_string(),
                return_context: focus.return_context,
            },
            None => Location::Browse(self.list_position()),
        }
    }

    /// Breadcrumb trail; `name_of` supplies record names known to the cache.
    pub fn breadcrumbs(&self, name_of: impl Fn(&Address) -> Option<String>) -> Vec<BreadcrumbNode> {
        let mut trail = vec![BreadcrumbNode {
            label: format!("{} p.{}", self.category.title(), self.page),
        }];
        trail.extend(self.stack.iter().map(|focus| BreadcrumbNode {
            label: name_of(&focus.address).unwrap_or_else(|| {
                format!(
                    "{} #{}",
                    focus.address.category().map(|c| c.title()).unwrap_or("Record"),
                    focus.address.id().unwrap_or("?")
                )
            }),
        }));
        trail
    }
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new(Category::default())
    }
}
