// State management module.
// Handles navigation, location strings, and list/detail view state.

pub mod browse;
pub mod detail;
pub mod location;
pub mod navigation;

pub use browse::{BrowseState, PageView};
pub use detail::DetailState;
pub use location::Location;
pub use navigation::{BackTarget, BreadcrumbNode, Focus, NavigationState, ReturnContext};
