// Shareable location strings.
// Encodes the navigation position as `/people/1?tab=people&page=3` or `?tab=planets&page=2`.

use std::fmt;
use std::str::FromStr;

use url::form_urlencoded;

use crate::error::{CatalogError, Result};
use crate::swapi::Category;

use super::navigation::ReturnContext;

/// A serialized navigation position.
///
/// Browse locations carry only the list position. Detail locations name the
/// focused record and, when it was opened from a list, the position to return to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Browse(ReturnContext),
    Detail {
        category: Category,
        id: String,
        return_context: Option<ReturnContext>,
    },
}

impl Default for Location {
    fn default() -> Self {
        Location::Browse(ReturnContext {
            category: Category::default(),
            page: 1,
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Browse(ctx) => write!(f, "?{}", query_string(ctx)),
            Location::Detail {
                category,
                id,
                return_context,
            } => {
                write!(f, "/{}/{}", category.path(), id)?;
                if let Some(ctx) = return_context {
                    write!(f, "?{}", query_string(ctx))?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for Location {
    type Err = CatalogError;

    /// Lenient on the query: unknown tabs fall back to people and bad pages to 1.
    /// Strict on the path: a detail path must name a known category and an id.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (path, query) = s.split_once('?').unwrap_or((s, ""));

        let mut tab: Option<String> = None;
        let mut page: Option<String> = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "tab" => tab = Some(value.into_owned()),
                "page" => page = Some(value.into_owned()),
                _ => {}
            }
        }

        let has_context = tab.is_some() || page.is_some();
        let ctx = ReturnContext {
            category: tab
                .as_deref()
                .and_then(Category::from_path)
                .unwrap_or_default(),
            page: page
                .as_deref()
                .and_then(|p| p.parse::<u32>().ok())
                .filter(|p| *p > 0)
                .unwrap_or(1),
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Ok(Location::Browse(ctx)),
            [category, id] => {
                let category = Category::from_path(category)
                    .ok_or_else(|| CatalogError::InvalidAddress(s.to_string()))?;
                Ok(Location::Detail {
                    category,
                    id: (*id).to_string(),
                    return_context: has_context.then_some(ctx),
                })
            }
            _ => Err(CatalogError::InvalidAddress(s.to_string())),
        }
    }
}

fn query_string(ctx: &ReturnContext) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("tab", ctx.category.path())
        .append_pair("page", &ctx.page.to_string())
        .finish()
}
