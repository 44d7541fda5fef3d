// SWAPI catalog module.
// Provides the HTTP client, record types and field schema for the Star Wars API.

pub mod client;
pub mod endpoints;
pub mod schema;
pub mod types;

pub use client::{CatalogClient, DEFAULT_TIMEOUT, SWAPI_BASE};
pub use schema::{DisplayField, FieldKind, FieldValue, display_fields, summary_fields};
pub use types::*;
