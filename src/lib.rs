// Terminal browser for the Star Wars API catalog.
// Catalog client, query cache, navigation state and the ratatui front-end.

pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod paths;
pub mod state;
pub mod swapi;
pub mod ui;

pub use error::{CatalogError, Result};
