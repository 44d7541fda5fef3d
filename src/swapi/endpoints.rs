// SWAPI endpoint functions.
// Typed fetches for category pages and single records.

use crate::error::{CatalogError, Result};

use super::client::CatalogClient;
use super::types::{Address, Category, Page, Record};

const NO_PARAMS: &[(&str, &str)] = &[];

impl CatalogClient {
    /// Fetch page `page` (1-indexed) of `category`.
    pub async fn fetch_page(&self, category: Category, page: u32) -> Result<Page> {
        if page == 0 {
            return Err(CatalogError::InvalidPage);
        }
        let url = self.list_url(category);
        let params = [("page", page.to_string())];
        tracing::debug!(%category, page, "Fetching catalog page");
        let body = self.get_json(&url, &params).await?;
        Page::from_json(category, page, body)
    }

    /// Fetch the record at `address`.
    pub async fn fetch_by_address(&self, address: &Address) -> Result<Record> {
        let category = address
            .category()
            .ok_or_else(|| CatalogError::InvalidAddress(address.to_string()))?;
        tracing::debug!(%address, "Fetching catalog record");
        let body = self.get_json(address.as_str(), NO_PARAMS).await?;
        Record::from_json(category, body)
    }

    /// Fetch record `id` of `category`.
    pub async fn fetch_record(&self, category: Category, id: &str) -> Result<Record> {
        let address = self.address_for(category, id)?;
        self.fetch_by_address(&address).await
    }
}
