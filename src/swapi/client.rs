// SWAPI HTTP client.
// Issues GET requests against the catalog and maps HTTP outcomes onto CatalogError.

use std::time::Duration;

use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use serde_json::Value;

use crate::error::{CatalogError, Result};

use super::types::{Address, Category};

pub const SWAPI_BASE: &str = "https://swapi.py4e.com/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Stateless catalog client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl CatalogClient {
    /// Create a client for the catalog rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url).map_err(|_| CatalogError::InvalidAddress(base_url.clone()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("holocron-tui"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(CatalogError::from)?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Client for the public catalog.
    pub fn swapi() -> Result<Self> {
        Self::new(SWAPI_BASE, DEFAULT_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Canonical address of record `id` in `category`.
    pub fn address_for(&self, category: Category, id: &str) -> Result<Address> {
        let id = id.trim_matches('/');
        if id.is_empty() {
            return Err(CatalogError::InvalidAddress(String::new()));
        }
        Address::parse(&format!("{}/{}/{}/", self.base_url, category.path(), id))
    }

    /// URL of a category's list endpoint.
    pub fn list_url(&self, category: Category) -> String {
        format!("{}/{}/", self.base_url, category.path())
    }

    /// GET `url` and decode the body as JSON, bounded by the request timeout.
    pub async fn get_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        params: &T,
    ) -> Result<Value> {
        let request = async {
            let response = self.client.get(url).query(params).send().await?;
            let response = check_response(response)?;
            let body: Value = response.json().await?;
            Ok::<_, CatalogError>(body)
        };

        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    url,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Catalog request timed out"
                );
                Err(CatalogError::UnreachableService(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs_f32()
                )))
            }
        }
    }
}

/// Check response status and convert errors.
fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    match status {
        s if s.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(CatalogError::NotFound(response.url().to_string())),
        s if s.is_client_error() => {
            tracing::debug!(url = %response.url(), status = s.as_u16(), "Client error from catalog");
            Err(CatalogError::NotFound(format!("{} (HTTP {})", response.url(), s.as_u16())))
        }
        s => Err(CatalogError::UnreachableService(format!(
            "HTTP {} from {}",
            s.as_u16(),
            response.url()
        ))),
    }
}
