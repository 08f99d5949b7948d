use std::time::Duration;

use url::Url;

use crate::error::CatalogError;
use crate::net::{CatalogSnapshot, CatalogSource};

const USER_AGENT: &str = concat!("placement-engine/", env!("CARGO_PKG_VERSION"));

/// Catalog fetched from the backend over HTTP (blocking).
pub struct HttpCatalogSource {
    endpoint: Url,
    client: reqwest::blocking::Client,
}

impl HttpCatalogSource {
    pub fn new(endpoint: &str) -> Result<Self, CatalogError> {
        // Bare hosts are taken as https.
        let endpoint = if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            format!("https://{}", endpoint)
        } else {
            endpoint.to_string()
        };
        let endpoint = Url::parse(&endpoint)?;

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| CatalogError::Http(format!("client error: {}", e)))?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Request URL for `domain`.
    pub fn catalog_url(&self, domain: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("domain", domain);
        url
    }
}

impl CatalogSource for HttpCatalogSource {
    fn load_catalog(&self, domain: &str) -> Result<CatalogSnapshot, CatalogError> {
        let url = self.catalog_url(domain);
        log::debug!("Fetching placement catalog from {}", url);

        let response = self
            .client
            .get(url.as_str())
            .header("Accept", "application/json")
            .send()
            .map_err(|e| CatalogError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| CatalogError::Http(format!("failed to read body: {}", e)))?;
        CatalogSnapshot::from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_domain_query() {
        let source = HttpCatalogSource::new("ads.example.com/v1/catalog?format=json").unwrap();
        assert_eq!(source.endpoint().scheme(), "https");
        let url = source.catalog_url("my blog.org");
        assert_eq!(
            url.as_str(),
            "https://ads.example.com/v1/catalog?format=json&domain=my+blog.org"
        );
    }

    #[test]
    fn rejects_bad_endpoint() {
        assert!(matches!(
            HttpCatalogSource::new("http://[::1"),
            Err(CatalogError::InvalidUrl(_))
        ));
    }
}
