use crate::config::HubConfig;
use crate::error::{OverlayError, OverlayResult};
use crate::hub::traits::PropertySource;
use crate::hub::types::{HubFilters, HubPage};
use crate::models::CanonicalProperty;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP client for the property hub's JSON API
pub struct HubClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HubClient {
    /// Create a hub client from configuration
    pub fn new(config: &HubConfig) -> OverlayResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            OverlayError::Validation(format!("Invalid hub base url '{}': {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(OverlayError::Validation(format!(
                "Hub base url '{}' cannot carry a path",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("property-overlay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OverlayError::SourceUnavailable(format!("Failed to create HTTP client: {}", e)))?;

        info!(base_url = %base_url, timeout_secs = config.timeout_secs, "Hub client ready");

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// `base_url` with `segments` appended, each percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get(&self, url: Url) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl PropertySource for HubClient {
    async fn fetch_page(
        &self,
        filters: &HubFilters,
        page: u32,
        page_size: u32,
    ) -> OverlayResult<HubPage> {
        let mut query = vec![
            ("page", page.max(1).to_string()),
            ("pageSize", page_size.max(1).to_string()),
        ];
        query.extend(filters.to_query());

        let url = self.endpoint(&["properties"]);
        debug!("Fetching hub page {} from {}", page, url);

        let response = self.get(url).query(&query).send().await?;

        if !response.status().is_success() {
            warn!("Hub returned status: {}", response.status());
            return Err(OverlayError::SourceUnavailable(format!(
                "hub returned status {}",
                response.status()
            )));
        }

        let body: HubPage = response.json().await.map_err(|e| {
            OverlayError::SourceUnavailable(format!("invalid page payload: {}", e))
        })?;

        debug!("Hub page {} returned {} of {} records", page, body.records.len(), body.total);
        Ok(body)
    }

    async fn fetch_one(&self, id: &str) -> OverlayResult<CanonicalProperty> {
        let url = self.endpoint(&["properties", id]);
        debug!("Fetching hub property {}", id);

        let response = self.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(OverlayError::NotFound(format!("property {}", id))),
            status if !status.is_success() => {
                warn!("Hub returned status {} for property {}", status, id);
                Err(OverlayError::SourceUnavailable(format!(
                    "hub returned status {}",
                    status
                )))
            }
            _ => response.json().await.map_err(|e| {
                OverlayError::SourceUnavailable(format!("invalid property payload: {}", e))
            }),
        }
    }

    fn source_name(&self) -> &'static str {
        "hub"
    }
}
