use std::collections::HashSet;
use std::future::Future;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::candidates::CandidateSet;
use crate::config::SearchOptions;
use crate::error::FetchError;
use crate::events::ImageRef;
use crate::presentation::Dispatcher;

/// Progress share emitted when the search request goes out.
pub const SUBMIT_SHARE: f64 = 0.1;
/// Progress share emitted once the response body has been decoded.
pub const RESPONSE_SHARE: f64 = 0.1;
/// Progress share spread evenly across result items.
pub const PARSE_SHARE: f64 = 0.3;

/// Remote search returning raw result items.
pub trait SearchProvider: Send + Sync + 'static {
    fn search(&self, query: &str) -> impl Future<Output = Result<Vec<Value>, FetchError>> + Send;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// iTunes-style search: `GET {endpoint}?term=..&limit=..&media=..` returning `{"results": [..]}`.
#[derive(Debug, Clone)]
pub struct ItunesSearch {
    client: reqwest::Client,
    endpoint: Url,
    limit: u32,
    media: String,
}

impl ItunesSearch {
    pub fn new(options: &SearchOptions) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            endpoint: options.endpoint_url()?,
            limit: options.limit,
            media: options.media.clone(),
        })
    }

    pub fn request_url(&self, query: &str) -> Result<Url, FetchError> {
        let limit = self.limit.to_string();
        Url::parse_with_params(
            self.endpoint.as_str(),
            &[
                ("term", query),
                ("limit", limit.as_str()),
                ("media", self.media.as_str()),
            ],
        )
        .map_err(|err| FetchError::InvalidQuery(err.to_string()))
    }
}

impl SearchProvider for ItunesSearch {
    async fn search(&self, query: &str) -> Result<Vec<Value>, FetchError> {
        let url = self.request_url(query)?;
        debug!(%url, "sending search request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| FetchError::TransportFailure(err.to_string()))?;
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|err| FetchError::TransportFailure(err.to_string()))?;
        Ok(body.results)
    }
}

/// Extracts `field` from every item, keeping the first occurrence of each value.
pub fn collect_candidates(items: &[Value], field: &str) -> Vec<ImageRef> {
    collect_candidates_with(items, field, |_| {})
}

/// Like [`collect_candidates`], reporting a `PARSE_SHARE / items.len()` step per item.
pub fn collect_candidates_with(
    items: &[Value],
    field: &str,
    mut on_item: impl FnMut(f64),
) -> Vec<ImageRef> {
    let step = if items.is_empty() {
        0.0
    } else {
        PARSE_SHARE / items.len() as f64
    };
    let mut seen = HashSet::with_capacity(items.len());
    let mut images = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        match item.get(field).and_then(Value::as_str) {
            Some(raw) => {
                let image = ImageRef::from(raw);
                if seen.insert(image.clone()) {
                    images.push(image);
                }
            }
            None => debug!(position, field, "result item has no image reference"),
        }
        on_item(step);
    }
    images
}

/// Turns a query into a validated [`CandidateSet`].
#[derive(Debug)]
pub struct CandidateFetcher<P> {
    provider: P,
    image_field: String,
}

impl<P: SearchProvider> CandidateFetcher<P> {
    pub fn new(provider: P, image_field: impl Into<String>) -> Self {
        Self {
            provider,
            image_field: image_field.into(),
        }
    }

    /// The returned set carries generation 0; the caller assigns the real one on install.
    #[instrument(skip(self, progress))]
    pub async fn fetch(&self, query: &str, progress: &Dispatcher) -> Result<CandidateSet, FetchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FetchError::InvalidQuery("query must not be empty".into()));
        }

        progress.advance_progress(SUBMIT_SHARE);
        let items = self.provider.search(query).await?;
        progress.advance_progress(RESPONSE_SHARE);

        let images = collect_candidates_with(&items, &self.image_field, |step| {
            progress.advance_progress(step)
        });
        info!(
            results = items.len(),
            distinct = images.len(),
            "search complete"
        );
        CandidateSet::validated(0, images)
    }
}
