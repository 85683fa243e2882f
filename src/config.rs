use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use reqwest::Url;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Query used for the startup fill and as the initial search field contents.
    pub default_query: String,
    /// Remote search provider settings.
    pub search: SearchOptions,
    /// Background rotation pacing.
    pub rotation: RotationOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.default_query.trim().is_empty(),
            "default-query must not be blank"
        );
        self.search.validate()?;
        self.rotation.validate()?;
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            default_query: "Elton John".to_string(),
            search: SearchOptions::default(),
            rotation: RotationOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SearchOptions {
    /// Search endpoint; the query is sent as `term`, plus `limit` and `media`.
    pub endpoint: String,
    /// Maximum number of results requested per search.
    pub limit: u32,
    /// Media category passed to the provider.
    pub media: String,
    /// Field of each result item that holds the image reference.
    pub image_field: String,
    /// Whole-request timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub user_agent: String,
}

impl SearchOptions {
    pub const MAX_LIMIT: u32 = 200;

    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint)
            .with_context(|| format!("search.endpoint {:?} is not a valid URL", self.endpoint))?;
        ensure!(
            matches!(url.scheme(), "http" | "https"),
            "search.endpoint must use http or https"
        );
        Ok(url)
    }

    fn validate(&self) -> Result<()> {
        self.endpoint_url()?;
        ensure!(
            (1..=Self::MAX_LIMIT).contains(&self.limit),
            "search.limit must be between 1 and {}",
            Self::MAX_LIMIT
        );
        ensure!(
            !self.image_field.trim().is_empty(),
            "search.image-field must not be empty"
        );
        ensure!(
            self.timeout > Duration::ZERO,
            "search.timeout must be positive"
        );
        Ok(())
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            endpoint: "https://itunes.apple.com/search".to_string(),
            limit: Self::MAX_LIMIT,
            media: "music".to_string(),
            image_field: "artworkUrl100".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RotationOptions {
    /// Delay between substitution cycles.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Optional deterministic seed for slot selection.
    pub seed: Option<u64>,
}

impl RotationOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.interval > Duration::ZERO,
            "rotation.interval must be positive"
        );
        Ok(())
    }
}

impl Default for RotationOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            seed: None,
        }
    }
}
