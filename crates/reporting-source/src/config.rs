use serde::{Deserialize, Serialize};

use crate::{Result, SourceError};

pub const DEFAULT_BASE_URL: &str = "https://governcrm-api.buildly.dev";
pub const DEFAULT_PAGE_TITLE: &str = "Buildly Reporting";

/// Connection settings for the upstream API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    /// Location of the OpenAPI document listing the available endpoints.
    pub api_docs_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub page_title: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_docs_url: None,
            client_id: None,
            client_secret: None,
            page_title: DEFAULT_PAGE_TITLE.to_string(),
        }
    }
}

impl SourceConfig {
    /// Read `BASE_URL`, `API_DOCS_URL`, `CLIENT_ID`, `CLIENT_SECRET` and `PAGE_TITLE` from the
    /// process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            base_url: get("BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            api_docs_url: get("API_DOCS_URL"),
            client_id: get("CLIENT_ID"),
            client_secret: get("CLIENT_SECRET"),
            page_title: get("PAGE_TITLE").unwrap_or(defaults.page_title),
        }
    }

    pub fn login_url(&self) -> String {
        format!("{}/oauth/login/", self.base_url)
    }

    /// URL of `endpoint`, a path such as `/orders/`, on the configured API.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// The OAuth client credentials; both must be configured before a login is attempted.
    pub fn client_credentials(&self) -> Result<(&str, &str)> {
        let id = self
            .client_id
            .as_deref()
            .ok_or(SourceError::MissingConfig("CLIENT_ID"))?;
        let secret = self
            .client_secret
            .as_deref()
            .ok_or(SourceError::MissingConfig("CLIENT_SECRET"))?;
        Ok((id, secret))
    }

    pub fn docs_url(&self) -> Result<&str> {
        self.api_docs_url
            .as_deref()
            .ok_or(SourceError::MissingConfig("API_DOCS_URL"))
    }
}
