//! Vendor Platform Client
//!
//! Unified interface to the vulnerability-management platform's REST API:
//! tag categories, tag values, agents, assets, and tag assignment mutations.
//! The `PlatformApi` trait keeps the reconciler testable against an in-memory
//! implementation; `IoClient` is the production HTTP client.

use crate::error::SyncError;
use crate::model::{Agent, Asset, AssetTag, Tag, TagAction, TagCategory};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Platform API surface consumed by the reconciler.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// List all tag categories.
    async fn list_categories(&self) -> Result<Vec<TagCategory>, SyncError>;

    /// Create a tag category.
    async fn create_category(
        &self,
        name: &str,
        description: &str,
    ) -> Result<TagCategory, SyncError>;

    /// List tag values in one category.
    async fn list_tags(&self, category: &str) -> Result<Vec<Tag>, SyncError>;

    /// Create a tag value in a category, returning the created tag with its
    /// assigned identifier.
    async fn create_tag(&self, category: &str, value: &str) -> Result<Tag, SyncError>;

    /// List all agents, including their group memberships.
    async fn list_agents(&self) -> Result<Vec<Agent>, SyncError>;

    /// List all assets in the inventory.
    async fn list_assets(&self) -> Result<Vec<Asset>, SyncError>;

    /// Current tags attached to one asset.
    async fn asset_tags(&self, asset_id: &str) -> Result<Vec<AssetTag>, SyncError>;

    /// Bulk add or remove tag-to-asset associations by identifier.
    async fn assign_tags(
        &self,
        action: TagAction,
        asset_ids: &[String],
        tag_ids: &[String],
    ) -> Result<(), SyncError>;
}

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Page size for the paginated inventory listings.
const LIST_PAGE_LIMIT: usize = 200;

// Map reqwest-level failures to the sync error taxonomy.
fn map_http_error(error: reqwest::Error) -> SyncError {
    if error.is_status() {
        let status = error.status().map(|s| s.as_u16()).unwrap_or(0);
        match status {
            401 | 403 => SyncError::AuthFailed(error.to_string()),
            429 => SyncError::RateLimited(error.to_string()),
            _ => SyncError::Api {
                status,
                message: error.to_string(),
            },
        }
    } else if error.is_timeout() {
        SyncError::Transport(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        SyncError::Transport(format!("Connection error: {}", error))
    } else {
        SyncError::Transport(error.to_string())
    }
}

/// HTTP client for the platform REST API.
///
/// Authentication uses the platform's API-key header on every request; there
/// is no session state.
pub struct IoClient {
    client: Client,
    base_url: String,
    api_keys: String,
}

impl IoClient {
    pub fn new(
        base_url: String,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self, SyncError> {
        let client = Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_keys: format!("accessKey={};secretKey={}", access_key, secret_key),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header("X-ApiKeys", &self.api_keys)
            .header("Accept", "application/json")
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("X-ApiKeys", &self.api_keys)
            .header("Accept", "application/json")
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(match status.as_u16() {
            401 | 403 => SyncError::AuthFailed(message),
            429 => SyncError::RateLimited(message),
            code => SyncError::Api {
                status: code,
                message,
            },
        })
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SyncError> {
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| SyncError::Serialization(format!("Failed to parse response: {}", e)))
    }
}

#[derive(Deserialize)]
struct CategoriesResponse {
    #[serde(default)]
    categories: Vec<TagCategory>,
}

#[derive(Deserialize)]
struct TagValuesResponse {
    #[serde(default)]
    values: Vec<Tag>,
}

#[derive(Deserialize)]
struct AgentsResponse {
    #[serde(default)]
    agents: Vec<Agent>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Deserialize, Default)]
struct Pagination {
    total: usize,
}

#[derive(Deserialize)]
struct AssetsResponse {
    #[serde(default)]
    assets: Vec<Asset>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Deserialize)]
struct AssetTagsResponse {
    #[serde(default)]
    tags: Vec<AssetTag>,
}

#[derive(Serialize)]
struct CreateCategoryRequest<'a> {
    name: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct CreateTagRequest<'a> {
    category_name: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct AssignTagsRequest<'a> {
    action: TagAction,
    assets: &'a [String],
    tags: &'a [String],
}

#[async_trait]
impl PlatformApi for IoClient {
    async fn list_categories(&self) -> Result<Vec<TagCategory>, SyncError> {
        let response = self
            .get("/tags/categories")
            .send()
            .await
            .map_err(map_http_error)?;
        let body: CategoriesResponse = Self::parse(response).await?;
        Ok(body.categories)
    }

    async fn create_category(
        &self,
        name: &str,
        description: &str,
    ) -> Result<TagCategory, SyncError> {
        let response = self
            .post("/tags/categories")
            .json(&CreateCategoryRequest { name, description })
            .send()
            .await
            .map_err(map_http_error)?;
        Self::parse(response).await
    }

    async fn list_tags(&self, category: &str) -> Result<Vec<Tag>, SyncError> {
        let response = self
            .get("/tags/values")
            .query(&[("f", format!("category_name:eq:{}", category))])
            .send()
            .await
            .map_err(map_http_error)?;
        let body: TagValuesResponse = Self::parse(response).await?;
        // The filter is advisory on some deployments; enforce it client-side.
        Ok(body
            .values
            .into_iter()
            .filter(|t| t.category_name == category)
            .collect())
    }

    async fn create_tag(&self, category: &str, value: &str) -> Result<Tag, SyncError> {
        let response = self
            .post("/tags/values")
            .json(&CreateTagRequest {
                category_name: category,
                value,
            })
            .send()
            .await
            .map_err(map_http_error)?;
        Self::parse(response).await
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, SyncError> {
        let mut agents = Vec::new();
        loop {
            let response = self
                .get("/scanners/1/agents")
                .query(&[
                    ("offset", agents.len().to_string()),
                    ("limit", LIST_PAGE_LIMIT.to_string()),
                ])
                .send()
                .await
                .map_err(map_http_error)?;
            let page: AgentsResponse = Self::parse(response).await?;
            if page.agents.is_empty() {
                break;
            }
            agents.extend(page.agents);
            if agents.len() >= page.pagination.total {
                break;
            }
        }
        Ok(agents)
    }

    async fn list_assets(&self) -> Result<Vec<Asset>, SyncError> {
        let mut assets = Vec::new();
        loop {
            let response = self
                .get("/assets")
                .query(&[
                    ("offset", assets.len().to_string()),
                    ("limit", LIST_PAGE_LIMIT.to_string()),
                ])
                .send()
                .await
                .map_err(map_http_error)?;
            let page: AssetsResponse = Self::parse(response).await?;
            if page.assets.is_empty() {
                break;
            }
            assets.extend(page.assets);
            if assets.len() >= page.pagination.total {
                break;
            }
        }
        Ok(assets)
    }

    async fn asset_tags(&self, asset_id: &str) -> Result<Vec<AssetTag>, SyncError> {
        let response = self
            .get(&format!("/tags/assets/{}/assignments", asset_id))
            .send()
            .await
            .map_err(map_http_error)?;
        let body: AssetTagsResponse = Self::parse(response).await?;
        Ok(body.tags)
    }

    async fn assign_tags(
        &self,
        action: TagAction,
        asset_ids: &[String],
        tag_ids: &[String],
    ) -> Result<(), SyncError> {
        let response = self
            .post("/tags/assets/assignments")
            .json(&AssignTagsRequest {
                action,
                assets: asset_ids,
                tags: tag_ids,
            })
            .send()
            .await
            .map_err(map_http_error)?;
        Self::check(response).await?;
        Ok(())
    }
}
