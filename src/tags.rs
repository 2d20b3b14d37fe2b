//! Tag Universe
//!
//! Ownership of the reserved tag category and the bidirectional value ↔
//! identifier index. The assignment mutations address tags by identifier, so
//! every value referenced during reconciliation must be registered here first.

use crate::error::SyncError;
use crate::model::Tag;
use crate::platform::PlatformApi;
use std::collections::HashMap;
use tracing::info;

/// Description stamped onto the category when this tool creates it.
pub const CATEGORY_DESCRIPTION: &str = "Tags synced from scanner agent group membership";

/// Bidirectional mapping between tag values and identifiers, scoped to one
/// category.
#[derive(Debug, Clone)]
pub struct TagIndex {
    category: String,
    by_value: HashMap<String, String>,
    by_uuid: HashMap<String, String>,
}

impl TagIndex {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            by_value: HashMap::new(),
            by_uuid: HashMap::new(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Register a tag in both directions. Later registrations win, which is
    /// what a post-creation re-list relies on.
    pub fn register(&mut self, tag: &Tag) {
        self.by_value.insert(tag.value.clone(), tag.uuid.clone());
        self.by_uuid.insert(tag.uuid.clone(), tag.value.clone());
    }

    pub fn contains(&self, value: &str) -> bool {
        self.by_value.contains_key(value)
    }

    /// Resolve a tag value to its identifier.
    ///
    /// An unregistered value is a typed error rather than a panic; callers
    /// decide whether to create the tag or skip the mutation.
    pub fn resolve(&self, value: &str) -> Result<String, SyncError> {
        self.by_value
            .get(value)
            .cloned()
            .ok_or_else(|| SyncError::TagNotFound(value.to_string()))
    }

    pub fn value_for(&self, uuid: &str) -> Option<&str> {
        self.by_uuid.get(uuid).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_value.is_empty()
    }
}

/// Create the owned category if it does not exist yet.
pub async fn ensure_category(api: &dyn PlatformApi, category: &str) -> Result<(), SyncError> {
    let categories = api.list_categories().await?;
    if categories.iter().any(|c| c.name == category) {
        return Ok(());
    }
    info!(category, "Category not found, creating");
    api.create_category(category, CATEGORY_DESCRIPTION).await?;
    Ok(())
}

/// Build a fresh index of every tag currently in the category.
pub async fn load_index(api: &dyn PlatformApi, category: &str) -> Result<TagIndex, SyncError> {
    let mut index = TagIndex::new(category);
    refresh_index(api, &mut index).await?;
    Ok(index)
}

/// Re-list the category so identifiers created after the initial load (by this
/// run or out-of-band) become addressable.
pub async fn refresh_index(api: &dyn PlatformApi, index: &mut TagIndex) -> Result<(), SyncError> {
    let category = index.category().to_string();
    for tag in api.list_tags(&category).await? {
        index.register(&tag);
    }
    Ok(())
}

/// Resolve a value to its identifier, creating the tag on first sight.
pub async fn resolve_or_create(
    api: &dyn PlatformApi,
    index: &mut TagIndex,
    value: &str,
) -> Result<String, SyncError> {
    if let Ok(uuid) = index.resolve(value) {
        return Ok(uuid);
    }
    let tag = api.create_tag(index.category(), value).await?;
    index.register(&tag);
    Ok(tag.uuid)
}
