//! Shared test fixtures: an in-memory platform implementation that records
//! every API call and applies assignment mutations to its own state, so
//! convergence and idempotence can be asserted end to end.

use async_trait::async_trait;
use groupsync::error::SyncError;
use groupsync::model::{Agent, AgentGroup, Asset, AssetTag, Tag, TagAction, TagCategory};
use groupsync::platform::PlatformApi;
use std::collections::HashMap;
use std::sync::Mutex;

/// One recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListCategories,
    CreateCategory(String),
    ListTags(String),
    CreateTag(String, String),
    ListAgents,
    ListAssets,
    AssetTags(String),
    AssignTags(TagAction, Vec<String>, Vec<String>),
}

#[derive(Default)]
pub struct MockState {
    pub categories: Vec<TagCategory>,
    pub tags: Vec<Tag>,
    pub agents: Vec<Agent>,
    pub assets: Vec<Asset>,
    pub asset_tags: HashMap<String, Vec<AssetTag>>,
    pub calls: Vec<Call>,
    next_id: usize,
    pub fail_list_agents: bool,
    pub fail_list_assets: bool,
    pub fail_assign: bool,
    /// Asset ids whose tag fetch fails with a transport error.
    pub fail_asset_tags: Vec<String>,
}

pub struct MockPlatform {
    pub state: Mutex<MockState>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    /// Platform with the owned category and the given tags pre-registered.
    pub fn with_category(category: &str, values: &[&str]) -> Self {
        let platform = Self::new();
        {
            let mut state = platform.state.lock().unwrap();
            state.categories.push(TagCategory {
                uuid: "cat-1".to_string(),
                name: category.to_string(),
                description: None,
            });
            for value in values {
                let uuid = format!("tag-{}", value);
                state.tags.push(Tag {
                    uuid,
                    category_name: category.to_string(),
                    value: value.to_string(),
                });
            }
        }
        platform
    }

    pub fn add_agent(&self, name: &str, groups: &[&str]) {
        let mut state = self.state.lock().unwrap();
        let uuid = format!("agent-{}", state.agents.len() + 1);
        state.agents.push(Agent {
            uuid,
            name: name.to_string(),
            groups: groups
                .iter()
                .map(|g| AgentGroup {
                    name: g.to_string(),
                })
                .collect(),
        });
    }

    /// Add an asset with its current tags in the given category.
    pub fn add_asset(&self, id: &str, hostnames: &[&str], current: &[(&str, &str)]) {
        let mut state = self.state.lock().unwrap();
        state.assets.push(Asset {
            id: id.to_string(),
            hostname: hostnames.iter().map(|h| h.to_string()).collect(),
        });
        state.asset_tags.insert(
            id.to_string(),
            current
                .iter()
                .map(|(category, value)| AssetTag {
                    category_name: category.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        );
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutation_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::AssignTags(..) | Call::CreateTag(..) | Call::CreateCategory(..)
                )
            })
            .collect()
    }

    pub fn assign_calls(&self, action: TagAction) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::AssignTags(a, _, _) if *a == action))
            .collect()
    }

    /// Current tag values on an asset, restricted to one category.
    pub fn tag_values(&self, asset_id: &str, category: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut values: Vec<String> = state
            .asset_tags
            .get(asset_id)
            .map(|tags| {
                tags.iter()
                    .filter(|t| t.category_name == category)
                    .map(|t| t.value.clone())
                    .collect()
            })
            .unwrap_or_default();
        values.sort();
        values
    }

    pub fn agents_by_uuid(&self) -> HashMap<String, Agent> {
        let state = self.state.lock().unwrap();
        state
            .agents
            .iter()
            .cloned()
            .map(|a| (a.uuid.clone(), a))
            .collect()
    }

    pub fn assets_by_id(&self) -> HashMap<String, Asset> {
        let state = self.state.lock().unwrap();
        state
            .assets
            .iter()
            .cloned()
            .map(|a| (a.id.clone(), a))
            .collect()
    }
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn list_categories(&self) -> Result<Vec<TagCategory>, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListCategories);
        Ok(state.categories.clone())
    }

    async fn create_category(
        &self,
        name: &str,
        description: &str,
    ) -> Result<TagCategory, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateCategory(name.to_string()));
        state.next_id += 1;
        let category = TagCategory {
            uuid: format!("cat-{}", state.next_id),
            name: name.to_string(),
            description: Some(description.to_string()),
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn list_tags(&self, category: &str) -> Result<Vec<Tag>, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListTags(category.to_string()));
        Ok(state
            .tags
            .iter()
            .filter(|t| t.category_name == category)
            .cloned()
            .collect())
    }

    async fn create_tag(&self, category: &str, value: &str) -> Result<Tag, SyncError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::CreateTag(category.to_string(), value.to_string()));
        let tag = Tag {
            uuid: format!("tag-{}", value),
            category_name: category.to_string(),
            value: value.to_string(),
        };
        state.tags.push(tag.clone());
        Ok(tag)
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListAgents);
        if state.fail_list_agents {
            return Err(SyncError::Transport("connection reset".to_string()));
        }
        Ok(state.agents.clone())
    }

    async fn list_assets(&self) -> Result<Vec<Asset>, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListAssets);
        if state.fail_list_assets {
            return Err(SyncError::Transport("connection reset".to_string()));
        }
        Ok(state.assets.clone())
    }

    async fn asset_tags(&self, asset_id: &str) -> Result<Vec<AssetTag>, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AssetTags(asset_id.to_string()));
        if state.fail_asset_tags.iter().any(|id| id == asset_id) {
            return Err(SyncError::Transport("connection reset".to_string()));
        }
        Ok(state.asset_tags.get(asset_id).cloned().unwrap_or_default())
    }

    async fn assign_tags(
        &self,
        action: TagAction,
        asset_ids: &[String],
        tag_ids: &[String],
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AssignTags(
            action,
            asset_ids.to_vec(),
            tag_ids.to_vec(),
        ));
        if state.fail_assign {
            return Err(SyncError::Api {
                status: 500,
                message: "injected failure".to_string(),
            });
        }
        // Apply the mutation to the tracked asset tags so follow-up runs see
        // the converged state.
        let resolved: Vec<AssetTag> = tag_ids
            .iter()
            .filter_map(|uuid| {
                state.tags.iter().find(|t| &t.uuid == uuid).map(|t| AssetTag {
                    category_name: t.category_name.clone(),
                    value: t.value.clone(),
                })
            })
            .collect();
        for asset_id in asset_ids {
            let tags = state.asset_tags.entry(asset_id.clone()).or_default();
            match action {
                TagAction::Add => {
                    for tag in &resolved {
                        if !tags
                            .iter()
                            .any(|t| t.category_name == tag.category_name && t.value == tag.value)
                        {
                            tags.push(tag.clone());
                        }
                    }
                }
                TagAction::Remove => {
                    tags.retain(|t| {
                        !resolved
                            .iter()
                            .any(|r| r.category_name == t.category_name && r.value == t.value)
                    });
                }
            }
        }
        Ok(())
    }
}
