//! Reconciliation
//!
//! The core procedure: build the desired-state mapping from agent group
//! membership, diff it against each asset's current tags in the owned
//! category, and apply the minimal add/remove mutations. Group membership is
//! the source of truth; tags with no backing group are purged.

use crate::error::SyncError;
use crate::model::{Agent, Asset, AssetTag, TagAction};
use crate::platform::PlatformApi;
use crate::tags::{self, TagIndex};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Agent names and hostnames are matched on the full uppercased string, not a
/// prefix.
pub fn normalize_key(name: &str) -> String {
    name.to_uppercase()
}

/// Minimal mutation set turning `current` into `desired`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagDelta {
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
}

impl TagDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Symmetric difference between the current and desired tag-value sets.
pub fn diff_tags(current: &BTreeSet<String>, desired: &BTreeSet<String>) -> TagDelta {
    TagDelta {
        to_add: desired.difference(current).cloned().collect(),
        to_remove: current.difference(desired).cloned().collect(),
    }
}

/// Uppercased agent name → set of group names. Built once per run from the
/// agent snapshot and read-only afterwards.
#[derive(Debug, Default)]
pub struct DesiredState {
    groups: HashMap<String, BTreeSet<String>>,
}

impl DesiredState {
    /// Desired group set for a matching key; `None` means no agent with that
    /// name, which reconciliation treats as the empty set.
    pub fn groups_for(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Per-asset terminal state within one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
    /// No hostname to key on; nothing to do, zero API calls.
    Skipped,
    /// Current tags already equal the desired set.
    Unchanged,
    /// One or both mutations were issued (or would be, under dry-run).
    Reconciled {
        added: usize,
        removed: usize,
        failed_calls: usize,
    },
}

/// Counters for one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Every asset seen by the loop, including ones whose tag fetch failed.
    pub assets: usize,
    pub skipped: usize,
    pub unchanged: usize,
    pub reconciled: usize,
    pub tags_added: usize,
    pub tags_removed: usize,
    pub failed_calls: usize,
    pub fetch_failures: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &AssetOutcome) {
        match outcome {
            AssetOutcome::Skipped => self.skipped += 1,
            AssetOutcome::Unchanged => self.unchanged += 1,
            AssetOutcome::Reconciled {
                added,
                removed,
                failed_calls,
            } => {
                self.reconciled += 1;
                self.tags_added += added;
                self.tags_removed += removed;
                self.failed_calls += failed_calls;
            }
        }
    }
}

/// Drives one reconciliation pass against the platform.
pub struct Reconciler<'a> {
    api: &'a dyn PlatformApi,
    index: TagIndex,
    create_delay: Duration,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    /// Ensure the owned category exists and index its current tag universe.
    pub async fn new(
        api: &'a dyn PlatformApi,
        category: &str,
        create_delay: Duration,
        dry_run: bool,
    ) -> Result<Self, SyncError> {
        tags::ensure_category(api, category).await?;
        let index = tags::load_index(api, category).await?;
        info!(category, tags = index.len(), "Tag universe indexed");
        Ok(Self {
            api,
            index,
            create_delay,
            dry_run,
        })
    }

    pub fn index(&self) -> &TagIndex {
        &self.index
    }

    /// Build the uppercased-name → group-set mapping from the agent snapshot.
    ///
    /// Creating a tag for every newly seen group name is a deliberate side
    /// effect: groups are discovered from live data, not declared up front.
    /// After all agents are processed the category is re-listed so tags
    /// created concurrently or out-of-band are addressable in this run.
    pub async fn build_desired_state(
        &mut self,
        agents: &HashMap<String, Agent>,
    ) -> Result<DesiredState, SyncError> {
        let mut state = DesiredState::default();
        for agent in agents.values() {
            if agent.groups.is_empty() {
                debug!(agent = %agent.name, "Agent has no groups, skipping");
                continue;
            }
            let key = normalize_key(&agent.name);
            let entry = state.groups.entry(key).or_default();
            for group in &agent.groups {
                entry.insert(group.name.clone());
                if self.index.contains(&group.name) {
                    continue;
                }
                if self.dry_run {
                    info!(group = %group.name, "Tag does not exist, would create");
                    continue;
                }
                warn!(group = %group.name, "Tag does not exist, creating");
                tags::resolve_or_create(self.api, &mut self.index, &group.name).await?;
                // Crude rate limiting after creations only, matching the
                // platform's sensitivity to bursts of tag writes.
                tokio::time::sleep(self.create_delay).await;
            }
        }
        if !self.dry_run {
            tags::refresh_index(self.api, &mut self.index).await?;
        }
        info!(
            agents = state.len(),
            tags = self.index.len(),
            "Desired state built"
        );
        Ok(state)
    }

    /// Reconcile one asset given its freshly fetched current tags.
    ///
    /// The add and remove mutations are independently fault-tolerant: a failed
    /// remove is logged and does not block the add, and neither aborts the
    /// remaining assets.
    pub async fn reconcile_asset(
        &self,
        asset: &Asset,
        current_tags: &[AssetTag],
        desired: &DesiredState,
    ) -> AssetOutcome {
        let Some(hostname) = asset.primary_hostname() else {
            return AssetOutcome::Skipped;
        };
        let key = normalize_key(hostname);

        let current: BTreeSet<String> = current_tags
            .iter()
            .filter(|t| t.category_name == self.index.category())
            .map(|t| t.value.clone())
            .collect();
        let desired_set = desired.groups_for(&key).cloned().unwrap_or_default();

        let delta = diff_tags(&current, &desired_set);
        if delta.is_empty() {
            return AssetOutcome::Unchanged;
        }
        info!(
            host = %key,
            to_add = ?delta.to_add,
            to_remove = ?delta.to_remove,
            "Tag delta computed"
        );

        if self.dry_run {
            return AssetOutcome::Reconciled {
                added: delta.to_add.len(),
                removed: delta.to_remove.len(),
                failed_calls: 0,
            };
        }

        let mut failed_calls = 0;
        let mut removed = 0;
        let mut added = 0;

        if !delta.to_remove.is_empty() {
            match self
                .apply(TagAction::Remove, &asset.id, &delta.to_remove)
                .await
            {
                Ok(()) => {
                    info!(host = %key, count = delta.to_remove.len(), "Removed tags");
                    removed = delta.to_remove.len();
                }
                Err(e) => {
                    error!(host = %key, "Problem removing tags: {}", e);
                    failed_calls += 1;
                }
            }
        }
        if !delta.to_add.is_empty() {
            match self.apply(TagAction::Add, &asset.id, &delta.to_add).await {
                Ok(()) => {
                    info!(host = %key, count = delta.to_add.len(), "Added tags");
                    added = delta.to_add.len();
                }
                Err(e) => {
                    error!(host = %key, "Problem adding tags: {}", e);
                    failed_calls += 1;
                }
            }
        }

        AssetOutcome::Reconciled {
            added,
            removed,
            failed_calls,
        }
    }

    async fn apply(
        &self,
        action: TagAction,
        asset_id: &str,
        values: &BTreeSet<String>,
    ) -> Result<(), SyncError> {
        let uuids = values
            .iter()
            .map(|v| self.index.resolve(v))
            .collect::<Result<Vec<_>, _>>()?;
        self.api
            .assign_tags(action, &[asset_id.to_string()], &uuids)
            .await
    }

    /// One full pass: build desired state, then reconcile every asset in turn.
    pub async fn run(
        &mut self,
        agents: &HashMap<String, Agent>,
        assets: &HashMap<String, Asset>,
    ) -> Result<RunSummary, SyncError> {
        let desired = self.build_desired_state(agents).await?;

        let total = assets.len();
        let mut summary = RunSummary::default();
        for (position, asset) in assets.values().enumerate() {
            let count = position + 1;
            summary.assets += 1;
            let hostname = asset.primary_hostname();
            info!(
                "[{}/{}] {}",
                count,
                total,
                hostname.unwrap_or("HostnameNotFound")
            );

            if hostname.is_none() {
                summary.record(&AssetOutcome::Skipped);
                continue;
            }

            let current_tags = match self.api.asset_tags(&asset.id).await {
                Ok(tags) => tags,
                Err(e) => {
                    error!(asset = %asset.id, "Failed to fetch current tags: {}", e);
                    summary.fetch_failures += 1;
                    continue;
                }
            };

            let outcome = self.reconcile_asset(asset, &current_tags, &desired).await;
            summary.record(&outcome);
        }

        info!(
            assets = summary.assets,
            reconciled = summary.reconciled,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            failed_calls = summary.failed_calls,
            "Reconciliation pass complete"
        );
        Ok(summary)
    }
}
