//! Groupsync: Agent-Group to Asset-Tag Reconciliation
//!
//! Mirrors scanner agent group membership onto asset tags in a reserved tag
//! category, so asset filtering by tag always reflects current group
//! membership. Designed to run unattended on a schedule.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod platform;
pub mod reconcile;
pub mod tags;
