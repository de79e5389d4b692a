//! Zone map structure editor.
//!
//! This crate stages edits to a warehouse's zone/position hierarchy in
//! memory and reconciles them with a backing store in one ordered pass:
//!
//! - [`StagingStore`] holds flat zone, position and link collections plus
//!   the baseline they were loaded from. All mutations are pure.
//! - [`TreeIndex`] derives parent/child views on demand.
//! - [`reconcile`] turns staged statuses into foreign-key-safe store calls.
//! - [`WarehouseStore`] is the storage contract; [`MemoryStore`] implements
//!   it in memory.
//! - [`ZoneEditor`] is the single-flight command surface.

pub mod config;
pub mod editor;
pub mod error;
pub mod models;
pub mod pattern;
pub mod reconcile;
pub mod staging;
pub mod status;
pub mod store;
pub mod template;
pub mod tree;
pub mod types;

pub use config::EditorConfig;
pub use editor::ZoneEditor;
pub use error::CoreError;
pub use reconcile::{SyncPhase, SyncPlan, SyncReport};
pub use staging::StagingStore;
pub use status::StagingStatus;
pub use store::{MemoryStore, StoreError, WarehouseStore};
pub use tree::TreeIndex;
