//! Backing stores for the application registry and the metric catalog
//!
//! ## Design
//!
//! - **Trait-based**: `RegistryStore` and `CatalogStore` let callers swap the backing
//!   store without touching the registry or catalog services
//! - **Async**: All operations are async so a database-backed store fits the same seams
//! - **Concurrent**: Implementations are `Send + Sync` and are shared between request
//!   handlers and the scheduler sweep; no cross-operation atomicity is promised
//!
//! ## Backends
//!
//! - **In-Memory** (default): dashmap-backed, state lives as long as the process
//! - **SQLite** (`storage-sqlite` feature): survives restarts
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use metrics_relay::storage::{CatalogStore, RegistryStore, memory::MemoryStore};
//!
//! let store = Arc::new(MemoryStore::new());
//! let registry_store: Arc<dyn RegistryStore> = store.clone();
//! let catalog_store: Arc<dyn CatalogStore> = store;
//! ```

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{CatalogStore, RegistryStore};
pub use error::{StorageError, StorageResult};
