//! Storage backend abstraction for variant datasets.
//!
//! The HTTP service addresses variant files by id. A [`Storage`] turns an id
//! into a validated [`VariantInput`] pointing at either a plain VCF or a
//! BGZF VCF with its tabix index.
//!
//! # Implementations
//!
//! - [`LocalStorage`] - Local filesystem storage
//!
//! # Example
//!
//! ```no_run
//! use varsieve::storage::{Storage, LocalStorage};
//! use std::path::PathBuf;
//!
//! # async fn run() -> varsieve::Result<()> {
//! let storage = LocalStorage::new(PathBuf::from("./data"));
//! let input = storage.resolve("sample").await?;
//! # Ok(())
//! # }
//! ```

mod local;

pub use local::LocalStorage;

use crate::Result;
use crate::input::VariantInput;
use async_trait::async_trait;

/// Storage backend trait for locating variant datasets
#[async_trait]
pub trait Storage: Send + Sync {
    /// Resolve a dataset id to a variant input
    async fn resolve(&self, id: &str) -> Result<VariantInput>;
}
