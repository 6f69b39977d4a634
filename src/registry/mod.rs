//! Package metadata providers, one per ecosystem.
//!
//! Each provider answers `fetch(name, version)` with the declared author,
//! license identifier and repository URL, or a [`MetadataError`] when the
//! package cannot be found or the registry cannot be reached.

pub mod crates_io;
pub mod nuget;
pub mod pypi;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::MetadataError;
use crate::models::{Ecosystem, PackageMetadata};

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn fetch(&self, name: &str, version: &str) -> Result<PackageMetadata, MetadataError>;
}

/// Provider registered for each ecosystem the resolver can handle.
pub type Providers = BTreeMap<Ecosystem, Box<dyn MetadataProvider>>;

/// Empty strings for absent optional fields.
pub(crate) fn or_empty(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}
