//! License text sources and the fallback chain the resolver walks.
//!
//! - [`directory`]: `license*` file inside an installed package.
//! - [`github`]: the repository's license via the GitHub API.
//! - [`spdx`]: canonical text for the declared SPDX identifier(s).
//!
//! Sources never fail loudly: any problem is logged at debug level and the
//! lookup returns `None` so the next source gets a turn.

pub mod directory;
pub mod expression;
pub mod github;
pub mod spdx;

use async_trait::async_trait;
use reqwest::Client;

use crate::cache::ContentCache;
use crate::models::{LicenseText, PackageMetadata};

/// One strategy for obtaining a package's license text.
#[async_trait]
pub trait LicenseSource: Send + Sync {
    /// Short label used in debug logs.
    fn name(&self) -> &'static str;

    async fn lookup(&self, metadata: &PackageMetadata) -> Option<LicenseText>;
}

/// The standard priority order: installed file, then repository, then the
/// generic SPDX text.
pub fn default_chain(
    client: &Client,
    github_token: Option<String>,
    license_cache: ContentCache,
) -> Vec<Box<dyn LicenseSource>> {
    vec![
        Box::new(directory::DirectorySource),
        Box::new(github::GithubSource::new(client.clone(), github_token)),
        Box::new(spdx::SpdxSource::new(client.clone(), license_cache)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chain_order() {
        let dir = tempfile::tempdir().unwrap();
        let chain = default_chain(
            &Client::new(),
            None,
            ContentCache::at(dir.path(), crate::cache::DEFAULT_EXPIRATION),
        );
        let names: Vec<_> = chain.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["directory", "github", "spdx"]);
    }
}
