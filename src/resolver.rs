//! Turns a list of dependencies into notice text.
//!
//! For each dependency, in order:
//! 1. a valid cache entry is used as-is, nothing else runs;
//! 2. otherwise the ecosystem's [`MetadataProvider`] is asked for package facts;
//! 3. the [`LicenseSource`] chain is walked until one returns text;
//! 4. the rendered notice is appended to the output and cached.
//!
//! A failure at step 2 or 3 puts the dependency in the failure list and the
//! batch moves on.

use crate::cache::ContentCache;
use crate::error::{FailureReason, MetadataError};
use crate::license::LicenseSource;
use crate::models::{Dependency, LicenseText, NoticeRecord, PackageMetadata, Provenance};
use crate::registry::{MetadataProvider, Providers};
use crate::report::notice::render;

/// How one dependency ended.
#[derive(Debug)]
pub enum Outcome<'a> {
    CacheHit,
    Resolved(Provenance),
    Failed(&'a FailureReason),
}

/// Receives per-dependency progress while a batch runs.
pub trait Progress {
    fn started(&self, _dependency: &Dependency) {}
    fn finished(&self, _dependency: &Dependency, _outcome: Outcome<'_>) {}
}

/// Discards all progress.
pub struct Silent;

impl Progress for Silent {}

#[derive(Debug)]
pub struct Failure {
    pub dependency: Dependency,
    pub reason: FailureReason,
}

/// Output of one run: the concatenated notices and the dependencies that
/// could not be resolved, both in input order.
#[derive(Debug, Default)]
pub struct ResolutionBatch {
    pub notice: String,
    pub failures: Vec<Failure>,
}

impl ResolutionBatch {
    pub fn failed_ids(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.dependency.id()).collect()
    }
}

pub struct Resolver {
    cache: ContentCache,
    providers: Providers,
    sources: Vec<Box<dyn LicenseSource>>,
}

impl Resolver {
    /// `sources` is tried in order; the first to produce text wins.
    pub fn new(cache: ContentCache, providers: Providers, sources: Vec<Box<dyn LicenseSource>>) -> Self {
        Self {
            cache,
            providers,
            sources,
        }
    }

    pub async fn resolve(&self, dependencies: &[Dependency], progress: &dyn Progress) -> ResolutionBatch {
        let mut batch = ResolutionBatch::default();

        for dependency in dependencies {
            progress.started(dependency);
            let key = dependency.cache_key();

            if let Some(cached) = self.cache.load(&key).and_then(|b| String::from_utf8(b).ok()) {
                batch.notice.push_str(&cached);
                progress.finished(dependency, Outcome::CacheHit);
                continue;
            }

            match self.resolve_uncached(dependency).await {
                Ok((notice, provenance)) => {
                    self.cache.save(&key, notice.as_bytes());
                    batch.notice.push_str(&notice);
                    progress.finished(dependency, Outcome::Resolved(provenance));
                }
                Err(reason) => {
                    log::debug!("{}: {reason}", dependency.id());
                    progress.finished(dependency, Outcome::Failed(&reason));
                    batch.failures.push(Failure {
                        dependency: dependency.clone(),
                        reason,
                    });
                }
            }
        }

        batch
    }

    async fn resolve_uncached(&self, dependency: &Dependency) -> Result<(String, Provenance), FailureReason> {
        let provider = self.provider_for(dependency)?;
        let metadata = provider.fetch(&dependency.name, &dependency.version).await?;

        let license = self
            .find_license(&metadata)
            .await
            .ok_or(FailureReason::LicenseUnresolved)?;

        let record = NoticeRecord::new(&metadata, &license);
        Ok((render(&record), license.provenance()))
    }

    fn provider_for(&self, dependency: &Dependency) -> Result<&dyn MetadataProvider, MetadataError> {
        self.providers
            .get(&dependency.ecosystem)
            .map(|p| p.as_ref())
            .ok_or_else(|| {
                MetadataError::not_found(
                    &dependency.name,
                    &dependency.version,
                    format!("no metadata provider for {}", dependency.ecosystem),
                )
            })
    }

    /// First license text any source produces for `metadata`.
    pub async fn find_license(&self, metadata: &PackageMetadata) -> Option<LicenseText> {
        for source in &self.sources {
            if let Some(text) = source.lookup(metadata).await {
                log::debug!("{}: license from {}", metadata.name, source.name());
                return Some(text);
            }
            log::debug!("{}: nothing from {}", metadata.name, source.name());
        }
        None
    }
}
