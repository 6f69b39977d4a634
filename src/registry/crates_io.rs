use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{or_empty, MetadataProvider};
use crate::error::MetadataError;
use crate::models::PackageMetadata;

pub const CRATES_IO_API: &str = "https://crates.io/api/v1/crates";

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: CrateVersion,
}

#[derive(Debug, Deserialize)]
struct CrateResponse {
    #[serde(rename = "crate")]
    krate: CrateInfo,
    #[serde(default)]
    versions: Vec<CrateVersion>,
}

#[derive(Debug, Deserialize)]
struct CrateInfo {
    repository: Option<String>,
    homepage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrateVersion {
    num: String,
    license: Option<String>,
    repository: Option<String>,
    #[serde(default)]
    yanked: bool,
    published_by: Option<Publisher>,
}

#[derive(Debug, Deserialize)]
struct Publisher {
    name: Option<String>,
    login: Option<String>,
}

/// Metadata from the crates.io API.
///
/// Exact versions go straight to `/crates/{name}/{version}`. Partial
/// requirements such as `1.0` are matched against the crate's published
/// versions, newest first.
pub struct CratesIoProvider {
    client: Client,
    base_url: String,
}

impl CratesIoProvider {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: CRATES_IO_API.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        name: &str,
        version: &str,
    ) -> Result<T, MetadataError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MetadataError::network(name, e))?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(MetadataError::not_found(name, version, "not on crates.io"))
            }
            s => return Err(MetadataError::not_found(name, version, format!("HTTP {s}"))),
        }

        response
            .json()
            .await
            .map_err(|e| MetadataError::malformed(name, e.to_string()))
    }

    async fn fetch_crate(&self, name: &str, version: &str) -> Result<CrateResponse, MetadataError> {
        let url = format!("{}/{}", self.base_url, name);
        self.get_json(&url, name, version).await
    }
}

#[async_trait]
impl MetadataProvider for CratesIoProvider {
    async fn fetch(&self, name: &str, version: &str) -> Result<PackageMetadata, MetadataError> {
        let requirement = normalize_requirement(version);
        if requirement.is_empty() {
            return Err(MetadataError::not_found(name, version, "no version declared"));
        }

        if is_exact(&requirement) {
            let url = format!("{}/{}/{}", self.base_url, name, requirement);
            let response: VersionResponse = self.get_json(&url, name, version).await?;
            let found = response.version;

            let info = if found.repository.as_deref().map_or(true, str::is_empty) {
                self.fetch_crate(name, version).await.ok().map(|c| c.krate)
            } else {
                None
            };
            return Ok(to_metadata(name, found, info));
        }

        let response = self.fetch_crate(name, version).await?;
        let found = pick_version(response.versions, &requirement).ok_or_else(|| {
            MetadataError::not_found(name, version, "no published version matches")
        })?;
        Ok(to_metadata(name, found, Some(response.krate)))
    }
}

fn to_metadata(name: &str, version: CrateVersion, info: Option<CrateInfo>) -> PackageMetadata {
    let author = version
        .published_by
        .and_then(|p| p.name.filter(|n| !n.is_empty()).or(p.login))
        .unwrap_or_default();

    let repository = version
        .repository
        .filter(|r| !r.is_empty())
        .or_else(|| {
            info.and_then(|i| {
                i.repository
                    .filter(|r| !r.is_empty())
                    .or(i.homepage.filter(|h| !h.is_empty()))
            })
        });

    PackageMetadata {
        name: name.to_string(),
        version: version.num,
        copyright: author.clone(),
        author,
        license_identifier: or_empty(version.license),
        repository_url: or_empty(repository),
        package_dir: None,
    }
}

/// Strip Cargo's caret, tilde and exact operators: `^1.2` → `1.2`.
pub fn normalize_requirement(version: &str) -> String {
    version
        .trim()
        .trim_start_matches(['^', '=', '~'])
        .trim()
        .to_string()
}

/// `major.minor.patch`, optionally with pre-release or build metadata.
fn is_exact(requirement: &str) -> bool {
    let core = requirement.split(['-', '+']).next().unwrap_or(requirement);
    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// First non-yanked version whose leading components equal the requirement.
/// crates.io lists versions newest first. Pre-releases only match when the
/// requirement names one.
fn pick_version(versions: Vec<CrateVersion>, requirement: &str) -> Option<CrateVersion> {
    let wanted: Vec<&str> = requirement.split('.').filter(|p| *p != "*").collect();
    let allow_pre = requirement.contains('-');

    versions.into_iter().find(|v| {
        if v.yanked || (!allow_pre && v.num.contains('-')) {
            return false;
        }
        let have: Vec<&str> = v.num.split('.').collect();
        wanted.len() <= have.len() && wanted.iter().zip(&have).all(|(w, h)| w == h)
    })
}
