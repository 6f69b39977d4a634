use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::LicenseSource;
use crate::models::{LicenseText, PackageMetadata, Provenance};

pub const GITHUB_API: &str = "https://api.github.com";

/// Subset of `GET /repos/{owner}/{repo}/license` we rely on.
#[derive(Debug, Deserialize)]
struct RepoLicense {
    download_url: Option<String>,
}

/// License file published in the package's GitHub repository.
///
/// An optional token raises the API rate limit; without one requests go out
/// unauthenticated.
pub struct GithubSource {
    client: Client,
    token: Option<String>,
    base_url: String,
}

impl GithubSource {
    pub fn new(client: Client, token: Option<String>) -> Self {
        Self {
            client,
            token: token.filter(|t| !t.trim().is_empty()),
            base_url: GITHUB_API.to_string(),
        }
    }

    async fn fetch(&self, endpoint: &str) -> Option<String> {
        let mut request = self
            .client
            .get(endpoint)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| log::debug!("{endpoint}: {e}"))
            .ok()?;
        if !response.status().is_success() {
            log::debug!("{endpoint}: HTTP {}", response.status());
            return None;
        }
        let license: RepoLicense = response
            .json()
            .await
            .map_err(|e| log::debug!("{endpoint}: {e}"))
            .ok()?;
        let download_url = license.download_url.filter(|u| !u.is_empty())?;

        let response = self
            .client
            .get(&download_url)
            .send()
            .await
            .map_err(|e| log::debug!("{download_url}: {e}"))
            .ok()?;
        if !response.status().is_success() {
            log::debug!("{download_url}: HTTP {}", response.status());
            return None;
        }
        response.text().await.ok()
    }
}

#[async_trait]
impl LicenseSource for GithubSource {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn lookup(&self, metadata: &PackageMetadata) -> Option<LicenseText> {
        let endpoint = license_endpoint(&self.base_url, &metadata.repository_url)?;
        let text = self.fetch(&endpoint).await?;
        LicenseText::new(text, Provenance::Repository)
    }
}

/// `owner` and `repo` of a GitHub URL, in any of the forms registries use:
/// `https://github.com/o/r`, `git+https://…`, `git://…`, `git@github.com:o/r.git`,
/// `www.github.com/o/r/tree/main`, with or without a trailing `/` or `.git`.
pub fn parse_repository(url: &str) -> Option<(String, String)> {
    let url = url.trim();
    let url = url.split(['?', '#']).next().unwrap_or(url);
    let url = url.strip_prefix("git+").unwrap_or(url);

    let rest = if let Some(rest) = url.strip_prefix("git@github.com:") {
        format!("github.com/{rest}")
    } else {
        let without_scheme = ["https://", "http://", "git://", "ssh://git@", "ssh://"]
            .iter()
            .find_map(|scheme| url.strip_prefix(scheme))
            .unwrap_or(url);
        without_scheme.to_string()
    };
    let rest = rest.strip_prefix("www.").unwrap_or(&rest);

    let path = rest.strip_prefix("github.com/")?;
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// License endpoint under `api` for a repository URL, or `None` when the URL
/// does not point at GitHub.
pub fn license_endpoint(api: &str, repository_url: &str) -> Option<String> {
    let (owner, repo) = parse_repository(repository_url)?;
    Some(format!("{api}/repos/{owner}/{repo}/license"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parsed(url: &str) -> Option<(String, String)> {
        parse_repository(url)
    }

    fn pair(owner: &str, repo: &str) -> Option<(String, String)> {
        Some((owner.to_string(), repo.to_string()))
    }

    #[test]
    fn test_plain_https() {
        assert_eq!(parsed("https://github.com/serde-rs/serde"), pair("serde-rs", "serde"));
        assert_eq!(parsed("https://github.com/serde-rs/serde/"), pair("serde-rs", "serde"));
        assert_eq!(parsed("http://www.github.com/a/b"), pair("a", "b"));
    }

    #[test]
    fn test_git_suffix_and_prefixes() {
        assert_eq!(parsed("https://github.com/a/b.git"), pair("a", "b"));
        assert_eq!(parsed("git+https://github.com/a/b.git"), pair("a", "b"));
        assert_eq!(parsed("git://github.com/a/b"), pair("a", "b"));
        assert_eq!(parsed("git@github.com:a/b.git"), pair("a", "b"));
        assert_eq!(parsed("ssh://git@github.com/a/b"), pair("a", "b"));
    }

    #[test]
    fn test_deep_paths_and_fragments() {
        assert_eq!(parsed("https://github.com/a/b/tree/main/crates/c"), pair("a", "b"));
        assert_eq!(parsed("https://github.com/a/b#readme"), pair("a", "b"));
    }

    #[test]
    fn test_non_github_urls() {
        assert_eq!(parsed(""), None);
        assert_eq!(parsed("https://gitlab.com/a/b"), None);
        assert_eq!(parsed("https://github.com/a"), None);
        assert_eq!(parsed("https://example.com/github.com/a/b"), None);
    }

    #[test]
    fn test_license_endpoint() {
        assert_eq!(
            license_endpoint(GITHUB_API, "https://github.com/a/b.git").as_deref(),
            Some("https://api.github.com/repos/a/b/license")
        );
    }

    #[test]
    fn test_blank_token_is_dropped() {
        let source = GithubSource::new(Client::new(), Some("  ".into()));
        assert!(source.token.is_none());
    }

    #[tokio::test]
    async fn test_lookup_skips_non_github_repository() {
        let source = GithubSource::new(Client::new(), None);
        let metadata = PackageMetadata {
            repository_url: "https://gitlab.com/a/b".into(),
            ..Default::default()
        };
        assert!(source.lookup(&metadata).await.is_none());
    }

    fn mocked(server: &MockServer, token: Option<&str>) -> GithubSource {
        GithubSource {
            base_url: server.uri(),
            ..GithubSource::new(Client::new(), token.map(str::to_string))
        }
    }

    fn from_repo(url: &str) -> PackageMetadata {
        PackageMetadata {
            repository_url: url.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetches_license_through_download_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/serde-rs/serde/license"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "download_url": format!("{}/raw/serde/LICENSE-MIT", server.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/raw/serde/LICENSE-MIT"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Permission is hereby granted"))
            .expect(1)
            .mount(&server)
            .await;

        let text = mocked(&server, Some("secret"))
            .lookup(&from_repo("git+https://github.com/serde-rs/serde.git"))
            .await
            .unwrap();
        assert_eq!(text.text(), "Permission is hereby granted");
        assert_eq!(text.provenance(), Provenance::Repository);
    }

    #[tokio::test]
    async fn test_missing_license_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/a/b/license"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(mocked(&server, None)
            .lookup(&from_repo("https://github.com/a/b"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_no_download_url_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/a/b/license"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "download_url": null
            })))
            .mount(&server)
            .await;

        assert!(mocked(&server, None)
            .lookup(&from_repo("https://github.com/a/b"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_failed_download_or_empty_text_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/a/b/license"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "download_url": format!("{}/raw/b/LICENSE", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/raw/b/LICENSE"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/a/c/license"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "download_url": format!("{}/raw/c/LICENSE", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/raw/c/LICENSE"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
            .mount(&server)
            .await;

        let source = mocked(&server, None);
        assert!(source.lookup(&from_repo("https://github.com/a/b")).await.is_none());
        assert!(source.lookup(&from_repo("https://github.com/a/c")).await.is_none());
    }
}
