use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{or_empty, MetadataProvider};
use crate::error::MetadataError;
use crate::license::spdx::normalize;
use crate::models::PackageMetadata;

pub const PYPI_API: &str = "https://pypi.org/pypi";

#[derive(Debug, Deserialize)]
struct PypiResponse {
    info: PypiInfo,
}

#[derive(Debug, Default, Deserialize)]
struct PypiInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    author: Option<String>,
    author_email: Option<String>,
    license: Option<String>,
    license_expression: Option<String>,
    #[serde(default)]
    classifiers: Vec<String>,
    project_urls: Option<HashMap<String, Option<String>>>,
    home_page: Option<String>,
}

/// Metadata from the PyPI JSON API. Always the latest release: PyPI
/// requirements in `pyproject.toml` rarely pin an exact version.
pub struct PypiProvider {
    client: Client,
    base_url: String,
}

impl PypiProvider {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: PYPI_API.to_string(),
        }
    }
}

#[async_trait]
impl MetadataProvider for PypiProvider {
    async fn fetch(&self, name: &str, version: &str) -> Result<PackageMetadata, MetadataError> {
        let url = format!("{}/{}/json", self.base_url, name);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MetadataError::network(name, e))?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(MetadataError::not_found(name, version, "not on PyPI"))
            }
            s => return Err(MetadataError::not_found(name, version, format!("HTTP {s}"))),
        }

        let data: PypiResponse = response
            .json()
            .await
            .map_err(|e| MetadataError::malformed(name, e.to_string()))?;

        Ok(to_metadata(name, data.info))
    }
}

fn to_metadata(requested: &str, info: PypiInfo) -> PackageMetadata {
    let license = declared_license(&info);
    let repository = repository_url(&info);
    let author = info
        .author
        .filter(|a| !a.trim().is_empty())
        .or(info.author_email);

    let name = if info.name.is_empty() {
        requested.to_string()
    } else {
        info.name
    };

    let author = or_empty(author);
    PackageMetadata {
        name,
        version: info.version,
        copyright: author.clone(),
        author,
        license_identifier: license,
        repository_url: repository,
        package_dir: None,
    }
}

fn is_set(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.eq_ignore_ascii_case("UNKNOWN")
}

/// Explicit `license` field, then `license_expression`, then the
/// `License :: …` trove classifier. A multi-line `license` (the full text
/// pasted into the field) loses to a one-line alternative.
fn declared_license(info: &PypiInfo) -> String {
    let declared: Vec<&str> = [info.license.as_deref(), info.license_expression.as_deref()]
        .into_iter()
        .flatten()
        .filter(|l| is_set(l))
        .collect();

    if let Some(single_line) = declared.iter().find(|l| !l.trim().contains('\n')) {
        return single_line.trim().to_string();
    }

    let classifier = info
        .classifiers
        .iter()
        .filter(|c| c.starts_with("License ::"))
        .filter_map(|c| c.rsplit("::").next())
        .map(|l| normalize(l))
        .find(|l| is_set(l));

    classifier
        .or_else(|| declared.first().map(|l| l.trim().to_string()))
        .unwrap_or_default()
}

/// `project_urls.Source`, then `project_urls.Homepage`, then common
/// variants of those keys, then the legacy `home_page` field.
fn repository_url(info: &PypiInfo) -> String {
    let urls: Vec<(&str, &str)> = info
        .project_urls
        .iter()
        .flatten()
        .filter_map(|(k, v)| v.as_deref().filter(|v| is_set(v)).map(|v| (k.as_str(), v)))
        .collect();

    let exact = ["Source", "Homepage"]
        .iter()
        .find_map(|key| urls.iter().find(|(k, _)| k == key).map(|(_, v)| *v));

    let loose = || {
        ["source", "source code", "repository", "code", "github", "homepage"]
            .iter()
            .find_map(|key| {
                urls.iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| *v)
            })
    };

    exact
        .or_else(loose)
        .map(str::to_string)
        .or_else(|| info.home_page.clone().filter(|h| is_set(h)))
        .map(|u| u.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parse(json: &str) -> PackageMetadata {
        let response: PypiResponse = serde_json::from_str(json).unwrap();
        to_metadata("requested", response.info)
    }

    #[test]
    fn test_homepage_used_when_source_missing() {
        let metadata = parse(
            r#"{"info": {
                "name": "left-pad", "version": "1.3.0", "author": "someone",
                "license": "MIT",
                "project_urls": {"Homepage": "https://github.com/a/b", "Documentation": "https://docs"}
            }}"#,
        );
        assert_eq!(metadata.name, "left-pad");
        assert_eq!(metadata.version, "1.3.0");
        assert_eq!(metadata.license_identifier, "MIT");
        assert_eq!(metadata.repository_url, "https://github.com/a/b");
    }

    #[test]
    fn test_source_preferred_over_homepage() {
        let metadata = parse(
            r#"{"info": {
                "name": "requests", "version": "2.32.0",
                "project_urls": {"Homepage": "https://requests.readthedocs.io", "Source": "https://github.com/psf/requests"}
            }}"#,
        );
        assert_eq!(metadata.repository_url, "https://github.com/psf/requests");
    }

    #[test]
    fn test_license_expression_fallback() {
        let metadata = parse(
            r#"{"info": {"name": "x", "version": "1", "license": "", "license_expression": "Apache-2.0"}}"#,
        );
        assert_eq!(metadata.license_identifier, "Apache-2.0");
    }

    #[test]
    fn test_full_text_license_field_loses_to_classifier() {
        let metadata = parse(
            r#"{"info": {"name": "x", "version": "1",
                "license": "Copyright 2020\n\nPermission is hereby granted",
                "classifiers": ["Programming Language :: Python", "License :: OSI Approved :: MIT License"]}}"#,
        );
        assert_eq!(metadata.license_identifier, "MIT");
    }

    #[test]
    fn test_unknown_values_are_unset() {
        let metadata = parse(
            r#"{"info": {"name": "x", "version": "1", "license": "UNKNOWN", "home_page": "UNKNOWN",
                "project_urls": null}}"#,
        );
        assert_eq!(metadata.license_identifier, "");
        assert_eq!(metadata.repository_url, "");
    }

    #[test]
    fn test_loose_project_url_keys() {
        let metadata = parse(
            r#"{"info": {"name": "x", "version": "1",
                "project_urls": {"Source Code": "https://github.com/o/r", "Tracker": null}}}"#,
        );
        assert_eq!(metadata.repository_url, "https://github.com/o/r");
    }

    fn mocked(server: &MockServer) -> PypiProvider {
        PypiProvider {
            client: Client::new(),
            base_url: server.uri(),
        }
    }

    #[tokio::test]
    async fn test_fetch_reads_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/requests/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "info": {
                    "name": "requests", "version": "2.32.3", "author": "Kenneth Reitz",
                    "license": "Apache-2.0",
                    "project_urls": {"Source": "https://github.com/psf/requests"}
                }
            })))
            .mount(&server)
            .await;

        let metadata = mocked(&server).fetch("requests", "").await.unwrap();
        assert_eq!(metadata.version, "2.32.3");
        assert_eq!(metadata.author, "Kenneth Reitz");
        assert_eq!(metadata.repository_url, "https://github.com/psf/requests");
    }

    #[tokio::test]
    async fn test_missing_package_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/no-such-package/json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = mocked(&server).fetch("no-such-package", "").await.unwrap_err();
        assert!(matches!(err, MetadataError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = mocked(&server).fetch("broken", "").await.unwrap_err();
        assert!(matches!(err, MetadataError::Malformed { .. }));
    }
}
