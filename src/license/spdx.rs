use async_trait::async_trait;
use reqwest::Client;

use super::expression::identifiers;
use super::LicenseSource;
use crate::cache::ContentCache;
use crate::models::{LicenseText, PackageMetadata, Provenance};

/// Static mirror of the SPDX license list texts.
pub const SPDX_TEXT_URL: &str = "https://raw.githubusercontent.com/spdx/license-list-data/main/text";

/// Canonical license text for the declared SPDX identifier(s).
///
/// Texts are cached by identifier alone, separately from the per-package
/// notices, since one identifier serves many packages. Compound expressions
/// produce every component's text in expression order; if any component is
/// missing the whole lookup fails.
pub struct SpdxSource {
    client: Client,
    cache: ContentCache,
    base_url: String,
}

impl SpdxSource {
    pub fn new(client: Client, cache: ContentCache) -> Self {
        Self {
            client,
            cache,
            base_url: SPDX_TEXT_URL.to_string(),
        }
    }

    async fn text_for(&self, id: &str) -> Option<String> {
        if let Some(bytes) = self.cache.load(id) {
            if let Ok(text) = String::from_utf8(bytes) {
                return Some(text);
            }
        }

        let url = format!("{}/{}.txt", self.base_url, id);
        log::debug!("fetching {url}");
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                log::debug!("{url}: {e}");
                return None;
            }
        };
        if !response.status().is_success() {
            log::debug!("{url}: HTTP {}", response.status());
            return None;
        }
        let text = response.text().await.ok()?;
        if text.trim().is_empty() {
            return None;
        }

        self.cache.save(id, text.as_bytes());
        Some(text)
    }
}

#[async_trait]
impl LicenseSource for SpdxSource {
    fn name(&self) -> &'static str {
        "spdx"
    }

    async fn lookup(&self, metadata: &PackageMetadata) -> Option<LicenseText> {
        let ids = identifiers(&metadata.license_identifier)?;

        let mut texts = Vec::with_capacity(ids.len());
        for id in &ids {
            texts.push(self.text_for(id).await?);
        }

        LicenseText::new(texts.join("\n\n"), Provenance::Spdx)
    }
}

/// Normalize common non-SPDX license names to their SPDX equivalents.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed {
        "Apache 2.0" | "Apache License 2.0" | "Apache License, Version 2.0" | "Apache Software License" => {
            "Apache-2.0".to_string()
        }
        "MIT License" | "The MIT License" | "MIT license" => "MIT".to_string(),
        "BSD" | "BSD License" => "BSD-3-Clause".to_string(),
        "BSD 2-Clause" | "Simplified BSD" => "BSD-2-Clause".to_string(),
        "BSD 3-Clause" | "New BSD" | "Modified BSD" => "BSD-3-Clause".to_string(),
        "GNU GPL v2" | "GNU General Public License v2" | "GPL v2" | "GPLv2" => {
            "GPL-2.0".to_string()
        }
        "GNU GPL v3" | "GNU General Public License v3" | "GPL v3" | "GPLv3" => {
            "GPL-3.0".to_string()
        }
        "GNU LGPL v2.1" | "LGPL v2.1" | "LGPLv2.1" => "LGPL-2.1".to_string(),
        "GNU LGPL v3" | "LGPL v3" | "LGPLv3" => "LGPL-3.0".to_string(),
        "Mozilla Public License 2.0" | "MPL 2.0" | "MPLv2" => "MPL-2.0".to_string(),
        "ISC License" => "ISC".to_string(),
        "CC0" | "Public Domain" => "CC0-1.0".to_string(),
        "AGPL v3" | "AGPLv3" | "GNU AGPL v3" => "AGPL-3.0".to_string(),
        "PSF" | "PSF License" | "Python Software Foundation License" => "PSF-2.0".to_string(),
        other => other.to_string(),
    }
}
