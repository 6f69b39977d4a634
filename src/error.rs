use std::path::PathBuf;

use thiserror::Error;

/// Batch-level failures. Any of these aborts the run before output is written.
#[derive(Debug, Error)]
pub enum NoticeError {
    #[error("manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("failed to parse manifest {path}: {details}")]
    ManifestParse { path: PathBuf, details: String },

    #[error("{path}: unsupported project type")]
    UnsupportedProject { path: PathBuf },
}

/// Failure to obtain metadata for a single package.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("{name} {version}: not found ({reason})")]
    NotFound {
        name: String,
        version: String,
        reason: String,
    },

    #[error("{name}: network error: {source}")]
    Network {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{name}: malformed metadata: {details}")]
    Malformed { name: String, details: String },
}

impl MetadataError {
    pub fn not_found(name: &str, version: &str, reason: impl Into<String>) -> Self {
        MetadataError::NotFound {
            name: name.to_string(),
            version: version.to_string(),
            reason: reason.into(),
        }
    }

    pub fn network(name: &str, source: reqwest::Error) -> Self {
        MetadataError::Network {
            name: name.to_string(),
            source,
        }
    }

    pub fn malformed(name: &str, details: impl Into<String>) -> Self {
        MetadataError::Malformed {
            name: name.to_string(),
            details: details.into(),
        }
    }
}

/// Why one dependency ended up in the failure list.
#[derive(Debug, Error)]
pub enum FailureReason {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("no license text found")]
    LicenseUnresolved,
}

/// Cache problems. Never leaves the cache module; every one is a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt cache entry: {0}")]
    Corrupt(String),
}
