//! Filing loader collaborator.
//!
//! The engine consumes loaders through the `FilingLoader` trait and
//! treats the returned document and metadata as authoritative and
//! read-only. Loader failure is pipeline-fatal: no partial chunk set is
//! produced for a filing whose source could not be obtained.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use filing_core::{AppError, AppResult};
use walkdir::WalkDir;

use crate::types::{FilingMeta, RawFiling};

/// Identifies the filing to load: an explicit path or URL, or a
/// ticker/form/year triple resolved against the loader's document root.
#[derive(Debug, Clone, Default)]
pub struct FilingRequest {
    pub ticker: Option<String>,
    pub form: Option<String>,
    pub year: Option<i32>,
    pub path: Option<PathBuf>,
    pub url: Option<String>,
}

impl FilingRequest {
    /// Derive a stable filing id from the request fields.
    pub fn filing_id(&self) -> String {
        match (&self.ticker, &self.year) {
            (Some(ticker), Some(year)) => {
                let form = self.form.as_deref().unwrap_or("10-K");
                format!("{}-{}-{}", ticker.to_uppercase(), form, year)
            }
            _ => self
                .path
                .as_ref()
                .and_then(|p| p.file_stem())
                .map(|s| s.to_string_lossy().to_string())
                .or_else(|| self.url.clone())
                .unwrap_or_else(|| "unknown-filing".to_string()),
        }
    }
}

/// Source of raw filing documents.
#[async_trait::async_trait]
pub trait FilingLoader: Send + Sync {
    /// Loader name for logs (e.g., "file", "http")
    fn name(&self) -> &str;

    /// Fetch the raw document and its metadata.
    async fn load(&self, request: &FilingRequest) -> AppResult<RawFiling>;
}

/// Loads filings from the local filesystem.
///
/// A request with an explicit path reads that file; a ticker/year
/// request searches the document root for a matching
/// `<ticker>-<year>*.htm[l]` file. A `<stem>.meta.yaml` sidecar next to
/// the document supplies filing metadata when present.
#[derive(Debug)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, request: &FilingRequest) -> AppResult<PathBuf> {
        if let Some(path) = &request.path {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                self.root.join(path)
            };
            if !path.is_file() {
                return Err(AppError::Loader(format!("document not found: {:?}", path)));
            }
            return Ok(path);
        }

        let (Some(ticker), Some(year)) = (&request.ticker, &request.year) else {
            return Err(AppError::Loader(
                "request needs either a path or a ticker and year".to_string(),
            ));
        };

        let prefix = format!("{}-{}", ticker.to_lowercase(), year);
        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if stem.starts_with(&prefix) && matches!(ext.as_str(), "htm" | "html" | "txt") {
                return Ok(path.to_path_buf());
            }
        }

        Err(AppError::Loader(format!(
            "no document matching {} under {:?}",
            prefix, self.root
        )))
    }

    /// Read the `<stem>.meta.yaml` sidecar, if any.
    fn sidecar_meta(path: &Path) -> Option<FilingMeta> {
        let sidecar = path.with_extension("meta.yaml");
        let content = std::fs::read_to_string(&sidecar).ok()?;
        match serde_yaml::from_str(&content) {
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::warn!("Ignoring unreadable metadata sidecar {:?}: {}", sidecar, e);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl FilingLoader for FileLoader {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self, request: &FilingRequest) -> AppResult<RawFiling> {
        let path = self.resolve(request)?;
        tracing::debug!("Loading filing from {:?}", path);

        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::Loader(format!("failed to read {:?}: {}", path, e)))?;

        let mut meta = Self::sidecar_meta(&path).unwrap_or_default();
        if meta.filing_id.is_empty() {
            meta.filing_id = request.filing_id();
        }
        if meta.ticker.is_none() {
            meta.ticker = request.ticker.clone();
        }
        if meta.form.is_none() {
            meta.form = request.form.clone();
        }
        if meta.year.is_none() {
            meta.year = request.year;
        }

        Ok(RawFiling { body, meta })
    }
}

/// Loads filings over HTTP from their source URL.
#[derive(Debug)]
pub struct HttpLoader {
    client: reqwest::Client,
}

impl HttpLoader {
    pub fn new() -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("filing-index/0.1")
            .build()
            .map_err(|e| AppError::Loader(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl FilingLoader for HttpLoader {
    fn name(&self) -> &str {
        "http"
    }

    async fn load(&self, request: &FilingRequest) -> AppResult<RawFiling> {
        let url = request
            .url
            .as_deref()
            .ok_or_else(|| AppError::Loader("request has no URL".to_string()))?;

        tracing::debug!("Fetching filing from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Loader(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Loader(format!(
                "request to {} returned {}",
                url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Loader(format!("failed to read body from {}: {}", url, e)))?;

        let meta = FilingMeta {
            filing_id: request.filing_id(),
            ticker: request.ticker.clone(),
            form: request.form.clone(),
            year: request.year,
            source_url: Some(url.to_string()),
            ..Default::default()
        };

        Ok(RawFiling { body, meta })
    }
}

/// Create a loader by name.
pub fn create_loader(kind: &str, root: &Path) -> AppResult<Arc<dyn FilingLoader>> {
    match kind {
        "file" => Ok(Arc::new(FileLoader::new(root))),
        "http" => Ok(Arc::new(HttpLoader::new()?)),
        _ => Err(AppError::Loader(format!(
            "Unknown loader: '{}'. Supported loaders: file, http",
            kind
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_loader_direct_path() {
        let temp = TempDir::new().unwrap();
        let doc = temp.path().join("acme-2024-10k.htm");
        std::fs::write(&doc, "<p>Annual report</p>").unwrap();

        let loader = FileLoader::new(temp.path());
        let request = FilingRequest {
            path: Some(doc),
            ..Default::default()
        };

        let raw = loader.load(&request).await.unwrap();
        assert!(raw.body.contains("Annual report"));
        assert_eq!(raw.meta.filing_id, "acme-2024-10k");
    }

    #[tokio::test]
    async fn test_file_loader_ticker_year_lookup() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("acme-2024-annual.htm"), "<p>body</p>").unwrap();

        let loader = FileLoader::new(temp.path());
        let request = FilingRequest {
            ticker: Some("ACME".to_string()),
            year: Some(2024),
            ..Default::default()
        };

        let raw = loader.load(&request).await.unwrap();
        assert_eq!(raw.meta.filing_id, "ACME-10-K-2024");
        assert_eq!(raw.meta.ticker.as_deref(), Some("ACME"));
    }

    #[tokio::test]
    async fn test_file_loader_missing_document_is_fatal() {
        let temp = TempDir::new().unwrap();
        let loader = FileLoader::new(temp.path());
        let request = FilingRequest {
            ticker: Some("NOPE".to_string()),
            year: Some(1999),
            ..Default::default()
        };

        let err = loader.load(&request).await.unwrap_err();
        assert!(matches!(err, AppError::Loader(_)));
    }

    #[tokio::test]
    async fn test_file_loader_sidecar_metadata() {
        let temp = TempDir::new().unwrap();
        let doc = temp.path().join("acme-2024.htm");
        std::fs::write(&doc, "<p>body</p>").unwrap();
        std::fs::write(
            temp.path().join("acme-2024.meta.yaml"),
            "filing_id: ACME-10-K-2024\ncompany: Acme Corp\nyear: 2024\n",
        )
        .unwrap();

        let loader = FileLoader::new(temp.path());
        let request = FilingRequest {
            path: Some(doc),
            ..Default::default()
        };

        let raw = loader.load(&request).await.unwrap();
        assert_eq!(raw.meta.company.as_deref(), Some("Acme Corp"));
        assert_eq!(raw.meta.year, Some(2024));
    }

    #[test]
    fn test_create_unknown_loader() {
        let result = create_loader("carrier-pigeon", Path::new("."));
        assert!(result.is_err());
    }
}
