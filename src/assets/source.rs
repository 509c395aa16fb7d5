use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{BannerError, BannerResult};

/// Something that can turn an asset URI into encoded image bytes.
///
/// Implementations are called concurrently from the loader's worker pool.
pub trait AssetSource: Send + Sync {
    /// Fetch raw bytes for `uri`.
    fn fetch(&self, uri: &str) -> BannerResult<Vec<u8>>;
}

/// Reads assets from a local directory.
///
/// Accepts relative paths and `file://` URIs; both are resolved under `root` after normalization.
#[derive(Clone, Debug)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for FsAssetSource {
    fn fetch(&self, uri: &str) -> BannerResult<Vec<u8>> {
        let rel = uri.strip_prefix("file://").unwrap_or(uri);
        let norm = normalize_rel_path(rel)?;
        let path = self.root.join(Path::new(&norm));
        std::fs::read(&path)
            .with_context(|| format!("read asset bytes from '{}'", path.display()))
            .map_err(BannerError::from)
    }
}

/// Fetches `http://` and `https://` URIs with a blocking client.
#[cfg(feature = "http")]
#[derive(Clone, Debug)]
pub struct HttpAssetSource {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpAssetSource {
    pub fn new(timeout: std::time::Duration) -> BannerResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl AssetSource for HttpAssetSource {
    fn fetch(&self, uri: &str) -> BannerResult<Vec<u8>> {
        let response = self
            .client
            .get(uri)
            .send()
            .with_context(|| format!("request '{uri}'"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BannerError::evaluation(format!("GET '{uri}' returned {status}")));
        }
        let bytes = response
            .bytes()
            .with_context(|| format!("read body of '{uri}'"))?;
        Ok(bytes.to_vec())
    }
}

/// Dispatches by URI scheme: `http(s)://` to the network source, everything else to the
/// filesystem source.
pub struct RoutedAssetSource {
    fs: FsAssetSource,
    http: Option<Box<dyn AssetSource>>,
}

impl RoutedAssetSource {
    pub fn new(fs: FsAssetSource) -> Self {
        Self { fs, http: None }
    }

    pub fn with_http(mut self, http: Box<dyn AssetSource>) -> Self {
        self.http = Some(http);
        self
    }
}

impl AssetSource for RoutedAssetSource {
    fn fetch(&self, uri: &str) -> BannerResult<Vec<u8>> {
        if is_remote(uri) {
            return match &self.http {
                Some(http) => http.fetch(uri),
                None => Err(BannerError::validation(format!(
                    "no network source configured for '{uri}'"
                ))),
            };
        }
        self.fs.fetch(uri)
    }
}

fn is_remote(uri: &str) -> bool {
    let lower = uri.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Normalize and validate root-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> BannerResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(BannerError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(BannerError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(BannerError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(BannerError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
