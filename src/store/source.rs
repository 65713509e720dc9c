//! Remote blob access for cache files.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use tempfile::NamedTempFile;

use super::StoreError;

/// Read-only access to remote cache objects by key, e.g.
/// "US/ME_Knox.csv.gz" or "US/building_class.json".
pub trait BlobSource {
    fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// Blob source over a public HTTP(S) bucket.
pub struct HttpSource {
    base: String,
    client: Client,
}

impl HttpSource {
    /// Bucket the published dataset lives in.
    pub const DEFAULT_BUCKET: &'static str = "https://buildings.gridlabd.us";

    pub fn new(base: impl Into<String>) -> Result<Self, StoreError> {
        let base = base.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .user_agent(concat!("openbuildings/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| StoreError::RemoteFetchFailed {
                key: base.clone(),
                source: Box::new(e),
            })?;
        Ok(Self { base, client })
    }
}

impl BlobSource for HttpSource {
    fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let url = format!("{}/{}", self.base, key);
        let fail = |e: reqwest::Error| StoreError::RemoteFetchFailed {
            key: key.to_string(),
            source: Box::new(e),
        };
        let bytes = self
            .client
            .get(&url)
            .send()
            .map_err(fail)?
            .error_for_status()
            .map_err(fail)?
            .bytes()
            .map_err(fail)?;
        Ok(bytes.to_vec())
    }
}

/// In-memory blob source for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemSource {
    objects: HashMap<String, Vec<u8>>,
}

impl MemSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, bytes: Vec<u8>) {
        self.objects.insert(key.into(), bytes);
    }
}

impl BlobSource for MemSource {
    fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::RemoteFetchFailed {
                key: key.to_string(),
                source: "no such object".into(),
            })
    }
}

/// Fetch `key` and atomically install it at `target` (write to a temp
/// file in the same directory, then rename).
pub(crate) fn install(
    source: &dyn BlobSource,
    key: &str,
    target: &Path,
) -> Result<(), StoreError> {
    let bytes = source.fetch(key)?;
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = NamedTempFile::new_in(target.parent().unwrap_or(Path::new(".")))?;
    tmp.write_all(&bytes)?;
    tmp.persist(target).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_source_round_trip() {
        let mut source = MemSource::new();
        source.insert("US/ME_Knox.csv.gz", b"bytes".to_vec());
        assert_eq!(source.fetch("US/ME_Knox.csv.gz").unwrap(), b"bytes");
        assert!(matches!(
            source.fetch("US/ME_York.csv.gz"),
            Err(StoreError::RemoteFetchFailed { .. })
        ));
    }

    #[test]
    fn install_writes_the_target() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("cache").join("ME_Knox.csv.gz");

        let mut source = MemSource::new();
        source.insert("US/ME_Knox.csv.gz", b"payload".to_vec());
        install(&source, "US/ME_Knox.csv.gz", &target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"payload");
    }
}
