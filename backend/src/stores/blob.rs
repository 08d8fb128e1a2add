//! Filesystem-backed blob storage with md5-signed, time-boxed access URLs.
//!
//! Artifacts live under a configured root directory, one file per draft
//! (`{user_id}/{draft_id}.docx`). An access URL embeds the blob path, a unix
//! expiry timestamp, and an md5 token over `secret:path:expiry`; the download
//! route recomputes the token and refuses tampered or lapsed links. Reissuing
//! a URL is just re-signing with a fresh expiry, no blob work involved.

use crate::stores::{BlobStore, SignedUrl, StoreError};
use chrono::{Duration, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct FsBlobStore {
    root: PathBuf,
    secret: String,
    /// Public base URL of this service, e.g. `http://localhost:8080`.
    base_url: String,
}

impl FsBlobStore {
    pub fn new<P: AsRef<Path>>(root: P, secret: String, base_url: String) -> Self {
        FsBlobStore {
            root: root.as_ref().to_path_buf(),
            secret,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn sign(&self, path: &str, expires: i64) -> String {
        let digest = md5::compute(format!("{}:{}:{}", self.secret, path, expires));
        format!("{:x}", digest)
    }

    /// Blob paths are relative, forward-slash separated, and may not escape
    /// the root.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        if path.is_empty() || path.starts_with('/') {
            return None;
        }
        if path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return None;
        }
        Some(self.root.join(path))
    }
}

impl BlobStore for FsBlobStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let full = self
            .resolve(path)
            .ok_or_else(|| StoreError::Corrupt(format!("invalid blob path '{}'", path)))?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, bytes)?;
        Ok(())
    }

    fn signed_url(&self, path: &str, ttl: Duration) -> Result<SignedUrl, StoreError> {
        if self.resolve(path).is_none() {
            return Err(StoreError::Corrupt(format!("invalid blob path '{}'", path)));
        }
        let expires_at = Utc::now() + ttl;
        let expires = expires_at.timestamp();
        let sig = self.sign(path, expires);
        Ok(SignedUrl {
            url: format!(
                "{}/api/files/{}?expires={}&sig={}",
                self.base_url, path, expires, sig
            ),
            expires_at,
        })
    }

    fn open(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(full) = self.resolve(path) else {
            return Ok(None);
        };
        match fs::read(full) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn verify(&self, path: &str, expires: i64, sig: &str) -> bool {
        self.sign(path, expires) == sig
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FsBlobStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(
            dir.path(),
            "test-secret".to_string(),
            "http://localhost:8080/".to_string(),
        );
        (dir, store)
    }

    #[test]
    fn upload_then_open_roundtrips() {
        let (_dir, store) = store();
        store.upload("user-1/d-1.docx", b"contents").unwrap();
        assert_eq!(store.open("user-1/d-1.docx").unwrap().unwrap(), b"contents");
        assert!(store.open("user-1/missing.docx").unwrap().is_none());
    }

    #[test]
    fn signed_url_carries_expiry_and_valid_signature() {
        let (_dir, store) = store();
        let signed = store.signed_url("user-1/d-1.docx", Duration::days(1)).unwrap();
        assert!(signed.url.starts_with("http://localhost:8080/api/files/user-1/d-1.docx?"));
        assert!(signed.expires_at > Utc::now());

        let expires = signed.expires_at.timestamp();
        let sig = signed
            .url
            .rsplit("sig=")
            .next()
            .expect("sig query parameter");
        assert!(store.verify("user-1/d-1.docx", expires, sig));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let (_dir, store) = store();
        let signed = store.signed_url("user-1/d-1.docx", Duration::days(1)).unwrap();
        let expires = signed.expires_at.timestamp();
        assert!(!store.verify("user-1/d-1.docx", expires, "0000"));
        // Extending the window invalidates the original token.
        let sig = store.sign("user-1/d-1.docx", expires);
        assert!(!store.verify("user-1/d-1.docx", expires + 60, &sig));
        assert!(!store.verify("user-2/d-1.docx", expires, &sig));
    }

    #[test]
    fn traversal_paths_are_refused() {
        let (_dir, store) = store();
        assert!(store.upload("../escape.docx", b"x").is_err());
        assert!(store.upload("/abs.docx", b"x").is_err());
        assert!(store.open("a//b.docx").unwrap().is_none());
    }
}
