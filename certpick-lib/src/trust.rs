//! Trust anchors for chain building.
//!
//! Provides [`TrustStore`], the set of CA certificates chains may
//! terminate at. By default it is loaded from the system trust store
//! (the same certificates OpenSSL uses), discovered via `openssl-probe`
//! and environment variables; it can also be built from explicit bundles
//! so the anchor set is an injectable capability.

use crate::cert::Certificate;
use crate::util;
use crate::CertpickError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Well-known CA bundle file paths, in order of preference.
pub(crate) const KNOWN_CA_BUNDLE_PATHS: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt", // Debian/Ubuntu
    "/etc/pki/tls/certs/ca-bundle.crt",   // RHEL/CentOS/Fedora
    "/etc/ssl/ca-bundle.pem",             // openSUSE
    "/etc/ssl/cert.pem",                  // macOS, Alpine
];

/// Well-known CA certificate directory paths.
pub(crate) const KNOWN_CA_DIR_PATHS: &[&str] = &["/etc/ssl/certs"];

/// Check if a file looks like a PEM certificate file for trust store
/// loading: `.pem`, `.crt`, `.cer`, or OpenSSL hash-linked names
/// (`XXXXXXXX.N` with a single-digit extension).
fn is_pem_cert_file(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e,
        None => return false,
    };
    matches!(ext, "pem" | "crt" | "cer")
        || (ext.len() == 1 && ext.bytes().next().is_some_and(|b| b.is_ascii_digit()))
}

/// A set of trusted CA certificates, indexed by raw subject name so the
/// chain builder can look up candidate issuers directly.
pub struct TrustStore {
    anchors_by_subject: HashMap<Vec<u8>, Vec<Certificate>>,
    count: usize,
}

impl std::fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustStore")
            .field("count", &self.count)
            .finish()
    }
}

impl TrustStore {
    /// Create an empty trust store.
    pub fn new() -> Self {
        TrustStore {
            anchors_by_subject: HashMap::new(),
            count: 0,
        }
    }

    /// Load the system trust store.
    ///
    /// Checks, in order: the `SSL_CERT_FILE` environment variable, the
    /// bundle discovered by `openssl-probe`, well-known bundle paths,
    /// then `SSL_CERT_DIR`, the directory discovered by `openssl-probe`,
    /// and well-known certificate directories.
    pub fn system() -> Result<Self, CertpickError> {
        let mut store = TrustStore::new();

        if let Some(bundle_path) = find_system_ca_bundle() {
            let data = std::fs::read(&bundle_path)?;
            if store.add_pem_bundle(&data) > 0 {
                debug!(path = %bundle_path.display(), anchors = store.count, "loaded system CA bundle");
                return Ok(store);
            }
        }

        let probe = openssl_probe::probe();
        let dir_candidates = std::env::var("SSL_CERT_DIR")
            .ok()
            .into_iter()
            .chain(
                probe
                    .cert_dir
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned()),
            )
            .chain(KNOWN_CA_DIR_PATHS.iter().map(|s| (*s).to_string()));

        for dir in dir_candidates {
            if let Ok(added) = store.add_pem_directory(Path::new(&dir)) {
                if added > 0 {
                    debug!(dir = %dir, anchors = store.count, "loaded system CA directory");
                    return Ok(store);
                }
            }
        }

        Err(CertpickError::StoreError(
            "no system trust store found".into(),
        ))
    }

    /// Create a trust store from a PEM bundle (e.g., a CA certificates file).
    pub fn from_pem(pem_data: &[u8]) -> Self {
        let mut store = TrustStore::new();
        store.add_pem_bundle(pem_data);
        store
    }

    /// Create a trust store from a PEM file path.
    pub fn from_pem_file(path: &Path) -> Result<Self, CertpickError> {
        let data = std::fs::read(path).map_err(|e| {
            CertpickError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        Ok(Self::from_pem(&data))
    }

    /// Add a single anchor certificate.
    pub fn add_certificate(&mut self, cert: Certificate) {
        self.anchors_by_subject
            .entry(cert.subject_der().to_vec())
            .or_default()
            .push(cert);
        self.count += 1;
    }

    /// Add all certificates from a PEM bundle, skipping blocks that fail
    /// to parse (some bundles carry non-certificate entries). Returns the
    /// number added.
    pub fn add_pem_bundle(&mut self, pem_data: &[u8]) -> usize {
        let mut added = 0;
        for pem in util::pem_blocks(pem_data) {
            if !util::CERT_LABELS.contains(&pem.label.as_str()) {
                continue;
            }
            match Certificate::from_der(&pem.contents) {
                Ok(cert) => {
                    self.add_certificate(cert);
                    added += 1;
                }
                Err(error) => debug!(%error, "skipping unparsable trust anchor"),
            }
        }
        added
    }

    /// Load certificates from a directory of PEM files (like OpenSSL's
    /// `-CApath`). Returns the number added.
    pub fn add_pem_directory(&mut self, dir: &Path) -> Result<usize, CertpickError> {
        let mut total = 0;
        let entries = std::fs::read_dir(dir).map_err(|e| {
            CertpickError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", dir.display(), e),
            ))
        })?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_pem_cert_file(&path) {
                if let Ok(data) = std::fs::read(&path) {
                    total += self.add_pem_bundle(&data);
                }
            }
        }
        Ok(total)
    }

    /// Find anchors whose subject matches the given raw issuer name.
    pub(crate) fn find_issuers(&self, issuer_raw: &[u8]) -> Option<&Vec<Certificate>> {
        self.anchors_by_subject.get(issuer_raw)
    }

    /// Check if a certificate is in the trust store, matching by subject
    /// and DER content.
    pub fn contains(&self, cert: &Certificate) -> bool {
        self.anchors_by_subject
            .get(cert.subject_der())
            .is_some_and(|anchors| anchors.iter().any(|a| a.der() == cert.der()))
    }

    /// Number of anchors in the store.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for TrustStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the system CA bundle path (same location OpenSSL uses).
pub fn find_system_ca_bundle() -> Option<PathBuf> {
    // Environment variable first, matching OpenSSL behavior
    if let Ok(path) = std::env::var("SSL_CERT_FILE") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Some(p);
        }
    }

    let probe = openssl_probe::probe();
    if let Some(file) = probe.cert_file {
        let path = PathBuf::from(&file);
        if path.exists() {
            return Some(path);
        }
    }

    KNOWN_CA_BUNDLE_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}
