//! Store-backed candidate resolution for automatic mode.
//!
//! When the caller supplies no certificate collection, candidates come
//! from a read-only personal certificate store. The store is a
//! capability injected as a trait so tests can substitute a fake, and
//! the release discipline is explicit: every enumerated certificate that
//! is not the selected one goes back to the store exactly once.

use crate::cert::{load_identity_bundle, Certificate};
use crate::issuer::IssuerNameSet;
use crate::matcher::{select_candidate, Selection};
use crate::trust::TrustStore;
use crate::CertpickError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the personal store location.
pub const IDENTITY_DIR_ENV: &str = "CLIENT_IDENTITY_DIR";

/// Well-known personal-store directory paths, in order of preference.
pub(crate) const KNOWN_IDENTITY_DIR_PATHS: &[&str] = &["/etc/ssl/client", "/etc/pki/tls/client"];

/// A read-only source of client identities.
///
/// `certificates` transfers ownership of the entire enumeration to the
/// caller; the caller must hand every certificate it does not keep back
/// through `release`. Release consumes the certificate, so releasing the
/// same one twice is unrepresentable.
pub trait ClientStore {
    /// Enumerate the store's certificates, in stable store order.
    fn certificates(&self) -> Result<Vec<Certificate>, CertpickError>;

    /// Return an unselected certificate to the store for disposal.
    fn release(&self, certificate: Certificate);
}

/// Apply the matcher to a store's enumeration, releasing everything that
/// was not selected — on the match, no-match, and empty paths alike.
pub(crate) fn resolve_from_store(
    store: &dyn ClientStore,
    issuers: &IssuerNameSet,
    trust: &TrustStore,
) -> Result<Option<Selection>, CertpickError> {
    let certs = store.certificates()?;
    if certs.is_empty() {
        debug!("certificate store is empty");
        return Ok(None);
    }

    let selection = select_candidate(&certs, issuers, trust);
    let selected_index = selection.as_ref().map(|s| s.index);
    for (i, cert) in certs.into_iter().enumerate() {
        if Some(i) != selected_index {
            store.release(cert);
        }
        // The selected certificate's ownership moved into the Selection;
        // the enumeration's copy just drops.
    }
    Ok(selection)
}

/// The system personal certificate store: a directory of PEM identity
/// bundles (certificate followed by its private key).
///
/// The directory is discovered through [`IDENTITY_DIR_ENV`] and then
/// well-known paths, mirroring how the CA trust store is found.
#[derive(Debug, Clone)]
pub struct PersonalStore {
    dir: PathBuf,
}

impl PersonalStore {
    /// Open the default personal store.
    pub fn open_default() -> Result<Self, CertpickError> {
        if let Ok(dir) = std::env::var(IDENTITY_DIR_ENV) {
            let p = PathBuf::from(&dir);
            if p.is_dir() {
                return Ok(PersonalStore { dir: p });
            }
        }
        KNOWN_IDENTITY_DIR_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_dir())
            .map(|dir| PersonalStore { dir })
            .ok_or_else(|| CertpickError::StoreError("no personal certificate store found".into()))
    }

    /// Open the store at an explicit directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        PersonalStore { dir: dir.into() }
    }

    /// The backing directory.
    pub fn directory(&self) -> &Path {
        &self.dir
    }
}

impl ClientStore for PersonalStore {
    /// Enumerate identity bundles in file-name order (stable across
    /// runs, since selection is first-match-in-order). Files that do not
    /// contain a certificate are skipped, not errors.
    fn certificates(&self) -> Result<Vec<Certificate>, CertpickError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            CertpickError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", self.dir.display(), e),
            ))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && matches!(
                        path.extension().and_then(|e| e.to_str()),
                        Some("pem" | "crt" | "cer")
                    )
            })
            .collect();
        paths.sort();

        let mut certs = Vec::new();
        for path in paths {
            let Ok(data) = std::fs::read(&path) else {
                continue;
            };
            match load_identity_bundle(&data) {
                // The bundle's first certificate is the identity; any
                // rest is chain material, not a candidate of its own.
                Ok(mut bundle) => certs.push(bundle.swap_remove(0)),
                Err(error) => {
                    debug!(path = %path.display(), %error, "skipping unparsable identity bundle");
                }
            }
        }
        Ok(certs)
    }

    fn release(&self, certificate: Certificate) {
        // Store entries are process-local copies of on-disk identities;
        // dropping the copy is the release.
        drop(certificate);
    }
}
