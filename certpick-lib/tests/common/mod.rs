//! Shared fixtures and fakes for the integration tests.
//!
//! The PKI under `testdata/` is generated by `testdata/gen.sh`: one
//! hierarchy rooted at "Certpick Test Root CA" (with a three-deep
//! intermediate chain), a second root "Other Root CA" with its own
//! client certificate, and a standalone self-signed client certificate.

// Not every test binary uses every helper.
#![allow(dead_code)]

use certpick_lib::{CertHandle, Certificate, CertpickError, ClientStore, HandshakeContext, TrustStore};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub fn testdata(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
}

pub fn cert(name: &str) -> Certificate {
    Certificate::load(&testdata(name)).expect(name)
}

/// Load a certificate and attach its private key from a separate file.
pub fn identity(cert_name: &str, key_name: &str) -> Certificate {
    let mut cert = cert(cert_name);
    cert.attach_key_pem(&testdata(key_name)).expect(key_name);
    cert
}

/// Trust store anchored at both test roots.
pub fn test_trust() -> TrustStore {
    let mut trust = TrustStore::new();
    trust.add_pem_bundle(&testdata("root.pem"));
    trust.add_pem_bundle(&testdata("root2.pem"));
    trust
}

/// Handshake-context fake: serves a fixed acceptable-issuer list,
/// records every forwarded extra-chain handle, and can be told to fail
/// the Nth registration.
#[derive(Default)]
pub struct FakeContext {
    issuers: Vec<Vec<u8>>,
    pub added: Vec<CertHandle>,
    fail_on: Option<usize>,
}

impl FakeContext {
    /// No issuer constraint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acceptable issuers are the subjects of the given CA certificates,
    /// exactly as a server would send them (raw DER names).
    pub fn accepting(cas: &[&Certificate]) -> Self {
        FakeContext {
            issuers: cas.iter().map(|ca| ca.subject_der().to_vec()).collect(),
            ..Self::default()
        }
    }

    /// Raw issuer entries, for exercising unparsable input.
    pub fn with_raw_issuers(issuers: Vec<Vec<u8>>) -> Self {
        FakeContext {
            issuers,
            ..Self::default()
        }
    }

    /// Fail the registration call at `index` (0-based).
    pub fn fail_registration(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }
}

impl HandshakeContext for FakeContext {
    fn acceptable_issuers(&self) -> Vec<Vec<u8>> {
        self.issuers.clone()
    }

    fn add_extra_chain_cert(&mut self, cert: CertHandle) -> Result<(), CertpickError> {
        if self.fail_on == Some(self.added.len()) {
            return Err(CertpickError::Engine("forced registration failure".into()));
        }
        self.added.push(cert);
        Ok(())
    }
}

/// Store fake that records the subject of every released certificate, so
/// tests can assert each unselected enumeration entry is released
/// exactly once.
pub struct CountingStore {
    certs: Vec<Certificate>,
    released: Arc<Mutex<Vec<String>>>,
}

impl CountingStore {
    pub fn new(certs: Vec<Certificate>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let released = Arc::new(Mutex::new(Vec::new()));
        (
            CountingStore {
                certs,
                released: Arc::clone(&released),
            },
            released,
        )
    }
}

impl ClientStore for CountingStore {
    fn certificates(&self) -> Result<Vec<Certificate>, CertpickError> {
        Ok(self.certs.clone())
    }

    fn release(&self, certificate: Certificate) {
        self.released
            .lock()
            .expect("released log poisoned")
            .push(certificate.subject().to_oneline());
    }
}

/// Store fake whose enumeration panics, for the boundary-containment test.
pub struct PanickingStore;

impl ClientStore for PanickingStore {
    fn certificates(&self) -> Result<Vec<Certificate>, CertpickError> {
        panic!("store backend unavailable");
    }

    fn release(&self, _certificate: Certificate) {}
}
