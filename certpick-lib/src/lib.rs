//! certpick-lib: TLS client-certificate selection.
//!
//! When a TLS server requests a client certificate mid-handshake, the
//! engine driving the handshake invokes a selection callback with the
//! distinguished names of the certificate authorities it will accept.
//! This library implements that callback: it matches locally available
//! identities (a caller-supplied collection, or the personal certificate
//! store) against the issuer set, builds the selected certificate's
//! trust chain, and hands engine-compatible certificate and key handles
//! back across the boundary — reporting one of the three classic
//! sentinels (`1` certificate set, `0` none, `-1` suspend) and never
//! letting an error escape the callback.

mod cert;
mod chain;
mod engine;
mod issuer;
mod key;
mod matcher;
mod oid;
mod provider;
mod registry;
mod store;
mod trust;
mod util;

pub use cert::{load_identity_bundle, Certificate, DistinguishedName};
pub use chain::{build_chain, CertificateChain};
pub use engine::{
    CertHandle, HandshakeContext, CALLBACK_CERT_SET, CALLBACK_NO_CERT, CALLBACK_SUSPEND,
};
pub use issuer::IssuerNameSet;
pub use key::{extract_key, KeyAlgorithm, KeyHandle};
pub use matcher::{select_candidate, Selection};
pub use provider::{CallbackOutcome, ClientCertProvider};
pub use registry::{ProviderRegistry, ProviderToken};
pub use store::{ClientStore, PersonalStore, IDENTITY_DIR_ENV};
pub use trust::{find_system_ca_bundle, TrustStore};

/// Errors returned by certpick-lib.
#[derive(Debug, thiserror::Error)]
pub enum CertpickError {
    #[error("Failed to parse certificate: {0}")]
    ParseError(String),

    #[error("Invalid PEM format: {0}")]
    PemError(String),

    #[error("Invalid DER format: {0}")]
    DerError(String),

    #[error("Private key error: {0}")]
    KeyError(String),

    #[error("Certificate store error: {0}")]
    StoreError(String),

    #[error("TLS engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
