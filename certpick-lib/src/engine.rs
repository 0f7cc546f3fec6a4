//! The boundary presented by the TLS engine: handshake context, native
//! certificate handles, and the sentinel return codes of the client
//! certificate callback.
//!
//! Nothing in this module performs selection; it defines the contract the
//! engine consumes. The engine side is deliberately a trait so tests (and
//! any embedding) can substitute their own handshake state.

use crate::cert::Certificate;
use crate::CertpickError;
use std::os::raw::c_int;
use std::sync::Arc;

/// Callback result: a certificate and key handle were populated.
pub const CALLBACK_CERT_SET: c_int = 1;
/// Callback result: no certificate; the handshake continues without
/// client authentication if the server permits it.
pub const CALLBACK_NO_CERT: c_int = 0;
/// Callback result: a recoverable assembly failure; the engine must treat
/// the handshake as failed for this attempt.
pub const CALLBACK_SUSPEND: c_int = -1;

/// The in-progress TLS handshake state presented by the engine.
///
/// The callback reads the server's acceptable-issuer list through this
/// trait and registers intermediate certificates as extra chain material
/// on it. Implementations own the native handshake state; the callback
/// never retains the context beyond a single invocation.
pub trait HandshakeContext {
    /// DER-encoded distinguished names of the certificate authorities the
    /// server will accept for client authentication. Empty when the
    /// server imposed no constraint (or sent none).
    fn acceptable_issuers(&self) -> Vec<Vec<u8>>;

    /// Register one intermediate certificate as extra chain material for
    /// the handshake. Ownership of the handle passes to the engine.
    fn add_extra_chain_cert(&mut self, cert: CertHandle) -> Result<(), CertpickError>;
}

/// An engine-compatible, owned duplicate of a certificate's DER encoding.
///
/// Duplication bumps a refcount on the shared encoding rather than
/// copying it, so a handle stays valid after the source [`Certificate`]
/// is dropped and dropping either side cannot corrupt the other.
#[derive(Clone)]
pub struct CertHandle {
    der: Arc<Vec<u8>>,
}

impl CertHandle {
    pub(crate) fn duplicate_from(cert: &Certificate) -> Self {
        CertHandle {
            der: cert.shared_der(),
        }
    }

    /// DER encoding of the certificate this handle refers to.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
}

impl std::fmt::Debug for CertHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertHandle")
            .field("der_len", &self.der.len())
            .finish()
    }
}
