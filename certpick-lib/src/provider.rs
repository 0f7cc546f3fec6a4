//! The client-certificate callback adapter.
//!
//! [`ClientCertProvider`] is the single entry point the TLS engine
//! invokes mid-handshake when the server requests a client certificate.
//! One provider serves one connection attempt; it owns every handle it
//! duplicates for the engine until it is disposed.

use crate::cert::Certificate;
use crate::engine::{
    CertHandle, HandshakeContext, CALLBACK_CERT_SET, CALLBACK_NO_CERT, CALLBACK_SUSPEND,
};
use crate::issuer::IssuerNameSet;
use crate::key::{extract_key, KeyHandle};
use crate::matcher::{select_candidate, Selection};
use crate::store::{resolve_from_store, ClientStore};
use crate::trust::TrustStore;
use crate::CertpickError;
use std::os::raw::c_int;
use tracing::{debug, warn};

/// Terminal outcome of one callback invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// A certificate and key handle were populated.
    CertificateSet,
    /// No eligible certificate; the handshake proceeds without client
    /// authentication if the server permits it.
    NoCertificateSet,
    /// A recoverable assembly failure; the engine must abort this
    /// handshake attempt.
    SuspendHandshake,
}

impl CallbackOutcome {
    /// The sentinel integer understood by the engine.
    pub fn sentinel(self) -> c_int {
        match self {
            CallbackOutcome::CertificateSet => CALLBACK_CERT_SET,
            CallbackOutcome::NoCertificateSet => CALLBACK_NO_CERT,
            CallbackOutcome::SuspendHandshake => CALLBACK_SUSPEND,
        }
    }
}

/// Where candidates come from.
enum CandidateSource {
    /// Caller-supplied ordered collection ("manual mode").
    Supplied(Vec<Certificate>),
    /// System personal store, queried at callback time ("automatic mode").
    Store(Box<dyn ClientStore>),
}

/// Handles duplicated for the engine during one invocation. The provider
/// keeps them alive until disposal or the next invocation replaces them.
struct HeldHandles {
    certificate: CertHandle,
    key: KeyHandle,
    extra_chain: Vec<CertHandle>,
}

/// Selects a client certificate when the engine asks for one.
///
/// Created once per TLS connection attempt that may need client
/// authentication, registered with the engine (see
/// [`ProviderRegistry`](crate::ProviderRegistry)), and disposed exactly
/// once when the attempt concludes, whatever the outcome.
pub struct ClientCertProvider {
    source: CandidateSource,
    trust: TrustStore,
    held: Option<HeldHandles>,
    disposed: bool,
    last_outcome: Option<CallbackOutcome>,
}

impl std::fmt::Debug for ClientCertProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match &self.source {
            CandidateSource::Supplied(certs) => format!("supplied({})", certs.len()),
            CandidateSource::Store(_) => "automatic".into(),
        };
        f.debug_struct("ClientCertProvider")
            .field("mode", &mode)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl ClientCertProvider {
    /// Manual mode: select from an explicit ordered collection.
    pub fn with_certificates(certificates: Vec<Certificate>, trust: TrustStore) -> Self {
        ClientCertProvider {
            source: CandidateSource::Supplied(certificates),
            trust,
            held: None,
            disposed: false,
            last_outcome: None,
        }
    }

    /// Automatic mode: select from a personal certificate store.
    pub fn automatic(store: Box<dyn ClientStore>, trust: TrustStore) -> Self {
        ClientCertProvider {
            source: CandidateSource::Store(store),
            trust,
            held: None,
            disposed: false,
            last_outcome: None,
        }
    }

    /// The callback proper. Invoked by the engine (through the
    /// registry) when the server requests a client certificate.
    ///
    /// On `CALLBACK_CERT_SET` both output slots hold valid handles;
    /// otherwise both are left empty. Every internal failure is resolved
    /// to a sentinel here — nothing escapes to the engine.
    pub fn select_client_certificate(
        &mut self,
        context: Option<&mut dyn HandshakeContext>,
        cert_out: &mut Option<CertHandle>,
        key_out: &mut Option<KeyHandle>,
    ) -> c_int {
        *cert_out = None;
        *key_out = None;
        let outcome = self.run(context, cert_out, key_out);
        self.last_outcome = Some(outcome);
        outcome.sentinel()
    }

    fn run(
        &mut self,
        context: Option<&mut dyn HandshakeContext>,
        cert_out: &mut Option<CertHandle>,
        key_out: &mut Option<KeyHandle>,
    ) -> CallbackOutcome {
        if self.disposed {
            warn!("client certificate callback invoked on a disposed provider");
            return CallbackOutcome::NoCertificateSet;
        }

        // A renegotiation re-enters here; handles from the previous
        // invocation are replaced, never accumulated.
        self.held = None;

        let Some(context) = context else {
            debug!("handshake context is null, continuing without a client certificate");
            return CallbackOutcome::NoCertificateSet;
        };

        let issuers = IssuerNameSet::from_context(context);
        debug!(acceptable_issuers = issuers.len(), "issuer set extracted");

        let selection = match self.resolve(&issuers) {
            Ok(Some(selection)) => selection,
            Ok(None) => {
                debug!("no eligible client certificate");
                return CallbackOutcome::NoCertificateSet;
            }
            Err(error) => {
                debug!(%error, "candidate resolution failed, continuing without a client certificate");
                return CallbackOutcome::NoCertificateSet;
            }
        };

        let leaf = selection.chain.leaf();
        let Some(key) = extract_key(leaf) else {
            debug!(
                subject = %leaf.subject(),
                "selected certificate has no usable private key"
            );
            return CallbackOutcome::NoCertificateSet;
        };

        // Forward intermediates to the engine. A single failed
        // registration aborts the attempt: a partially registered chain
        // would leave the handshake in an inconsistent state.
        let mut extra_chain = Vec::with_capacity(selection.chain.extra_chain().len());
        for cert in selection.chain.extra_chain() {
            let handle = CertHandle::duplicate_from(cert);
            extra_chain.push(handle.clone());
            if let Err(error) = context.add_extra_chain_cert(handle) {
                warn!(
                    subject = %cert.subject(),
                    %error,
                    "extra chain registration failed, suspending handshake"
                );
                // extra_chain drops here, freeing every duplicate made so far
                return CallbackOutcome::SuspendHandshake;
            }
        }

        let certificate = CertHandle::duplicate_from(leaf);
        debug!(
            subject = %leaf.subject(),
            key_algorithm = %key.algorithm(),
            extra_chain = extra_chain.len(),
            "client certificate selected"
        );
        *cert_out = Some(certificate.clone());
        *key_out = Some(key.clone());
        self.held = Some(HeldHandles {
            certificate,
            key,
            extra_chain,
        });
        CallbackOutcome::CertificateSet
    }

    fn resolve(&self, issuers: &IssuerNameSet) -> Result<Option<Selection>, CertpickError> {
        match &self.source {
            CandidateSource::Supplied(certs) => Ok(select_candidate(certs, issuers, &self.trust)),
            CandidateSource::Store(store) => resolve_from_store(store.as_ref(), issuers, &self.trust),
        }
    }

    /// Free every handle this provider produced. Idempotent: a second
    /// call is a guarded no-op, so a double dispose can never double-free
    /// the underlying handles.
    pub fn dispose(&mut self) {
        if self.disposed {
            debug!("provider disposed more than once");
            return;
        }
        self.disposed = true;
        self.held = None;
    }

    /// Whether the provider has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Outcome of the most recent invocation, if any.
    pub fn last_outcome(&self) -> Option<CallbackOutcome> {
        self.last_outcome
    }

    /// The certificate handle produced by the last successful
    /// invocation, while still held.
    pub fn held_certificate(&self) -> Option<&CertHandle> {
        self.held.as_ref().map(|h| &h.certificate)
    }

    /// The key handle produced by the last successful invocation, while
    /// still held.
    pub fn held_key(&self) -> Option<&KeyHandle> {
        self.held.as_ref().map(|h| &h.key)
    }

    /// Extra-chain handles registered with the engine during the last
    /// successful invocation.
    pub fn held_extra_chain(&self) -> &[CertHandle] {
        self.held
            .as_ref()
            .map(|h| h.extra_chain.as_slice())
            .unwrap_or(&[])
    }
}
