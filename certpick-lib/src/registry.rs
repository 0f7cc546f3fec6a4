//! Provider registration: the stable identity native code holds.
//!
//! The engine cannot hold a reference into a movable Rust object across
//! the handshake, so providers live in an explicit table and the engine
//! (via the owning connection) holds an opaque token. Invocation goes
//! through the table, which is also the last line of defense: no panic
//! may cross the callback boundary, so the provider call runs under
//! `catch_unwind`.

use crate::engine::{CertHandle, HandshakeContext, CALLBACK_NO_CERT};
use crate::key::KeyHandle;
use crate::provider::ClientCertProvider;
use std::collections::HashMap;
use std::os::raw::c_int;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// Opaque, pointer-sized identity for a registered provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderToken(u64);

/// Table of live providers, keyed by token.
///
/// Owned by the connection layer; one registration per connection
/// attempt. Releasing a token disposes the provider and is required on
/// every teardown path — there is no implicit finalization.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<u64, ClientCertProvider>,
    next_token: u64,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("registered", &self.providers.len())
            .finish()
    }
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider for the duration of a handshake attempt.
    pub fn register(&mut self, provider: ClientCertProvider) -> ProviderToken {
        self.next_token += 1;
        let token = ProviderToken(self.next_token);
        self.providers.insert(token.0, provider);
        debug!(token = token.0, "client certificate provider registered");
        token
    }

    /// Borrow a registered provider.
    pub fn provider(&self, token: ProviderToken) -> Option<&ClientCertProvider> {
        self.providers.get(&token.0)
    }

    /// Invoke the callback for the provider behind `token`.
    ///
    /// Unknown tokens answer `CALLBACK_NO_CERT`. A panic inside the
    /// provider is contained here, both output slots are cleared, and
    /// the handshake continues without a client certificate — an error
    /// must never propagate across the callback boundary.
    pub fn invoke(
        &mut self,
        token: ProviderToken,
        context: Option<&mut dyn HandshakeContext>,
        cert_out: &mut Option<CertHandle>,
        key_out: &mut Option<KeyHandle>,
    ) -> c_int {
        let Some(provider) = self.providers.get_mut(&token.0) else {
            warn!(token = token.0, "callback invoked with an unknown provider token");
            *cert_out = None;
            *key_out = None;
            return CALLBACK_NO_CERT;
        };

        // Reborrow the output slots so the closure does not consume them;
        // the panic arm below must still be able to clear them.
        let result = catch_unwind(AssertUnwindSafe(|| {
            provider.select_client_certificate(context, &mut *cert_out, &mut *key_out)
        }));
        match result {
            Ok(sentinel) => sentinel,
            Err(_) => {
                *cert_out = None;
                *key_out = None;
                warn!(
                    token = token.0,
                    "certificate selection panicked, continuing without a client certificate"
                );
                CALLBACK_NO_CERT
            }
        }
    }

    /// Release a registration: dispose the provider and drop it from the
    /// table. Returns false (and does nothing) for an unknown or already
    /// released token, so a double release cannot touch freed handles.
    pub fn release(&mut self, token: ProviderToken) -> bool {
        match self.providers.remove(&token.0) {
            Some(mut provider) => {
                provider.dispose();
                true
            }
            None => {
                debug!(
                    token = token.0,
                    "release of an unknown or already released provider token"
                );
                false
            }
        }
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry has no live registrations.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
