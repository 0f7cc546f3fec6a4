//! Acceptable-issuer extraction: the set of certificate-authority
//! distinguished names the server declared acceptable for client
//! authentication.

use crate::cert::DistinguishedName;
use crate::engine::HandshakeContext;
use std::collections::HashSet;
use tracing::debug;
use x509_parser::prelude::FromDer;
use x509_parser::x509::X509Name;

/// Deduplicated set of acceptable issuer names, in one-line DN form.
///
/// An empty set means the server imposed no issuer constraint: any
/// locally available certificate is eligible.
#[derive(Debug, Clone, Default)]
pub struct IssuerNameSet {
    names: HashSet<String>,
}

impl IssuerNameSet {
    /// The empty set (no issuer constraint).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from one-line DN strings.
    pub fn from_names<I>(names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        IssuerNameSet {
            names: names.into_iter().collect(),
        }
    }

    /// Read the acceptable-issuer list out of the handshake context.
    ///
    /// Entries that fail to parse as X.501 Names are skipped: an issuer
    /// constraint that cannot be read degrades to "no constraint", never
    /// to a hard error.
    pub fn from_context(ctx: &dyn HandshakeContext) -> Self {
        let mut names = HashSet::new();
        for der in ctx.acceptable_issuers() {
            match X509Name::from_der(&der) {
                Ok((_, name)) => {
                    names.insert(DistinguishedName::from_x509_name(&name).to_oneline());
                }
                Err(error) => {
                    debug!(%error, "skipping unparsable acceptable-issuer entry");
                }
            }
        }
        IssuerNameSet { names }
    }

    /// Whether the set contains the given distinguished name.
    pub fn contains_dn(&self, dn: &DistinguishedName) -> bool {
        self.names.contains(&dn.to_oneline())
    }

    /// Whether the set contains the given one-line DN string.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Whether the server imposed no issuer constraint.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of distinct acceptable issuers.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Iterate the issuer names (unordered).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
