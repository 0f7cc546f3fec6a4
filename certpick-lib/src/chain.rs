//! Trust chain construction via DFS path finding.
//!
//! Given a selected leaf certificate and a pool of locally available
//! intermediates, builds an ordered chain from leaf toward a trust
//! anchor using depth-first search with backtracking. Chain building is
//! purely structural — signatures and name linkage — with no
//! application-policy checks.

use crate::cert::Certificate;
use crate::trust::TrustStore;
use x509_parser::prelude::*;

/// Maximum chain depth to prevent infinite loops during chain building.
pub(crate) const MAX_CHAIN_DEPTH: usize = 32;

/// An ordered trust chain, leaf first.
///
/// When a trust anchor was resolved locally, the chain ends with that
/// root; otherwise it ends at the deepest intermediate that could be
/// linked. A chain always contains at least the leaf.
#[derive(Debug, Clone)]
pub struct CertificateChain {
    certs: Vec<Certificate>,
    anchored: bool,
}

impl CertificateChain {
    /// All chain elements, leaf first.
    pub fn certificates(&self) -> &[Certificate] {
        &self.certs
    }

    /// The selected certificate itself.
    pub fn leaf(&self) -> &Certificate {
        // Construction guarantees at least the leaf element.
        &self.certs[0]
    }

    /// Number of chain elements (at least 1).
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    /// Whether the chain has no elements. Construction always includes
    /// the leaf, so this is false for any built chain.
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// Whether the chain terminates at a trust anchor.
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// The elements to forward to the engine as extra chain material:
    /// everything except the leaf and, when the chain terminates in a
    /// self-signed root, that root.
    pub fn extra_chain(&self) -> &[Certificate] {
        let mut extra = self.certs.get(1..).unwrap_or(&[]);
        if extra.last().is_some_and(Certificate::is_self_signed) {
            extra = extra.get(..extra.len() - 1).unwrap_or(&[]);
        }
        extra
    }
}

/// Build a chain from `leaf` toward a trust anchor.
///
/// Tries multiple paths through `intermediates` via backtracking when
/// there are cross-signed or duplicate candidates. If no path reaches an
/// anchor, the deepest linkable path is returned; at minimum the chain
/// contains the leaf alone. Never fails: an unresolvable chain degrades,
/// it does not error.
pub fn build_chain(
    leaf: &Certificate,
    intermediates: &[Certificate],
    trust: &TrustStore,
) -> CertificateChain {
    if leaf.is_self_signed() {
        return CertificateChain {
            anchored: trust.contains(leaf),
            certs: vec![leaf.clone()],
        };
    }

    let parsed = match X509Certificate::from_der(leaf.der()) {
        Ok((_, x509)) => x509,
        Err(_) => {
            return CertificateChain {
                certs: vec![leaf.clone()],
                anchored: false,
            }
        }
    };

    let mut best = vec![leaf.clone()];
    let mut current = vec![leaf.clone()];
    let mut used = vec![false; intermediates.len()];
    let anchored = dfs_build(&parsed, &mut current, &mut used, intermediates, trust, &mut best);

    CertificateChain {
        certs: best,
        anchored,
    }
}

/// DFS recursive helper. Returns true if the chain in `best` terminates
/// at a trust anchor; otherwise `best` holds the deepest path seen.
#[allow(clippy::indexing_slicing)] // used[idx] safe: idx from intermediates.iter().enumerate(), same len
fn dfs_build(
    current_x509: &X509Certificate,
    chain: &mut Vec<Certificate>,
    used: &mut [bool],
    intermediates: &[Certificate],
    trust: &TrustStore,
    best: &mut Vec<Certificate>,
) -> bool {
    let issuer_raw = current_x509.issuer().as_raw();

    // Chain terminates here if the issuer is a trust anchor.
    if let Some(anchors) = trust.find_issuers(issuer_raw) {
        for anchor in anchors {
            let Ok((_, root)) = X509Certificate::from_der(anchor.der()) else {
                continue;
            };
            if current_x509.verify_signature(Some(root.public_key())).is_ok() {
                *best = chain.clone();
                // Append the resolved root unless it is already the last
                // element (a self-signed intermediate that is itself trusted).
                if best.last().map(Certificate::der) != Some(anchor.der()) {
                    best.push(anchor.clone());
                }
                return true;
            }
        }
    }

    if chain.len() >= MAX_CHAIN_DEPTH {
        return false;
    }

    // Try each unused intermediate as the next link.
    for (idx, cand) in intermediates.iter().enumerate() {
        if used[idx] {
            continue;
        }
        let Ok((_, cand_x509)) = X509Certificate::from_der(cand.der()) else {
            continue;
        };
        if cand_x509.subject().as_raw() != issuer_raw {
            continue;
        }
        if current_x509
            .verify_signature(Some(cand_x509.public_key()))
            .is_err()
        {
            continue;
        }

        used[idx] = true;
        chain.push(cand.clone());

        if dfs_build(&cand_x509, chain, used, intermediates, trust, best) {
            return true;
        }
        if chain.len() > best.len() {
            *best = chain.clone();
        }

        chain.pop();
        used[idx] = false;
    }

    false
}
