//! Candidate matching: pick the certificate to present for client
//! authentication from an ordered candidate collection.

use crate::cert::Certificate;
use crate::chain::{build_chain, CertificateChain};
use crate::issuer::IssuerNameSet;
use crate::trust::TrustStore;
use tracing::debug;

/// A matched candidate: its position in the candidate collection and the
/// chain built for it (whose leaf is the selected certificate).
#[derive(Debug, Clone)]
pub struct Selection {
    /// Index of the selected certificate in the candidate collection.
    pub index: usize,
    /// The chain built for the selected certificate, leaf first.
    pub chain: CertificateChain,
}

impl Selection {
    /// The selected certificate.
    pub fn certificate(&self) -> &Certificate {
        self.chain.leaf()
    }
}

/// Select a certificate from `candidates` against the server's issuer set.
///
/// A single-certificate collection is selected unconditionally — an
/// explicitly provided lone certificate is the caller's intent, issuer
/// membership notwithstanding. Otherwise candidates are tried in
/// collection order and the first whose chain contains an element issued
/// by an acceptable CA wins; an empty issuer set accepts the first
/// candidate outright. No scoring — first match is the tie-break.
///
/// The other candidates serve as the intermediates pool when building
/// each candidate's chain, so a collection loaded from one bundle can
/// carry its own chain material.
pub fn select_candidate(
    candidates: &[Certificate],
    issuers: &IssuerNameSet,
    trust: &TrustStore,
) -> Option<Selection> {
    if candidates.is_empty() {
        return None;
    }

    if let [only] = candidates {
        let chain = build_chain(only, &[], trust);
        debug!(subject = %only.subject(), "single candidate selected unconditionally");
        return Some(Selection { index: 0, chain });
    }

    for (index, candidate) in candidates.iter().enumerate() {
        let pool: Vec<Certificate> = candidates
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, c)| c.clone())
            .collect();
        let chain = build_chain(candidate, &pool, trust);
        if issuers.is_empty() || chain_matches(&chain, issuers) {
            debug!(
                subject = %candidate.subject(),
                index,
                chain_len = chain.len(),
                "candidate matched issuer set"
            );
            return Some(Selection { index, chain });
        }
    }

    None
}

/// A chain matches when any element's issuer DN is in the issuer set.
/// This covers both a leaf issued directly by an acceptable CA and a
/// chain passing through one, without requiring the CA certificate
/// itself to be locally present.
fn chain_matches(chain: &CertificateChain, issuers: &IssuerNameSet) -> bool {
    chain
        .certificates()
        .iter()
        .any(|cert| issuers.contains_dn(cert.issuer()))
}
