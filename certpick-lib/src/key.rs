//! Private key extraction: produce an owned, engine-compatible key handle
//! from a certificate's attached key, polymorphic over the key algorithm.

use crate::cert::Certificate;
use crate::oid;
use std::sync::Arc;
use tracing::debug;
use x509_parser::der_parser::ber::BerObjectContent;
use x509_parser::der_parser::der::parse_der;
use zeroize::Zeroizing;

/// Key algorithm tag for an extracted private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
    EllipticCurve,
}

impl KeyAlgorithm {
    /// Short display name ("RSA" or "EC").
    pub fn name(self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::EllipticCurve => "EC",
        }
    }
}

impl std::fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An owned, engine-compatible private key handle.
///
/// Tagged by algorithm internally but presented to the engine as an
/// opaque DER reference. Duplication shares the underlying key bytes by
/// refcount — the material is never copied — and the bytes are wiped when
/// the last handle (or the source certificate) is dropped.
#[derive(Clone)]
pub struct KeyHandle {
    algorithm: KeyAlgorithm,
    der: Arc<Zeroizing<Vec<u8>>>,
}

impl KeyHandle {
    /// The key's algorithm.
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// DER encoding of the private key.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Whether the handle refers to non-empty key material.
    pub fn is_valid(&self) -> bool {
        !self.der.is_empty()
    }
}

impl std::fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose key bytes.
        f.debug_struct("KeyHandle")
            .field("algorithm", &self.algorithm)
            .field("der_len", &self.der.len())
            .finish()
    }
}

/// Extract an owned key handle from a certificate's attached private key.
///
/// Classification tries RSA first, then elliptic-curve. A certificate
/// with no key, an empty key, or a key of an unrecognized algorithm
/// yields `None` — "this certificate is unusable for client auth", a
/// normal outcome, not an error.
pub fn extract_key(cert: &Certificate) -> Option<KeyHandle> {
    let der = cert.shared_key()?;
    if der.is_empty() {
        debug!(subject = %cert.subject(), "attached private key is empty");
        return None;
    }
    let Some(algorithm) = classify_key(&der) else {
        debug!(
            subject = %cert.subject(),
            "private key is neither RSA nor elliptic-curve"
        );
        return None;
    };
    Some(KeyHandle { algorithm, der })
}

/// Determine the algorithm of a DER-encoded private key.
///
/// PKCS#8 keys carry an AlgorithmIdentifier and are classified by its
/// OID. Bare keys are classified structurally: PKCS#1 RSAPrivateKey
/// first, then SEC1 ECPrivateKey.
fn classify_key(der: &[u8]) -> Option<KeyAlgorithm> {
    if let Some(oid_str) = pkcs8_algorithm(der) {
        return match oid_str.as_str() {
            oid::RSA_ENCRYPTION => Some(KeyAlgorithm::Rsa),
            oid::EC_PUBLIC_KEY => Some(KeyAlgorithm::EllipticCurve),
            _ => None,
        };
    }
    if is_pkcs1_rsa(der) {
        Some(KeyAlgorithm::Rsa)
    } else if is_sec1_ec(der) {
        Some(KeyAlgorithm::EllipticCurve)
    } else {
        None
    }
}

/// Read the algorithm OID out of a PKCS#8 PrivateKeyInfo, if the input
/// has that shape (RFC 5208: version, AlgorithmIdentifier, privateKey).
fn pkcs8_algorithm(der: &[u8]) -> Option<String> {
    let (_, obj) = parse_der(der).ok()?;
    let fields = obj.as_sequence().ok()?;
    if fields.len() < 3 {
        return None;
    }
    if !matches!(fields.first()?.content, BerObjectContent::Integer(_)) {
        return None;
    }
    let algorithm = fields.get(1)?.as_sequence().ok()?;
    let oid = algorithm.first()?.as_oid().ok()?;
    Some(oid.to_id_string())
}

/// Structural check for a PKCS#1 RSAPrivateKey (RFC 8017 Appendix A.1.2):
/// a sequence of at least nine integers starting with version 0.
fn is_pkcs1_rsa(der: &[u8]) -> bool {
    let Ok((_, obj)) = parse_der(der) else {
        return false;
    };
    let Ok(fields) = obj.as_sequence() else {
        return false;
    };
    fields.len() >= 9
        && fields
            .iter()
            .all(|f| matches!(f.content, BerObjectContent::Integer(_)))
        && fields.first().and_then(|f| f.as_u32().ok()) == Some(0)
}

/// Structural check for a SEC1 ECPrivateKey (RFC 5915): version 1
/// followed by the private key octet string.
fn is_sec1_ec(der: &[u8]) -> bool {
    let Ok((_, obj)) = parse_der(der) else {
        return false;
    };
    let Ok(fields) = obj.as_sequence() else {
        return false;
    };
    fields.len() >= 2
        && fields.first().and_then(|f| f.as_u32().ok()) == Some(1)
        && matches!(
            fields.get(1).map(|f| &f.content),
            Some(BerObjectContent::OctetString(_))
        )
}
