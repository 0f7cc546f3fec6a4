//! Certificate data types and PEM/DER loading.

use crate::util;
use crate::CertpickError;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use x509_parser::prelude::*;
use zeroize::Zeroizing;

/// Distinguished name with ordered components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistinguishedName {
    /// Ordered list of (attribute_type, value) pairs.
    /// Attribute types use short names where known (e.g., "CN", "O", "C").
    pub components: Vec<(String, String)>,
}

impl DistinguishedName {
    /// Format as a comma-separated one-line string matching OpenSSL's default format.
    /// Example: "C = US, O = Org, CN = example.com"
    ///
    /// Values containing commas, equals signs, or backslashes are escaped
    /// to prevent ambiguous output.
    pub fn to_oneline(&self) -> String {
        let mut result = String::new();
        for (i, (k, v)) in self.components.iter().enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            result.push_str(k);
            result.push_str(" = ");
            for ch in v.chars() {
                match ch {
                    '\\' => result.push_str("\\\\"),
                    ',' => result.push_str("\\,"),
                    '=' => result.push_str("\\="),
                    _ => result.push(ch),
                }
            }
        }
        result
    }

    pub(crate) fn from_x509_name(name: &X509Name) -> Self {
        let mut components = Vec::new();
        for rdn in name.iter() {
            for attr in rdn.iter() {
                let key = util::dn_short_name(&attr.attr_type().to_id_string());
                let value = attr.as_str().unwrap_or("<binary>").to_string();
                components.push((key, value));
            }
        }
        DistinguishedName { components }
    }
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_oneline())
    }
}

/// An X.509 certificate held for client authentication.
///
/// The DER encoding is shared behind a refcount, so clones and the
/// engine-facing handles duplicated from it never copy the underlying
/// bytes. A certificate optionally carries its private key (DER bytes,
/// wiped on last drop); the key algorithm is not interpreted here — that
/// is the key extractor's job.
#[derive(Clone)]
pub struct Certificate {
    der: Arc<Vec<u8>>,
    subject: DistinguishedName,
    issuer: DistinguishedName,
    raw_subject: Vec<u8>,
    raw_issuer: Vec<u8>,
    self_signed: bool,
    key: Option<Arc<Zeroizing<Vec<u8>>>>,
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject.to_oneline())
            .field("issuer", &self.issuer.to_oneline())
            .field("has_private_key", &self.key.is_some())
            .finish()
    }
}

impl Certificate {
    /// Load a certificate from PEM or DER (auto-detected).
    ///
    /// If the input begins with `-----BEGIN` (after stripping whitespace),
    /// it is treated as PEM. Otherwise it is treated as DER.
    pub fn load(input: &[u8]) -> Result<Self, CertpickError> {
        if input.is_empty() {
            return Err(CertpickError::ParseError("empty input".into()));
        }
        if util::is_pem(input) {
            Self::from_pem(input)
        } else {
            Self::from_der(input)
        }
    }

    /// Load a certificate from the first CERTIFICATE block of a PEM input.
    pub fn from_pem(input: &[u8]) -> Result<Self, CertpickError> {
        let (_, pem) = x509_parser::pem::parse_x509_pem(input)
            .map_err(|e| CertpickError::PemError(format!("{}", e)))?;
        if !util::CERT_LABELS.contains(&pem.label.as_str()) {
            return Err(CertpickError::PemError(format!(
                "expected CERTIFICATE, got {}",
                pem.label
            )));
        }
        Self::from_der(&pem.contents)
    }

    /// Load a certificate from DER bytes.
    pub fn from_der(input: &[u8]) -> Result<Self, CertpickError> {
        let (remaining, x509) = X509Certificate::from_der(input)
            .map_err(|e| CertpickError::DerError(format!("{}", e)))?;

        // Keep only the actual certificate bytes, not any trailing data,
        // so the engine-facing duplicate is a clean encoding.
        let cert_len = input.len() - remaining.len();
        let cert_der = input.get(..cert_len).unwrap_or(input);

        let raw_subject = x509.subject().as_raw().to_vec();
        let raw_issuer = x509.issuer().as_raw().to_vec();
        let self_signed = raw_subject == raw_issuer && x509.verify_signature(None).is_ok();

        Ok(Certificate {
            subject: DistinguishedName::from_x509_name(x509.subject()),
            issuer: DistinguishedName::from_x509_name(x509.issuer()),
            raw_subject,
            raw_issuer,
            self_signed,
            der: Arc::new(cert_der.to_vec()),
            key: None,
        })
    }

    /// Attach a private key from a PEM input.
    ///
    /// Accepts PKCS#8 (`PRIVATE KEY`), PKCS#1 (`RSA PRIVATE KEY`), and
    /// SEC1 (`EC PRIVATE KEY`) blocks; the first key block found wins.
    pub fn attach_key_pem(&mut self, input: &[u8]) -> Result<(), CertpickError> {
        for pem in util::pem_blocks(input) {
            if util::KEY_LABELS.contains(&pem.label.as_str()) {
                self.attach_key_der(pem.contents);
                return Ok(());
            }
        }
        Err(CertpickError::KeyError("no private key block found".into()))
    }

    /// Attach a DER-encoded private key. The bytes are wiped when the last
    /// reference (certificate or extracted key handle) is dropped.
    pub fn attach_key_der(&mut self, der: Vec<u8>) {
        self.key = Some(Arc::new(Zeroizing::new(der)));
    }

    /// Subject distinguished name.
    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    /// Issuer distinguished name.
    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    /// DER encoding of the certificate.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Raw DER encoding of the subject Name, as sent in CA name lists.
    pub fn subject_der(&self) -> &[u8] {
        &self.raw_subject
    }

    /// Raw DER encoding of the issuer Name.
    pub fn issuer_der(&self) -> &[u8] {
        &self.raw_issuer
    }

    /// Whether the certificate is self-signed (subject equals issuer and
    /// the signature verifies against its own public key).
    pub fn is_self_signed(&self) -> bool {
        self.self_signed
    }

    /// Whether a private key is attached.
    pub fn has_private_key(&self) -> bool {
        self.key.is_some()
    }

    pub(crate) fn shared_der(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.der)
    }

    pub(crate) fn shared_key(&self) -> Option<Arc<Zeroizing<Vec<u8>>>> {
        self.key.as_ref().map(Arc::clone)
    }
}

/// Load an identity bundle: certificates plus an optional private key from
/// one input.
///
/// PEM inputs may interleave certificate and key blocks in any order; the
/// first key block is attached to the first certificate. DER inputs are
/// treated as a single certificate without a key. Returns the certificates
/// in input order.
pub fn load_identity_bundle(input: &[u8]) -> Result<Vec<Certificate>, CertpickError> {
    if input.is_empty() {
        return Err(CertpickError::ParseError("empty input".into()));
    }
    if !util::is_pem(input) {
        return Ok(vec![Certificate::from_der(input)?]);
    }

    let mut certs: Vec<Certificate> = Vec::new();
    let mut key: Option<Vec<u8>> = None;
    for pem in util::pem_blocks(input) {
        let label = pem.label.as_str();
        if util::CERT_LABELS.contains(&label) {
            match Certificate::from_der(&pem.contents) {
                Ok(cert) => certs.push(cert),
                Err(error) => debug!(%error, "skipping unparsable certificate block"),
            }
        } else if util::KEY_LABELS.contains(&label) {
            if key.is_none() {
                key = Some(pem.contents);
            } else {
                debug!("ignoring additional private key block in identity bundle");
            }
        }
    }

    let Some(first) = certs.first_mut() else {
        return Err(CertpickError::ParseError(
            "no certificate in identity bundle".into(),
        ));
    };
    if let Some(der) = key {
        first.attach_key_der(der);
    }
    Ok(certs)
}
