//! Shared PEM and naming helpers.

use crate::oid;
use x509_parser::pem::Pem;

/// PEM block labels accepted as certificates.
pub(crate) const CERT_LABELS: &[&str] = &["CERTIFICATE", "TRUSTED CERTIFICATE", "X509 CERTIFICATE"];

/// PEM block labels accepted as private keys (PKCS#8, PKCS#1, SEC1).
pub(crate) const KEY_LABELS: &[&str] = &["PRIVATE KEY", "RSA PRIVATE KEY", "EC PRIVATE KEY"];

/// Check whether input looks like PEM rather than DER.
///
/// PEM input begins with `-----BEGIN` after any leading whitespace.
pub(crate) fn is_pem(input: &[u8]) -> bool {
    let start = input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(0);
    input.get(start..).is_some_and(|s| s.starts_with(b"-----BEGIN"))
}

/// Collect all parsable PEM blocks from a buffer, skipping malformed ones.
pub(crate) fn pem_blocks(input: &[u8]) -> Vec<Pem> {
    Pem::iter_from_buffer(input).flatten().collect()
}

/// Map a DN attribute OID to its short name (e.g., "CN", "O", "C").
///
/// Unknown attribute types fall back to the dotted-decimal OID string.
pub(crate) fn dn_short_name(oid_str: &str) -> String {
    match oid_str {
        oid::COMMON_NAME => "CN".into(),
        oid::SURNAME => "SN".into(),
        oid::SERIAL_NUMBER => "serialNumber".into(),
        oid::COUNTRY => "C".into(),
        oid::LOCALITY => "L".into(),
        oid::STATE_OR_PROVINCE => "ST".into(),
        oid::STREET_ADDRESS => "street".into(),
        oid::ORGANIZATION => "O".into(),
        oid::ORGANIZATIONAL_UNIT => "OU".into(),
        oid::TITLE => "title".into(),
        oid::POSTAL_CODE => "postalCode".into(),
        oid::GIVEN_NAME => "GN".into(),
        oid::EMAIL_ADDRESS => "emailAddress".into(),
        oid::DOMAIN_COMPONENT => "DC".into(),
        other => other.to_string(),
    }
}
