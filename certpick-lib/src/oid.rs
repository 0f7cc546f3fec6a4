//! Centralized OID string constants used throughout certpick-lib.
//!
//! Object Identifiers (OIDs) are defined by ITU-T X.660 and referenced
//! extensively in RFC 5280 (X.509), RFC 3279 (algorithms), and RFC 5480
//! (ECC).  Grouping them here avoids magic strings scattered across
//! modules and gives each OID a readable name.

// ── X.509 Distinguished Name attributes (RFC 4519 / X.520) ──────────────

pub const COMMON_NAME: &str = "2.5.4.3";
pub const SURNAME: &str = "2.5.4.4";
pub const SERIAL_NUMBER: &str = "2.5.4.5";
pub const COUNTRY: &str = "2.5.4.6";
pub const LOCALITY: &str = "2.5.4.7";
pub const STATE_OR_PROVINCE: &str = "2.5.4.8";
pub const STREET_ADDRESS: &str = "2.5.4.9";
pub const ORGANIZATION: &str = "2.5.4.10";
pub const ORGANIZATIONAL_UNIT: &str = "2.5.4.11";
pub const TITLE: &str = "2.5.4.12";
pub const POSTAL_CODE: &str = "2.5.4.17";
pub const GIVEN_NAME: &str = "2.5.4.42";
pub const EMAIL_ADDRESS: &str = "1.2.840.113549.1.9.1"; // PKCS#9
pub const DOMAIN_COMPONENT: &str = "0.9.2342.19200300.100.1.25";

// ── Private key algorithms (RFC 3279 / RFC 5480) ─────────────────────────

pub const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
pub const EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
