#![no_main]

use certpick_lib::{CertHandle, CertpickError, HandshakeContext, IssuerNameSet};
use libfuzzer_sys::fuzz_target;

/// Context fake that hands the fuzz input to the issuer extractor as a
/// series of raw name entries.
struct RawIssuers(Vec<Vec<u8>>);

impl HandshakeContext for RawIssuers {
    fn acceptable_issuers(&self) -> Vec<Vec<u8>> {
        self.0.clone()
    }

    fn add_extra_chain_cert(&mut self, _cert: CertHandle) -> Result<(), CertpickError> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    // Split the input into pseudo-entries so short and long name blobs
    // are both exercised. Extraction must never panic; unparsable
    // entries degrade to absence, not errors.
    let entries: Vec<Vec<u8>> = data.chunks(64).map(|c| c.to_vec()).collect();
    let ctx = RawIssuers(entries);
    let issuers = IssuerNameSet::from_context(&ctx);
    let _ = issuers.len();
    let _ = issuers.is_empty();
    for name in issuers.names() {
        let _ = issuers.contains(name);
    }
});
