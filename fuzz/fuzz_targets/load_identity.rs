#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Identity loading must never panic, regardless of input.
    if let Ok(certs) = certpick_lib::load_identity_bundle(data) {
        for cert in &certs {
            // Exercise accessors and key classification
            let _ = cert.subject().to_oneline();
            let _ = cert.issuer().to_oneline();
            let _ = cert.subject_der();
            let _ = cert.issuer_der();
            let _ = cert.is_self_signed();
            let _ = certpick_lib::extract_key(cert);
        }

        // Exercise chain building against an empty anchor set
        if let Some((leaf, pool)) = certs.split_first() {
            let trust = certpick_lib::TrustStore::new();
            let chain = certpick_lib::build_chain(leaf, pool, &trust);
            let _ = chain.extra_chain();
            let _ = chain.is_anchored();
        }
    }
});
