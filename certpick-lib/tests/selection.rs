//! Selection scenarios: issuer extraction, candidate matching, chain
//! construction, and the callback adapter's sentinel mapping.

mod common;

use certpick_lib::{
    build_chain, select_candidate, CallbackOutcome, Certificate, ClientCertProvider,
    IssuerNameSet, CALLBACK_CERT_SET, CALLBACK_NO_CERT,
};
use common::{cert, identity, test_trust, FakeContext};

fn invoke(
    provider: &mut ClientCertProvider,
    ctx: &mut FakeContext,
) -> (
    i32,
    Option<certpick_lib::CertHandle>,
    Option<certpick_lib::KeyHandle>,
) {
    let mut cert_out = None;
    let mut key_out = None;
    let rc = provider.select_client_certificate(Some(ctx), &mut cert_out, &mut key_out);
    (rc, cert_out, key_out)
}

// ---- Issuer extraction ----

#[test]
fn issuer_set_deduplicates_names() {
    let root = cert("root.pem");
    let root2 = cert("root2.pem");
    let ctx = FakeContext::accepting(&[&root, &root2, &root]);
    let issuers = IssuerNameSet::from_context(&ctx);
    assert_eq!(issuers.len(), 2);
    assert!(issuers.contains_dn(root.subject()));
    assert!(issuers.contains_dn(root2.subject()));
}

#[test]
fn issuer_set_skips_unparsable_entries() {
    let root = cert("root.pem");
    let ctx = FakeContext::with_raw_issuers(vec![
        b"not a DER name".to_vec(),
        root.subject_der().to_vec(),
        Vec::new(),
    ]);
    let issuers = IssuerNameSet::from_context(&ctx);
    assert_eq!(issuers.len(), 1);
    assert!(issuers.contains_dn(root.subject()));
}

#[test]
fn missing_issuer_list_degrades_to_no_constraint() {
    let ctx = FakeContext::new();
    let issuers = IssuerNameSet::from_context(&ctx);
    assert!(issuers.is_empty());
}

// ---- Chain building ----

#[test]
fn chain_reaches_root_through_intermediate() {
    let leaf = cert("rsa-client.pem");
    let intermediate = cert("intermediate.pem");
    let chain = build_chain(&leaf, &[intermediate.clone()], &test_trust());
    assert!(chain.is_anchored());
    assert_eq!(chain.len(), 3);
    assert_eq!(chain.leaf().subject(), leaf.subject());
    // Extra chain: intermediate only — leaf and self-signed root excluded.
    let extra = chain.extra_chain();
    assert_eq!(extra.len(), 1);
    assert_eq!(extra[0].subject(), intermediate.subject());
}

#[test]
fn chain_without_local_intermediates_is_leaf_only() {
    let leaf = cert("rsa-client.pem");
    let chain = build_chain(&leaf, &[], &test_trust());
    assert!(!chain.is_anchored());
    assert_eq!(chain.len(), 1);
    assert!(chain.extra_chain().is_empty());
}

#[test]
fn self_signed_leaf_chain_has_no_extra_material() {
    let leaf = cert("self-client.pem");
    let chain = build_chain(&leaf, &[], &test_trust());
    assert_eq!(chain.len(), 1);
    assert!(chain.extra_chain().is_empty());
}

#[test]
fn chain_orders_intermediates_leaf_to_root() {
    let leaf = cert("deep-client.pem");
    let pool = vec![
        // Deliberately shuffled relative to chain order.
        cert("intermediate.pem"),
        cert("intermediate3.pem"),
        cert("intermediate2.pem"),
    ];
    let chain = build_chain(&leaf, &pool, &test_trust());
    assert!(chain.is_anchored());
    let subjects: Vec<String> = chain
        .certificates()
        .iter()
        .map(|c| c.subject().to_oneline())
        .collect();
    assert_eq!(subjects.len(), 5);
    assert!(subjects[0].contains("deep.client.test"));
    assert!(subjects[1].contains("Intermediate CA 3"));
    assert!(subjects[2].contains("Intermediate CA 2"));
    assert!(subjects[3].ends_with("Certpick Test Intermediate CA"));
    assert!(subjects[4].contains("Root CA"));
    assert_eq!(chain.extra_chain().len(), 3);
}

// ---- Candidate matching ----

#[test]
fn single_candidate_selected_even_when_issuer_set_excludes_it() {
    let candidates = vec![identity("self-client.pem", "self-client.key")];
    let root2 = cert("root2.pem");
    let issuers = IssuerNameSet::from_names([root2.subject().to_oneline()]);
    let selection = select_candidate(&candidates, &issuers, &test_trust())
        .expect("single candidate must always be selected");
    assert_eq!(selection.index, 0);
}

#[test]
fn first_match_in_collection_order_wins() {
    // Both leaves chain to the same root; the first stays first.
    let candidates = vec![
        identity("rsa-client.pem", "rsa-client.key"),
        identity("ec-client.pem", "ec-client.key"),
        cert("intermediate.pem"),
    ];
    let root = cert("root.pem");
    let issuers = IssuerNameSet::from_names([root.subject().to_oneline()]);
    let selection = select_candidate(&candidates, &issuers, &test_trust()).expect("match");
    assert_eq!(selection.index, 0);
}

#[test]
fn third_candidate_selected_when_only_its_issuer_is_acceptable() {
    let candidates = vec![
        identity("rsa-client.pem", "rsa-client.key"),
        identity("ec-client.pem", "ec-client.key"),
        identity("other-client.pem", "other-client.key"),
    ];
    let root2 = cert("root2.pem");
    let issuers = IssuerNameSet::from_names([root2.subject().to_oneline()]);
    let selection = select_candidate(&candidates, &issuers, &test_trust()).expect("match");
    assert_eq!(selection.index, 2);
    assert!(selection
        .certificate()
        .subject()
        .to_oneline()
        .contains("other.client.test"));
}

#[test]
fn no_candidate_matches_nonempty_issuer_set() {
    let candidates = vec![
        identity("rsa-client.pem", "rsa-client.key"),
        identity("ec-client.pem", "ec-client.key"),
    ];
    let root2 = cert("root2.pem");
    let issuers = IssuerNameSet::from_names([root2.subject().to_oneline()]);
    assert!(select_candidate(&candidates, &issuers, &test_trust()).is_none());
}

#[test]
fn empty_issuer_set_accepts_first_candidate() {
    let candidates = vec![
        identity("ec-client.pem", "ec-client.key"),
        identity("rsa-client.pem", "rsa-client.key"),
    ];
    let selection =
        select_candidate(&candidates, &IssuerNameSet::new(), &test_trust()).expect("match");
    assert_eq!(selection.index, 0);
}

#[test]
fn empty_candidate_collection_matches_nothing() {
    let candidates: Vec<Certificate> = Vec::new();
    assert!(select_candidate(&candidates, &IssuerNameSet::new(), &test_trust()).is_none());
}

// ---- Callback adapter ----

#[test]
fn single_certificate_empty_issuer_set_yields_certificate_set() {
    let mut provider = ClientCertProvider::with_certificates(
        vec![identity("self-client.pem", "self-client.key")],
        test_trust(),
    );
    let mut ctx = FakeContext::new();
    let (rc, cert_out, key_out) = invoke(&mut provider, &mut ctx);
    assert_eq!(rc, CALLBACK_CERT_SET);
    assert!(cert_out.is_some());
    assert!(key_out.is_some());
    // Chain length 1: no extra chain certificates forwarded.
    assert!(ctx.added.is_empty());
    assert_eq!(provider.last_outcome(), Some(CallbackOutcome::CertificateSet));
}

#[test]
fn intermediates_are_forwarded_but_leaf_and_root_are_not() {
    let mut provider = ClientCertProvider::with_certificates(
        vec![
            identity("rsa-client.pem", "rsa-client.key"),
            cert("intermediate.pem"),
        ],
        test_trust(),
    );
    let root = cert("root.pem");
    let mut ctx = FakeContext::accepting(&[&root]);
    let (rc, cert_out, _) = invoke(&mut provider, &mut ctx);
    assert_eq!(rc, CALLBACK_CERT_SET);

    let leaf = cert("rsa-client.pem");
    let intermediate = cert("intermediate.pem");
    assert_eq!(ctx.added.len(), 1);
    assert_eq!(ctx.added[0].as_der(), intermediate.der());
    assert_ne!(ctx.added[0].as_der(), leaf.der());
    assert_ne!(ctx.added[0].as_der(), root.der());
    assert_eq!(cert_out.expect("certificate handle").as_der(), leaf.der());
}

#[test]
fn no_issuer_match_yields_no_certificate() {
    let mut provider = ClientCertProvider::with_certificates(
        vec![
            identity("rsa-client.pem", "rsa-client.key"),
            identity("ec-client.pem", "ec-client.key"),
        ],
        test_trust(),
    );
    let root2 = cert("root2.pem");
    let mut ctx = FakeContext::accepting(&[&root2]);
    let (rc, cert_out, key_out) = invoke(&mut provider, &mut ctx);
    assert_eq!(rc, CALLBACK_NO_CERT);
    assert!(cert_out.is_none());
    assert!(key_out.is_none());
    assert_eq!(
        provider.last_outcome(),
        Some(CallbackOutcome::NoCertificateSet)
    );
}

#[test]
fn selected_certificate_without_key_yields_no_certificate() {
    // Lone candidate wins the fast path but carries no private key.
    let mut provider =
        ClientCertProvider::with_certificates(vec![cert("self-client.pem")], test_trust());
    let mut ctx = FakeContext::new();
    let (rc, cert_out, key_out) = invoke(&mut provider, &mut ctx);
    assert_eq!(rc, CALLBACK_NO_CERT);
    assert!(cert_out.is_none());
    assert!(key_out.is_none());
}

#[test]
fn null_handshake_context_yields_no_certificate() {
    let mut provider = ClientCertProvider::with_certificates(
        vec![identity("self-client.pem", "self-client.key")],
        test_trust(),
    );
    let mut cert_out = None;
    let mut key_out = None;
    let rc = provider.select_client_certificate(None, &mut cert_out, &mut key_out);
    assert_eq!(rc, CALLBACK_NO_CERT);
    assert!(cert_out.is_none());
    assert!(key_out.is_none());
}

#[test]
fn certificate_handle_shares_the_der_allocation() {
    let supplied = identity("self-client.pem", "self-client.key");
    let der_ptr = supplied.der().as_ptr();
    let mut provider = ClientCertProvider::with_certificates(vec![supplied], test_trust());
    let mut ctx = FakeContext::new();
    let (rc, cert_out, _) = invoke(&mut provider, &mut ctx);
    assert_eq!(rc, CALLBACK_CERT_SET);
    // Duplication bumps a refcount; it must not copy the encoding.
    assert_eq!(cert_out.expect("certificate handle").as_der().as_ptr(), der_ptr);
}
