//! certpick: Diagnose TLS client-certificate selection against local identities.

use anyhow::{Context, Result};
use certpick_lib::{
    build_chain, load_identity_bundle, CertHandle, Certificate, CertpickError,
    ClientCertProvider, HandshakeContext, IssuerNameSet, KeyHandle, PersonalStore, TrustStore,
    CALLBACK_CERT_SET, CALLBACK_NO_CERT,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "certpick",
    about = "Diagnose TLS client-certificate selection against local identities",
    long_about = "certpick simulates the client-certificate request a TLS server makes\n\
                  mid-handshake and reports which locally available identity would be\n\
                  presented, the trust chain built for it, and the intermediates that\n\
                  would be forwarded to the engine.\n\n\
                  Identities are PEM bundles holding a certificate, optional chain\n\
                  certificates, and the private key. With no identity files, the\n\
                  personal certificate store is used (see CLIENT_IDENTITY_DIR).",
    after_help = "EXAMPLES:\n\
                  \n  certpick select client.pem\
                  \n  certpick select client.pem backup.pem --ca server-cas.pem\
                  \n  certpick select --ca server-cas.pem          # personal store\
                  \n  certpick select --json client.pem\
                  \n  certpick chain client.pem --trust ca-bundle.pem\
                  \n  certpick issuers server-cas.pem"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a certificate request and report the selection outcome
    #[command(after_help = "EXIT CODES:\n\
                      \n  0  a certificate was selected\
                      \n  1  no eligible certificate (handshake would continue without one)\
                      \n  2  chain assembly failed (handshake would be suspended)\
                      \n\nEXAMPLES:\n\
                      \n  certpick select client.pem\
                      \n  certpick select a.pem b.pem --ca server-cas.pem\
                      \n  certpick select --ca server-cas.pem")]
    Select {
        /// Identity files (PEM bundles). Uses the personal store if omitted.
        #[arg(value_name = "IDENTITY")]
        identities: Vec<PathBuf>,
        /// CA bundle standing in for the server's acceptable-issuer list.
        /// Omitted means the server imposes no issuer constraint.
        #[arg(long, value_name = "FILE")]
        ca: Option<PathBuf>,
        /// Trust anchors for chain building (default: system trust store)
        #[arg(long, value_name = "FILE")]
        trust: Option<PathBuf>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Build and print the locally resolvable chain for an identity
    Chain {
        /// Identity file. Reads from stdin if omitted.
        file: Option<PathBuf>,
        /// Trust anchors for chain building (default: system trust store)
        #[arg(long, value_name = "FILE")]
        trust: Option<PathBuf>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Print the acceptable-issuer set a server using a CA bundle would send
    Issuers {
        /// CA bundle file. Reads from stdin if omitted.
        file: Option<PathBuf>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

/// Maximum file size for PEM inputs (10 MiB).
const MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;

fn read_input(file: Option<&PathBuf>) -> Result<Vec<u8>> {
    match file {
        Some(path) => {
            let meta = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat file: {}", path.display()))?;
            if meta.len() > MAX_INPUT_BYTES {
                anyhow::bail!(
                    "File too large ({} bytes, max {} bytes): {}",
                    meta.len(),
                    MAX_INPUT_BYTES,
                    path.display()
                );
            }
            std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .take(MAX_INPUT_BYTES)
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn load_trust(trust: Option<&PathBuf>) -> Result<TrustStore> {
    match trust {
        Some(path) => Ok(TrustStore::from_pem_file(path)?),
        None => TrustStore::system().context("Failed to load the system trust store"),
    }
}

/// Deduplicated, sorted subject names of every certificate in a CA bundle.
fn issuer_names_from_bundle(data: &[u8]) -> Result<Vec<String>> {
    let cas = load_identity_bundle(data).context("Failed to parse CA bundle")?;
    let set = IssuerNameSet::from_names(cas.iter().map(|ca| ca.subject().to_oneline()));
    let mut names: Vec<String> = set.names().map(str::to_string).collect();
    names.sort();
    Ok(names)
}

/// Stand-in for the engine's handshake state: serves the simulated
/// issuer list and accepts every extra-chain registration.
#[derive(Default)]
struct SimulatedRequest {
    issuers: Vec<Vec<u8>>,
    forwarded: Vec<CertHandle>,
}

impl HandshakeContext for SimulatedRequest {
    fn acceptable_issuers(&self) -> Vec<Vec<u8>> {
        self.issuers.clone()
    }

    fn add_extra_chain_cert(&mut self, cert: CertHandle) -> Result<(), CertpickError> {
        self.forwarded.push(cert);
        Ok(())
    }
}

#[derive(Serialize)]
struct SelectReport {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_algorithm: Option<String>,
    extra_chain: Vec<String>,
}

fn outcome_label(sentinel: i32) -> &'static str {
    match sentinel {
        CALLBACK_CERT_SET => "certificate-set",
        CALLBACK_NO_CERT => "no-certificate",
        _ => "suspend",
    }
}

fn outcome_exit_code(sentinel: i32) -> i32 {
    match sentinel {
        CALLBACK_CERT_SET => 0,
        CALLBACK_NO_CERT => 1,
        _ => 2,
    }
}

fn run_select(
    identities: &[PathBuf],
    ca: Option<&PathBuf>,
    trust: Option<&PathBuf>,
    json: bool,
) -> Result<i32> {
    let trust = load_trust(trust)?;

    let mut provider = if identities.is_empty() {
        let store =
            PersonalStore::open_default().context("No identities given and no personal store")?;
        ClientCertProvider::automatic(Box::new(store), trust)
    } else {
        let mut candidates = Vec::new();
        for path in identities {
            let data = read_input(Some(path))?;
            let bundle = load_identity_bundle(&data)
                .with_context(|| format!("Failed to load identity: {}", path.display()))?;
            candidates.extend(bundle);
        }
        ClientCertProvider::with_certificates(candidates, trust)
    };

    let mut request = SimulatedRequest::default();
    if let Some(path) = ca {
        let data = read_input(Some(path))?;
        let cas = load_identity_bundle(&data).context("Failed to parse CA bundle")?;
        request.issuers = cas.iter().map(|c| c.subject_der().to_vec()).collect();
    }

    let mut cert_out: Option<CertHandle> = None;
    let mut key_out: Option<KeyHandle> = None;
    let rc = provider.select_client_certificate(Some(&mut request), &mut cert_out, &mut key_out);

    let selected = cert_out
        .as_ref()
        .map(|handle| Certificate::from_der(handle.as_der()))
        .transpose()?;
    let extra_chain: Vec<String> = request
        .forwarded
        .iter()
        .filter_map(|handle| Certificate::from_der(handle.as_der()).ok())
        .map(|cert| cert.subject().to_oneline())
        .collect();

    let report = SelectReport {
        outcome: outcome_label(rc),
        subject: selected.as_ref().map(|c| c.subject().to_oneline()),
        issuer: selected.as_ref().map(|c| c.issuer().to_oneline()),
        key_algorithm: key_out.as_ref().map(|k| k.algorithm().name().to_string()),
        extra_chain,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match rc {
            CALLBACK_CERT_SET => {
                println!(
                    "selected: {}",
                    report.subject.as_deref().unwrap_or_default()
                );
                println!(
                    "issuer:   {}",
                    report.issuer.as_deref().unwrap_or_default()
                );
                println!(
                    "key:      {}",
                    report.key_algorithm.as_deref().unwrap_or_default()
                );
                if report.extra_chain.is_empty() {
                    println!("extra chain: (none)");
                } else {
                    println!("extra chain:");
                    for subject in &report.extra_chain {
                        println!("  {}", subject);
                    }
                }
            }
            CALLBACK_NO_CERT => eprintln!("no eligible client certificate"),
            _ => eprintln!("chain assembly failed; handshake would be suspended"),
        }
    }

    provider.dispose();
    Ok(outcome_exit_code(rc))
}

fn run_chain(file: Option<&PathBuf>, trust: Option<&PathBuf>, json: bool) -> Result<()> {
    let trust = load_trust(trust)?;
    let data = read_input(file)?;
    let bundle = load_identity_bundle(&data).context("Failed to load identity")?;
    let (leaf, pool) = bundle
        .split_first()
        .context("Identity bundle holds no certificate")?;
    let chain = build_chain(leaf, pool, &trust);

    #[derive(Serialize)]
    struct ChainEntry {
        depth: usize,
        subject: String,
        issuer: String,
    }
    #[derive(Serialize)]
    struct ChainReport {
        anchored: bool,
        chain: Vec<ChainEntry>,
        extra_chain_len: usize,
    }

    let report = ChainReport {
        anchored: chain.is_anchored(),
        chain: chain
            .certificates()
            .iter()
            .enumerate()
            .map(|(depth, cert)| ChainEntry {
                depth,
                subject: cert.subject().to_oneline(),
                issuer: cert.issuer().to_oneline(),
            })
            .collect(),
        extra_chain_len: chain.extra_chain().len(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for entry in &report.chain {
            println!(
                "depth {}: subject = {}, issuer = {}",
                entry.depth, entry.subject, entry.issuer
            );
        }
        println!(
            "anchored: {}, extra chain certificates: {}",
            report.anchored, report.extra_chain_len
        );
    }
    Ok(())
}

fn run_issuers(file: Option<&PathBuf>, json: bool) -> Result<()> {
    let data = read_input(file)?;
    let names = issuer_names_from_bundle(&data)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else {
        for name in &names {
            println!("{}", name);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Select {
            identities,
            ca,
            trust,
            json,
        } => {
            let code = run_select(identities, ca.as_ref(), trust.as_ref(), *json)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Chain { file, trust, json } => {
            run_chain(file.as_ref(), trust.as_ref(), *json)?;
        }
        Commands::Issuers { file, json } => {
            run_issuers(file.as_ref(), *json)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ROOT_PEM: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../certpick-lib/testdata/root.pem"
    ));
    const ROOT2_PEM: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../certpick-lib/testdata/root2.pem"
    ));

    #[test]
    fn outcome_labels_cover_all_sentinels() {
        assert_eq!(outcome_label(1), "certificate-set");
        assert_eq!(outcome_label(0), "no-certificate");
        assert_eq!(outcome_label(-1), "suspend");
    }

    #[test]
    fn exit_codes_mirror_sentinels() {
        assert_eq!(outcome_exit_code(1), 0);
        assert_eq!(outcome_exit_code(0), 1);
        assert_eq!(outcome_exit_code(-1), 2);
    }

    #[test]
    fn issuer_names_are_sorted_and_deduplicated() {
        let mut bundle = Vec::new();
        bundle.extend_from_slice(ROOT2_PEM);
        bundle.extend_from_slice(ROOT_PEM);
        bundle.extend_from_slice(ROOT_PEM);
        let names = issuer_names_from_bundle(&bundle).unwrap();
        assert_eq!(names.len(), 2);
        assert!(names[0] < names[1]);
        assert!(names.iter().any(|n| n.contains("Certpick Test Root CA")));
        assert!(names.iter().any(|n| n.contains("Other Root CA")));
    }

    #[test]
    fn simulated_request_serves_issuers_and_records_forwards() {
        let root = Certificate::load(ROOT_PEM).unwrap();
        let request = SimulatedRequest {
            issuers: vec![root.subject_der().to_vec()],
            forwarded: Vec::new(),
        };
        let issuers = IssuerNameSet::from_context(&request);
        assert!(issuers.contains_dn(root.subject()));
    }
}
