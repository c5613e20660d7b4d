//! PEM ingestion and parsing against a real root certificate.

use xchain_lib::{certificates_from_pem, oid, CertPool};

/// GeoTrust Global CA, a long-retired public root, used purely as parsing
/// input.
const GEOTRUST_GLOBAL_CA: &str = "-----BEGIN CERTIFICATE-----
MIIDVDCCAjygAwIBAgIDAjRWMA0GCSqGSIb3DQEBBQUAMEIxCzAJBgNVBAYTAlVT
MRYwFAYDVQQKEw1HZW9UcnVzdCBJbmMuMRswGQYDVQQDExJHZW9UcnVzdCBHbG9i
YWwgQ0EwHhcNMDIwNTIxMDQwMDAwWhcNMjIwNTIxMDQwMDAwWjBCMQswCQYDVQQG
EwJVUzEWMBQGA1UEChMNR2VvVHJ1c3QgSW5jLjEbMBkGA1UEAxMSR2VvVHJ1c3Qg
R2xvYmFsIENBMIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA2swYYzD9
9BcjGlZ+W988bDjkcbd4kdS8odhM+KhDtgPpTSEHCIjaWC9mOSm9BXiLnTjoBbdq
fnGk5sRgprDvgOSJKA+eJdbtg/OtppHHmMlCGDUUna2YRpIuT8rxh0PBFpVXLVDv
iS2Aelet8u5fa9IAjbkU+BQVNdnARqN7csiRv8lVK83Qlz6cJmTM386DGXHKTubU
1XupGc1V3sjs0l44U+VcT4wt/lAjNvxm5suOpDkZALeVAjmRCw7+OC7RHQWa9k0+
bw8HHa8sHo9gOeL6NlMTOdReJivbPagUvTLrGAMoUgRx5aszPeE4uwc2hGKceeoW
MPRfwCvocWvk+QIDAQABo1MwUTAPBgNVHRMBAf8EBTADAQH/MB0GA1UdDgQWBBTA
ephojYn7qwVkDBF9qn1luMrMTjAfBgNVHSMEGDAWgBTAephojYn7qwVkDBF9qn1l
uMrMTjANBgkqhkiG9w0BAQUFAAOCAQEANeMpauUvXVSOKVCUn5kaFOSPeCpilKIn
Z57QzxpeR+nBsqTP3UEaBU6bS+5Kb1VSsyShNwrrZHYqLizz/Tt1kL/6cdjHPTfS
tQWVYrmm3ok9Nns4d0iXrKYgjy6myQzCsplFAMfOEVEiIuCl6rYVSAlk6l5PdPcF
PseKUgzbFbS9bZvlxrFUaKnjaZC2mqUPuLk/IH2uSrW4nOQdtqvmlKXBx4Ot2/Un
hw4EbNX/3aBd7YdStysVAq45pmp06drE57xNNB6pXE0zX5IJL4hmXXeXxx12E6nV
5fEWCRE11azbJHFwLJhWC9kXtNHjUStedejV0NxPNO3CBWaAocvmMw==
-----END CERTIFICATE-----";

#[test]
fn parse_real_root_certificate() {
    let certs = certificates_from_pem(GEOTRUST_GLOBAL_CA.as_bytes()).expect("parse PEM");
    assert_eq!(certs.len(), 1);
    let cert = &certs[0];

    assert_eq!(cert.subject.common_name(), Some("GeoTrust Global CA"));
    assert_eq!(cert.subject.organization(), Some("GeoTrust Inc."));
    assert_eq!(cert.subject, cert.issuer);
    assert!(cert.is_self_issued());
    assert_eq!(cert.version, 3);

    // 2002-05-21T04:00:00Z .. 2022-05-21T04:00:00Z
    assert_eq!(cert.not_before, 1_021_953_600);
    assert_eq!(cert.not_after, 1_653_105_600);

    assert!(cert.basic_constraints_valid);
    assert!(cert.is_ca);
    assert_eq!(cert.max_path_len, None);

    assert_eq!(cert.signature_algorithm, oid::SHA1_WITH_RSA);
    assert_eq!(cert.public_key.algorithm, oid::RSA_ENCRYPTION);
    assert!(!cert.signature.is_empty());
    assert!(!cert.raw_tbs.is_empty());

    assert!(cert.subject_key_id.is_some());
    assert_eq!(cert.subject_key_id, cert.authority_key_id);

    assert!(!cert.has_san_extension);
    assert!(!cert.has_name_constraints());
    assert!(cert.unhandled_critical_extensions.is_empty());
}

#[test]
fn append_from_pem_is_idempotent() {
    let mut pool = CertPool::new();
    assert!(pool.append_from_pem(GEOTRUST_GLOBAL_CA.as_bytes()));
    assert_eq!(pool.len(), 1);

    // The same bundle again adds nothing new.
    assert!(!pool.append_from_pem(GEOTRUST_GLOBAL_CA.as_bytes()));
    assert_eq!(pool.len(), 1);
}

#[test]
fn append_from_pem_skips_foreign_block_types() {
    let bundle = format!(
        "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n{}\n",
        GEOTRUST_GLOBAL_CA
    );
    let mut pool = CertPool::new();
    assert!(pool.append_from_pem(bundle.as_bytes()));
    assert_eq!(pool.len(), 1);
}

#[test]
fn append_from_pem_rejects_non_pem_input() {
    let mut pool = CertPool::new();
    assert!(!pool.append_from_pem(b"definitely not pem"));
    assert!(pool.is_empty());
}

#[test]
fn pool_lookup_after_pem_ingestion() {
    let mut pool = CertPool::new();
    pool.append_from_pem(GEOTRUST_GLOBAL_CA.as_bytes());

    let cert = certificates_from_pem(GEOTRUST_GLOBAL_CA.as_bytes())
        .expect("parse PEM")
        .remove(0);
    assert!(pool.contains(&cert));
    assert_eq!(pool.certs_with_subject(&cert.subject).count(), 1);
}
