#![allow(dead_code)] // each integration test binary uses a subset of these helpers

//! Test PKI: hand-built certificates with symbolic signatures.
//!
//! Real signature algorithms would only test the crypto crate; what the
//! verifier cares about is *which message* was signed by *which key pair*.
//! A symbolic signature encodes exactly that (the signing key's public
//! bytes and the signed message) and the [`TestVerifier`] recomputes it.

use std::net::IpAddr;
use std::sync::Arc;

use num_bigint::BigUint;
use xchain_lib::{
    oid, Certificate, DistinguishedName, ExtKeyUsage, IpCidr, KeyUsage, PublicKey,
    SignatureError, SignatureVerifier,
};

pub const TEST_SIG_ALG: &str = "1.3.9999.1";
pub const UNIMPLEMENTED_SIG_ALG: &str = "1.3.9999.99";
pub const TEST_KEY_ALG: &str = "1.3.9999.0";

pub const NOT_BEFORE: i64 = 1_000_000_000;
pub const NOT_AFTER: i64 = 2_000_000_000;
pub const TEST_TIME: i64 = 1_500_000_000;

pub fn symbolic_signature(signer_key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut sig = b"sig(".to_vec();
    sig.extend_from_slice(signer_key);
    sig.push(b',');
    sig.extend_from_slice(message);
    sig.push(b')');
    sig
}

/// Accepts a signature iff it is the symbolic signature of the message
/// under the presented public key. One algorithm OID is deliberately left
/// unimplemented to exercise that diagnostic path.
pub struct TestVerifier;

impl SignatureVerifier for TestVerifier {
    fn verify(
        &self,
        algorithm: &str,
        public_key: &PublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), SignatureError> {
        if algorithm != TEST_SIG_ALG {
            return Err(SignatureError::UnsupportedAlgorithm(algorithm.to_string()));
        }
        if signature == symbolic_signature(&public_key.data, message).as_slice() {
            Ok(())
        } else {
            Err(SignatureError::InvalidSignature)
        }
    }
}

pub fn dn(attrs: &[(&str, &str)]) -> DistinguishedName {
    DistinguishedName::from_attributes(attrs.iter().copied())
}

pub fn cn(name: &str) -> DistinguishedName {
    dn(&[(oid::COMMON_NAME, name)])
}

pub struct CertBuilder {
    subject: DistinguishedName,
    key_name: String,
    serial: u32,
    version: u32,
    not_before: i64,
    not_after: i64,
    is_ca: bool,
    basic_constraints_valid: bool,
    max_path_len: Option<u32>,
    key_usage: u16,
    ext_key_usages: Vec<ExtKeyUsage>,
    san_dns: Vec<String>,
    san_ip: Vec<IpAddr>,
    san_email: Vec<String>,
    san_uri: Vec<String>,
    subject_key_id: Option<Vec<u8>>,
    authority_key_id: Option<Vec<u8>>,
    permitted_dns: Vec<String>,
    excluded_dns: Vec<String>,
    permitted_ip: Vec<IpCidr>,
    excluded_ip: Vec<IpCidr>,
    permitted_email: Vec<String>,
    excluded_email: Vec<String>,
    permitted_uri: Vec<String>,
    excluded_uri: Vec<String>,
    permitted_dir_names: Vec<DistinguishedName>,
    excluded_dir_names: Vec<DistinguishedName>,
    critical_exts: Vec<String>,
    signature_algorithm: String,
}

impl CertBuilder {
    pub fn new(common_name: &str) -> Self {
        CertBuilder {
            subject: cn(common_name),
            key_name: common_name.to_string(),
            serial: 1,
            version: 3,
            not_before: NOT_BEFORE,
            not_after: NOT_AFTER,
            is_ca: false,
            basic_constraints_valid: false,
            max_path_len: None,
            key_usage: 0,
            ext_key_usages: Vec::new(),
            san_dns: Vec::new(),
            san_ip: Vec::new(),
            san_email: Vec::new(),
            san_uri: Vec::new(),
            subject_key_id: None,
            authority_key_id: None,
            permitted_dns: Vec::new(),
            excluded_dns: Vec::new(),
            permitted_ip: Vec::new(),
            excluded_ip: Vec::new(),
            permitted_email: Vec::new(),
            excluded_email: Vec::new(),
            permitted_uri: Vec::new(),
            excluded_uri: Vec::new(),
            permitted_dir_names: Vec::new(),
            excluded_dir_names: Vec::new(),
            critical_exts: Vec::new(),
            signature_algorithm: TEST_SIG_ALG.to_string(),
        }
    }

    pub fn subject(mut self, subject: DistinguishedName) -> Self {
        self.subject = subject;
        self
    }

    /// Distinct key pair for certificates that share a subject.
    pub fn key_name(mut self, name: &str) -> Self {
        self.key_name = name.to_string();
        self
    }

    pub fn serial(mut self, serial: u32) -> Self {
        self.serial = serial;
        self
    }

    pub fn ca(mut self) -> Self {
        self.is_ca = true;
        self.basic_constraints_valid = true;
        self.key_usage = KeyUsage::CERT_SIGN | KeyUsage::DIGITAL_SIGNATURE;
        self
    }

    /// An X.509 v1 certificate: no extensions of any kind.
    pub fn v1(mut self) -> Self {
        self.version = 1;
        self.is_ca = false;
        self.basic_constraints_valid = false;
        self.key_usage = 0;
        self
    }

    pub fn validity(mut self, not_before: i64, not_after: i64) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn max_path_len(mut self, len: u32) -> Self {
        self.max_path_len = Some(len);
        self
    }

    pub fn key_usage(mut self, flags: u16) -> Self {
        self.key_usage = flags;
        self
    }

    pub fn ekus(mut self, usages: &[ExtKeyUsage]) -> Self {
        self.ext_key_usages = usages.to_vec();
        self
    }

    pub fn dns_san(mut self, names: &[&str]) -> Self {
        self.san_dns = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn ip_san(mut self, ips: &[&str]) -> Self {
        self.san_ip = ips.iter().map(|s| s.parse().expect("test IP")).collect();
        self
    }

    pub fn email_san(mut self, emails: &[&str]) -> Self {
        self.san_email = emails.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn uri_san(mut self, uris: &[&str]) -> Self {
        self.san_uri = uris.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn skid(mut self, id: &[u8]) -> Self {
        self.subject_key_id = Some(id.to_vec());
        self
    }

    pub fn akid(mut self, id: &[u8]) -> Self {
        self.authority_key_id = Some(id.to_vec());
        self
    }

    pub fn permitted_dns(mut self, constraints: &[&str]) -> Self {
        self.permitted_dns = constraints.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn excluded_dns(mut self, constraints: &[&str]) -> Self {
        self.excluded_dns = constraints.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn permitted_email(mut self, constraints: &[&str]) -> Self {
        self.permitted_email = constraints.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn excluded_ip(mut self, ranges: &[(&[u8], &[u8])]) -> Self {
        self.excluded_ip = ranges
            .iter()
            .map(|(addr, mask)| IpCidr {
                addr: addr.to_vec(),
                mask: mask.to_vec(),
            })
            .collect();
        self
    }

    pub fn permitted_dir_names(mut self, names: &[DistinguishedName]) -> Self {
        self.permitted_dir_names = names.to_vec();
        self
    }

    pub fn excluded_dir_names(mut self, names: &[DistinguishedName]) -> Self {
        self.excluded_dir_names = names.to_vec();
        self
    }

    pub fn critical_ext(mut self, ext_oid: &str) -> Self {
        self.critical_exts.push(ext_oid.to_string());
        self
    }

    pub fn signature_algorithm(mut self, alg: &str) -> Self {
        self.signature_algorithm = alg.to_string();
        self
    }

    pub fn self_signed(self) -> Arc<Certificate> {
        let issuer = self.subject.clone();
        let key = key_bytes(&self.key_name);
        self.build(issuer, &key)
    }

    pub fn signed_by(self, parent: &Arc<Certificate>) -> Arc<Certificate> {
        let issuer = parent.subject.clone();
        let key = parent.public_key.data.clone();
        self.build(issuer, &key)
    }

    fn build(self, issuer: DistinguishedName, issuer_key: &[u8]) -> Arc<Certificate> {
        let raw_tbs = format!(
            "tbs({},{},{})",
            self.subject.to_oneline(),
            self.key_name,
            self.serial
        )
        .into_bytes();
        let signature = symbolic_signature(issuer_key, &raw_tbs);
        let has_san_extension = !self.san_dns.is_empty()
            || !self.san_ip.is_empty()
            || !self.san_email.is_empty()
            || !self.san_uri.is_empty();

        Arc::new(Certificate {
            subject: self.subject,
            issuer,
            serial: BigUint::from(self.serial),
            version: self.version,
            not_before: self.not_before,
            not_after: self.not_after,
            signature_algorithm: self.signature_algorithm,
            signature,
            public_key: PublicKey {
                algorithm: TEST_KEY_ALG.to_string(),
                curve: None,
                data: key_bytes(&self.key_name),
            },
            raw_tbs,
            subject_key_id: self.subject_key_id,
            authority_key_id: self.authority_key_id,
            basic_constraints_valid: self.basic_constraints_valid,
            is_ca: self.is_ca,
            max_path_len: self.max_path_len,
            key_usage: KeyUsage(self.key_usage),
            ext_key_usages: self.ext_key_usages,
            has_san_extension,
            san_dns: self.san_dns,
            san_ip: self.san_ip,
            san_email: self.san_email,
            san_uri: self.san_uri,
            permitted_dns: self.permitted_dns,
            excluded_dns: self.excluded_dns,
            permitted_ip: self.permitted_ip,
            excluded_ip: self.excluded_ip,
            permitted_email: self.permitted_email,
            excluded_email: self.excluded_email,
            permitted_uri: self.permitted_uri,
            excluded_uri: self.excluded_uri,
            permitted_dir_names: self.permitted_dir_names,
            excluded_dir_names: self.excluded_dir_names,
            name_constraints_critical: true,
            unhandled_critical_extensions: self.critical_exts,
        })
    }
}

fn key_bytes(key_name: &str) -> Vec<u8> {
    format!("key:{}", key_name).into_bytes()
}
