//! The parsed, immutable certificate model the verifier operates on.
//!
//! Values of [`Certificate`] are produced by the `parser` module (or built
//! directly by callers that have their own parsing) and never mutated by the
//! core. All cryptographic material (the signature, the to-be-signed bytes,
//! the public key) is carried opaquely and only ever handed to a
//! [`SignatureVerifier`](crate::crypto::SignatureVerifier).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use num_bigint::BigUint;

use crate::crypto::{SignatureError, SignatureVerifier};
use crate::error::{CertificateInvalidError, InvalidReason, VerifyError};
use crate::name::DistinguishedName;
use crate::oid;

/// Key usage bit set (RFC 5280 Section 4.2.1.3).
///
/// A value of zero means the extension is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyUsage(pub u16);

impl KeyUsage {
    pub const DIGITAL_SIGNATURE: u16 = 1 << 0;
    pub const CONTENT_COMMITMENT: u16 = 1 << 1;
    pub const KEY_ENCIPHERMENT: u16 = 1 << 2;
    pub const DATA_ENCIPHERMENT: u16 = 1 << 3;
    pub const KEY_AGREEMENT: u16 = 1 << 4;
    pub const CERT_SIGN: u16 = 1 << 5;
    pub const CRL_SIGN: u16 = 1 << 6;

    /// Whether the extension was present at all.
    pub fn is_present(self) -> bool {
        self.0 != 0
    }

    pub fn key_cert_sign(self) -> bool {
        self.0 & Self::CERT_SIGN != 0
    }
}

/// Extended key usage values (RFC 5280 Section 4.2.1.12), with the legacy
/// Server-Gated-Crypto OIDs still found in older intermediates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtKeyUsage {
    Any,
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    IpsecEndSystem,
    IpsecTunnel,
    IpsecUser,
    TimeStamping,
    OcspSigning,
    MicrosoftServerGatedCrypto,
    NetscapeServerGatedCrypto,
    Other(String),
}

impl ExtKeyUsage {
    pub fn from_oid(eku_oid: &str) -> Self {
        match eku_oid {
            oid::EKU_ANY => ExtKeyUsage::Any,
            oid::EKU_SERVER_AUTH => ExtKeyUsage::ServerAuth,
            oid::EKU_CLIENT_AUTH => ExtKeyUsage::ClientAuth,
            oid::EKU_CODE_SIGNING => ExtKeyUsage::CodeSigning,
            oid::EKU_EMAIL_PROTECTION => ExtKeyUsage::EmailProtection,
            oid::EKU_IPSEC_END_SYSTEM => ExtKeyUsage::IpsecEndSystem,
            oid::EKU_IPSEC_TUNNEL => ExtKeyUsage::IpsecTunnel,
            oid::EKU_IPSEC_USER => ExtKeyUsage::IpsecUser,
            oid::EKU_TIME_STAMPING => ExtKeyUsage::TimeStamping,
            oid::EKU_OCSP_SIGNING => ExtKeyUsage::OcspSigning,
            oid::EKU_MS_SERVER_GATED_CRYPTO => ExtKeyUsage::MicrosoftServerGatedCrypto,
            oid::EKU_NS_SERVER_GATED_CRYPTO => ExtKeyUsage::NetscapeServerGatedCrypto,
            other => ExtKeyUsage::Other(other.to_string()),
        }
    }
}

/// A subject public key, opaque to the verifier core.
///
/// `data` holds the raw subject-public-key bit string (an RSAPublicKey DER
/// structure, an uncompressed EC point, or raw EdDSA key bytes); `curve` is
/// the named-curve parameter OID for EC keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub algorithm: String,
    pub curve: Option<String>,
    pub data: Vec<u8>,
}

/// An IP range from a name-constraint subtree: raw address bytes plus a
/// netmask of equal length (4+4 for IPv4, 16+16 for IPv6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpCidr {
    pub addr: Vec<u8>,
    pub mask: Vec<u8>,
}

impl IpCidr {
    /// Prefix match of an address (as raw SAN bytes) against this range.
    /// Addresses of a different family never match.
    pub fn contains(&self, ip_bytes: &[u8]) -> bool {
        if ip_bytes.len() != self.addr.len() || self.addr.len() != self.mask.len() {
            return false;
        }
        ip_bytes
            .iter()
            .zip(self.addr.iter())
            .zip(self.mask.iter())
            .all(|((ip, a), m)| (ip & m) == (a & m))
    }
}

impl std::fmt::Display for IpCidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix_len: u32 = self.mask.iter().map(|b| b.count_ones()).sum();
        match format_ip_bytes(&self.addr) {
            Some(addr) => write!(f, "{}/{}", addr, prefix_len),
            None => write!(f, "<malformed>/{}", prefix_len),
        }
    }
}

/// Render raw SAN address bytes as a textual IP, if they are a well-formed
/// 4- or 16-byte address.
pub fn format_ip_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

/// A parsed X.509 certificate.
///
/// Structural equality over this type is the identity used for loop
/// prevention during path building, duplicate suppression in pools, and
/// chain de-duplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub subject: DistinguishedName,
    pub issuer: DistinguishedName,
    pub serial: BigUint,
    /// One-based version as displayed: 1, 2, or 3.
    pub version: u32,
    pub not_before: i64,
    pub not_after: i64,

    /// Signature algorithm OID, opaque to the core.
    pub signature_algorithm: String,
    pub signature: Vec<u8>,
    pub public_key: PublicKey,
    /// The to-be-signed portion of the certificate, the message the
    /// signature was produced over.
    pub raw_tbs: Vec<u8>,

    pub subject_key_id: Option<Vec<u8>>,
    pub authority_key_id: Option<Vec<u8>>,

    /// Whether the BasicConstraints extension was present and parsed.
    pub basic_constraints_valid: bool,
    pub is_ca: bool,
    /// `None` when absent; `Some(0)` is an explicit zero path length.
    pub max_path_len: Option<u32>,

    pub key_usage: KeyUsage,
    pub ext_key_usages: Vec<ExtKeyUsage>,

    /// Whether a SubjectAltName extension was present at all, even if it
    /// carried no name forms this model captures.
    pub has_san_extension: bool,
    pub san_dns: Vec<String>,
    pub san_ip: Vec<IpAddr>,
    pub san_email: Vec<String>,
    pub san_uri: Vec<String>,

    pub permitted_dns: Vec<String>,
    pub excluded_dns: Vec<String>,
    pub permitted_ip: Vec<IpCidr>,
    pub excluded_ip: Vec<IpCidr>,
    pub permitted_email: Vec<String>,
    pub excluded_email: Vec<String>,
    pub permitted_uri: Vec<String>,
    pub excluded_uri: Vec<String>,
    pub permitted_dir_names: Vec<DistinguishedName>,
    pub excluded_dir_names: Vec<DistinguishedName>,
    pub name_constraints_critical: bool,

    /// OIDs of critical extensions the parsing collaborator did not
    /// understand. Any entry here fails verification.
    pub unhandled_critical_extensions: Vec<String>,
}

impl Certificate {
    /// Whether the certificate is self-issued (subject == issuer).
    ///
    /// RFC 5280 Section 6.1: self-issued certificates do not count toward
    /// path length and are exempt from name constraints, except for the
    /// final certificate in the chain.
    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }

    /// Whether `at` (Unix seconds) falls inside the validity window.
    pub fn is_valid_at(&self, at: i64) -> bool {
        at >= self.not_before && at <= self.not_after
    }

    /// Whether the certificate carries any name-constraint subtree.
    pub fn has_name_constraints(&self) -> bool {
        !self.permitted_dns.is_empty()
            || !self.excluded_dns.is_empty()
            || !self.permitted_ip.is_empty()
            || !self.excluded_ip.is_empty()
            || !self.permitted_email.is_empty()
            || !self.excluded_email.is_empty()
            || !self.permitted_uri.is_empty()
            || !self.excluded_uri.is_empty()
            || !self.permitted_dir_names.is_empty()
            || !self.excluded_dir_names.is_empty()
    }

    /// A short human-readable identifier for diagnostics: CN, else the
    /// first Organization, else `serial:<n>`.
    pub fn display_name(&self) -> String {
        if let Some(cn) = self.subject.common_name() {
            if !cn.is_empty() {
                return cn.to_string();
            }
        }
        if let Some(org) = self.subject.organization() {
            if !org.is_empty() {
                return org.to_string();
            }
        }
        format!("serial:{}", self.serial)
    }

    /// Verify that this certificate was signed by `parent`.
    ///
    /// The parent's subject must equal this certificate's issuer, and the
    /// signature over `raw_tbs` must verify under the parent's public key.
    pub fn check_signature_from(
        &self,
        parent: &Certificate,
        verifier: &dyn SignatureVerifier,
    ) -> Result<(), VerifyError> {
        if parent.subject != self.issuer {
            return Err(VerifyError::CertificateInvalid(CertificateInvalidError {
                cert: std::sync::Arc::new(self.clone()),
                reason: InvalidReason::NameMismatch,
                detail: String::new(),
            }));
        }
        self.verify_signature(parent, verifier)
            .map_err(VerifyError::Signature)
    }

    /// Raw signature verification against a claimed parent, without the
    /// issuer/subject check.
    pub(crate) fn verify_signature(
        &self,
        parent: &Certificate,
        verifier: &dyn SignatureVerifier,
    ) -> Result<(), SignatureError> {
        verifier.verify(
            &self.signature_algorithm,
            &parent.public_key,
            &self.raw_tbs,
            &self.signature,
        )
    }

    /// Minimal self-issued certificate for unit tests within the crate.
    #[cfg(test)]
    pub(crate) fn stub(subject: DistinguishedName) -> Certificate {
        Certificate {
            issuer: subject.clone(),
            subject,
            serial: BigUint::from(7u32),
            version: 3,
            not_before: 0,
            not_after: i64::MAX,
            signature_algorithm: String::new(),
            signature: Vec::new(),
            public_key: PublicKey {
                algorithm: String::new(),
                curve: None,
                data: Vec::new(),
            },
            raw_tbs: Vec::new(),
            subject_key_id: None,
            authority_key_id: None,
            basic_constraints_valid: false,
            is_ca: false,
            max_path_len: None,
            key_usage: KeyUsage::default(),
            ext_key_usages: Vec::new(),
            has_san_extension: false,
            san_dns: Vec::new(),
            san_ip: Vec::new(),
            san_email: Vec::new(),
            san_uri: Vec::new(),
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
            name_constraints_critical: false,
            unhandled_critical_extensions: Vec::new(),
        }
    }
}
