//! Adapter between `x509-parser` and the crate's certificate model.
//!
//! This is the only module that touches DER or PEM bytes. Everything the
//! verifier core needs is extracted here into owned [`Certificate`] values;
//! fields the core treats as opaque (signature, key material, TBS bytes)
//! are carried through untouched.

use log::warn;
use x509_parser::prelude::*;

use crate::cert::{format_ip_bytes, Certificate, ExtKeyUsage, IpCidr, KeyUsage, PublicKey};
use crate::name::{AttributeTypeAndValue, DistinguishedName, Rdn};
use crate::oid;

/// Error converting input bytes into a [`Certificate`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("failed to parse DER certificate: {0}")]
    Der(String),
    #[error("failed to parse PEM input: {0}")]
    Pem(String),
    #[error("no certificates found in PEM input")]
    NoCertificates,
}

/// Parse a single DER-encoded certificate.
pub fn certificate_from_der(der: &[u8]) -> Result<Certificate, ParseError> {
    let (_, x509) =
        X509Certificate::from_der(der).map_err(|e| ParseError::Der(e.to_string()))?;
    Ok(convert_certificate(&x509))
}

/// Parse all `CERTIFICATE` blocks from a PEM bundle.
///
/// Blocks of other types are ignored; certificate blocks that fail to parse
/// are skipped (some bundles carry non-certificate entries). An error is
/// returned only when the input yields no certificate at all.
pub fn certificates_from_pem(data: &[u8]) -> Result<Vec<Certificate>, ParseError> {
    let mut certs = Vec::new();

    for pem_entry in Pem::iter_from_buffer(data) {
        match pem_entry {
            Ok(pem) => {
                if pem.label != "CERTIFICATE" {
                    continue;
                }
                match certificate_from_der(&pem.contents) {
                    Ok(cert) => certs.push(cert),
                    Err(e) => warn!("skipping unparseable certificate block: {}", e),
                }
            }
            Err(e) => {
                // Trailing garbage after valid blocks is tolerated.
                if !certs.is_empty() {
                    break;
                }
                return Err(ParseError::Pem(e.to_string()));
            }
        }
    }

    if certs.is_empty() {
        return Err(ParseError::NoCertificates);
    }
    Ok(certs)
}

fn convert_certificate(x509: &X509Certificate<'_>) -> Certificate {
    let spki = x509.public_key();
    let public_key = PublicKey {
        algorithm: spki.algorithm.algorithm.to_id_string(),
        curve: spki
            .algorithm
            .parameters
            .as_ref()
            .and_then(|p| p.as_oid().ok())
            .map(|o| o.to_id_string()),
        data: spki.subject_public_key.data.to_vec(),
    };

    let mut cert = Certificate {
        subject: convert_name(x509.subject()),
        issuer: convert_name(x509.issuer()),
        serial: x509.serial.clone(),
        version: x509.version().0 + 1,
        not_before: x509.validity().not_before.timestamp(),
        not_after: x509.validity().not_after.timestamp(),
        signature_algorithm: x509.signature_algorithm.algorithm.to_id_string(),
        signature: x509.signature_value.data.to_vec(),
        public_key,
        raw_tbs: x509.tbs_certificate.as_ref().to_vec(),
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
    };

    if let Ok(Some(bc)) = x509.basic_constraints() {
        cert.basic_constraints_valid = true;
        cert.is_ca = bc.value.ca;
        cert.max_path_len = bc.value.path_len_constraint;
    }

    if let Ok(Some(ku)) = x509.key_usage() {
        cert.key_usage = KeyUsage(ku.value.flags);
    }

    if let Ok(Some(eku)) = x509.extended_key_usage() {
        let v = &eku.value;
        if v.any {
            cert.ext_key_usages.push(ExtKeyUsage::Any);
        }
        if v.server_auth {
            cert.ext_key_usages.push(ExtKeyUsage::ServerAuth);
        }
        if v.client_auth {
            cert.ext_key_usages.push(ExtKeyUsage::ClientAuth);
        }
        if v.code_signing {
            cert.ext_key_usages.push(ExtKeyUsage::CodeSigning);
        }
        if v.email_protection {
            cert.ext_key_usages.push(ExtKeyUsage::EmailProtection);
        }
        if v.time_stamping {
            cert.ext_key_usages.push(ExtKeyUsage::TimeStamping);
        }
        if v.ocsp_signing {
            cert.ext_key_usages.push(ExtKeyUsage::OcspSigning);
        }
        for other in &v.other {
            cert.ext_key_usages
                .push(ExtKeyUsage::from_oid(&other.to_id_string()));
        }
    }

    cert.has_san_extension = x509
        .extensions()
        .iter()
        .any(|e| e.oid.to_id_string() == oid::EXT_SUBJECT_ALT_NAME);
    if let Ok(Some(san)) = x509.subject_alternative_name() {
        for gn in &san.value.general_names {
            match gn {
                GeneralName::DNSName(name) => cert.san_dns.push(name.to_string()),
                GeneralName::RFC822Name(email) => cert.san_email.push(email.to_string()),
                GeneralName::URI(uri) => cert.san_uri.push(uri.to_string()),
                GeneralName::IPAddress(bytes) => match format_ip_bytes(bytes) {
                    Some(ip) => cert.san_ip.push(ip),
                    None => warn!("skipping malformed IP SAN ({} bytes)", bytes.len()),
                },
                _ => {}
            }
        }
    }

    if let Ok(Some(nc)) = x509.name_constraints() {
        if let Some(permitted) = &nc.value.permitted_subtrees {
            for subtree in permitted {
                convert_subtree(
                    &subtree.base,
                    &mut cert.permitted_dns,
                    &mut cert.permitted_email,
                    &mut cert.permitted_uri,
                    &mut cert.permitted_ip,
                    &mut cert.permitted_dir_names,
                );
            }
        }
        if let Some(excluded) = &nc.value.excluded_subtrees {
            for subtree in excluded {
                convert_subtree(
                    &subtree.base,
                    &mut cert.excluded_dns,
                    &mut cert.excluded_email,
                    &mut cert.excluded_uri,
                    &mut cert.excluded_ip,
                    &mut cert.excluded_dir_names,
                );
            }
        }
    }

    for ext in x509.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::SubjectKeyIdentifier(ski) => {
                cert.subject_key_id = Some(ski.0.to_vec());
            }
            ParsedExtension::AuthorityKeyIdentifier(aki) => {
                cert.authority_key_id = aki.key_identifier.as_ref().map(|kid| kid.0.to_vec());
            }
            _ => {}
        }

        let ext_oid = ext.oid.to_id_string();
        if ext_oid == oid::EXT_NAME_CONSTRAINTS {
            cert.name_constraints_critical = ext.critical;
        }
        if ext.critical && !is_known_extension(&ext_oid) {
            cert.unhandled_critical_extensions.push(ext_oid);
        }
    }

    cert
}

fn convert_name(name: &X509Name<'_>) -> DistinguishedName {
    DistinguishedName {
        rdns: name
            .iter()
            .map(|rdn| Rdn {
                attributes: rdn
                    .iter()
                    .map(|attr| AttributeTypeAndValue {
                        oid: attr.attr_type().to_id_string(),
                        value: match attr.as_str() {
                            Ok(s) => s.to_string(),
                            // Non-string values keep a stable hex form so
                            // distinct names stay distinct.
                            Err(_) => hex_string(attr.attr_value().data),
                        },
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn convert_subtree(
    base: &GeneralName<'_>,
    dns: &mut Vec<String>,
    email: &mut Vec<String>,
    uri: &mut Vec<String>,
    ip: &mut Vec<IpCidr>,
    dir_names: &mut Vec<DistinguishedName>,
) {
    match base {
        GeneralName::DNSName(name) => dns.push(name.to_string()),
        GeneralName::RFC822Name(addr) => email.push(addr.to_string()),
        GeneralName::URI(u) => uri.push(u.to_string()),
        GeneralName::IPAddress(bytes) => {
            // A constraint is address bytes followed by a netmask of the
            // same length: 4+4 for IPv4, 16+16 for IPv6.
            if bytes.len() == 8 || bytes.len() == 32 {
                let (addr, mask) = bytes.split_at(bytes.len() / 2);
                ip.push(IpCidr {
                    addr: addr.to_vec(),
                    mask: mask.to_vec(),
                });
            } else {
                warn!("skipping malformed IP name constraint ({} bytes)", bytes.len());
            }
        }
        GeneralName::DirectoryName(name) => dir_names.push(convert_name(name)),
        _ => {}
    }
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Check if an extension OID is one the crate recognizes and processes.
/// RFC 5280 Section 4.2 requires rejecting certificates that carry
/// unrecognized critical extensions, so anything outside this list that is
/// marked critical is recorded as unhandled.
fn is_known_extension(ext_oid: &str) -> bool {
    matches!(
        ext_oid,
        oid::EXT_SUBJECT_KEY_ID
            | oid::EXT_KEY_USAGE
            | oid::EXT_SUBJECT_ALT_NAME
            | oid::EXT_ISSUER_ALT_NAME
            | oid::EXT_BASIC_CONSTRAINTS
            | oid::EXT_NAME_CONSTRAINTS
            | oid::EXT_CRL_DISTRIBUTION_POINTS
            | oid::EXT_CERTIFICATE_POLICIES
            | oid::EXT_AUTHORITY_KEY_ID
            | oid::EXT_EXTENDED_KEY_USAGE
            | oid::EXT_AUTHORITY_INFO_ACCESS
            | oid::EXT_SCT_LIST
    )
}
