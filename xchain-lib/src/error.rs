//! Structured verification errors.
//!
//! Every failure mode of the verifier is a value carrying the certificate it
//! concerns. During path building, per-edge failures are recorded rather
//! than returned; when no chain can be built the most informative recorded
//! error is synthesized via [`VerifyError::search_priority`].

use std::sync::Arc;

use crate::cert::Certificate;
use crate::crypto::SignatureError;
use crate::util;
use crate::verify::LegacyCommonName;

/// Top-level error returned by [`verify`](crate::verify::verify).
#[derive(Debug, Clone, thiserror::Error)]
pub enum VerifyError {
    #[error(transparent)]
    Hostname(HostnameError),
    #[error(transparent)]
    CertificateInvalid(CertificateInvalidError),
    #[error(transparent)]
    UnknownAuthority(UnknownAuthorityError),
    #[error(transparent)]
    UnhandledCriticalExtension(UnhandledCriticalExtension),
    #[error(transparent)]
    SystemRoots(SystemRootsError),
    /// A raw signature-check failure, surfaced by
    /// [`Certificate::check_signature_from`](crate::cert::Certificate::check_signature_from)
    /// and carried inside [`UnknownAuthorityError`] hints.
    #[error(transparent)]
    Signature(SignatureError),
}

impl VerifyError {
    /// Ranking used when synthesizing the final error from everything
    /// recorded during an unsuccessful search. Higher wins.
    pub(crate) fn search_priority(&self) -> u8 {
        match self {
            VerifyError::CertificateInvalid(e) => match e.reason {
                InvalidReason::CANotAuthorizedForThisName => 6,
                InvalidReason::Expired => 5,
                InvalidReason::NotAuthorizedToSign => 3,
                _ => 2,
            },
            VerifyError::UnhandledCriticalExtension(_) => 4,
            VerifyError::UnknownAuthority(_) => 1,
            _ => 0,
        }
    }
}

/// The leaf does not match the requested host identity.
#[derive(Debug, Clone)]
pub struct HostnameError {
    pub certificate: Arc<Certificate>,
    pub host: String,
    /// The legacy-CN policy in effect for the failed check; determines how
    /// a SAN-less certificate is explained.
    pub legacy_common_name: LegacyCommonName,
}

impl std::fmt::Display for HostnameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = &self.certificate;

        if util::parse_ip_literal(&self.host).is_some() {
            if c.san_ip.is_empty() {
                return write!(
                    f,
                    "cannot validate certificate for {} because it doesn't contain any IP SANs",
                    self.host
                );
            }
            let valid: Vec<String> = c.san_ip.iter().map(|ip| ip.to_string()).collect();
            return write!(
                f,
                "certificate is valid for {}, not {}",
                valid.join(", "),
                self.host
            );
        }

        let candidate = util::normalize_hostname(&self.host);
        if !util::valid_hostname_input(&candidate) {
            return write!(
                f,
                "cannot validate certificate for {} because it is not a valid hostname",
                self.host
            );
        }

        if c.has_san_extension {
            if c.san_dns.is_empty() {
                return write!(
                    f,
                    "certificate is not valid for any names, but wanted to match {}",
                    self.host
                );
            }
            return write!(
                f,
                "certificate is valid for {}, not {}",
                c.san_dns.join(", "),
                self.host
            );
        }

        // No SAN extension at all: the Common Name is all there is.
        let cn = c.subject.common_name().unwrap_or("");
        if cn.is_empty() {
            return write!(
                f,
                "certificate is not valid for any names, but wanted to match {}",
                self.host
            );
        }
        if !util::valid_hostname_pattern(cn) {
            return match self.legacy_common_name {
                LegacyCommonName::Allow => {
                    write!(f, "Common Name is not a valid hostname: {}", cn)
                }
                LegacyCommonName::Forbid => write!(
                    f,
                    "certificate is not valid for any names, but wanted to match {}",
                    self.host
                ),
            };
        }
        match self.legacy_common_name {
            LegacyCommonName::Forbid => write!(
                f,
                "certificate relies on legacy Common Name field, use SANs instead"
            ),
            LegacyCommonName::Allow => {
                write!(f, "certificate is valid for {}, not {}", cn, self.host)
            }
        }
    }
}

impl std::error::Error for HostnameError {}

/// Why a certificate was rejected from every candidate chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    Expired,
    CANotAuthorizedForThisName,
    TooManyIntermediates,
    IncompatibleUsage,
    NotAuthorizedToSign,
    NameConstraintsWithoutSANs,
    NameMismatch,
    SignatureCheckFailure,
    TooManyConstraintComparisons,
}

/// A certificate failed one of the path-validation predicates.
#[derive(Debug, Clone)]
pub struct CertificateInvalidError {
    pub cert: Arc<Certificate>,
    pub reason: InvalidReason,
    pub detail: String,
}

impl std::fmt::Display for CertificateInvalidError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reason {
            InvalidReason::Expired => {
                if self.detail.is_empty() {
                    write!(f, "certificate has expired or is not yet valid")
                } else {
                    write!(
                        f,
                        "certificate has expired or is not yet valid: {}",
                        self.detail
                    )
                }
            }
            InvalidReason::CANotAuthorizedForThisName => write!(
                f,
                "a root or intermediate certificate is not authorized to sign for this name: {}",
                self.detail
            ),
            InvalidReason::TooManyIntermediates => {
                write!(f, "too many intermediates for path length constraint")
            }
            InvalidReason::IncompatibleUsage => {
                write!(f, "certificate specifies an incompatible key usage")
            }
            InvalidReason::NotAuthorizedToSign => write!(
                f,
                "certificate is not authorized to sign other certificates"
            ),
            InvalidReason::NameConstraintsWithoutSANs => write!(
                f,
                "issuer has name constraints but leaf doesn't have a SAN extension"
            ),
            InvalidReason::NameMismatch => write!(
                f,
                "issuer name does not match subject from issuing certificate"
            ),
            InvalidReason::SignatureCheckFailure => write!(
                f,
                "signature check attempts limit reached while verifying certificate chain"
            ),
            InvalidReason::TooManyConstraintComparisons => write!(
                f,
                "exceeded permitted name constraint comparisons while verifying certificate chain"
            ),
        }
    }
}

impl std::error::Error for CertificateInvalidError {}

/// No chain to any trust anchor could be built.
#[derive(Debug, Clone)]
pub struct UnknownAuthorityError {
    /// The certificate whose issuer could not be resolved.
    pub cert: Arc<Certificate>,
    /// The most interesting failure seen while trying candidate parents,
    /// typically a signature error.
    pub hint_err: Option<Box<VerifyError>>,
    /// The candidate authority that produced `hint_err`.
    pub hint_cert: Option<Arc<Certificate>>,
}

impl std::fmt::Display for UnknownAuthorityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "certificate signed by unknown authority")?;
        if let (Some(hint_err), Some(hint_cert)) = (&self.hint_err, &self.hint_cert) {
            write!(
                f,
                " (possibly because of \"{}\" while trying to verify candidate authority certificate \"{}\")",
                hint_err,
                hint_cert.display_name()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for UnknownAuthorityError {}

/// A certificate carried a critical extension the parsing collaborator did
/// not understand.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unhandled critical extension ({oid})")]
pub struct UnhandledCriticalExtension {
    pub oid: String,
}

/// No trust anchors were provided and the core has no system store.
#[derive(Debug, Clone, Copy, Default, thiserror::Error)]
#[error("failed to load system roots and no roots provided")]
pub struct SystemRootsError;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::DistinguishedName;
    use crate::oid;

    fn bare_cert(cn: Option<&str>, org: Option<&str>) -> Arc<Certificate> {
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        if let Some(org) = org {
            attrs.push((oid::ORGANIZATION, org));
        }
        if let Some(cn) = cn {
            attrs.push((oid::COMMON_NAME, cn));
        }
        Arc::new(Certificate::stub(DistinguishedName::from_attributes(attrs)))
    }

    #[test]
    fn unknown_authority_hint_names_cn_then_org_then_serial() {
        let hint = Box::new(VerifyError::Signature(SignatureError::InvalidSignature));
        for (cert, expected) in [
            (bare_cert(Some("test"), Some("ca")), "\"test\""),
            (bare_cert(None, Some("ca")), "\"ca\""),
            (bare_cert(None, None), "\"serial:7\""),
        ] {
            let err = UnknownAuthorityError {
                cert: cert.clone(),
                hint_err: Some(hint.clone()),
                hint_cert: Some(cert),
            };
            let msg = err.to_string();
            assert!(
                msg.starts_with("certificate signed by unknown authority (possibly because of"),
                "unexpected message: {msg}"
            );
            assert!(msg.ends_with(&format!("{})", expected)), "unexpected message: {msg}");
        }
    }

    #[test]
    fn unknown_authority_without_hint_is_bare() {
        let err = UnknownAuthorityError {
            cert: bare_cert(Some("leaf"), None),
            hint_err: None,
            hint_cert: None,
        };
        assert_eq!(err.to_string(), "certificate signed by unknown authority");
    }
}
