//! Certificate path verification.
//!
//! The entry point is [`verify`]: validate the leaf, then enumerate every
//! chain from it to a trust anchor. All search state is local to the call;
//! concurrent verifications over shared pools are fully supported.

mod budget;
mod chain;
mod constraints;
mod eku;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::cert::{Certificate, ExtKeyUsage};
use crate::crypto::{SignatureVerifier, DEFAULT_VERIFIER};
use crate::error::{
    CertificateInvalidError, HostnameError, InvalidReason, SystemRootsError,
    UnhandledCriticalExtension, VerifyError,
};
use crate::pool::CertPool;
use crate::util;

/// An ordered certificate sequence from the leaf to a trust anchor, each
/// certificate signed by its successor.
pub type Chain = Vec<Arc<Certificate>>;

/// Policy for the legacy fallback that matches a hostname against the
/// subject Common Name when a certificate has no SAN extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegacyCommonName {
    /// Consult the CN of SAN-less certificates (deprecated behavior).
    Allow,
    /// Never consult the CN; SAN-less certificates match no hostname.
    #[default]
    Forbid,
}

/// Options controlling verification behavior.
pub struct VerifyOptions<'a> {
    /// Trust anchors. Verification fails with
    /// [`SystemRootsError`](crate::error::SystemRootsError) when absent;
    /// the core has no system trust store of its own.
    pub roots: Option<&'a CertPool>,
    /// Additional issuers considered during path building.
    pub intermediates: Option<&'a CertPool>,
    /// Verify at a specific Unix timestamp instead of the current time.
    pub current_time: Option<i64>,
    /// Hostname or textual IP to match against the leaf's identities.
    /// `None` or empty skips the identity check.
    pub dns_name: Option<String>,
    /// Acceptable extended key usages. Empty means server authentication;
    /// including [`ExtKeyUsage::Any`] disables EKU chaining entirely.
    pub key_usages: Vec<ExtKeyUsage>,
    /// Legacy Common-Name fallback policy for SAN-less leaves.
    pub legacy_common_name: LegacyCommonName,
    /// Budget for name-constraint comparisons across the whole build.
    /// Defaults to 250 000.
    pub max_constraint_comparisons: Option<usize>,
    /// Signature-check capability. Defaults to the built-in ring-backed
    /// verifier.
    pub signature_verifier: Option<&'a dyn SignatureVerifier>,
}

impl Default for VerifyOptions<'_> {
    fn default() -> Self {
        VerifyOptions {
            roots: None,
            intermediates: None,
            current_time: None,
            dns_name: None,
            key_usages: Vec::new(),
            legacy_common_name: LegacyCommonName::default(),
            max_constraint_comparisons: None,
            signature_verifier: None,
        }
    }
}

/// Verify `leaf` against the options, returning every valid chain
/// `[leaf, …, root]` or the most informative error.
///
/// The leaf is validated first (validity window, unhandled critical
/// extensions, host identity, extended key usage); then the path builder
/// enumerates chains to the trust anchors, bounded by the signature-check
/// and constraint-comparison budgets.
pub fn verify(
    leaf: &Arc<Certificate>,
    opts: &VerifyOptions<'_>,
) -> Result<Vec<Chain>, VerifyError> {
    let roots = opts
        .roots
        .ok_or(VerifyError::SystemRoots(SystemRootsError))?;
    let now = opts.current_time.unwrap_or_else(unix_now);
    let verifier = opts.signature_verifier.unwrap_or(&DEFAULT_VERIFIER);

    if !leaf.is_valid_at(now) {
        return Err(VerifyError::CertificateInvalid(CertificateInvalidError {
            cert: leaf.clone(),
            reason: InvalidReason::Expired,
            detail: format!(
                "current time {} is outside validity window {}..{}",
                now, leaf.not_before, leaf.not_after
            ),
        }));
    }

    if let Some(ext_oid) = leaf.unhandled_critical_extensions.first() {
        return Err(VerifyError::UnhandledCriticalExtension(
            UnhandledCriticalExtension {
                oid: ext_oid.clone(),
            },
        ));
    }

    if let Some(host) = opts.dns_name.as_deref() {
        if !host.is_empty() {
            verify_leaf_identity(leaf, host, opts.legacy_common_name)?;
        }
    }

    let requested = eku::initial_usages(&opts.key_usages);
    eku::check_leaf(leaf, &requested)?;

    // A certificate placed directly in the roots pool anchors itself.
    if roots.contains(leaf) {
        debug!("leaf {} is itself a trust anchor", leaf.display_name());
        return Ok(vec![vec![leaf.clone()]]);
    }

    debug!(
        "building chains for {} against {} roots",
        leaf.display_name(),
        roots.len()
    );
    chain::PathBuilder::new(
        leaf,
        roots,
        opts.intermediates,
        verifier,
        opts.legacy_common_name,
        now,
        opts.max_constraint_comparisons
            .unwrap_or(budget::DEFAULT_CONSTRAINT_COMPARISONS),
    )
    .run(requested)
}

/// Match the requested host identity against the leaf.
///
/// An IP literal must equal one of the leaf's IP SANs. A hostname is
/// lowercased, stripped of one trailing dot, and rejected outright when
/// syntactically invalid. Any SAN extension at all makes the SAN list
/// authoritative; the Common Name is only ever consulted for SAN-less
/// certificates under [`LegacyCommonName::Allow`].
fn verify_leaf_identity(
    leaf: &Arc<Certificate>,
    host: &str,
    legacy: LegacyCommonName,
) -> Result<(), VerifyError> {
    let fail = || {
        VerifyError::Hostname(HostnameError {
            certificate: leaf.clone(),
            host: host.to_string(),
            legacy_common_name: legacy,
        })
    };

    if let Some(ip) = util::parse_ip_literal(host) {
        if leaf.san_ip.contains(&ip) {
            return Ok(());
        }
        return Err(fail());
    }

    let candidate = util::normalize_hostname(host);
    if !util::valid_hostname_input(&candidate) {
        return Err(fail());
    }

    if leaf.has_san_extension {
        for pattern in &leaf.san_dns {
            if util::valid_hostname_pattern(pattern) && util::match_hostnames(pattern, &candidate)
            {
                return Ok(());
            }
        }
        return Err(fail());
    }

    match legacy {
        LegacyCommonName::Forbid => Err(fail()),
        LegacyCommonName::Allow => {
            let cn = leaf.subject.common_name().unwrap_or("");
            if util::valid_hostname_pattern(cn) && util::match_hostnames(cn, &candidate) {
                Ok(())
            } else {
                Err(fail())
            }
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
