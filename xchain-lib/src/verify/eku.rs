//! Extended-key-usage propagation along the chain.
//!
//! The acceptable EKU set starts from the caller's request and can only
//! shrink as the chain is ascended (RFC 5280 Section 4.2.1.12 as practiced:
//! CA EKU lists constrain what their subordinates may be used for). A leaf
//! or CA without an EKU extension imposes nothing.

use std::sync::Arc;

use crate::cert::{Certificate, ExtKeyUsage};
use crate::error::{CertificateInvalidError, InvalidReason, VerifyError};

/// The requested usages to chain with: `None` disables EKU checking
/// entirely (the caller asked for `Any`), otherwise the non-empty list to
/// narrow. An empty request defaults to `ServerAuth`.
pub(super) fn initial_usages(requested: &[ExtKeyUsage]) -> Option<Vec<ExtKeyUsage>> {
    if requested.contains(&ExtKeyUsage::Any) {
        return None;
    }
    if requested.is_empty() {
        Some(vec![ExtKeyUsage::ServerAuth])
    } else {
        Some(requested.to_vec())
    }
}

/// Narrow `remaining` by a certificate's EKU list. An absent list or an
/// `Any` entry passes everything through.
pub(super) fn narrow(remaining: &[ExtKeyUsage], cert: &Certificate) -> Vec<ExtKeyUsage> {
    if cert.ext_key_usages.is_empty() || cert.ext_key_usages.contains(&ExtKeyUsage::Any) {
        return remaining.to_vec();
    }
    remaining
        .iter()
        .filter(|usage| satisfies(cert, usage))
        .cloned()
        .collect()
}

/// Pre-flight check of the leaf's own EKUs against the initial request,
/// before any path building.
pub(super) fn check_leaf(
    leaf: &Arc<Certificate>,
    requested: &Option<Vec<ExtKeyUsage>>,
) -> Result<(), VerifyError> {
    let Some(remaining) = requested else {
        return Ok(());
    };
    if narrow(remaining, leaf).is_empty() {
        return Err(VerifyError::CertificateInvalid(CertificateInvalidError {
            cert: leaf.clone(),
            reason: InvalidReason::IncompatibleUsage,
            detail: String::new(),
        }));
    }
    Ok(())
}

fn satisfies(cert: &Certificate, usage: &ExtKeyUsage) -> bool {
    if cert.ext_key_usages.contains(usage) {
        return true;
    }
    // Legacy Server-Gated-Crypto EKUs on older CAs still authorize TLS
    // server usage below them.
    *usage == ExtKeyUsage::ServerAuth
        && (cert
            .ext_key_usages
            .contains(&ExtKeyUsage::MicrosoftServerGatedCrypto)
            || cert
                .ext_key_usages
                .contains(&ExtKeyUsage::NetscapeServerGatedCrypto))
}
