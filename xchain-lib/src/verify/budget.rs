//! Work budgets that bound the path search against adversarial graphs.
//!
//! Both counters count down; hitting zero aborts the entire verification,
//! unlike per-edge failures which only skip a candidate.

use std::sync::Arc;

use crate::cert::Certificate;
use crate::error::{CertificateInvalidError, InvalidReason, VerifyError};

/// Signature checks allowed per `verify` call. Taken from the remediation
/// for CVE-2018-16875: enough for any realistic cross-signed mesh, far too
/// small for a quadratic blow-up over shared-subject intermediates.
const SIGNATURE_CHECK_LIMIT: usize = 100;

/// Name-constraint comparisons allowed per `verify` call unless the caller
/// overrides it.
pub(super) const DEFAULT_CONSTRAINT_COMPARISONS: usize = 250_000;

pub(super) struct Budget {
    leaf: Arc<Certificate>,
    signature_checks: usize,
    name_comparisons: usize,
}

impl Budget {
    pub(super) fn new(leaf: Arc<Certificate>, max_name_comparisons: usize) -> Self {
        Budget {
            leaf,
            signature_checks: SIGNATURE_CHECK_LIMIT,
            name_comparisons: max_name_comparisons,
        }
    }

    pub(super) fn consume_signature_check(&mut self) -> Result<(), VerifyError> {
        match self.signature_checks.checked_sub(1) {
            Some(rest) => {
                self.signature_checks = rest;
                Ok(())
            }
            None => Err(self.exhausted(InvalidReason::SignatureCheckFailure)),
        }
    }

    pub(super) fn consume_name_comparisons(&mut self, n: usize) -> Result<(), VerifyError> {
        match self.name_comparisons.checked_sub(n) {
            Some(rest) => {
                self.name_comparisons = rest;
                Ok(())
            }
            None => Err(self.exhausted(InvalidReason::TooManyConstraintComparisons)),
        }
    }

    fn exhausted(&self, reason: InvalidReason) -> VerifyError {
        VerifyError::CertificateInvalid(CertificateInvalidError {
            cert: self.leaf.clone(),
            reason,
            detail: String::new(),
        })
    }
}

/// Whether a recorded error is a budget exhaustion that must abort the
/// whole search rather than skip a candidate.
pub(super) fn is_fatal(err: &VerifyError) -> bool {
    matches!(
        err,
        VerifyError::CertificateInvalid(e) if matches!(
            e.reason,
            InvalidReason::SignatureCheckFailure | InvalidReason::TooManyConstraintComparisons
        )
    )
}
