//! Chain building: depth-first search from the leaf up to a trust anchor.
//!
//! The candidate graph is a DAG, not a tree: the same certificate can be
//! reachable along several paths, and cross-signed or duplicated issuers
//! are common. Cycle prevention is "not already in the current chain";
//! memoizing across paths would be unsound because the EKU and constraint
//! state differ per path.

use std::sync::Arc;

use log::debug;

use crate::cert::{Certificate, ExtKeyUsage};
use crate::crypto::SignatureVerifier;
use crate::error::{
    CertificateInvalidError, InvalidReason, UnknownAuthorityError, VerifyError,
};
use crate::pool::CertPool;

use super::budget::{is_fatal, Budget};
use super::{constraints, eku, Chain, LegacyCommonName};

/// Maximum number of intermediates in a single chain.
const MAX_INTERMEDIATE_DEPTH: usize = 15;

#[derive(Clone, Copy, PartialEq, Eq)]
enum CertType {
    Intermediate,
    Root,
}

pub(super) struct PathBuilder<'a> {
    leaf: &'a Arc<Certificate>,
    roots: &'a CertPool,
    intermediates: Option<&'a CertPool>,
    verifier: &'a dyn SignatureVerifier,
    legacy: LegacyCommonName,
    now: i64,
    budget: Budget,
    chains: Vec<Chain>,
    /// Most informative per-edge failure seen so far.
    best_err: Option<VerifyError>,
    /// First signature failure, kept for the unknown-authority diagnostic.
    hint_err: Option<Box<VerifyError>>,
    hint_cert: Option<Arc<Certificate>>,
}

impl<'a> PathBuilder<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        leaf: &'a Arc<Certificate>,
        roots: &'a CertPool,
        intermediates: Option<&'a CertPool>,
        verifier: &'a dyn SignatureVerifier,
        legacy: LegacyCommonName,
        now: i64,
        max_name_comparisons: usize,
    ) -> Self {
        PathBuilder {
            leaf,
            roots,
            intermediates,
            verifier,
            legacy,
            now,
            budget: Budget::new(leaf.clone(), max_name_comparisons),
            chains: Vec::new(),
            best_err: None,
            hint_err: None,
            hint_cert: None,
        }
    }

    /// Run the search. Returns every distinct chain found, or the most
    /// informative error when no chain exists. Budget exhaustion aborts
    /// immediately.
    pub(super) fn run(
        mut self,
        initial_eku: Option<Vec<ExtKeyUsage>>,
    ) -> Result<Vec<Chain>, VerifyError> {
        let mut chain = vec![self.leaf.clone()];
        self.build(&mut chain, &initial_eku)?;

        if self.chains.is_empty() {
            return Err(self.into_error());
        }
        Ok(dedup_chains(self.chains))
    }

    fn build(
        &mut self,
        chain: &mut Chain,
        remaining_eku: &Option<Vec<ExtKeyUsage>>,
    ) -> Result<(), VerifyError> {
        let child = chain.last().expect("chain is never empty").clone();

        for candidate in ordered_candidates(self.roots, &child) {
            self.consider(chain, remaining_eku, candidate, CertType::Root)?;
        }
        if let Some(pool) = self.intermediates {
            for candidate in ordered_candidates(pool, &child) {
                self.consider(chain, remaining_eku, candidate, CertType::Intermediate)?;
            }
        }
        Ok(())
    }

    fn consider(
        &mut self,
        chain: &mut Chain,
        remaining_eku: &Option<Vec<ExtKeyUsage>>,
        candidate: Arc<Certificate>,
        cert_type: CertType,
    ) -> Result<(), VerifyError> {
        // Loop prevention: a chain never contains the same certificate
        // twice. Structural equality, so the same certificate parsed into
        // both pools still counts as one.
        if chain.iter().any(|c| **c == *candidate) {
            return Ok(());
        }

        let child = chain.last().expect("chain is never empty").clone();

        // Trust anchors are accepted by declaration; only transit
        // certificates have to prove CA authority. An X.509 v1/v2
        // certificate can never do so because it cannot carry
        // BasicConstraints.
        if cert_type == CertType::Intermediate
            && (!candidate.basic_constraints_valid || !candidate.is_ca)
        {
            self.record(invalid(
                &candidate,
                InvalidReason::NotAuthorizedToSign,
                String::new(),
            ));
            return Ok(());
        }

        if candidate.key_usage.is_present() && !candidate.key_usage.key_cert_sign() {
            self.record(invalid(
                &candidate,
                InvalidReason::NotAuthorizedToSign,
                String::new(),
            ));
            return Ok(());
        }

        if !candidate.is_valid_at(self.now) {
            self.record(invalid(
                &candidate,
                InvalidReason::Expired,
                format!(
                    "current time {} is outside validity window {}..{}",
                    self.now, candidate.not_before, candidate.not_after
                ),
            ));
            return Ok(());
        }

        if let Some(max_path_len) = candidate.max_path_len {
            let intermediates_below = chain[1..]
                .iter()
                .filter(|c| !c.is_self_issued())
                .count();
            if intermediates_below as u64 > u64::from(max_path_len) {
                self.record(invalid(
                    &candidate,
                    InvalidReason::TooManyIntermediates,
                    String::new(),
                ));
                return Ok(());
            }
        }

        if let Err(e) =
            constraints::check_ca_constraints(&candidate, chain, self.legacy, &mut self.budget)
        {
            if is_fatal(&e) {
                return Err(e);
            }
            self.record(e);
            return Ok(());
        }

        let next_eku = match remaining_eku {
            None => None,
            Some(remaining) => {
                let next = eku::narrow(remaining, &candidate);
                if next.is_empty() {
                    self.record(invalid(
                        &candidate,
                        InvalidReason::IncompatibleUsage,
                        String::new(),
                    ));
                    return Ok(());
                }
                Some(next)
            }
        };

        self.budget.consume_signature_check()?;
        if let Err(sig_err) = child.verify_signature(&candidate, self.verifier) {
            debug!(
                "candidate {} rejected for {}: {}",
                candidate.display_name(),
                child.display_name(),
                sig_err
            );
            if self.hint_err.is_none() {
                self.hint_err = Some(Box::new(VerifyError::Signature(sig_err)));
                self.hint_cert = Some(candidate);
            }
            return Ok(());
        }

        if let Some(ext_oid) = candidate.unhandled_critical_extensions.first() {
            self.record(VerifyError::UnhandledCriticalExtension(
                crate::error::UnhandledCriticalExtension {
                    oid: ext_oid.clone(),
                },
            ));
            return Ok(());
        }

        if cert_type == CertType::Root {
            let mut complete = chain.clone();
            complete.push(candidate);
            debug!(
                "found chain of length {} anchored at {}",
                complete.len(),
                complete.last().expect("non-empty").display_name()
            );
            self.chains.push(complete);
            // Keep searching: other candidates can yield alternate chains.
            return Ok(());
        }

        // chain currently holds the leaf plus the intermediates below the
        // candidate; adding the candidate must stay within the depth bound.
        if chain.len() > MAX_INTERMEDIATE_DEPTH {
            self.record(invalid(
                &candidate,
                InvalidReason::TooManyIntermediates,
                format!("chain depth exceeds {} intermediates", MAX_INTERMEDIATE_DEPTH),
            ));
            return Ok(());
        }

        chain.push(candidate);
        let result = self.build(chain, &next_eku);
        chain.pop();
        result
    }

    fn record(&mut self, err: VerifyError) {
        let replace = match &self.best_err {
            None => true,
            Some(current) => err.search_priority() > current.search_priority(),
        };
        if replace {
            self.best_err = Some(err);
        }
    }

    fn into_error(self) -> VerifyError {
        match self.best_err {
            Some(err) => err,
            None => VerifyError::UnknownAuthority(UnknownAuthorityError {
                cert: self.leaf.clone(),
                hint_err: self.hint_err,
                hint_cert: self.hint_cert,
            }),
        }
    }
}

fn invalid(cert: &Arc<Certificate>, reason: InvalidReason, detail: String) -> VerifyError {
    VerifyError::CertificateInvalid(CertificateInvalidError {
        cert: cert.clone(),
        reason,
        detail,
    })
}

/// Candidate parents for `child` from one pool: every entry whose subject
/// equals the child's issuer. A candidate whose subject key id matches the
/// child's authority key id sorts first; the rest keep insertion order.
/// The key ids are an ordering heuristic only, never a filter: a child
/// with an AKID still chains to a subject-matching parent without any SKID.
fn ordered_candidates(pool: &CertPool, child: &Certificate) -> Vec<Arc<Certificate>> {
    let mut candidates: Vec<Arc<Certificate>> =
        pool.certs_with_subject(&child.issuer).cloned().collect();
    if let Some(akid) = &child.authority_key_id {
        candidates.sort_by_key(|c| match &c.subject_key_id {
            Some(skid) if skid == akid => 0u8,
            _ => 1u8,
        });
    }
    candidates
}

/// Drop chains that are exact sequence duplicates of an earlier one.
fn dedup_chains(chains: Vec<Chain>) -> Vec<Chain> {
    let mut out: Vec<Chain> = Vec::new();
    for chain in chains {
        if !out.contains(&chain) {
            out.push(chain);
        }
    }
    out
}
