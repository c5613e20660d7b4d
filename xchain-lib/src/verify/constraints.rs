//! Name-constraint checking (RFC 5280 Section 4.2.1.10).
//!
//! A CA's permitted and excluded subtrees constrain every certificate
//! beneath it in the chain; the CA's own subject is never tested, so a trust
//! anchor can never reject itself. Enforcing each ancestor's subtrees
//! against everything below it realizes the constraint algebra: a name must
//! fall inside every ancestor's permitted set (intersection) and outside
//! every ancestor's excluded set (union), and a SubCA can therefore only
//! ever restrict what its parent allowed.

use std::net::IpAddr;
use std::sync::Arc;

use crate::cert::Certificate;
use crate::error::{CertificateInvalidError, InvalidReason, VerifyError};
use crate::name::DistinguishedName;
use crate::util;

use super::budget::Budget;
use super::LegacyCommonName;

/// Check a candidate CA's name constraints against every certificate below
/// it in the chain under construction (`chain_below[0]` is the leaf).
///
/// Self-issued intermediates are exempt; the leaf never is.
pub(super) fn check_ca_constraints(
    ca: &Certificate,
    chain_below: &[Arc<Certificate>],
    legacy: LegacyCommonName,
    budget: &mut Budget,
) -> Result<(), VerifyError> {
    if !ca.has_name_constraints() {
        return Ok(());
    }

    for (idx, cert) in chain_below.iter().enumerate() {
        let is_leaf = idx == 0;
        if !is_leaf && cert.is_self_issued() {
            continue;
        }

        // A SAN-less leaf whose Common Name is serving as its hostname
        // identity has no names the constraints could be applied to.
        if is_leaf
            && legacy == LegacyCommonName::Allow
            && !cert.has_san_extension
            && cert
                .subject
                .common_name()
                .is_some_and(util::valid_hostname_pattern)
        {
            return Err(VerifyError::CertificateInvalid(CertificateInvalidError {
                cert: cert.clone(),
                reason: InvalidReason::NameConstraintsWithoutSANs,
                detail: String::new(),
            }));
        }

        if cert.has_san_extension {
            for name in &cert.san_dns {
                check_name(
                    cert,
                    "DNS name",
                    name,
                    name,
                    &ca.permitted_dns,
                    &ca.excluded_dns,
                    budget,
                    |c| c.clone(),
                    |n: &String, c| match_domain_constraint(n, c),
                )?;
            }
            for email in &cert.san_email {
                check_name(
                    cert,
                    "rfc822Name",
                    email,
                    email,
                    &ca.permitted_email,
                    &ca.excluded_email,
                    budget,
                    |c| c.clone(),
                    |e: &String, c| match_email_constraint(e, c),
                )?;
            }
            for ip in &cert.san_ip {
                let bytes = ip_bytes(ip);
                check_name(
                    cert,
                    "IP address",
                    &ip.to_string(),
                    &bytes,
                    &ca.permitted_ip,
                    &ca.excluded_ip,
                    budget,
                    |c| c.to_string(),
                    |b: &Vec<u8>, c| Ok(c.contains(b)),
                )?;
            }
            for uri in &cert.san_uri {
                check_name(
                    cert,
                    "URI",
                    uri,
                    uri,
                    &ca.permitted_uri,
                    &ca.excluded_uri,
                    budget,
                    |c| c.clone(),
                    |u: &String, c| match_uri_constraint(u, c),
                )?;
            }
        }

        if !cert.subject.is_empty() {
            check_name(
                cert,
                "directory name",
                &cert.subject.to_oneline(),
                &cert.subject,
                &ca.permitted_dir_names,
                &ca.excluded_dir_names,
                budget,
                |c| c.to_oneline(),
                |s: &DistinguishedName, c| Ok(s.has_rdn_prefix(c)),
            )?;
        }
    }

    Ok(())
}

/// Check one name against a permitted and an excluded subtree list.
/// Excluded wins first; a non-empty permitted list must then cover the name.
#[allow(clippy::too_many_arguments)]
fn check_name<N, C>(
    cert: &Arc<Certificate>,
    kind: &str,
    name_display: &str,
    name: &N,
    permitted: &[C],
    excluded: &[C],
    budget: &mut Budget,
    constraint_display: impl Fn(&C) -> String,
    matches: impl Fn(&N, &C) -> Result<bool, String>,
) -> Result<(), VerifyError> {
    budget.consume_name_comparisons(excluded.len())?;
    for constraint in excluded {
        match matches(name, constraint) {
            Ok(true) => {
                return Err(violation(
                    cert,
                    format!(
                        "{} {:?} is excluded by constraint {:?}",
                        kind,
                        name_display,
                        constraint_display(constraint)
                    ),
                ))
            }
            Ok(false) => {}
            Err(e) => return Err(violation(cert, e)),
        }
    }

    if permitted.is_empty() {
        return Ok(());
    }
    budget.consume_name_comparisons(permitted.len())?;
    for constraint in permitted {
        match matches(name, constraint) {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => return Err(violation(cert, e)),
        }
    }
    Err(violation(
        cert,
        format!("{} {:?} is not permitted by any constraint", kind, name_display),
    ))
}

fn violation(cert: &Arc<Certificate>, detail: String) -> VerifyError {
    VerifyError::CertificateInvalid(CertificateInvalidError {
        cert: cert.clone(),
        reason: InvalidReason::CANotAuthorizedForThisName,
        detail,
    })
}

fn ip_bytes(ip: &IpAddr) -> Vec<u8> {
    match ip {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

/// Split a domain into reverse-order labels, rejecting empty labels (which
/// covers leading/trailing dots).
fn reverse_labels(domain: &str) -> Option<Vec<&str>> {
    if domain.is_empty() {
        return Some(Vec::new());
    }
    let labels: Vec<&str> = domain.split('.').rev().collect();
    if labels.iter().any(|l| l.is_empty()) {
        return None;
    }
    Some(labels)
}

/// Match a DNS name against a constraint domain.
///
/// An empty constraint matches everything. `example.com` matches itself and
/// any subdomain; `.example.com` matches subdomains only. Malformed names
/// or constraints (empty labels, trailing dots) are errors, not mismatches.
pub(super) fn match_domain_constraint(domain: &str, constraint: &str) -> Result<bool, String> {
    if constraint.is_empty() {
        return Ok(true);
    }

    let domain_labels =
        reverse_labels(domain).ok_or_else(|| format!("cannot parse dnsName {:?}", domain))?;

    let (must_have_subdomains, constraint) = match constraint.strip_prefix('.') {
        Some(rest) => (true, rest),
        None => (false, constraint),
    };
    let constraint_labels = reverse_labels(constraint)
        .ok_or_else(|| format!("cannot parse dnsName constraint {:?}", constraint))?;

    if domain_labels.len() < constraint_labels.len()
        || (must_have_subdomains && domain_labels.len() == constraint_labels.len())
    {
        return Ok(false);
    }
    Ok(constraint_labels
        .iter()
        .zip(domain_labels.iter())
        .all(|(c, d)| c.eq_ignore_ascii_case(d)))
}

/// Match an rfc822Name against a constraint: a full mailbox matches
/// exactly, a domain (optionally dot-prefixed for subdomains-only) matches
/// the mailbox's domain part.
pub(super) fn match_email_constraint(email: &str, constraint: &str) -> Result<bool, String> {
    if constraint.contains('@') {
        return Ok(email.eq_ignore_ascii_case(constraint));
    }
    let (_, domain) = email
        .rsplit_once('@')
        .ok_or_else(|| format!("cannot parse rfc822Name {:?}", email))?;
    match_domain_constraint(domain, constraint)
}

/// Match a URI's host component against a DNS constraint. Hosts that are
/// IP addresses (or empty) cannot satisfy a domain constraint and are
/// errors.
pub(super) fn match_uri_constraint(uri: &str, constraint: &str) -> Result<bool, String> {
    let rest = uri
        .split_once("://")
        .map(|(_, rest)| rest)
        .ok_or_else(|| format!("cannot parse URI {:?}", uri))?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host = authority
        .rsplit_once('@')
        .map(|(_, host)| host)
        .unwrap_or(authority);
    let host = strip_port(host);

    if host.is_empty() {
        return Err(format!(
            "URI with empty host ({:?}) cannot be matched against constraints",
            uri
        ));
    }
    if (host.starts_with('[') && host.ends_with(']')) || host.parse::<IpAddr>().is_ok() {
        return Err(format!(
            "URI with IP ({:?}) cannot be matched against constraints",
            uri
        ));
    }
    match_domain_constraint(host, constraint)
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // Bracketed IPv6 literal, possibly with a port after the bracket.
        return match host.rfind(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}
