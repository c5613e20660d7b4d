//! Certificate pools: unordered sets with a by-subject lookup index.
//!
//! Two pools take part in every verification: the trust anchors and the
//! candidate intermediates. A pool is append-only; once populated it is
//! read-only during verification and safe to share across threads.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cert::Certificate;
use crate::name::DistinguishedName;
use crate::parser;

/// A set of certificates indexed by subject distinguished name.
///
/// Insertion order is preserved per subject and is the tie-break order the
/// parent selector falls back to.
#[derive(Clone, Default)]
pub struct CertPool {
    certs: Vec<Arc<Certificate>>,
    by_subject: HashMap<DistinguishedName, Vec<usize>>,
}

impl std::fmt::Debug for CertPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertPool")
            .field("count", &self.certs.len())
            .finish()
    }
}

impl CertPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        CertPool::default()
    }

    /// Append a certificate. Structural duplicates are skipped; returns
    /// whether the certificate was actually added.
    pub fn add(&mut self, cert: Arc<Certificate>) -> bool {
        let bucket = self.by_subject.entry(cert.subject.clone()).or_default();
        if bucket.iter().any(|&i| *self.certs[i] == *cert) {
            return false;
        }
        bucket.push(self.certs.len());
        self.certs.push(cert);
        true
    }

    /// Append every `CERTIFICATE` block from a PEM bundle, skipping blocks
    /// that fail to parse. Returns whether any certificate was added.
    pub fn append_from_pem(&mut self, pem: &[u8]) -> bool {
        let certs = match parser::certificates_from_pem(pem) {
            Ok(certs) => certs,
            Err(_) => return false,
        };
        let mut added = false;
        for cert in certs {
            added |= self.add(Arc::new(cert));
        }
        added
    }

    /// Certificates whose subject equals `name`, in insertion order.
    pub fn certs_with_subject<'a>(
        &'a self,
        name: &DistinguishedName,
    ) -> impl Iterator<Item = &'a Arc<Certificate>> {
        self.by_subject
            .get(name)
            .into_iter()
            .flatten()
            .map(move |&i| &self.certs[i])
    }

    /// Structural membership test.
    pub fn contains(&self, cert: &Certificate) -> bool {
        self.by_subject
            .get(&cert.subject)
            .map(|bucket| bucket.iter().any(|&i| *self.certs[i] == *cert))
            .unwrap_or(false)
    }

    /// All certificates, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Certificate>> {
        self.certs.iter()
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }
}
