//! X.509 certificate path building and verification.
//!
//! Given a leaf certificate, a pool of trusted roots, a pool of candidate
//! intermediates, and a set of verification parameters, [`verify`]
//! enumerates every valid chain from the leaf up to a trust anchor,
//! checking signatures, validity windows, basic constraints, RFC 5280 name
//! constraints, extended key usages, and the requested host identity. It
//! either returns the chains or fails with a precisely-classified error.
//!
//! The core operates on parsed [`Certificate`] values and a pluggable
//! [`SignatureVerifier`] capability; it never parses DER itself. The
//! bundled parsing adapter ([`certificate_from_der`],
//! [`certificates_from_pem`]) converts DER or PEM input into the
//! certificate model, and [`RingVerifier`] provides the default
//! cryptography.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use xchain_lib::{verify, CertPool, VerifyOptions};
//!
//! let leaf_pem = std::fs::read("leaf.pem").expect("read leaf");
//! let leaf = Arc::new(
//!     xchain_lib::certificates_from_pem(&leaf_pem)
//!         .expect("parse leaf")
//!         .remove(0),
//! );
//!
//! let mut roots = CertPool::new();
//! roots.append_from_pem(&std::fs::read("roots.pem").expect("read roots"));
//!
//! let mut intermediates = CertPool::new();
//! intermediates.append_from_pem(&std::fs::read("chain.pem").expect("read chain"));
//!
//! let opts = VerifyOptions {
//!     roots: Some(&roots),
//!     intermediates: Some(&intermediates),
//!     dns_name: Some("www.example.com".into()),
//!     ..VerifyOptions::default()
//! };
//! let chains = verify(&leaf, &opts).expect("verification failed");
//! println!("found {} chain(s)", chains.len());
//! ```

mod cert;
mod crypto;
mod error;
mod name;
pub mod oid;
mod parser;
mod pool;
mod util;
mod verify;

pub use cert::{
    format_ip_bytes, Certificate, ExtKeyUsage, IpCidr, KeyUsage, PublicKey,
};
pub use crypto::{RingVerifier, SignatureError, SignatureVerifier};
pub use error::{
    CertificateInvalidError, HostnameError, InvalidReason, SystemRootsError,
    UnhandledCriticalExtension, UnknownAuthorityError, VerifyError,
};
pub use name::{AttributeTypeAndValue, DistinguishedName, Rdn};
pub use parser::{certificate_from_der, certificates_from_pem, ParseError};
pub use pool::CertPool;
pub use verify::{verify, Chain, LegacyCommonName, VerifyOptions};
