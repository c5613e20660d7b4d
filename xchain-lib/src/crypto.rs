//! The signature-verification capability consumed by the verifier.
//!
//! The core never implements cryptography itself: every signature check goes
//! through the [`SignatureVerifier`] trait, which receives the opaque
//! algorithm identifier, public key, message, and signature bytes. The
//! built-in [`RingVerifier`] covers the algorithms certificates use on the
//! web today; everything else reports "algorithm unimplemented" so the
//! verifier can surface a distinct diagnostic.

use crate::cert::PublicKey;
use crate::oid;

/// Error from a single signature check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The signature does not verify under the given key.
    #[error("certificate signature does not verify")]
    InvalidSignature,
    /// The algorithm (or its combination with the key type) is not
    /// implemented by this verifier.
    #[error("cannot verify signature: algorithm unimplemented ({0})")]
    UnsupportedAlgorithm(String),
}

/// Capability to check one signature.
///
/// Implementations must be pure and thread-safe; the verifier may invoke
/// them from concurrent `verify` calls over shared pools.
pub trait SignatureVerifier: Send + Sync {
    /// Check `signature` over `message` under `public_key`, where the
    /// signature was produced with the algorithm identified by `algorithm`
    /// (a dotted-decimal OID).
    fn verify(
        &self,
        algorithm: &str,
        public_key: &PublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), SignatureError>;
}

/// The default verifier, backed by *ring*.
///
/// Supports RSA PKCS#1 v1.5 with SHA-256/384/512, ECDSA over P-256/P-384
/// with SHA-256/384 (ASN.1 signatures), and Ed25519. Notably SHA-1-based
/// algorithms are not implemented.
#[derive(Debug, Clone, Copy, Default)]
pub struct RingVerifier;

pub(crate) static DEFAULT_VERIFIER: RingVerifier = RingVerifier;

impl SignatureVerifier for RingVerifier {
    fn verify(
        &self,
        algorithm: &str,
        public_key: &PublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), SignatureError> {
        let alg = ring_algorithm(algorithm, public_key)
            .ok_or_else(|| SignatureError::UnsupportedAlgorithm(algorithm.to_string()))?;
        ring::signature::UnparsedPublicKey::new(alg, &public_key.data)
            .verify(message, signature)
            .map_err(|_| SignatureError::InvalidSignature)
    }
}

/// Map a signature algorithm OID plus key type/curve to a ring algorithm.
fn ring_algorithm(
    sig_alg: &str,
    key: &PublicKey,
) -> Option<&'static dyn ring::signature::VerificationAlgorithm> {
    use ring::signature as sig;

    let curve = key.curve.as_deref();
    let alg: &'static dyn sig::VerificationAlgorithm = match (sig_alg, key.algorithm.as_str()) {
        (oid::SHA256_WITH_RSA, oid::RSA_ENCRYPTION) => &sig::RSA_PKCS1_2048_8192_SHA256,
        (oid::SHA384_WITH_RSA, oid::RSA_ENCRYPTION) => &sig::RSA_PKCS1_2048_8192_SHA384,
        (oid::SHA512_WITH_RSA, oid::RSA_ENCRYPTION) => &sig::RSA_PKCS1_2048_8192_SHA512,
        (oid::ECDSA_WITH_SHA256, oid::EC_PUBLIC_KEY) => match curve {
            Some(oid::CURVE_P256) => &sig::ECDSA_P256_SHA256_ASN1,
            Some(oid::CURVE_P384) => &sig::ECDSA_P384_SHA256_ASN1,
            _ => return None,
        },
        (oid::ECDSA_WITH_SHA384, oid::EC_PUBLIC_KEY) => match curve {
            Some(oid::CURVE_P256) => &sig::ECDSA_P256_SHA384_ASN1,
            Some(oid::CURVE_P384) => &sig::ECDSA_P384_SHA384_ASN1,
            _ => return None,
        },
        (oid::ED25519, oid::ED25519) => &sig::ED25519,
        _ => return None,
    };
    Some(alg)
}
