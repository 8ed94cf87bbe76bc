//! Hashing helpers and the randomness guard.
//!
//! Everything the agent does on the request path is deterministic given the
//! key and the input: Ed25519 and PKCS#1 v1.5 signatures, raw RSA
//! private-key operations, and hash computations. [`ForbiddenRng`] is the
//! only RNG handle in the crate and it aborts the process on first use.

use base64::Engine as _;
use md5::{Digest as _, Md5};
use rand_core::{CryptoRng, RngCore};
use sha2::Sha256;

/// Compute the SSH-2 fingerprint of a public blob.
///
/// Returns a string like `"SHA256:base64data"`. Used only in logs.
pub fn sha256_fingerprint(blob: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(blob);
    let sum = hasher.finalize();
    format!(
        "SHA256:{}",
        base64::engine::general_purpose::STANDARD_NO_PAD.encode(sum)
    )
}

/// Compute the SSH-1 fingerprint of an RSA key.
///
/// Returns `"<bits> <aa:bb:...>"`: the modulus size followed by the
/// colon-separated MD5 of the modulus and exponent magnitudes. Used only
/// in logs.
pub fn rsa_ssh1_fingerprint(bits: u32, modulus: &[u8], exponent: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(modulus);
    hasher.update(exponent);
    let sum = hasher.finalize();
    let hexpairs: Vec<String> = sum.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{} {}", bits, hexpairs.join(":"))
}

/// Compute the SSH-1 challenge response hash.
///
/// `response` must be the 32-byte big-endian representation of the
/// decrypted challenge (zero-padded at the front if the plaintext was
/// shorter). The result is `MD5(response || session_id)`.
pub fn rsa1_challenge_response(response: &[u8; 32], session_id: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(response);
    hasher.update(session_id);
    hasher.finalize().into()
}

/// RNG handle that terminates the process on first use.
///
/// The agent must never consume randomness while handling a request; every
/// operation it performs is deterministic. This type stands wherever an
/// API would accept a random source, so that a code change which starts
/// drawing randomness is caught immediately rather than silently weakening
/// a signing path.
#[derive(Debug, Default)]
pub struct ForbiddenRng;

impl ForbiddenRng {
    fn forbidden(&self) -> ! {
        tracing::error!("internal error: attempt to use random numbers in the agent");
        std::process::abort();
    }
}

impl RngCore for ForbiddenRng {
    fn next_u32(&mut self) -> u32 {
        self.forbidden()
    }

    fn next_u64(&mut self) -> u64 {
        self.forbidden()
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        self.forbidden()
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.forbidden()
    }
}

impl CryptoRng for ForbiddenRng {}
