//! Key types and signing algorithms.
//!
//! # Supported Algorithms
//!
//! - `ssh-ed25519` - EdDSA signature using Ed25519
//! - `ssh-rsa` - RSA signatures; SHA-1 by default, SHA-256/SHA-512 when
//!   selected by the sign-request flags (RFC 8332)
//!
//! SSH-1 keys are always RSA and are used for challenge-response rather
//! than signing.
//!
//! # Security
//!
//! - Private key material is zeroized on drop (`ed25519_dalek::SigningKey`
//!   and `rsa::RsaPrivateKey` both implement `ZeroizeOnDrop`); transient
//!   copies of secret wire fields are held in [`zeroize::Zeroizing`]
//!   buffers.
//! - All signing and decryption is deterministic; no RNG is consumed (see
//!   [`crate::agent::crypto::ForbiddenRng`]).

use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use rsa::traits::{PrivateKeyParts as _, PublicKeyParts as _};
use rsa::{BigUint, RsaPrivateKey};
use vigil_platform::{VigilError, VigilResult};
use zeroize::Zeroizing;

use crate::agent::codec::{MessageReader, MessageWriter, Rsa1Order, RsaSsh1Public};
use crate::agent::crypto;

/// Sign-request flag selecting an RSA/SHA-256 signature (RFC 8332).
pub const SSH_AGENT_RSA_SHA2_256: u32 = 0x02;

/// Sign-request flag selecting an RSA/SHA-512 signature (RFC 8332).
pub const SSH_AGENT_RSA_SHA2_512: u32 = 0x04;

/// An SSH-2 private key held by the agent.
///
/// Implementations carry the secret material and know how to produce the
/// canonical public blob and wire-format signatures. The flag handling
/// contract is strict: [`supported_flags`](UserKey::supported_flags)
/// declares every flag bit the algorithm understands, and the request
/// handler refuses sign requests carrying any other bit before
/// [`sign`](UserKey::sign) is reached.
pub trait UserKey: Send + Sync {
    /// The algorithm identifier, e.g. `"ssh-ed25519"`.
    fn algorithm_name(&self) -> &'static str;

    /// The canonical SSH-2 public blob: `string algorithm_name` followed
    /// by algorithm-specific data.
    fn public_blob(&self) -> Vec<u8>;

    /// Every sign-request flag bit this algorithm accepts.
    fn supported_flags(&self) -> u32 {
        0
    }

    /// Checks whether this particular key can serve a request with the
    /// given (already validated) flags. Returns a human-readable reason
    /// if it cannot.
    fn invalid_for_flags(&self, _flags: u32) -> Option<String> {
        None
    }

    /// Signs `data`, returning the SSH signature blob
    /// (`string algorithm_name || string signature_bytes`).
    fn sign(&self, data: &[u8], flags: u32) -> VigilResult<Vec<u8>>;
}

/// The SSH-2 algorithms this agent accepts in `ADD_IDENTITY` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// `ssh-ed25519`
    Ed25519,
    /// `ssh-rsa`
    Rsa,
}

impl KeyAlgorithm {
    /// Looks up an algorithm by its wire name.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"ssh-ed25519" => Some(KeyAlgorithm::Ed25519),
            b"ssh-rsa" => Some(KeyAlgorithm::Rsa),
            _ => None,
        }
    }

    /// The algorithm's wire name.
    pub fn name(&self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => "ssh-ed25519",
            KeyAlgorithm::Rsa => "ssh-rsa",
        }
    }

    /// Parses the algorithm-specific private key fields of an
    /// `ADD_IDENTITY` request body.
    ///
    /// Returns `None` if the fields do not form a usable key. Decode
    /// errors (short reads) are left in the reader's sticky flag for the
    /// caller to check once the whole request has been consumed.
    pub fn new_private(&self, msg: &mut MessageReader<'_>) -> Option<Box<dyn UserKey>> {
        match self {
            KeyAlgorithm::Ed25519 => {
                Ed25519UserKey::new_private(msg).map(|k| Box::new(k) as Box<dyn UserKey>)
            }
            KeyAlgorithm::Rsa => {
                RsaUserKey::new_private(msg).map(|k| Box::new(k) as Box<dyn UserKey>)
            }
        }
    }
}

/// Ed25519 agent key (ssh-ed25519).
pub struct Ed25519UserKey {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl Ed25519UserKey {
    /// Creates a key from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Parses the `ADD_IDENTITY` private fields:
    /// `string public (32) || string private (64: seed || public)`.
    ///
    /// Returns `None` when the fields are inconsistent: wrong lengths, a
    /// private half whose embedded public copy disagrees, or a public
    /// half that does not match the seed.
    pub fn new_private(msg: &mut MessageReader<'_>) -> Option<Self> {
        let public = msg.get_string();
        let private = Zeroizing::new(msg.get_string().to_vec());
        if msg.has_err() || public.len() != 32 || private.len() != 64 {
            return None;
        }
        if &private[32..] != public {
            return None;
        }

        let mut seed = Zeroizing::new([0u8; 32]);
        seed.copy_from_slice(&private[..32]);
        let key = Self::from_seed(&seed);
        if key.verifying_key.as_bytes() != public {
            return None;
        }
        Some(key)
    }

    /// The verifying half, for tests and local management.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

impl UserKey for Ed25519UserKey {
    fn algorithm_name(&self) -> &'static str {
        "ssh-ed25519"
    }

    fn public_blob(&self) -> Vec<u8> {
        let mut w = MessageWriter::new();
        w.put_string(b"ssh-ed25519");
        w.put_string(self.verifying_key.as_bytes());
        w.into_vec()
    }

    fn sign(&self, data: &[u8], _flags: u32) -> VigilResult<Vec<u8>> {
        let signature = self.signing_key.sign(data);

        let mut w = MessageWriter::new();
        w.put_string(b"ssh-ed25519");
        w.put_string(&signature.to_bytes());
        Ok(w.into_vec())
    }
}

impl std::fmt::Debug for Ed25519UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519UserKey")
            .field("algorithm", &"ssh-ed25519")
            .field("public_key", &hex::encode(self.verifying_key.as_bytes()))
            .finish_non_exhaustive()
    }
}

/// RSA agent key (ssh-rsa).
///
/// One stored key serves all three signature variants; the sign-request
/// flags select the hash (RFC 8332).
pub struct RsaUserKey {
    key: RsaPrivateKey,
}

impl RsaUserKey {
    /// Creates a key from raw components. The primes must multiply to the
    /// modulus and the exponents must be consistent.
    pub fn from_components(
        n: BigUint,
        e: BigUint,
        d: BigUint,
        primes: Vec<BigUint>,
    ) -> VigilResult<Self> {
        let key = RsaPrivateKey::from_components(n, e, d, primes)
            .map_err(|e| VigilError::security(format!("invalid RSA private key: {}", e)))?;
        Ok(Self { key })
    }

    /// Parses the `ADD_IDENTITY` private fields:
    /// `mpint n || mpint e || mpint d || mpint iqmp || mpint p || mpint q`
    /// (each an SSH-2 string-framed mpint).
    ///
    /// The supplied `iqmp` is discarded; the CRT parameters are recomputed
    /// from the primes, so an inconsistent value cannot corrupt signing.
    pub fn new_private(msg: &mut MessageReader<'_>) -> Option<Self> {
        let n = msg.get_string().to_vec();
        let e = msg.get_string().to_vec();
        let d = Zeroizing::new(msg.get_string().to_vec());
        let _iqmp = Zeroizing::new(msg.get_string().to_vec());
        let p = Zeroizing::new(msg.get_string().to_vec());
        let q = Zeroizing::new(msg.get_string().to_vec());
        if msg.has_err() {
            return None;
        }

        Self::from_components(
            BigUint::from_bytes_be(&n),
            BigUint::from_bytes_be(&e),
            BigUint::from_bytes_be(&d),
            vec![BigUint::from_bytes_be(&p), BigUint::from_bytes_be(&q)],
        )
        .ok()
    }

    /// Modulus size in bytes.
    fn modulus_len(&self) -> usize {
        self.key.size()
    }
}

/// PKCS#1 v1.5 DigestInfo overhead for each hash, in bytes.
///
/// The encoded message is `01 FF.. 00 || DigestInfo`, which requires the
/// modulus to be at least 11 bytes longer than the DigestInfo.
fn pkcs1_digest_info_len(flags: u32) -> usize {
    if flags & SSH_AGENT_RSA_SHA2_512 != 0 {
        19 + 64
    } else if flags & SSH_AGENT_RSA_SHA2_256 != 0 {
        19 + 32
    } else {
        15 + 20 // SHA-1
    }
}

impl UserKey for RsaUserKey {
    fn algorithm_name(&self) -> &'static str {
        "ssh-rsa"
    }

    fn public_blob(&self) -> Vec<u8> {
        let mut w = MessageWriter::new();
        w.put_string(b"ssh-rsa");
        w.put_mp_ssh2(&self.key.e().to_bytes_be());
        w.put_mp_ssh2(&self.key.n().to_bytes_be());
        w.into_vec()
    }

    fn supported_flags(&self) -> u32 {
        SSH_AGENT_RSA_SHA2_256 | SSH_AGENT_RSA_SHA2_512
    }

    fn invalid_for_flags(&self, flags: u32) -> Option<String> {
        let needed = pkcs1_digest_info_len(flags) + 11;
        if self.modulus_len() < needed {
            Some(format!(
                "key is {} bytes, need at least {} for this signature type",
                self.modulus_len(),
                needed
            ))
        } else {
            None
        }
    }

    fn sign(&self, data: &[u8], flags: u32) -> VigilResult<Vec<u8>> {
        use rsa::pkcs1v15::SigningKey;
        use rsa::signature::{SignatureEncoding as _, Signer as _};

        // SHA-512 wins when both RFC 8332 bits are set.
        let (name, signature): (&[u8], Vec<u8>) = if flags & SSH_AGENT_RSA_SHA2_512 != 0 {
            let sk = SigningKey::<sha2::Sha512>::new(self.key.clone());
            (b"rsa-sha2-512", sk.sign(data).to_vec())
        } else if flags & SSH_AGENT_RSA_SHA2_256 != 0 {
            let sk = SigningKey::<sha2::Sha256>::new(self.key.clone());
            (b"rsa-sha2-256", sk.sign(data).to_vec())
        } else {
            let sk = SigningKey::<sha1::Sha1>::new(self.key.clone());
            (b"ssh-rsa", sk.sign(data).to_vec())
        };

        let mut w = MessageWriter::new();
        w.put_string(name);
        w.put_string(&signature);
        Ok(w.into_vec())
    }
}

impl std::fmt::Debug for RsaUserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaUserKey")
            .field("algorithm", &"ssh-rsa")
            .field("key_size_bits", &(self.modulus_len() * 8))
            .finish_non_exhaustive()
    }
}

/// SSH-1 RSA key, used for challenge-response.
pub struct Rsa1Key {
    public: RsaSsh1Public,
    key: RsaPrivateKey,
}

impl Rsa1Key {
    /// Creates a key from a decoded public part and raw private
    /// magnitudes.
    pub fn new(
        public: RsaSsh1Public,
        d: &[u8],
        p: &[u8],
        q: &[u8],
    ) -> VigilResult<Self> {
        let key = RsaPrivateKey::from_components(
            BigUint::from_bytes_be(&public.modulus),
            BigUint::from_bytes_be(&public.exponent),
            BigUint::from_bytes_be(d),
            vec![BigUint::from_bytes_be(p), BigUint::from_bytes_be(q)],
        )
        .map_err(|e| VigilError::security(format!("invalid RSA private key: {}", e)))?;
        Ok(Self { public, key })
    }

    /// Parses the `ADD_RSA_IDENTITY` private body:
    /// `uint32 bits || mp modulus || mp exponent || mp d || mp iqmp ||
    /// mp q || mp p`.
    ///
    /// Note the modulus-first order, unlike the exponent-first public
    /// encoding. Returns `None` if the components do not form a key;
    /// short reads stay in the reader's sticky flag.
    pub fn new_private_wire(msg: &mut MessageReader<'_>) -> Option<Self> {
        let public = msg.get_rsa_ssh1_pub(Rsa1Order::ModulusFirst);
        let d = Zeroizing::new(msg.get_mp_ssh1().to_vec());
        let _iqmp = Zeroizing::new(msg.get_mp_ssh1().to_vec());
        let q = Zeroizing::new(msg.get_mp_ssh1().to_vec());
        let p = Zeroizing::new(msg.get_mp_ssh1().to_vec());
        if msg.has_err() {
            return None;
        }
        Self::new(public, &d, &p, &q).ok()
    }

    /// Consistency self-test: the primes multiply to the modulus and the
    /// exponents invert each other. Run before a submitted key is
    /// accepted into the store.
    pub fn verify(&self) -> bool {
        self.key.validate().is_ok()
    }

    /// The public part.
    pub fn public(&self) -> &RsaSsh1Public {
        &self.public
    }

    /// The canonical SSH-1 public blob: `uint32 bits || mp exponent ||
    /// mp modulus`.
    pub fn public_blob(&self) -> Vec<u8> {
        rsa1_public_blob(&self.public)
    }

    /// Raw RSA private-key operation on an SSH-1 challenge.
    ///
    /// Returns the low 256 bits of the result as 32 big-endian bytes,
    /// zero-padded at the front when the value is shorter. No padding is
    /// interpreted; the challenge-response hash covers the raw integer.
    pub fn decrypt_challenge(&self, challenge: &[u8]) -> [u8; 32] {
        let c = BigUint::from_bytes_be(challenge);
        let plain = c.modpow(self.key.d(), self.key.n());
        let bytes = Zeroizing::new(plain.to_bytes_be());

        let mut out = [0u8; 32];
        if bytes.len() >= 32 {
            out.copy_from_slice(&bytes[bytes.len() - 32..]);
        } else {
            out[32 - bytes.len()..].copy_from_slice(&bytes);
        }
        out
    }

    /// The key's log fingerprint.
    pub fn fingerprint(&self) -> String {
        rsa1_fingerprint(&self.public)
    }
}

impl std::fmt::Debug for Rsa1Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rsa1Key")
            .field("bits", &self.public.bits)
            .finish_non_exhaustive()
    }
}

/// Encodes the canonical SSH-1 public blob for a decoded public key.
pub fn rsa1_public_blob(public: &RsaSsh1Public) -> Vec<u8> {
    let mut w = MessageWriter::new();
    w.put_rsa_ssh1_pub(public, Rsa1Order::ExponentFirst);
    w.into_vec()
}

/// The log fingerprint of an SSH-1 public key.
pub fn rsa1_fingerprint(public: &RsaSsh1Public) -> String {
    crypto::rsa_ssh1_fingerprint(public.bits, &public.modulus, &public.exponent)
}


#[cfg(test)]
mod tests {
    use super::test_keys::*;
    use super::*;
    use ed25519_dalek::Verifier as _;

    fn rsa_test_key() -> RsaUserKey {
        RsaUserKey::from_components(
            BigUint::from_bytes_be(&hex_bytes(RSA_N)),
            BigUint::from_bytes_be(&hex_bytes(RSA_E)),
            BigUint::from_bytes_be(&hex_bytes(RSA_D)),
            vec![
                BigUint::from_bytes_be(&hex_bytes(RSA_P)),
                BigUint::from_bytes_be(&hex_bytes(RSA_Q)),
            ],
        )
        .unwrap()
    }

    fn rsa1_test_key() -> Rsa1Key {
        let public = RsaSsh1Public {
            bits: RSA_BITS,
            exponent: hex_bytes(RSA_E),
            modulus: hex_bytes(RSA_N),
        };
        Rsa1Key::new(public, &hex_bytes(RSA_D), &hex_bytes(RSA_P), &hex_bytes(RSA_Q)).unwrap()
    }

    /// Extracts the inner signature bytes from an SSH signature blob.
    fn split_signature_blob(blob: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut r = MessageReader::new(blob);
        let name = r.get_string().to_vec();
        let sig = r.get_string().to_vec();
        assert!(!r.has_err());
        assert_eq!(r.remaining(), 0);
        (name, sig)
    }

    #[test]
    fn test_algorithm_lookup() {
        assert_eq!(
            KeyAlgorithm::from_name(b"ssh-ed25519"),
            Some(KeyAlgorithm::Ed25519)
        );
        assert_eq!(KeyAlgorithm::from_name(b"ssh-rsa"), Some(KeyAlgorithm::Rsa));
        assert_eq!(KeyAlgorithm::from_name(b"ssh-dss"), None);
        assert_eq!(KeyAlgorithm::Ed25519.name(), "ssh-ed25519");
    }

    #[test]
    fn test_ed25519_public_blob_shape() {
        let key = Ed25519UserKey::from_seed(&ED25519_SEED);
        let blob = key.public_blob();

        let mut r = MessageReader::new(&blob);
        assert_eq!(r.get_string(), b"ssh-ed25519");
        assert_eq!(r.get_string().len(), 32);
        assert!(!r.has_err());
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_ed25519_sign_verifies() {
        let key = Ed25519UserKey::from_seed(&ED25519_SEED);
        let blob = key.sign(b"data to sign", 0).unwrap();

        let (name, sig) = split_signature_blob(&blob);
        assert_eq!(name, b"ssh-ed25519");
        let sig = ed25519_dalek::Signature::from_slice(&sig).unwrap();
        assert!(key.verifying_key().verify(b"data to sign", &sig).is_ok());
        assert!(key.verifying_key().verify(b"other data", &sig).is_err());
    }

    #[test]
    fn test_ed25519_wire_parse_round_trip() {
        let key = Ed25519UserKey::from_seed(&ED25519_SEED);
        let public = *key.verifying_key().as_bytes();

        let mut w = MessageWriter::new();
        w.put_string(&public);
        let mut private = ED25519_SEED.to_vec();
        private.extend_from_slice(&public);
        w.put_string(&private);
        let body = w.into_vec();

        let mut r = MessageReader::new(&body);
        let parsed = Ed25519UserKey::new_private(&mut r).unwrap();
        assert_eq!(parsed.public_blob(), key.public_blob());
    }

    #[test]
    fn test_ed25519_wire_parse_rejects_mismatched_public() {
        let key = Ed25519UserKey::from_seed(&ED25519_SEED);
        let public = *key.verifying_key().as_bytes();

        let mut w = MessageWriter::new();
        w.put_string(&[0xab; 32]); // wrong public half
        let mut private = ED25519_SEED.to_vec();
        private.extend_from_slice(&public);
        w.put_string(&private);
        let body = w.into_vec();

        let mut r = MessageReader::new(&body);
        assert!(Ed25519UserKey::new_private(&mut r).is_none());
    }

    #[test]
    fn test_ed25519_no_supported_flags() {
        let key = Ed25519UserKey::from_seed(&ED25519_SEED);
        assert_eq!(key.supported_flags(), 0);
        assert!(key.invalid_for_flags(0).is_none());
    }

    #[test]
    fn test_rsa_public_blob_shape() {
        let key = rsa_test_key();
        let blob = key.public_blob();

        let mut r = MessageReader::new(&blob);
        assert_eq!(r.get_string(), b"ssh-rsa");
        let e = r.get_string().to_vec();
        let n = r.get_string().to_vec();
        assert!(!r.has_err());
        assert_eq!(r.remaining(), 0);
        assert_eq!(e, hex_bytes(RSA_E));
        // Modulus top bit is clear for this key, so no sign padding.
        assert_eq!(n, hex_bytes(RSA_N));
    }

    #[test]
    fn test_rsa_supported_flags() {
        let key = rsa_test_key();
        assert_eq!(
            key.supported_flags(),
            SSH_AGENT_RSA_SHA2_256 | SSH_AGENT_RSA_SHA2_512
        );
    }

    #[test]
    fn test_rsa_sign_flag_selects_algorithm() {
        let key = rsa_test_key();

        let (name, _) = split_signature_blob(&key.sign(b"hi", 0).unwrap());
        assert_eq!(name, b"ssh-rsa");

        let (name, _) = split_signature_blob(&key.sign(b"hi", SSH_AGENT_RSA_SHA2_256).unwrap());
        assert_eq!(name, b"rsa-sha2-256");

        let (name, _) = split_signature_blob(&key.sign(b"hi", SSH_AGENT_RSA_SHA2_512).unwrap());
        assert_eq!(name, b"rsa-sha2-512");

        // SHA-512 wins when both bits are set.
        let both = SSH_AGENT_RSA_SHA2_256 | SSH_AGENT_RSA_SHA2_512;
        let (name, _) = split_signature_blob(&key.sign(b"hi", both).unwrap());
        assert_eq!(name, b"rsa-sha2-512");
    }

    #[test]
    fn test_rsa_sha256_signature_verifies() {
        use rsa::pkcs1v15::{Signature, VerifyingKey};
        use rsa::signature::Verifier as _;

        let key = rsa_test_key();
        let (_, sig) = split_signature_blob(&key.sign(b"hi", SSH_AGENT_RSA_SHA2_256).unwrap());

        let public = rsa::RsaPublicKey::new(
            BigUint::from_bytes_be(&hex_bytes(RSA_N)),
            BigUint::from_bytes_be(&hex_bytes(RSA_E)),
        )
        .unwrap();
        let vk = VerifyingKey::<sha2::Sha256>::new(public);
        let sig = Signature::try_from(sig.as_slice()).unwrap();
        assert!(vk.verify(b"hi", &sig).is_ok());
        assert!(vk.verify(b"bye", &sig).is_err());
    }

    #[test]
    fn test_rsa_key_length_check() {
        let key = rsa_test_key();
        // A 128-byte modulus is comfortably long enough for every hash.
        assert!(key.invalid_for_flags(0).is_none());
        assert!(key.invalid_for_flags(SSH_AGENT_RSA_SHA2_512).is_none());
    }

    #[test]
    fn test_rsa1_self_test() {
        assert!(rsa1_test_key().verify());
    }

    #[test]
    fn test_rsa1_rejects_inconsistent_components() {
        let public = RsaSsh1Public {
            bits: RSA_BITS,
            exponent: hex_bytes(RSA_E),
            modulus: hex_bytes(RSA_N),
        };
        // Swap in a wrong private exponent; construction or validation
        // must fail.
        let bad = Rsa1Key::new(public, &[0x03], &hex_bytes(RSA_P), &hex_bytes(RSA_Q));
        assert!(bad.is_err() || !bad.unwrap().verify());
    }

    #[test]
    fn test_rsa1_challenge_decrypt() {
        let key = rsa1_test_key();

        // Encrypt 42 with the public half, decrypt with the private half.
        let m = BigUint::from(42u32);
        let n = BigUint::from_bytes_be(&hex_bytes(RSA_N));
        let e = BigUint::from_bytes_be(&hex_bytes(RSA_E));
        let c = m.modpow(&e, &n);

        let plain = key.decrypt_challenge(&c.to_bytes_be());
        let mut expected = [0u8; 32];
        expected[31] = 42;
        assert_eq!(plain, expected);
    }

    #[test]
    fn test_rsa1_private_wire_round_trip() {
        let mut w = MessageWriter::new();
        w.put_uint32(RSA_BITS);
        w.put_mp_ssh1(&hex_bytes(RSA_N));
        w.put_mp_ssh1(&hex_bytes(RSA_E));
        w.put_mp_ssh1(&hex_bytes(RSA_D));
        w.put_mp_ssh1(&[0x01]); // iqmp: unused by the parser
        w.put_mp_ssh1(&hex_bytes(RSA_Q));
        w.put_mp_ssh1(&hex_bytes(RSA_P));
        let body = w.into_vec();

        let mut r = MessageReader::new(&body);
        let key = Rsa1Key::new_private_wire(&mut r).unwrap();
        assert!(!r.has_err());
        assert!(key.verify());
        assert_eq!(key.public().bits, RSA_BITS);
        assert_eq!(key.public_blob(), rsa1_test_key().public_blob());
    }

    #[test]
    fn test_rsa1_truncated_wire_sets_error() {
        let mut w = MessageWriter::new();
        w.put_uint32(RSA_BITS);
        w.put_mp_ssh1(&hex_bytes(RSA_N));
        let body = w.into_vec();

        let mut r = MessageReader::new(&body);
        assert!(Rsa1Key::new_private_wire(&mut r).is_none());
        assert!(r.has_err());
    }

    #[test]
    fn test_rsa1_fingerprint_format() {
        let fp = rsa1_test_key().fingerprint();
        assert!(fp.starts_with("1023 "));
    }
}
