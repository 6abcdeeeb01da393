//! RSA signing primitives.
//!
//! Wallet keys are RSA-2048. Keys travel as lowercase hex over DER; the
//! public key hex doubles as the wallet address. Signatures are PKCS#1 v1.5
//! over SHA-256. A key or signature that fails to parse is a validation
//! failure surfaced as a [`CryptoError`], never a panic: a malformed peer
//! message must not take the node down.

use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::CryptoError;

/// RSA modulus size for wallet keys.
pub const KEY_BITS: usize = 2048;

/// A wallet address: the hex-encoded DER of an RSA public key.
pub type Address = String;

/// The synthetic address that mints the genesis coins and absorbs the
/// genesis change output.
pub const SINK_ADDRESS: &str = "0";

/// An RSA key pair with its hex-DER encodings cached.
#[derive(Clone)]
pub struct Keypair {
    private: RsaPrivateKey,
    public_hex: Address,
    private_hex: String,
}

impl Keypair {
    /// Generate a fresh RSA-2048 key pair.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Self::from_private(private)
    }

    /// Rebuild a key pair from a hex-encoded PKCS#8 DER private key.
    pub fn from_private_hex(private_hex: &str) -> Result<Self, CryptoError> {
        let der = hex::decode(private_hex).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let private =
            RsaPrivateKey::from_pkcs8_der(&der).map_err(|_| CryptoError::InvalidKey)?;
        Self::from_private(private)
    }

    fn from_private(private: RsaPrivateKey) -> Result<Self, CryptoError> {
        let public_der = RsaPublicKey::from(&private)
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let private_der = private
            .to_pkcs8_der()
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Ok(Self {
            public_hex: hex::encode(public_der.as_bytes()),
            private_hex: hex::encode(private_der.as_bytes()),
            private,
        })
    }

    /// The wallet address (hex-DER public key).
    pub fn address(&self) -> &Address {
        &self.public_hex
    }

    /// Hex-DER encoding of the private key. Never leaves the owning node.
    pub fn private_hex(&self) -> &str {
        &self.private_hex
    }

    /// Sign a message with PKCS#1 v1.5 over its SHA-256 digest.
    /// Returns the signature as lowercase hex.
    pub fn sign(&self, message: &[u8]) -> Result<String, CryptoError> {
        let signer = SigningKey::<Sha256>::new(self.private.clone());
        let signature = signer
            .try_sign(message)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        Ok(hex::encode(signature.to_vec()))
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Private material stays out of logs.
        f.debug_struct("Keypair")
            .field("public_hex", &self.public_hex)
            .finish_non_exhaustive()
    }
}

/// Verify a hex signature over `message` against a hex-DER public key.
pub fn verify(address: &str, message: &[u8], signature_hex: &str) -> Result<(), CryptoError> {
    let der = hex::decode(address).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
    let public = RsaPublicKey::from_public_key_der(&der).map_err(|_| CryptoError::InvalidKey)?;
    let bytes =
        hex::decode(signature_hex).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
    let signature =
        Signature::try_from(bytes.as_slice()).map_err(|_| CryptoError::MalformedSignature)?;
    VerifyingKey::<Sha256>::new(public)
        .verify(message, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    // Key generation is slow; share one pair across the module.
    static KEYS: LazyLock<Keypair> = LazyLock::new(|| Keypair::generate().expect("keygen"));
    static OTHER: LazyLock<Keypair> = LazyLock::new(|| Keypair::generate().expect("keygen"));

    // --- key material ---

    #[test]
    fn address_is_lowercase_hex() {
        let address = KEYS.address();
        assert!(!address.is_empty());
        assert!(address.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn round_trip_through_private_hex() {
        let restored = Keypair::from_private_hex(KEYS.private_hex()).unwrap();
        assert_eq!(restored.address(), KEYS.address());
    }

    #[test]
    fn debug_output_hides_private_key() {
        let debug = format!("{:?}", &*KEYS);
        assert!(!debug.contains(KEYS.private_hex()));
    }

    // --- sign / verify ---

    #[test]
    fn sign_then_verify() {
        let signature = KEYS.sign(b"message").unwrap();
        assert!(verify(KEYS.address(), b"message", &signature).is_ok());
    }

    #[test]
    fn tampered_message_fails() {
        let signature = KEYS.sign(b"message").unwrap();
        assert_eq!(
            verify(KEYS.address(), b"other message", &signature),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn wrong_key_fails() {
        let signature = KEYS.sign(b"message").unwrap();
        assert_eq!(
            verify(OTHER.address(), b"message", &signature),
            Err(CryptoError::VerificationFailed)
        );
    }

    // --- malformed input is an error, not a panic ---

    #[test]
    fn non_hex_address_is_invalid() {
        let signature = KEYS.sign(b"message").unwrap();
        assert!(matches!(
            verify("not hex!", b"message", &signature),
            Err(CryptoError::InvalidHex(_))
        ));
    }

    #[test]
    fn sink_address_is_not_a_key() {
        let signature = KEYS.sign(b"message").unwrap();
        // "0" is odd-length hex, so decoding already fails.
        assert!(verify(SINK_ADDRESS, b"message", &signature).is_err());
    }

    #[test]
    fn garbage_der_is_invalid_key() {
        let signature = KEYS.sign(b"message").unwrap();
        assert_eq!(
            verify("deadbeef", b"message", &signature),
            Err(CryptoError::InvalidKey)
        );
    }

    #[test]
    fn garbage_signature_is_malformed() {
        assert!(verify(KEYS.address(), b"message", "zz").is_err());
        assert!(matches!(
            verify(KEYS.address(), b"message", "00"),
            Err(CryptoError::MalformedSignature) | Err(CryptoError::VerificationFailed)
        ));
    }
}
