//! Signature verification seam and its secp256k1 implementation

use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey, VerifyOnly};
use sha2::{Digest, Sha256};

use crate::error::{LedgerError, Result};
use crate::types::ByteString;

/// verify(owner, message, signature) → bool
///
/// The ledger only ever asks whether a signature is acceptable; it never
/// inspects key or signature encodings itself.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, owner: &[u8], message: &[u8], signature: &[u8]) -> bool;
}

/// ECDSA over secp256k1. Owners are SEC1 public keys, signatures are DER,
/// the signed digest is SHA-256 of the message.
pub struct Secp256k1Verifier {
    secp: Secp256k1<VerifyOnly>,
}

impl Secp256k1Verifier {
    pub fn new() -> Self {
        Self { secp: Secp256k1::verification_only() }
    }
}

impl Default for Secp256k1Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, owner: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let pubkey = match PublicKey::from_slice(owner) {
            Ok(pk) => pk,
            Err(_) => return false,
        };

        let signature = match Signature::from_der(signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };

        let message = match Message::from_digest_slice(&message_digest(message)) {
            Ok(msg) => msg,
            Err(_) => return false,
        };

        self.secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
    }
}

/// Signing key with its SEC1-encoded verification key.
#[derive(Debug, Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| LedgerError::InvalidKey(e.to_string()))?;
        let public = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);
        Ok(Self { secret, public })
    }

    /// Owner identity to place on outputs paid to this key.
    pub fn public_key(&self) -> ByteString {
        self.public.serialize().to_vec()
    }

    /// DER signature over SHA-256(`message`).
    pub fn sign(&self, message: &[u8]) -> ByteString {
        let secp = Secp256k1::signing_only();
        // A 32-byte digest is always a valid message
        let digest = Message::from_digest(message_digest(message));
        secp.sign_ecdsa(&digest, &self.secret).serialize_der().to_vec()
    }
}

fn message_digest(message: &[u8]) -> [u8; 32] {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Sha256::digest(message));
    hash
}
