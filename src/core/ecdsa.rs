// secp256k1 signature boundary: verify and sign over a 32-byte digest

use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use crate::core::Hash256;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EcdsaError {
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),
}

/// Verify a DER signature over `digest`.
///
/// Malformed keys or signatures verify as false. High-S signatures are
/// normalised first, since the network accepts either form.
pub fn verify(pubkey: &[u8], digest: &Hash256, signature: &[u8]) -> bool {
    let secp = Secp256k1::verification_only();

    let Ok(pubkey) = PublicKey::from_slice(pubkey) else {
        return false;
    };
    let parsed = Signature::from_der(signature).or_else(|_| Signature::from_der_lax(signature));
    let Ok(mut signature) = parsed else {
        return false;
    };
    signature.normalize_s();

    let message = Message::from_digest(*digest.as_bytes());
    secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
}

/// Sign `digest`, returning the DER encoding (without hash-type byte)
pub fn sign(privkey: &[u8], digest: &Hash256) -> Result<Vec<u8>, EcdsaError> {
    let secp = Secp256k1::signing_only();
    let secret_key =
        SecretKey::from_slice(privkey).map_err(|e| EcdsaError::InvalidSecretKey(e.to_string()))?;

    let message = Message::from_digest(*digest.as_bytes());
    Ok(secp.sign_ecdsa(&message, &secret_key).serialize_der().to_vec())
}

/// Compressed public key for a secret key
pub fn public_key(privkey: &[u8]) -> Result<Vec<u8>, EcdsaError> {
    let secp = Secp256k1::signing_only();
    let secret_key =
        SecretKey::from_slice(privkey).map_err(|e| EcdsaError::InvalidSecretKey(e.to_string()))?;
    Ok(secret_key.public_key(&secp).serialize().to_vec())
}
