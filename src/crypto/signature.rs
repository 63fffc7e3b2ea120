//! secp256k1 verification of PK witnesses

use crate::constants::{PUBLIC_KEY_SIZE, SIGNATURE_SIZE};
use crate::types::Hash;
use secp256k1::{ecdsa::Signature, Message, PublicKey, SECP256K1};

/// Verify a compact ECDSA signature over `sighash`.
///
/// Obviously malformed keys or signatures are rejected before touching the
/// curve; every failure is reported as `false`.
pub fn verify_pk_witness(public_key: &[u8], signature: &[u8], sighash: &Hash) -> bool {
    if public_key.len() != PUBLIC_KEY_SIZE || signature.len() != SIGNATURE_SIZE {
        return false;
    }

    let Ok(public_key) = PublicKey::from_slice(public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_compact(signature) else {
        return false;
    };
    let message = Message::from_digest(*sighash);

    SECP256K1
        .verify_ecdsa(&message, &signature, &public_key)
        .is_ok()
}
