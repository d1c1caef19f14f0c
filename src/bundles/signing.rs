//! Token-signing key bundle. Only the PKCS#1 private key is persisted; the
//! public half is derived from it by consumers.

use super::{BuiltBundle, BundleKind, Payload, SecretNamer};
use crate::errors::Result;
use crate::random;

pub fn build(namer: &SecretNamer, bits: usize) -> Result<BuiltBundle> {
    let pair = random::generate_signing_key_pair(bits)?;

    Ok(BuiltBundle {
        kind: BundleKind::SigningKey,
        name: namer.bundle(BundleKind::SigningKey),
        payload: Payload::Plain(pair.private_key_pem),
    })
}
