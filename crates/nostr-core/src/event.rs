//! Event type and the C2 primitives that create and validate it.

use secp256k1::{Keypair, Message, Secp256k1, SecretKey, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// A signed, content-addressed Nostr event.
///
/// Opaque to the relay core beyond the fields below (§3): `content` and
/// `sig` are never interpreted, only `sig` is checked (via [`is_valid`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u64,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

/// The fields a client supplies before an id and signature exist.
pub struct EventTemplate {
    pub kind: u64,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub created_at: u64,
}

/// Replaceable kinds per NIP-16: 0, 3, and 10000..=19999.
pub fn is_replaceable_kind(kind: u64) -> bool {
    kind == 0 || kind == 3 || (10000..20000).contains(&kind)
}

/// Ephemeral kinds per NIP-16: 20000..=29999.
pub fn is_ephemeral_kind(kind: u64) -> bool {
    (20000..30000).contains(&kind)
}

/// The canonical NIP-01 serialization used to derive an event's id:
/// `[0, pubkey, created_at, kind, tags, content]`.
fn canonical_form(pubkey: &str, created_at: u64, kind: u64, tags: &[Vec<String>], content: &str) -> String {
    let value = serde_json::json!([0, pubkey, created_at, kind, tags, content]);
    value.to_string()
}

fn compute_id(pubkey: &str, created_at: u64, kind: u64, tags: &[Vec<String>], content: &str) -> String {
    let canon = canonical_form(pubkey, created_at, kind, tags, content);
    let digest = Sha256::digest(canon.as_bytes());
    hex::encode(digest)
}

/// Generate a fresh secp256k1 secret key, hex-encoded (32 bytes).
pub fn generate_secret_key() -> String {
    let secp = Secp256k1::new();
    let (secret_key, _) = secp.generate_keypair(&mut rand::thread_rng());
    hex::encode(secret_key.secret_bytes())
}

/// Derive the hex-encoded x-only public key for a hex-encoded secret key.
pub fn pubkey_from_secret(secret_key_hex: &str) -> Result<String> {
    let bytes = hex::decode(secret_key_hex)?;
    let secret_key = SecretKey::from_slice(&bytes).map_err(|_| Error::InvalidSecretKey)?;
    let secp = Secp256k1::new();
    let keypair = Keypair::from_secret_key(&secp, &secret_key);
    let (xonly, _) = XOnlyPublicKey::from_keypair(&keypair);
    Ok(hex::encode(xonly.serialize()))
}

/// Sign an [`EventTemplate`] with `secret_key_hex`, producing a complete,
/// valid [`Event`] (id computed, schnorr signature attached).
pub fn finalize_event(template: &EventTemplate, secret_key_hex: &str) -> Result<Event> {
    let bytes = hex::decode(secret_key_hex)?;
    let secret_key = SecretKey::from_slice(&bytes).map_err(|_| Error::InvalidSecretKey)?;
    let secp = Secp256k1::new();
    let keypair = Keypair::from_secret_key(&secp, &secret_key);
    let (xonly, _) = XOnlyPublicKey::from_keypair(&keypair);
    let pubkey = hex::encode(xonly.serialize());

    let id = compute_id(&pubkey, template.created_at, template.kind, &template.tags, &template.content);
    let id_bytes = hex::decode(&id)?;
    let message = Message::from_digest_slice(&id_bytes).map_err(|_| Error::InvalidSignature)?;
    let sig = secp.sign_schnorr(&message, &keypair);

    Ok(Event {
        id,
        pubkey,
        created_at: template.created_at,
        kind: template.kind,
        tags: template.tags.clone(),
        content: template.content.clone(),
        sig: hex::encode(sig.as_ref()),
    })
}

/// `is_valid(e)` (C2, §3): the id matches the canonical serialization and
/// the schnorr signature verifies against `pubkey`.
pub fn is_valid(event: &Event) -> bool {
    let Ok(pubkey_bytes) = hex::decode(&event.pubkey) else {
        return false;
    };
    let Ok(xonly) = XOnlyPublicKey::from_slice(&pubkey_bytes) else {
        return false;
    };

    let expected_id = compute_id(&event.pubkey, event.created_at, event.kind, &event.tags, &event.content);
    if expected_id != event.id {
        return false;
    }

    let Ok(id_bytes) = hex::decode(&event.id) else {
        return false;
    };
    let Ok(message) = Message::from_digest_slice(&id_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(&event.sig) else {
        return false;
    };
    let Ok(sig) = secp256k1::schnorr::Signature::from_slice(&sig_bytes) else {
        return false;
    };

    let secp = Secp256k1::new();
    secp.verify_schnorr(&sig, &message, &xonly).is_ok()
}

/// First-element tag name lookup, per §3: "tags whose name is a single
/// lowercase letter participate in filtering."
pub fn single_letter_tag_values<'a>(event: &'a Event, letter: char) -> impl Iterator<Item = &'a str> {
    let name = letter.to_string();
    event
        .tags
        .iter()
        .filter(move |t| t.first().map(|n| n == &name) == Some(true))
        .filter_map(|t| t.get(1))
        .map(|s| s.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalized_event_is_valid() {
        let sk = generate_secret_key();
        let template = EventTemplate {
            kind: 1,
            tags: vec![],
            content: "hello".to_string(),
            created_at: 1_700_000_000,
        };
        let event = finalize_event(&template, &sk).unwrap();
        assert!(is_valid(&event));
    }

    #[test]
    fn tampered_content_is_invalid() {
        let sk = generate_secret_key();
        let template = EventTemplate {
            kind: 1,
            tags: vec![],
            content: "hello".to_string(),
            created_at: 1_700_000_000,
        };
        let mut event = finalize_event(&template, &sk).unwrap();
        event.content = "tampered".to_string();
        assert!(!is_valid(&event));
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let sk = generate_secret_key();
        let template = EventTemplate {
            kind: 1,
            tags: vec![],
            content: "hello".to_string(),
            created_at: 1_700_000_000,
        };
        let mut event = finalize_event(&template, &sk).unwrap();
        event.sig = "0".repeat(128);
        assert!(!is_valid(&event));
    }

    #[test]
    fn replaceable_and_ephemeral_kind_ranges() {
        assert!(is_replaceable_kind(0));
        assert!(is_replaceable_kind(3));
        assert!(is_replaceable_kind(10000));
        assert!(is_replaceable_kind(19999));
        assert!(!is_replaceable_kind(20000));
        assert!(is_ephemeral_kind(20000));
        assert!(is_ephemeral_kind(29999));
        assert!(!is_ephemeral_kind(30000));
    }
}
