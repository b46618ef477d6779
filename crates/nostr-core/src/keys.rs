//! Hex/key validation helpers (C2 — `is_event_id`, `is_key`).

/// A nostr event id or public key is a 32-byte value, hex-encoded as 64
/// lowercase characters.
const HEX_LEN: usize = 64;

fn is_lowercase_hex64(s: &str) -> bool {
    s.len() == HEX_LEN && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// True when `s` is a well-formed, lowercase-hex event id.
pub fn is_event_id(s: &str) -> bool {
    is_lowercase_hex64(s)
}

/// True when `s` is a well-formed, lowercase-hex public key.
pub fn is_key(s: &str) -> bool {
    is_lowercase_hex64(s)
}
