//! Wallet identity validation and normalization.
//!
//! An identity is a base58-encoded ed25519 public key, 32-44 characters.
//! Clients may pass it bare, as a `#/dm/<pubkey>` share fragment, or
//! embedded as the tail of an HTTPS URL.

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn is_base58_pubkey(s: &str) -> bool {
    let len = s.chars().count();
    (32..=44).contains(&len) && s.chars().all(|c| BASE58_ALPHABET.contains(c))
}

/// Normalize an arbitrary client-supplied identity reference into a bare
/// base58 pubkey, or `None` if nothing in it matches the expected shape.
pub fn normalize_identity(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(frag) = raw.split("#/dm/").nth(1) {
        let candidate = frag.split(['/', '?', '&']).next().unwrap_or("");
        if is_base58_pubkey(candidate) {
            return Some(candidate.to_string());
        }
    }

    if let Some(last) = raw.rsplit(['/', '#']).next()
        && is_base58_pubkey(last)
    {
        return Some(last.to_string());
    }

    if is_base58_pubkey(raw) {
        return Some(raw.to_string());
    }

    None
}

pub fn is_valid_pubkey(pubkey: &str) -> bool {
    is_base58_pubkey(pubkey)
}
