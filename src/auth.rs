//! Challenge/response authentication: single-use nonces, ed25519
//! signature verification, and bearer session tokens.

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use rand::RngCore;
use rusqlite::{params, OptionalExtension};

use crate::config::AppConfig;
use crate::db::Db;
use crate::error::{AppError, AppResult};
use crate::models::{NonceResponse, UserRef, VerifyRequest, VerifyResponse};
use crate::time::now_millis;

fn random_hex(n_bytes: usize) -> String {
    let mut buf = vec![0u8; n_bytes];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Issue a fresh 16-byte nonce for `pubkey`, overwriting any prior one
/// (the old nonce becomes unusable — at most one challenge is live per
/// identity at a time).
pub fn issue_nonce(db: &Db, cfg: &AppConfig, pubkey: &str) -> NonceResponse {
    let nonce = random_hex(16);
    let expires_at = now_millis() + cfg.nonce_ttl_secs * 1000;

    let conn = db.conn();
    conn.execute(
        "INSERT INTO nonces (pubkey, nonce, expires_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(pubkey) DO UPDATE SET nonce = excluded.nonce, expires_at = excluded.expires_at",
        params![pubkey, &nonce, expires_at],
    )
    .expect("nonce insert");

    NonceResponse { nonce, expires_at }
}

/// Atomically consume the nonce record for `pubkey` — read then delete
/// in the same locked section — so at most one concurrent verify can
/// observe it.
fn consume_nonce(db: &Db, pubkey: &str) -> Option<(String, i64)> {
    let conn = db.conn();
    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT nonce, expires_at FROM nonces WHERE pubkey = ?1",
            params![pubkey],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .expect("nonce lookup");

    if row.is_some() {
        conn.execute("DELETE FROM nonces WHERE pubkey = ?1", params![pubkey])
            .expect("nonce delete");
    }
    row
}

fn verify_signature(pubkey: &str, message: &[u8], signature_b64: &str) -> bool {
    let Ok(pubkey_bytes) = bs58::decode(pubkey).into_vec() else {
        return false;
    };
    let Ok(pubkey_bytes): Result<[u8; 32], _> = pubkey_bytes.try_into() else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&pubkey_bytes) else {
        return false;
    };

    let Ok(sig_bytes) = base64::engine::general_purpose::STANDARD.decode(signature_b64) else {
        return false;
    };
    let Ok(sig_bytes): Result<[u8; 64], _> = sig_bytes.try_into() else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_bytes);

    verifying_key.verify(message, &signature).is_ok()
}

/// Verify a challenge response and issue a session. All failures are
/// collapsed to a single opaque `Unauthorized` — callers should log the
/// specific cause themselves if they need to distinguish it internally.
pub fn verify(db: &Db, cfg: &AppConfig, req: &VerifyRequest) -> AppResult<VerifyResponse> {
    let Some((stored_nonce, expires_at)) = consume_nonce(db, &req.pubkey) else {
        return Err(AppError::Unauthorized);
    };
    if stored_nonce != req.nonce || expires_at < now_millis() {
        return Err(AppError::Unauthorized);
    }

    if !verify_signature(&req.pubkey, req.nonce.as_bytes(), &req.signature) {
        return Err(AppError::Unauthorized);
    }

    let ttl_secs = cfg.clamp_session_ttl(req.session_ttl);
    let token = random_hex(24);
    let expires_at = now_millis() + ttl_secs * 1000;

    db.conn()
        .execute(
            "INSERT INTO sessions (token, pubkey, expires_at) VALUES (?1, ?2, ?3)",
            params![&token, &req.pubkey, expires_at],
        )
        .expect("session insert");

    Ok(VerifyResponse {
        token: token.clone(),
        user: UserRef { pubkey: req.pubkey.clone() },
    })
}

/// Resolve a bearer token to its owning identity, or `None` if absent
/// or expired. Expired sessions are pruned lazily on the read path.
pub fn resolve(db: &Db, token: &str) -> Option<String> {
    let conn = db.conn();
    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT pubkey, expires_at FROM sessions WHERE token = ?1",
            params![token],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .expect("session lookup");

    match row {
        Some((pubkey, expires_at)) if expires_at >= now_millis() => Some(pubkey),
        Some(_) => {
            conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])
                .ok();
            None
        }
        None => None,
    }
}

/// Background sweep: drop expired nonces and sessions. Ground in the
/// teacher's retention sweep style — periodic, best-effort, logged.
pub fn gc_sweep(db: &Db) -> (usize, usize) {
    let conn = db.conn();
    let now = now_millis();
    let nonces = conn
        .execute("DELETE FROM nonces WHERE expires_at < ?1", params![now])
        .unwrap_or(0);
    let sessions = conn
        .execute("DELETE FROM sessions WHERE expires_at < ?1", params![now])
        .unwrap_or(0);
    (nonces, sessions)
}
