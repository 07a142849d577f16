//! Profile directory: nickname <-> pubkey bijection, display names, and
//! per-recipient encryption public keys.

use rusqlite::{params, OptionalExtension};

use crate::config::AppConfig;
use crate::db::Db;
use crate::error::{AppError, AppResult};
use crate::models::Profile;
use crate::time::now_millis;

const NICKNAME_BLOCKLIST: &[&str] = &[
    "admin", "root", "support", "moderator", "system", "official", "staff", "help",
];

/// `^[a-z][a-z0-9_]{2,15}$` — 3 to 16 characters, lowercase-leading.
fn is_well_formed(nickname: &str) -> bool {
    let mut chars = nickname.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() {
        return false;
    }
    let rest: Vec<char> = chars.collect();
    (2..=15).contains(&rest.len())
        && rest.iter().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
}

/// Blocklist match is substring-both-ways: a nickname is rejected if it
/// contains a blocked word, or a blocked word contains it.
fn is_blocked(nickname: &str) -> bool {
    NICKNAME_BLOCKLIST
        .iter()
        .any(|word| nickname.contains(word) || word.contains(nickname.as_str()))
}

fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        pubkey: row.get(0)?,
        nickname: row.get(1)?,
        display_name: row.get(2)?,
        encryption_public_key: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        nickname_changed_at: row.get(6)?,
    })
}

const PROFILE_COLUMNS: &str =
    "pubkey, nickname, display_name, encryption_public_key, created_at, updated_at, nickname_changed_at";

/// Fetch a profile, creating a bare one on first contact.
pub fn get_or_create(db: &Db, pubkey: &str) -> Profile {
    let conn = db.conn();
    let existing = conn
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE pubkey = ?1"),
            params![pubkey],
            row_to_profile,
        )
        .optional()
        .expect("profile lookup");

    if let Some(profile) = existing {
        return profile;
    }

    let now = now_millis();
    conn.execute(
        "INSERT INTO profiles (pubkey, created_at, updated_at) VALUES (?1, ?2, ?2)",
        params![pubkey, now],
    )
    .expect("profile insert");

    Profile {
        pubkey: pubkey.to_string(),
        created_at: now,
        updated_at: now,
        ..Default::default()
    }
}

pub fn lookup_by_pubkey(db: &Db, pubkey: &str) -> Option<Profile> {
    db.conn()
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE pubkey = ?1"),
            params![pubkey],
            row_to_profile,
        )
        .optional()
        .expect("profile lookup")
}

pub fn lookup_by_nickname(db: &Db, nickname: &str) -> Option<Profile> {
    let conn = db.conn();
    let pubkey: Option<String> = conn
        .query_row(
            "SELECT pubkey FROM nickname_map WHERE nickname = ?1",
            params![nickname],
            |r| r.get(0),
        )
        .optional()
        .expect("nickname_map lookup");
    pubkey.and_then(|pk| {
        conn.query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE pubkey = ?1"),
            params![pk],
            row_to_profile,
        )
        .optional()
        .expect("profile lookup")
    })
}

/// Claim (or re-claim) a nickname for `pubkey`. Uniqueness is enforced
/// by `nickname_map`'s primary key; every write already serializes
/// through the single connection mutex, so no extra locking is needed
/// to make this claim race-free.
pub fn set_nickname(db: &Db, cfg: &AppConfig, pubkey: &str, nickname: &str) -> AppResult<Profile> {
    let nickname = nickname.trim().to_lowercase();
    if !is_well_formed(&nickname) {
        return Err(AppError::BadRequest("invalid nickname format".into()));
    }
    if is_blocked(&nickname) {
        return Err(AppError::BadRequest("nickname is reserved".into()));
    }

    let conn = db.conn();
    let profile = conn
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE pubkey = ?1"),
            params![pubkey],
            row_to_profile,
        )
        .optional()
        .expect("profile lookup");

    let now = now_millis();
    if let Some(ref profile) = profile
        && let Some(changed_at) = profile.nickname_changed_at
        && now - changed_at < cfg.nickname_cooldown_secs * 1000
    {
        let remaining_ms = (cfg.nickname_cooldown_secs * 1000 - (now - changed_at)).max(0);
        let retry_after_secs = (remaining_ms as u64).div_ceil(1000);
        return Err(AppError::RateLimited { retry_after_secs, limit: 1 });
    }

    if let Some(ref profile) = profile
        && profile.nickname.as_deref() == Some(nickname.as_str())
    {
        return Ok(profile.clone());
    }

    let owner: Option<String> = conn
        .query_row(
            "SELECT pubkey FROM nickname_map WHERE nickname = ?1",
            params![&nickname],
            |r| r.get(0),
        )
        .optional()
        .expect("nickname_map lookup");
    if owner.is_some_and(|o| o != pubkey) {
        return Err(AppError::Conflict("nickname already taken".into()));
    }

    if profile.is_none() {
        conn.execute(
            "INSERT INTO profiles (pubkey, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![pubkey, now],
        )
        .expect("profile insert");
    }

    if let Some(ref old) = profile
        && let Some(old_nick) = &old.nickname
    {
        conn.execute("DELETE FROM nickname_map WHERE nickname = ?1", params![old_nick])
            .expect("nickname_map delete");
    }

    conn.execute(
        "INSERT INTO nickname_map (nickname, pubkey) VALUES (?1, ?2)",
        params![&nickname, pubkey],
    )
    .map_err(|_| AppError::Conflict("nickname already taken".into()))?;

    let display_name = format!("@{nickname}");
    conn.execute(
        "UPDATE profiles SET nickname = ?1, display_name = ?2, updated_at = ?3, nickname_changed_at = ?3 WHERE pubkey = ?4",
        params![&nickname, &display_name, now, pubkey],
    )
    .expect("profile update");

    Ok(conn
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE pubkey = ?1"),
            params![pubkey],
            row_to_profile,
        )
        .expect("profile lookup"))
}

pub fn set_encryption_public_key(db: &Db, pubkey: &str, public_key: &str) -> AppResult<Profile> {
    if public_key.trim().is_empty() {
        return Err(AppError::BadRequest("encryption public key required".into()));
    }

    let conn = db.conn();
    let now = now_millis();
    let existing = conn
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE pubkey = ?1"),
            params![pubkey],
            row_to_profile,
        )
        .optional()
        .expect("profile lookup");

    if existing.is_none() {
        conn.execute(
            "INSERT INTO profiles (pubkey, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![pubkey, now],
        )
        .expect("profile insert");
    }

    conn.execute(
        "UPDATE profiles SET encryption_public_key = ?1, updated_at = ?2 WHERE pubkey = ?3",
        params![public_key, now, pubkey],
    )
    .expect("profile update");

    Ok(conn
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE pubkey = ?1"),
            params![pubkey],
            row_to_profile,
        )
        .expect("profile lookup"))
}
