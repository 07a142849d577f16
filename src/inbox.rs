//! Durable per-recipient inbox: store, ordered pull, and ack.
//!
//! Every envelope carries a monotonic `seq` per recipient so pulls are
//! strictly ordered even across restarts. Ordering and idempotence are
//! enforced by SQLite itself (the `(recipient, id)` primary key plus the
//! single connection mutex already serialize concurrent sends to the
//! same recipient — no separate in-process actor is needed).

use rusqlite::{params, OptionalExtension};

use crate::config::AppConfig;
use crate::db::Db;
use crate::models::MessageEnvelope;
use crate::time::now_millis;

fn next_seq(conn: &rusqlite::Connection, recipient: &str) -> i64 {
    conn.query_row(
        "SELECT COALESCE(MAX(seq), 0) + 1 FROM inbox_envelopes WHERE recipient = ?1",
        params![recipient],
        |r| r.get(0),
    )
    .expect("seq query")
}

/// Store an envelope. Sending the same `id` twice to the same recipient
/// is a no-op on the second call (idempotent enqueue) — the row is left
/// untouched, including its original `seq`.
pub fn store(db: &Db, cfg: &AppConfig, envelope: &MessageEnvelope) -> bool {
    let conn = db.conn();

    let already_present: bool = conn
        .query_row(
            "SELECT 1 FROM inbox_envelopes WHERE recipient = ?1 AND id = ?2",
            params![&envelope.to, &envelope.id],
            |_| Ok(true),
        )
        .optional()
        .expect("envelope lookup")
        .unwrap_or(false);

    if already_present {
        return false;
    }

    let seq = next_seq(&conn, &envelope.to);
    let payload = serde_json::to_string(envelope).expect("envelope serialize");
    let expires_at = envelope.timestamp + cfg.inbox_envelope_ttl_secs * 1000;

    conn.execute(
        "INSERT INTO inbox_envelopes (recipient, id, payload, expires_at, seq) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&envelope.to, &envelope.id, &payload, expires_at, seq],
    )
    .expect("envelope insert");

    true
}

/// Pull up to `limit` pending envelopes for `recipient`, oldest first.
/// `limit` is clamped to `[1, cfg.inbox_pull_max]`.
pub fn pull(db: &Db, cfg: &AppConfig, recipient: &str, limit: i64) -> Vec<MessageEnvelope> {
    let limit = limit.clamp(1, cfg.inbox_pull_max);
    let now = now_millis();

    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT payload FROM inbox_envelopes
             WHERE recipient = ?1 AND expires_at > ?2
             ORDER BY seq ASC LIMIT ?3",
        )
        .expect("prepare pull");

    let rows = stmt
        .query_map(params![recipient, now, limit], |r| {
            let payload: String = r.get(0)?;
            Ok(payload)
        })
        .expect("pull query");

    rows.filter_map(Result::ok)
        .filter_map(|payload| serde_json::from_str(&payload).ok())
        .collect()
}

/// Acknowledge delivery: permanently remove the given envelope ids for
/// `recipient`. Acking an id that doesn't exist (already acked, expired,
/// or never existed) is not an error.
pub fn ack(db: &Db, recipient: &str, ids: &[String]) {
    let conn = db.conn();
    for id in ids {
        conn.execute(
            "DELETE FROM inbox_envelopes WHERE recipient = ?1 AND id = ?2",
            params![recipient, id],
        )
        .expect("envelope delete");
    }
}

/// Background sweep: drop envelopes past their expiry, delivered or not.
pub fn gc_sweep(db: &Db) -> usize {
    db.conn()
        .execute(
            "DELETE FROM inbox_envelopes WHERE expires_at < ?1",
            params![now_millis()],
        )
        .unwrap_or(0)
}
