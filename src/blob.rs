//! Opaque blob storage: voice clips and encrypted chat backups.
//!
//! Namespaced by owner identity: backups live at `<owner>/backup`,
//! voice clips at `voice/<recipient>/<messageId>`. Size cap enforced
//! before the write (return `TooLarge` rather than attempting it),
//! mirroring the teacher's upload size check in `routes/files.rs`.

use rusqlite::{params, OptionalExtension};

use crate::db::Db;
use crate::error::{AppError, AppResult};
use crate::models::VoiceBlobMetadata;
use crate::time::now_millis;

pub fn backup_key(owner: &str) -> String {
    format!("{owner}/backup")
}

/// Per-conversation encrypted sync key: the spec's single `<owner>/backup`
/// blob, partitioned by the other party so a client can sync more than
/// one conversation independently.
pub fn sync_key(owner: &str, contact_key: &str) -> String {
    format!("{owner}/backup/{contact_key}")
}

pub fn voice_key(recipient: &str, message_id: &str) -> String {
    format!("voice/{recipient}/{message_id}")
}

pub struct BlobRecord {
    pub owner: String,
    pub metadata: String,
    pub data: Vec<u8>,
    pub uploaded_at: i64,
}

fn put(db: &Db, key: &str, owner: &str, metadata: &str, data: &[u8], max_bytes: i64) -> AppResult<i64> {
    if data.len() as i64 > max_bytes {
        return Err(AppError::TooLarge("blob exceeds size limit".into()));
    }

    let now = now_millis();
    db.conn()
        .execute(
            "INSERT INTO blobs (key, owner, metadata, size, data, uploaded_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(key) DO UPDATE SET metadata = excluded.metadata, size = excluded.size,
               data = excluded.data, uploaded_at = excluded.uploaded_at",
            params![key, owner, metadata, data.len() as i64, data, now],
        )
        .expect("blob upsert");

    Ok(data.len() as i64)
}

fn get(db: &Db, key: &str) -> Option<BlobRecord> {
    db.conn()
        .query_row(
            "SELECT owner, metadata, data, uploaded_at FROM blobs WHERE key = ?1",
            params![key],
            |r| {
                Ok(BlobRecord {
                    owner: r.get(0)?,
                    metadata: r.get(1)?,
                    data: r.get(2)?,
                    uploaded_at: r.get(3)?,
                })
            },
        )
        .optional()
        .expect("blob lookup")
}

/// Store a voice clip uploaded by `sender` for `recipient`, keyed by
/// `messageId`. Readable by either identity; deletable only by the
/// recipient (enforced by the caller against `VoiceBlobMetadata`).
pub fn put_voice(
    db: &Db,
    sender: &str,
    recipient: &str,
    message_id: &str,
    data: &[u8],
    duration: f64,
    mime_type: &str,
    max_bytes: i64,
) -> AppResult<VoiceBlobMetadata> {
    let key = voice_key(recipient, message_id);
    let metadata = VoiceBlobMetadata {
        sender_pubkey: Some(sender.to_string()),
        recipient_pubkey: Some(recipient.to_string()),
        message_id: Some(message_id.to_string()),
        duration: Some(duration),
        mime_type: Some(mime_type.to_string()),
        uploaded_at: now_millis(),
        size: data.len() as i64,
        version: 1,
    };
    let metadata_json = serde_json::to_string(&metadata).expect("metadata serialize");
    put(db, &key, sender, &metadata_json, data, max_bytes)?;
    Ok(metadata)
}

/// Fetch a voice clip. The caller is expected to check `requester`
/// against the metadata's sender/recipient before exposing the result.
pub fn get_voice(db: &Db, recipient: &str, message_id: &str) -> Option<(VoiceBlobMetadata, Vec<u8>)> {
    let record = get(db, &voice_key(recipient, message_id))?;
    let metadata: VoiceBlobMetadata = serde_json::from_str(&record.metadata).ok()?;
    Some((metadata, record.data))
}

pub fn put_backup(db: &Db, owner: &str, encrypted: &[u8], max_bytes: i64) -> AppResult<()> {
    let key = backup_key(owner);
    let metadata = serde_json::json!({}).to_string();
    put(db, &key, owner, &metadata, encrypted, max_bytes)?;
    Ok(())
}

pub fn get_backup(db: &Db, owner: &str) -> Option<(Vec<u8>, i64)> {
    let record = get(db, &backup_key(owner))?;
    Some((record.data, record.uploaded_at))
}

pub fn delete_backup(db: &Db, owner: &str) -> bool {
    db.conn()
        .execute("DELETE FROM blobs WHERE key = ?1", params![backup_key(owner)])
        .expect("blob delete")
        > 0
}

pub fn put_sync(db: &Db, owner: &str, contact_key: &str, encrypted: &[u8], max_bytes: i64) -> AppResult<()> {
    let key = sync_key(owner, contact_key);
    let metadata = serde_json::json!({}).to_string();
    put(db, &key, owner, &metadata, encrypted, max_bytes)?;
    Ok(())
}

pub fn get_sync(db: &Db, owner: &str, contact_key: &str) -> Option<(Vec<u8>, i64)> {
    let record = get(db, &sync_key(owner, contact_key))?;
    Some((record.data, record.uploaded_at))
}

pub fn delete_sync(db: &Db, owner: &str, contact_key: &str) -> bool {
    db.conn()
        .execute("DELETE FROM blobs WHERE key = ?1", params![sync_key(owner, contact_key)])
        .expect("blob delete")
        > 0
}

pub fn delete_voice(db: &Db, recipient: &str, message_id: &str) -> bool {
    db.conn()
        .execute(
            "DELETE FROM blobs WHERE key = ?1",
            params![voice_key(recipient, message_id)],
        )
        .expect("blob delete")
        > 0
}
