use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn new(path: &str) -> Self {
        let conn = Connection::open(path).expect("failed to open database");
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .expect("failed to set pragmas");
        let db = Db {
            conn: Mutex::new(conn),
        };
        db.migrate();
        db
    }

    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn migrate(&self) {
        let conn = self.conn();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS nonces (
                pubkey TEXT PRIMARY KEY,
                nonce TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                pubkey TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);

            CREATE TABLE IF NOT EXISTS profiles (
                pubkey TEXT PRIMARY KEY,
                nickname TEXT,
                display_name TEXT,
                encryption_public_key TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                nickname_changed_at INTEGER
            );

            CREATE TABLE IF NOT EXISTS nickname_map (
                nickname TEXT PRIMARY KEY,
                pubkey TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS inbox_envelopes (
                recipient TEXT NOT NULL,
                id TEXT NOT NULL,
                payload TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                seq INTEGER NOT NULL,
                PRIMARY KEY (recipient, id)
            );
            CREATE INDEX IF NOT EXISTS idx_inbox_recipient_seq ON inbox_envelopes(recipient, seq);
            CREATE INDEX IF NOT EXISTS idx_inbox_expires ON inbox_envelopes(expires_at);

            CREATE TABLE IF NOT EXISTS call_rooms (
                room_id TEXT PRIMARY KEY,
                caller_id TEXT NOT NULL,
                callee_id TEXT NOT NULL,
                caller_name TEXT,
                status TEXT NOT NULL,
                initiated_at INTEGER NOT NULL,
                answered_at INTEGER,
                ended_at INTEGER,
                end_reason TEXT
            );

            CREATE TABLE IF NOT EXISTS call_pending_disconnect (
                room_id TEXT NOT NULL,
                participant_id TEXT NOT NULL,
                at INTEGER NOT NULL,
                generation INTEGER NOT NULL,
                PRIMARY KEY (room_id, participant_id)
            );

            CREATE TABLE IF NOT EXISTS rate_limit_counters (
                action TEXT NOT NULL,
                identity TEXT NOT NULL,
                bucket INTEGER NOT NULL,
                count INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                PRIMARY KEY (action, identity, bucket)
            );
            CREATE INDEX IF NOT EXISTS idx_rate_limit_expires ON rate_limit_counters(expires_at);

            CREATE TABLE IF NOT EXISTS blobs (
                key TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                metadata TEXT NOT NULL,
                size INTEGER NOT NULL,
                data BLOB NOT NULL,
                uploaded_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_blobs_owner ON blobs(owner);
            ",
        )
        .expect("failed to run migrations");
    }
}
