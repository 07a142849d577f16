//! Background sweepers for everything with a TTL: expired nonces and
//! sessions, expired inbox envelopes, expired rate-limit buckets, and
//! stale unanswered calls.
//!
//! Ground: `retention.rs`'s periodic `tokio::spawn` loop — initial
//! startup delay, then a fixed interval, best-effort and non-fatal on
//! error.

use std::sync::Arc;
use std::time::Duration;

use crate::auth;
use crate::call_room::CallRoomRegistry;
use crate::config::AppConfig;
use crate::db::Db;
use crate::inbox;
use crate::rate_limit::RateLimiter;

const SWEEP_INTERVAL_SECS: u64 = 30;
const STARTUP_DELAY_SECS: u64 = 5;

pub fn spawn_sweeper(db: Arc<Db>, cfg: Arc<AppConfig>, call_rooms: Arc<CallRoomRegistry>) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(STARTUP_DELAY_SECS)).await;

        loop {
            let (nonces, sessions) = auth::gc_sweep(&db);
            let envelopes = inbox::gc_sweep(&db);
            let buckets = RateLimiter::gc_sweep(&db);
            let stale_calls = call_rooms.sweep_stale(cfg.call_stale_after_secs);

            if nonces + sessions + envelopes + buckets + stale_calls > 0 {
                println!(
                    "gc sweep: {nonces} nonces, {sessions} sessions, {envelopes} envelopes, \
                     {buckets} rate-limit buckets, {stale_calls} stale calls"
                );
            }

            tokio::time::sleep(Duration::from_secs(SWEEP_INTERVAL_SECS)).await;
        }
    });
}
