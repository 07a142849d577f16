use rocket::http::Header;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::Request;
use rusqlite::params;

use crate::db::Db;
use crate::time::now_millis;

/// Wrapper that adds standard rate limit headers to any JSON response.
/// Headers: X-RateLimit-Limit, X-RateLimit-Remaining, X-RateLimit-Reset
pub struct RateLimited<T> {
    pub inner: Json<T>,
    pub info: RateLimitInfo,
}

impl<T> RateLimited<T> {
    pub fn new(inner: Json<T>, info: RateLimitInfo) -> Self {
        Self { inner, info }
    }
}

impl<'r, 'o: 'r, T: serde::Serialize + 'o> Responder<'r, 'o> for RateLimited<T> {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let mut response = Response::build_from(self.inner.respond_to(req)?)
            .header(Header::new("X-RateLimit-Limit", self.info.limit.to_string()))
            .header(Header::new("X-RateLimit-Remaining", self.info.remaining.to_string()))
            .header(Header::new("X-RateLimit-Reset", self.info.retry_after_secs.to_string()))
            .finalize();

        if !self.info.allowed {
            response.set_header(Header::new("Retry-After", self.info.retry_after_secs.to_string()));
        }

        Ok(response)
    }
}

/// Error responder for rate-limited (429) responses with proper headers.
pub struct RateLimitedError {
    pub info: RateLimitInfo,
    pub message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for RateLimitedError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let body = Json(serde_json::json!({
            "error": self.message,
            "retry_after_secs": self.info.retry_after_secs,
            "limit": self.info.limit,
            "remaining": 0
        }));

        Response::build_from(body.respond_to(req)?)
            .status(rocket::http::Status::TooManyRequests)
            .header(Header::new("X-RateLimit-Limit", self.info.limit.to_string()))
            .header(Header::new("X-RateLimit-Remaining", "0".to_string()))
            .header(Header::new("X-RateLimit-Reset", self.info.retry_after_secs.to_string()))
            .header(Header::new("Retry-After", self.info.retry_after_secs.to_string()))
            .ok()
    }
}

/// Information about rate limit status for a given key.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub allowed: bool,
    pub limit: usize,
    pub remaining: usize,
    pub retry_after_secs: u64,
}

/// Fixed-window counter, keyed by `(action, identity, bucket)` where
/// `bucket = floor(now_ms / window_ms)`. Backed by SQLite so counts are
/// shared across workers and survive a restart mid-window.
pub struct RateLimiter;

impl RateLimiter {
    pub fn check(db: &Db, action: &str, identity: &str, max: i64, window_secs: i64) -> RateLimitInfo {
        let now = now_millis();
        let window_ms = window_secs * 1000;
        let bucket = now / window_ms;
        let bucket_start = bucket * window_ms;
        let expires_at = bucket_start + window_ms;

        let conn = db.conn();
        conn.execute(
            "INSERT INTO rate_limit_counters (action, identity, bucket, count, expires_at)
             VALUES (?1, ?2, ?3, 1, ?4)
             ON CONFLICT(action, identity, bucket) DO UPDATE SET count = count + 1",
            params![action, identity, bucket, expires_at],
        )
        .expect("rate limit upsert");

        let count: i64 = conn
            .query_row(
                "SELECT count FROM rate_limit_counters WHERE action = ?1 AND identity = ?2 AND bucket = ?3",
                params![action, identity, bucket],
                |r| r.get(0),
            )
            .expect("rate limit read-back");

        let retry_after_secs = ((expires_at - now).max(0) as u64).div_ceil(1000);

        if count > max {
            RateLimitInfo {
                allowed: false,
                limit: max as usize,
                remaining: 0,
                retry_after_secs,
            }
        } else {
            RateLimitInfo {
                allowed: true,
                limit: max as usize,
                remaining: (max - count).max(0) as usize,
                retry_after_secs: 0,
            }
        }
    }

    /// Drop buckets whose window has fully elapsed.
    pub fn gc_sweep(db: &Db) -> usize {
        db.conn()
            .execute(
                "DELETE FROM rate_limit_counters WHERE expires_at < ?1",
                params![now_millis()],
            )
            .unwrap_or(0)
    }
}
