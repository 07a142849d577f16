use std::env;

/// Tunables read from the environment, with defaults matching spec.
/// Mirrors the teacher's `RateLimitConfig::from_env` parse-with-default
/// style for every knob.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub nonce_ttl_secs: i64,
    pub session_ttl_default_secs: i64,
    pub session_ttl_min_secs: i64,
    pub session_ttl_max_secs: i64,

    pub nickname_cooldown_secs: i64,

    pub inbox_envelope_ttl_secs: i64,
    pub inbox_pull_max: i64,
    pub inbox_long_poll_max_wait_ms: u64,
    pub inbox_long_poll_interval_ms: u64,

    pub call_stale_after_secs: i64,
    pub call_disconnect_grace_secs: u64,

    pub rate_limit_send_max: i64,
    pub rate_limit_send_window_secs: i64,
    pub rate_limit_voice_max: i64,
    pub rate_limit_voice_window_secs: i64,
    pub rate_limit_auth_max: i64,
    pub rate_limit_auth_window_secs: i64,

    pub blob_backup_max_bytes: i64,
    pub blob_voice_max_bytes: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nonce_ttl_secs: 300,
            session_ttl_default_secs: 3600,
            session_ttl_min_secs: 900,
            session_ttl_max_secs: 43_200,

            nickname_cooldown_secs: 7 * 24 * 3600,

            inbox_envelope_ttl_secs: 300,
            inbox_pull_max: 100,
            inbox_long_poll_max_wait_ms: 15_000,
            inbox_long_poll_interval_ms: 800,

            call_stale_after_secs: 300,
            call_disconnect_grace_secs: 5,

            rate_limit_send_max: 60,
            rate_limit_send_window_secs: 60,
            rate_limit_voice_max: 60,
            rate_limit_voice_window_secs: 60,
            rate_limit_auth_max: 20,
            rate_limit_auth_window_secs: 60,

            blob_backup_max_bytes: 50 * 1024 * 1024,
            blob_voice_max_bytes: 50 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("SESSION_TTL_DEFAULT_SECS")
            && let Ok(n) = val.parse::<i64>()
        {
            config.session_ttl_default_secs = n;
        }
        if let Ok(val) = env::var("RATE_LIMIT_SEND_MAX")
            && let Ok(n) = val.parse::<i64>()
        {
            config.rate_limit_send_max = n;
        }
        if let Ok(val) = env::var("RATE_LIMIT_VOICE_MAX")
            && let Ok(n) = val.parse::<i64>()
        {
            config.rate_limit_voice_max = n;
        }
        if let Ok(val) = env::var("RATE_LIMIT_AUTH_MAX")
            && let Ok(n) = val.parse::<i64>()
        {
            config.rate_limit_auth_max = n;
        }
        if let Ok(val) = env::var("INBOX_ENVELOPE_TTL_SECS")
            && let Ok(n) = val.parse::<i64>()
        {
            config.inbox_envelope_ttl_secs = n;
        }
        if let Ok(val) = env::var("CALL_DISCONNECT_GRACE_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.call_disconnect_grace_secs = n;
        }
        if let Ok(val) = env::var("BLOB_BACKUP_MAX_BYTES")
            && let Ok(n) = val.parse::<i64>()
        {
            config.blob_backup_max_bytes = n;
        }

        config
    }

    /// Clamp a client-requested session TTL into `[min, max]`, falling
    /// back to the default when absent.
    pub fn clamp_session_ttl(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.session_ttl_default_secs)
            .clamp(self.session_ttl_min_secs, self.session_ttl_max_secs)
    }
}
