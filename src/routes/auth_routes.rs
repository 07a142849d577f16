use std::sync::Arc;
use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::auth;
use crate::config::AppConfig;
use crate::db::Db;
use crate::error::{AppError, AppResult};
use crate::identity;
use crate::models::{NonceResponse, VerifyRequest, VerifyResponse};
use crate::rate_limit::RateLimiter;

use super::ClientIp;

#[get("/auth/nonce?<pubkey>")]
pub fn auth_nonce(
    db: &State<Arc<Db>>,
    cfg: &State<AppConfig>,
    ip: ClientIp,
    pubkey: &str,
) -> AppResult<Json<NonceResponse>> {
    let rl = RateLimiter::check(db, "auth_nonce", &ip.0, cfg.rate_limit_auth_max, cfg.rate_limit_auth_window_secs);
    if !rl.allowed {
        return Err(AppError::RateLimited { retry_after_secs: rl.retry_after_secs, limit: rl.limit });
    }
    let pubkey = identity::normalize_identity(pubkey).ok_or_else(|| AppError::BadRequest("invalid pubkey".into()))?;
    Ok(Json(auth::issue_nonce(db, cfg, &pubkey)))
}

#[post("/auth/verify", format = "json", data = "<body>")]
pub fn auth_verify(
    db: &State<Arc<Db>>,
    cfg: &State<AppConfig>,
    ip: ClientIp,
    body: Json<VerifyRequest>,
) -> AppResult<Json<VerifyResponse>> {
    let rl = RateLimiter::check(db, "auth_verify", &ip.0, cfg.rate_limit_auth_max, cfg.rate_limit_auth_window_secs);
    if !rl.allowed {
        return Err(AppError::RateLimited { retry_after_secs: rl.retry_after_secs, limit: rl.limit });
    }
    if !identity::is_valid_pubkey(&body.pubkey) {
        return Err(AppError::BadRequest("invalid pubkey".into()));
    }
    Ok(Json(auth::verify(db, cfg, &body)?))
}
