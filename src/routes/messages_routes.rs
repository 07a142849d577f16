use std::sync::Arc;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::Db;
use crate::error::{AppError, AppResult};
use crate::identity;
use crate::inbox;
use crate::models::{AckRequest, MessageEnvelope, OkResponse, PollResponse, SendMessageRequest, SendMessageResponse};
use crate::nickname;
use crate::push::PushNotifier;
use crate::rate_limit::{RateLimited, RateLimiter};
use crate::time::now_millis;

use super::BearerAuth;

#[post("/messages/send", format = "json", data = "<body>")]
pub fn messages_send(
    db: &State<Arc<Db>>,
    cfg: &State<AppConfig>,
    push: &State<PushNotifier>,
    auth: BearerAuth,
    body: Json<SendMessageRequest>,
) -> AppResult<RateLimited<SendMessageResponse>> {
    let rl = RateLimiter::check(db, "send", &auth.0, cfg.rate_limit_send_max, cfg.rate_limit_send_window_secs);
    if !rl.allowed {
        return Err(AppError::RateLimited { retry_after_secs: rl.retry_after_secs, limit: rl.limit });
    }

    let to = identity::normalize_identity(&body.to).ok_or_else(|| AppError::BadRequest("invalid recipient".into()))?;

    let has_text = body.text.as_ref().is_some_and(|t| !t.is_empty());
    let has_ciphertext = body.ciphertext.is_some() && body.nonce.is_some();
    let has_voice = body.voice_key.is_some();
    if !has_text && !has_ciphertext && !has_voice {
        return Err(AppError::BadRequest("one of text, ciphertext+nonce, or voiceKey is required".into()));
    }
    if let Some(text) = &body.text
        && text.len() > 1024
    {
        return Err(AppError::BadRequest("text exceeds 1024 characters".into()));
    }

    let sender_profile = nickname::lookup_by_pubkey(db, &auth.0);
    let timestamp = body.timestamp.unwrap_or_else(now_millis);
    let message_id = Uuid::new_v4().to_string();

    let envelope = MessageEnvelope {
        id: message_id.clone(),
        from: auth.0.clone(),
        to: to.clone(),
        text: body.text.clone(),
        ciphertext: body.ciphertext.clone(),
        nonce: body.nonce.clone(),
        encryption_version: body.version,
        timestamp,
        sender_nickname: sender_profile.as_ref().and_then(|p| p.nickname.clone()),
        sender_display_name: sender_profile.as_ref().and_then(|p| p.display_name.clone()),
        sender_encryption_key: body
            .sender_encryption_key
            .clone()
            .or_else(|| sender_profile.as_ref().and_then(|p| p.encryption_public_key.clone())),
        token_preview: body.token_preview.clone(),
        voice_key: body.voice_key.clone(),
        voice_duration: body.voice_duration,
        voice_nonce: body.voice_nonce.clone(),
        voice_mime_type: body.voice_mime_type.clone(),
        voice_waveform: body.voice_waveform.clone(),
        expires_at: timestamp + cfg.inbox_envelope_ttl_secs * 1000,
    };

    inbox::store(db, cfg, &envelope);
    push.notify(&to, &message_id);

    Ok(RateLimited::new(Json(SendMessageResponse { ok: true, message_id }), rl))
}

#[get("/inbox/poll?<wait>")]
pub async fn inbox_poll(db: &State<Arc<Db>>, cfg: &State<AppConfig>, auth: BearerAuth, wait: Option<u64>) -> Json<PollResponse> {
    let deadline_ms = wait.unwrap_or(0).min(cfg.inbox_long_poll_max_wait_ms);
    let start = std::time::Instant::now();

    loop {
        let messages = inbox::pull(db, cfg, &auth.0, cfg.inbox_pull_max);
        if !messages.is_empty() || start.elapsed().as_millis() as u64 >= deadline_ms {
            return Json(PollResponse { messages });
        }
        tokio::time::sleep(std::time::Duration::from_millis(cfg.inbox_long_poll_interval_ms)).await;
    }
}

#[post("/messages/ack", format = "json", data = "<body>")]
pub fn messages_ack(db: &State<Arc<Db>>, auth: BearerAuth, body: Json<AckRequest>) -> Json<OkResponse> {
    inbox::ack(db, &auth.0, &body.ids);
    Json(OkResponse { ok: true })
}
