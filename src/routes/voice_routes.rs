use std::sync::Arc;
use base64::Engine;
use rocket::serde::json::Json;
use rocket::{delete, get, post, State};

use crate::blob;
use crate::config::AppConfig;
use crate::db::Db;
use crate::error::{AppError, AppResult};
use crate::identity;
use crate::models::{OkResponse, VoiceDownloadResponse, VoiceUploadRequest, VoiceUploadResponse};
use crate::rate_limit::{RateLimited, RateLimiter};

use super::BearerAuth;

#[post("/voice/upload", format = "json", data = "<body>")]
pub fn voice_upload(
    db: &State<Arc<Db>>,
    cfg: &State<AppConfig>,
    auth: BearerAuth,
    body: Json<VoiceUploadRequest>,
) -> AppResult<RateLimited<VoiceUploadResponse>> {
    let rl = RateLimiter::check(db, "voice", &auth.0, cfg.rate_limit_voice_max, cfg.rate_limit_voice_window_secs);
    if !rl.allowed {
        return Err(AppError::RateLimited { retry_after_secs: rl.retry_after_secs, limit: rl.limit });
    }

    let recipient = identity::normalize_identity(&body.recipient_pubkey)
        .ok_or_else(|| AppError::BadRequest("invalid recipient".into()))?;
    let data = base64::engine::general_purpose::STANDARD
        .decode(&body.encrypted_audio)
        .map_err(|_| AppError::BadRequest("encryptedAudio is not valid base64".into()))?;

    let metadata = blob::put_voice(
        db,
        &auth.0,
        &recipient,
        &body.message_id,
        &data,
        body.duration,
        &body.mime_type,
        cfg.blob_voice_max_bytes,
    )?;

    Ok(RateLimited::new(
        Json(VoiceUploadResponse { ok: true, voice_key: blob::voice_key(&recipient, &body.message_id), size: metadata.size }),
        rl,
    ))
}

#[get("/voice/<recipient>/<message_id>")]
pub fn voice_download(db: &State<Arc<Db>>, auth: BearerAuth, recipient: &str, message_id: &str) -> AppResult<Json<VoiceDownloadResponse>> {
    let Some((metadata, data)) = blob::get_voice(db, recipient, message_id) else {
        return Err(AppError::NotFound("voice clip not found".into()));
    };

    let is_sender = metadata.sender_pubkey.as_deref() == Some(auth.0.as_str());
    let is_recipient = recipient == auth.0;
    if !is_sender && !is_recipient {
        return Err(AppError::Forbidden("not a participant in this voice clip".into()));
    }

    Ok(Json(VoiceDownloadResponse {
        found: true,
        encrypted_audio: Some(base64::engine::general_purpose::STANDARD.encode(data)),
        duration: metadata.duration,
        mime_type: metadata.mime_type,
        sender_pubkey: metadata.sender_pubkey,
    }))
}

#[delete("/voice/<recipient>/<message_id>")]
pub fn voice_delete(db: &State<Arc<Db>>, auth: BearerAuth, recipient: &str, message_id: &str) -> AppResult<Json<OkResponse>> {
    let Some((metadata, _)) = blob::get_voice(db, recipient, message_id) else {
        return Err(AppError::NotFound("voice clip not found".into()));
    };

    if metadata.recipient_pubkey.as_deref() != Some(auth.0.as_str()) {
        return Err(AppError::Forbidden("only the recipient may delete this voice clip".into()));
    }

    blob::delete_voice(db, recipient, message_id);
    Ok(Json(OkResponse { ok: true }))
}
