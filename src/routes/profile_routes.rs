use std::sync::Arc;
use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::config::AppConfig;
use crate::db::Db;
use crate::error::{AppError, AppResult};
use crate::identity;
use crate::models::{Profile, ProfileResponse, SetEncryptionKeyRequest, SetNicknameRequest};
use crate::nickname;

use super::BearerAuth;

#[get("/profile/me")]
pub fn profile_me(db: &State<Arc<Db>>, auth: BearerAuth) -> Json<ProfileResponse> {
    Json(ProfileResponse { profile: nickname::get_or_create(db, &auth.0) })
}

#[post("/profile/nickname", format = "json", data = "<body>")]
pub fn profile_nickname(
    db: &State<Arc<Db>>,
    cfg: &State<AppConfig>,
    auth: BearerAuth,
    body: Json<SetNicknameRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = nickname::set_nickname(db, cfg, &auth.0, &body.nickname)?;
    Ok(Json(ProfileResponse { profile }))
}

#[post("/profile/encryption-key", format = "json", data = "<body>")]
pub fn profile_encryption_key(
    db: &State<Arc<Db>>,
    auth: BearerAuth,
    body: Json<SetEncryptionKeyRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = nickname::set_encryption_public_key(db, &auth.0, &body.public_key)?;
    Ok(Json(ProfileResponse { profile }))
}

#[get("/profile/lookup?<nickname>")]
pub fn profile_lookup(db: &State<Arc<Db>>, nickname: &str) -> AppResult<Json<ProfileResponse>> {
    let normalized = nickname.trim().trim_start_matches('@').to_lowercase();
    let profile: Option<Profile> = crate::nickname::lookup_by_nickname(db, &normalized);
    profile
        .map(|profile| Json(ProfileResponse { profile }))
        .ok_or_else(|| AppError::NotFound("profile not found".into()))
}

#[get("/profile/by-key?<pubkey>")]
pub fn profile_by_key(db: &State<Arc<Db>>, pubkey: &str) -> AppResult<Json<ProfileResponse>> {
    let pubkey = identity::normalize_identity(pubkey).ok_or_else(|| AppError::BadRequest("invalid pubkey".into()))?;
    crate::nickname::lookup_by_pubkey(db, &pubkey)
        .map(|profile| Json(ProfileResponse { profile }))
        .ok_or_else(|| AppError::NotFound("profile not found".into()))
}
