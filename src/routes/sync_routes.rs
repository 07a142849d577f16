use std::sync::Arc;
use base64::Engine;
use rocket::serde::json::Json;
use rocket::{delete, get, put, State};

use crate::blob;
use crate::config::AppConfig;
use crate::db::Db;
use crate::error::AppResult;
use crate::models::{OkResponse, SyncGetResponse, SyncPutRequest, SyncPutResponse};

use super::BearerAuth;

#[put("/sync/chat/<contact_key>", format = "json", data = "<body>")]
pub fn sync_put(
    db: &State<Arc<Db>>,
    cfg: &State<AppConfig>,
    auth: BearerAuth,
    contact_key: &str,
    body: Json<SyncPutRequest>,
) -> AppResult<Json<SyncPutResponse>> {
    // `encrypted` arrives base64-encoded opaque ciphertext from the client.
    let data = base64::engine::general_purpose::STANDARD
        .decode(&body.encrypted)
        .unwrap_or_else(|_| body.encrypted.as_bytes().to_vec());
    blob::put_sync(db, &auth.0, contact_key, &data, cfg.blob_backup_max_bytes)?;
    Ok(Json(SyncPutResponse {
        ok: true,
        key: blob::sync_key(&auth.0, contact_key),
    }))
}

#[get("/sync/chat/<contact_key>")]
pub fn sync_get(db: &State<Arc<Db>>, auth: BearerAuth, contact_key: &str) -> Json<SyncGetResponse> {
    match blob::get_sync(db, &auth.0, contact_key) {
        Some((data, updated_at)) => Json(SyncGetResponse {
            found: true,
            encrypted: Some(base64::engine::general_purpose::STANDARD.encode(data)),
            updated_at: Some(updated_at),
        }),
        None => Json(SyncGetResponse { found: false, encrypted: None, updated_at: None }),
    }
}

#[delete("/sync/chat/<contact_key>")]
pub fn sync_delete(db: &State<Arc<Db>>, auth: BearerAuth, contact_key: &str) -> Json<OkResponse> {
    blob::delete_sync(db, &auth.0, contact_key);
    Json(OkResponse { ok: true })
}
