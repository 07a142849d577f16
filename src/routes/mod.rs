// Route module decomposition — each domain area in its own file.
// Shared guards live here; route functions in submodules.

mod auth_routes;
mod call_routes;
mod messages_routes;
mod profile_routes;
mod sync_routes;
mod voice_routes;

pub use auth_routes::{auth_nonce, auth_verify};
pub use call_routes::{call_initiate, call_signal};
pub use messages_routes::{inbox_poll, messages_ack, messages_send};
pub use profile_routes::{profile_by_key, profile_encryption_key, profile_lookup, profile_me, profile_nickname};
pub use sync_routes::{sync_delete, sync_get, sync_put};
pub use voice_routes::{voice_delete, voice_download, voice_upload};

use std::sync::Arc;

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::json::Json;

use crate::auth;
use crate::db::Db;

/// Client IP, used as the rate-limit identity for unauthenticated routes.
pub struct ClientIp(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let ip = req
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .or_else(|| req.remote().map(|r| r.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        Outcome::Success(ClientIp(ip))
    }
}

/// Resolves the `Authorization: Bearer <token>` header to the session's
/// owning identity. Forwards to a 401 catcher on anything else.
pub struct BearerAuth(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BearerAuth {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(token) = req
            .headers()
            .get_one("Authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
        else {
            return Outcome::Error((Status::Unauthorized, ()));
        };

        let db = req.rocket().state::<Arc<Db>>().expect("Db not managed");
        match auth::resolve(db, token) {
            Some(pubkey) => Outcome::Success(BearerAuth(pubkey)),
            None => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}

#[rocket::catch(429)]
pub fn too_many_requests() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "rate limited"}))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "not found"}))
}

#[rocket::catch(401)]
pub fn unauthorized() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "unauthorized"}))
}

#[rocket::get("/health")]
pub fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}
