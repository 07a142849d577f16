pub mod auth;
pub mod blob;
pub mod call_room;
pub mod config;
pub mod db;
pub mod error;
pub mod gc;
pub mod identity;
pub mod inbox;
pub mod models;
pub mod nickname;
pub mod push;
pub mod rate_limit;
pub mod routes;
pub mod time;

use std::env;
use std::sync::Arc;

use call_room::CallRoomRegistry;
use config::AppConfig;
use db::Db;
use push::PushNotifier;
use rocket_cors::{AllowedOrigins, CorsOptions};

pub fn rocket() -> rocket::Rocket<rocket::Build> {
    let db_path = env::var("DATABASE_PATH").unwrap_or_else(|_| "data/messenger.db".to_string());
    rocket_with_db(&db_path)
}

pub fn rocket_with_db(db_path: &str) -> rocket::Rocket<rocket::Build> {
    build_rocket(db_path, AppConfig::from_env())
}

pub fn rocket_with_db_and_config(db_path: &str, cfg: AppConfig) -> rocket::Rocket<rocket::Build> {
    build_rocket(db_path, cfg)
}

fn build_rocket(db_path: &str, cfg: AppConfig) -> rocket::Rocket<rocket::Build> {
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let db = Arc::new(Db::new(db_path));
    let call_rooms = Arc::new(CallRoomRegistry::new(db.clone(), cfg.clone()));
    let push_notifier = PushNotifier::from_env();

    // Allowlist plus any localhost/127.0.0.1 origin regardless of port —
    // the teacher's CORS default is wide open; this gateway tightens it
    // per the external allowlist + loopback-dev-origin requirement.
    let allowlist: Vec<String> = env::var("ALLOWED_ORIGINS")
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let mut origin_patterns: Vec<String> = vec![
        r"^https?://localhost(:[0-9]+)?$".to_string(),
        r"^https?://127\.0\.0\.1(:[0-9]+)?$".to_string(),
    ];
    origin_patterns.extend(allowlist.iter().map(|origin| format!("^{}$", regex_escape(origin))));
    let origin_patterns: Vec<&str> = origin_patterns.iter().map(String::as_str).collect();

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::some_regex(&origin_patterns))
        .allow_credentials(true)
        .to_cors()
        .expect("failed to build CORS policy");

    // Voice uploads arrive as base64 inside a JSON body; 50MiB of audio
    // becomes ~67MiB of base64 plus the JSON envelope.
    let figment = rocket::Config::figment().merge(("limits.json", 80 * 1024 * 1024));

    gc::spawn_sweeper(db.clone(), Arc::new(cfg.clone()), call_rooms.clone());

    rocket::custom(figment)
        .manage(db)
        .manage(cfg)
        .manage(call_rooms)
        .manage(push_notifier)
        .attach(cors)
        .attach(rocket::fairing::AdHoc::on_response("Cache-Control: no-store", |_, response| {
            Box::pin(async move {
                response.set_raw_header("Cache-Control", "no-store");
            })
        }))
        .register(
            "/",
            rocket::catchers![routes::too_many_requests, routes::not_found, routes::unauthorized],
        )
        .mount(
            "/",
            rocket::routes![
                routes::health,
                routes::auth_nonce,
                routes::auth_verify,
                routes::profile_me,
                routes::profile_nickname,
                routes::profile_encryption_key,
                routes::profile_lookup,
                routes::profile_by_key,
                routes::messages_send,
                routes::inbox_poll,
                routes::messages_ack,
                routes::sync_put,
                routes::sync_get,
                routes::sync_delete,
                routes::voice_upload,
                routes::voice_download,
                routes::voice_delete,
                routes::call_initiate,
                routes::call_signal,
            ],
        )
}

/// Escape regex metacharacters in a literal origin string before folding
/// it into an `AllowedOrigins::some_regex` pattern.
fn regex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
