use rocket::http::{ContentType, Status};
use std::sync::{Arc, Barrier};
use std::thread;
use wallet_messenger_core::config::AppConfig;
use wallet_messenger_core::db::Db;
use wallet_messenger_core::nickname;

use crate::common::{auth_header, authenticate, new_wallet, test_client};

#[test]
fn set_and_lookup_nickname() {
    let client = test_client();
    let wallet = new_wallet();
    let token = authenticate(&client, &wallet);

    let res = client
        .post("/profile/nickname")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"nickname":"zerotrust"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["profile"]["nickname"], "zerotrust");
    assert_eq!(body["profile"]["displayName"], "@zerotrust");

    let res = client.get("/profile/lookup?nickname=zerotrust").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["profile"]["pubkey"], wallet.pubkey);
}

#[test]
fn malformed_nickname_is_rejected() {
    let client = test_client();
    let wallet = new_wallet();
    let token = authenticate(&client, &wallet);

    let res = client
        .post("/profile/nickname")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"nickname":"AB"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn rename_before_cooldown_expires_is_rejected() {
    let client = test_client();
    let wallet = new_wallet();
    let token = authenticate(&client, &wallet);

    let set = |nick: &str| {
        client
            .post("/profile/nickname")
            .header(ContentType::JSON)
            .header(auth_header(&token))
            .body(format!(r#"{{"nickname":"{nick}"}}"#))
            .dispatch()
    };

    assert_eq!(set("firstname").status(), Status::Ok);
    assert_eq!(set("secondname").status(), Status::TooManyRequests);
}

// S4: two identities race to claim the same nickname — exactly one wins.
// Driven straight at `nickname::set_nickname` over a shared `Arc<Db>` (the
// same connection the HTTP layer uses), since that's where the single-
// writer guarantee actually lives.
#[test]
fn concurrent_nickname_claims_have_exactly_one_winner() {
    let db = Arc::new(Db::new(&format!("file:profile_race_{}?mode=memory&cache=shared", uuid::Uuid::new_v4())));
    let cfg = AppConfig::default();
    let barrier = Arc::new(Barrier::new(2));

    let claim = |pubkey: &'static str, db: Arc<Db>, cfg: AppConfig, barrier: Arc<Barrier>| {
        thread::spawn(move || {
            barrier.wait();
            nickname::set_nickname(&db, &cfg, pubkey, "contested").is_ok()
        })
    };

    let t1 = claim("wallet-a", db.clone(), cfg.clone(), barrier.clone());
    let t2 = claim("wallet-b", db.clone(), cfg.clone(), barrier.clone());

    let r1 = t1.join().unwrap();
    let r2 = t2.join().unwrap();

    assert_eq!([r1, r2].iter().filter(|r| **r).count(), 1);
    assert_eq!(nickname::lookup_by_nickname(&db, "contested").unwrap().pubkey.starts_with("wallet-"), true);
}

#[test]
fn set_encryption_key_round_trips_through_profile() {
    let client = test_client();
    let wallet = new_wallet();
    let token = authenticate(&client, &wallet);

    let res = client
        .post("/profile/encryption-key")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"publicKey":"abcd1234"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);

    let res = client.get(format!("/profile/by-key?pubkey={}", wallet.pubkey)).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["profile"]["encryptionPublicKey"], "abcd1234");
}

#[test]
fn lookup_of_unknown_nickname_is_not_found() {
    let client = test_client();
    let res = client.get("/profile/lookup?nickname=nobodyhome").dispatch();
    assert_eq!(res.status(), Status::NotFound);
}
