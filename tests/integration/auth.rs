use rocket::http::Status;

use crate::common::{auth_header, new_wallet, test_client};

#[test]
fn health_check() {
    let client = test_client();
    let res = client.get("/health").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["status"], "ok");
}

// S1: full wallet auth — nonce, signed verify, bearer-gated profile read.
#[test]
fn full_auth_flow_grants_a_usable_session() {
    let client = test_client();
    let wallet = new_wallet();

    let res = client.get(format!("/auth/nonce?pubkey={}", wallet.pubkey)).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    let nonce = body["nonce"].as_str().unwrap().to_string();

    let signature = wallet.sign(&nonce);
    let res = client
        .post("/auth/verify")
        .header(rocket::http::ContentType::JSON)
        .body(format!(r#"{{"pubkey":"{}","nonce":"{}","signature":"{}"}}"#, wallet.pubkey, nonce, signature))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    let token = body["token"].as_str().unwrap();
    assert_eq!(body["user"]["pubkey"], wallet.pubkey);

    let res = client.get("/profile/me").header(auth_header(token)).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["profile"]["pubkey"], wallet.pubkey);
}

#[test]
fn nonce_is_single_use() {
    let client = test_client();
    let wallet = new_wallet();

    let res = client.get(format!("/auth/nonce?pubkey={}", wallet.pubkey)).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let nonce = body["nonce"].as_str().unwrap().to_string();
    let signature = wallet.sign(&nonce);

    let verify = |nonce: &str, sig: &str| {
        client
            .post("/auth/verify")
            .header(rocket::http::ContentType::JSON)
            .body(format!(r#"{{"pubkey":"{}","nonce":"{}","signature":"{}"}}"#, wallet.pubkey, nonce, sig))
            .dispatch()
    };

    assert_eq!(verify(&nonce, &signature).status(), Status::Ok);
    assert_eq!(verify(&nonce, &signature).status(), Status::Unauthorized);
}

#[test]
fn wrong_signature_is_rejected() {
    let client = test_client();
    let wallet = new_wallet();
    let impostor = new_wallet();

    let res = client.get(format!("/auth/nonce?pubkey={}", wallet.pubkey)).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let nonce = body["nonce"].as_str().unwrap().to_string();
    let bad_signature = impostor.sign(&nonce);

    let res = client
        .post("/auth/verify")
        .header(rocket::http::ContentType::JSON)
        .body(format!(r#"{{"pubkey":"{}","nonce":"{}","signature":"{}"}}"#, wallet.pubkey, nonce, bad_signature))
        .dispatch();
    assert_eq!(res.status(), Status::Unauthorized);
}

#[test]
fn unauthenticated_profile_read_is_rejected() {
    let client = test_client();
    let res = client.get("/profile/me").dispatch();
    assert_eq!(res.status(), Status::Unauthorized);
}

#[test]
fn malformed_pubkey_is_rejected() {
    let client = test_client();
    let res = client.get("/auth/nonce?pubkey=not-a-real-pubkey").dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}
