use base64::Engine;
use rocket::http::{ContentType, Status};

use crate::common::{auth_header, authenticate, new_wallet, test_client};

#[test]
fn sync_put_then_get_round_trips() {
    let client = test_client();
    let alice = new_wallet();
    let token = authenticate(&client, &alice);
    let payload = base64::engine::general_purpose::STANDARD.encode(b"encrypted chat log");

    let res = client
        .put("/sync/chat/bob-contact-key")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(format!(r#"{{"encrypted":"{payload}"}}"#))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);

    let res = client.get("/sync/chat/bob-contact-key").header(auth_header(&token)).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["found"], true);
    assert_eq!(body["encrypted"], payload);
}

#[test]
fn sync_is_partitioned_per_contact_key() {
    let client = test_client();
    let alice = new_wallet();
    let token = authenticate(&client, &alice);

    let put = |contact: &str, data: &str| {
        let payload = base64::engine::general_purpose::STANDARD.encode(data.as_bytes());
        client
            .put(format!("/sync/chat/{contact}"))
            .header(ContentType::JSON)
            .header(auth_header(&token))
            .body(format!(r#"{{"encrypted":"{payload}"}}"#))
            .dispatch()
    };
    assert_eq!(put("bob", "log with bob").status(), Status::Ok);
    assert_eq!(put("carol", "log with carol").status(), Status::Ok);

    let get_text = |contact: &str| {
        let res = client.get(format!("/sync/chat/{contact}")).header(auth_header(&token)).dispatch();
        let body: serde_json::Value = res.into_json().unwrap();
        let encoded = body["encrypted"].as_str().unwrap().to_string();
        String::from_utf8(base64::engine::general_purpose::STANDARD.decode(encoded).unwrap()).unwrap()
    };
    assert_eq!(get_text("bob"), "log with bob");
    assert_eq!(get_text("carol"), "log with carol");
}

#[test]
fn sync_delete_clears_the_blob() {
    let client = test_client();
    let alice = new_wallet();
    let token = authenticate(&client, &alice);
    let payload = base64::engine::general_purpose::STANDARD.encode(b"data");

    client
        .put("/sync/chat/bob")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(format!(r#"{{"encrypted":"{payload}"}}"#))
        .dispatch();

    let res = client.delete("/sync/chat/bob").header(auth_header(&token)).dispatch();
    assert_eq!(res.status(), Status::Ok);

    let res = client.get("/sync/chat/bob").header(auth_header(&token)).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["found"], false);
}

#[test]
fn unknown_sync_key_is_reported_not_found_not_an_error() {
    let client = test_client();
    let alice = new_wallet();
    let token = authenticate(&client, &alice);

    let res = client.get("/sync/chat/never-synced").header(auth_header(&token)).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["found"], false);
}
