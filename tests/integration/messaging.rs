use rocket::http::{ContentType, Status};

use crate::common::{auth_header, authenticate, new_wallet, test_client};

fn send(
    client: &rocket::local::blocking::Client,
    token: &str,
    to: &str,
    id_hint: &str,
    text: &str,
) -> serde_json::Value {
    let res = client
        .post("/messages/send")
        .header(ContentType::JSON)
        .header(auth_header(token))
        .body(format!(r#"{{"to":"{to}","text":"{text} {id_hint}"}}"#))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    res.into_json().unwrap()
}

// S2: ordered delivery — recipient pulls messages in send order, then acks.
#[test]
fn messages_are_delivered_in_order_and_ack_clears_them() {
    let client = test_client();
    let alice = new_wallet();
    let bob = new_wallet();
    let alice_token = authenticate(&client, &alice);
    let bob_token = authenticate(&client, &bob);

    send(&client, &alice_token, &bob.pubkey, "1", "first");
    send(&client, &alice_token, &bob.pubkey, "2", "second");
    send(&client, &alice_token, &bob.pubkey, "3", "third");

    let res = client.get("/inbox/poll").header(auth_header(&bob_token)).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages[0]["text"].as_str().unwrap().ends_with(" 1"));
    assert!(messages[1]["text"].as_str().unwrap().ends_with(" 2"));
    assert!(messages[2]["text"].as_str().unwrap().ends_with(" 3"));

    let ids: Vec<String> = messages.iter().map(|m| m["id"].as_str().unwrap().to_string()).collect();
    let res = client
        .post("/messages/ack")
        .header(ContentType::JSON)
        .header(auth_header(&bob_token))
        .body(serde_json::json!({ "ids": ids }).to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Ok);

    let res = client.get("/inbox/poll").header(auth_header(&bob_token)).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["messages"].as_array().unwrap().is_empty());
}

#[test]
fn sending_without_any_payload_variant_is_rejected() {
    let client = test_client();
    let alice = new_wallet();
    let bob = new_wallet();
    let token = authenticate(&client, &alice);

    let res = client
        .post("/messages/send")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(format!(r#"{{"to":"{}"}}"#, bob.pubkey))
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn sending_to_an_invalid_recipient_is_rejected() {
    let client = test_client();
    let alice = new_wallet();
    let token = authenticate(&client, &alice);

    let res = client
        .post("/messages/send")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"to":"not-a-pubkey","text":"hi"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn acking_an_already_acked_id_is_not_an_error() {
    let client = test_client();
    let alice = new_wallet();
    let bob = new_wallet();
    let alice_token = authenticate(&client, &alice);
    let bob_token = authenticate(&client, &bob);

    let sent = send(&client, &alice_token, &bob.pubkey, "1", "hello");
    let message_id = sent["messageId"].as_str().unwrap().to_string();

    let ack = || {
        client
            .post("/messages/ack")
            .header(ContentType::JSON)
            .header(auth_header(&bob_token))
            .body(serde_json::json!({ "ids": [message_id.clone()] }).to_string())
            .dispatch()
    };
    assert_eq!(ack().status(), Status::Ok);
    assert_eq!(ack().status(), Status::Ok);
}

#[test]
fn long_poll_returns_promptly_once_a_message_arrives() {
    let client = test_client();
    let alice = new_wallet();
    let bob = new_wallet();
    let alice_token = authenticate(&client, &alice);
    let bob_token = authenticate(&client, &bob);

    send(&client, &alice_token, &bob.pubkey, "1", "hi");

    let res = client.get("/inbox/poll?wait=2000").header(auth_header(&bob_token)).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
}
