// WebRTC signaling relay (offer/answer/ICE, disconnect grace) is exercised
// directly against the room actor in call_room.rs's own tests, since the
// WebSocket upgrade isn't reachable through rocket's local blocking client.
// This module covers the HTTP side: minting a call room.

use rocket::http::{ContentType, Status};

use crate::common::{auth_header, authenticate, new_wallet, test_client};

#[test]
fn initiating_a_call_mints_a_ringing_room() {
    let client = test_client();
    let caller = new_wallet();
    let callee = new_wallet();
    let token = authenticate(&client, &caller);

    let res = client
        .post("/call/initiate")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(format!(r#"{{"calleePubkey":"{}","callerName":"Caller"}}"#, callee.pubkey))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["roomId"].as_str().is_some());
    assert_eq!(body["callState"]["status"], "ringing");
    assert_eq!(body["callState"]["callerId"], caller.pubkey);
    assert_eq!(body["callState"]["calleeId"], callee.pubkey);
}

#[test]
fn initiating_a_call_with_an_invalid_callee_is_rejected() {
    let client = test_client();
    let caller = new_wallet();
    let token = authenticate(&client, &caller);

    let res = client
        .post("/call/initiate")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(r#"{"calleePubkey":"not-a-pubkey"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn initiating_a_call_without_a_session_is_rejected() {
    let client = test_client();
    let callee = new_wallet();

    let res = client
        .post("/call/initiate")
        .header(ContentType::JSON)
        .body(format!(r#"{{"calleePubkey":"{}"}}"#, callee.pubkey))
        .dispatch();
    assert_eq!(res.status(), Status::Unauthorized);
}
