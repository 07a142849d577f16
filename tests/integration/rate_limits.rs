use rocket::http::{ContentType, Status};
use wallet_messenger_core::config::AppConfig;

use crate::common::{auth_header, authenticate, new_wallet, test_client_with_config};

#[test]
fn send_rate_limit_headers_report_remaining_budget() {
    let cfg = AppConfig { rate_limit_send_max: 2, rate_limit_send_window_secs: 60, ..AppConfig::default() };
    let client = test_client_with_config(cfg);
    let alice = new_wallet();
    let bob = new_wallet();
    let token = authenticate(&client, &alice);

    let send = || {
        client
            .post("/messages/send")
            .header(ContentType::JSON)
            .header(auth_header(&token))
            .body(format!(r#"{{"to":"{}","text":"hi"}}"#, bob.pubkey))
            .dispatch()
    };

    let res1 = send();
    assert_eq!(res1.status(), Status::Ok);
    assert_eq!(res1.headers().get_one("X-RateLimit-Remaining"), Some("1"));

    let res2 = send();
    assert_eq!(res2.status(), Status::Ok);
    assert_eq!(res2.headers().get_one("X-RateLimit-Remaining"), Some("0"));

    let res3 = send();
    assert_eq!(res3.status(), Status::TooManyRequests);
    assert!(res3.headers().get_one("Retry-After").is_some());
}

#[test]
fn voice_and_send_limits_are_tracked_independently() {
    let cfg = AppConfig { rate_limit_send_max: 1, rate_limit_voice_max: 1, ..AppConfig::default() };
    let client = test_client_with_config(cfg);
    let alice = new_wallet();
    let bob = new_wallet();
    let token = authenticate(&client, &alice);

    let send = client
        .post("/messages/send")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(format!(r#"{{"to":"{}","text":"hi"}}"#, bob.pubkey))
        .dispatch();
    assert_eq!(send.status(), Status::Ok);

    let upload = client
        .post("/voice/upload")
        .header(ContentType::JSON)
        .header(auth_header(&token))
        .body(format!(
            r#"{{"recipientPubkey":"{}","messageId":"m1","encryptedAudio":"aGVsbG8=","duration":1.0,"mimeType":"audio/ogg"}}"#,
            bob.pubkey
        ))
        .dispatch();
    assert_eq!(upload.status(), Status::Ok);
}
