use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;
use rocket::local::blocking::Client;

/// Wrapper around Client that auto-deletes the temp DB on drop.
/// Prevents /tmp accumulation across repeated test runs.
pub struct TestClient {
    client: Option<Client>,
    db_path: String,
}

impl Drop for TestClient {
    fn drop(&mut self) {
        drop(self.client.take());
        let _ = std::fs::remove_file(&self.db_path);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_path));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_path));
    }
}

impl std::ops::Deref for TestClient {
    type Target = Client;
    fn deref(&self) -> &Client {
        self.client.as_ref().unwrap()
    }
}

pub fn test_client() -> TestClient {
    let db_path = format!("/tmp/messenger_test_{}.db", uuid::Uuid::new_v4());
    let rocket = wallet_messenger_core::rocket_with_db(&db_path);
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestClient { client: Some(client), db_path }
}

pub fn test_client_with_config(cfg: wallet_messenger_core::config::AppConfig) -> TestClient {
    let db_path = format!("/tmp/messenger_test_{}.db", uuid::Uuid::new_v4());
    let rocket = wallet_messenger_core::rocket_with_db_and_config(&db_path, cfg);
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestClient { client: Some(client), db_path }
}

/// A wallet keypair plus its base58 pubkey, for signing challenges in tests.
pub struct Wallet {
    pub signing_key: SigningKey,
    pub pubkey: String,
}

pub fn new_wallet() -> Wallet {
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);
    let signing_key = SigningKey::from_bytes(&seed);
    let pubkey = bs58::encode(signing_key.verifying_key().to_bytes()).into_string();
    Wallet { signing_key, pubkey }
}

impl Wallet {
    pub fn sign(&self, message: &str) -> String {
        let sig = self.signing_key.sign(message.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(sig.to_bytes())
    }
}

/// Runs the full nonce/verify handshake for `wallet` and returns its bearer token.
pub fn authenticate(client: &Client, wallet: &Wallet) -> String {
    let res = client.get(format!("/auth/nonce?pubkey={}", wallet.pubkey)).dispatch();
    assert_eq!(res.status(), rocket::http::Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    let nonce = body["nonce"].as_str().unwrap().to_string();
    let signature = wallet.sign(&nonce);

    let res = client
        .post("/auth/verify")
        .header(rocket::http::ContentType::JSON)
        .body(format!(
            r#"{{"pubkey":"{}","nonce":"{}","signature":"{}"}}"#,
            wallet.pubkey, nonce, signature
        ))
        .dispatch();
    assert_eq!(res.status(), rocket::http::Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    body["token"].as_str().unwrap().to_string()
}

pub fn auth_header(token: &str) -> rocket::http::Header<'static> {
    rocket::http::Header::new("Authorization", format!("Bearer {token}"))
}
