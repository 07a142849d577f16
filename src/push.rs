//! Best-effort push-notification trigger, fired after a successful
//! inbox `store` without blocking or failing the enqueue path.
//!
//! Grounded on `webhooks.rs`'s HMAC-signed fire-and-forget delivery:
//! same reqwest client, same "swallow all errors" posture, but there is
//! no subscriber list to fan out to here — a single configured endpoint
//! (or none) receives a `{recipient, messageId}` ping.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct PushNotifier {
    client: reqwest::Client,
    endpoint: Option<String>,
    secret: Option<Arc<String>>,
}

impl PushNotifier {
    pub fn from_env() -> Self {
        let endpoint = std::env::var("PUSH_NOTIFY_URL").ok();
        let secret = std::env::var("PUSH_NOTIFY_SECRET").ok().map(Arc::new);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("failed to create push notifier HTTP client");

        PushNotifier { client, endpoint, secret }
    }

    /// Notify `recipient` that `message_id` is waiting for them. Fire
    /// and forget: spawned on its own task, errors are logged and
    /// never propagate back to the caller.
    pub fn notify(&self, recipient: &str, message_id: &str) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };

        let client = self.client.clone();
        let secret = self.secret.clone();
        let body = serde_json::json!({ "recipient": recipient, "messageId": message_id }).to_string();

        tokio::spawn(async move {
            let mut request = client.post(&endpoint).header("Content-Type", "application/json");

            if let Some(secret) = secret
                && let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes())
            {
                mac.update(body.as_bytes());
                let signature = hex::encode(mac.finalize().into_bytes());
                request = request.header("X-Signature", signature);
            }

            if let Err(err) = request.body(body).send().await {
                eprintln!("push notification delivery failed: {err}");
            }
        });
    }
}

impl Default for PushNotifier {
    fn default() -> Self {
        PushNotifier {
            client: reqwest::Client::new(),
            endpoint: None,
            secret: None,
        }
    }
}
