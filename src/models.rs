use serde::{Deserialize, Serialize};

// --- Auth ---

#[derive(Debug, Serialize)]
pub struct NonceResponse {
    pub nonce: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub pubkey: String,
    pub nonce: String,
    pub signature: String,
    #[serde(rename = "sessionTtl")]
    pub session_ttl: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UserRef {
    pub pubkey: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub token: String,
    pub user: UserRef,
}

// --- Profile ---

#[derive(Debug, Serialize, Clone, Default)]
pub struct Profile {
    pub pubkey: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "encryptionPublicKey", skip_serializing_if = "Option::is_none")]
    pub encryption_public_key: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
    #[serde(rename = "nicknameChangedAt", skip_serializing_if = "Option::is_none")]
    pub nickname_changed_at: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Profile,
}

#[derive(Debug, Deserialize)]
pub struct SetNicknameRequest {
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
pub struct SetEncryptionKeyRequest {
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

// --- Messages / Inbox ---

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub to: String,
    pub text: Option<String>,
    pub ciphertext: Option<String>,
    pub nonce: Option<String>,
    pub version: Option<i32>,
    pub timestamp: Option<i64>,
    #[serde(rename = "tokenPreview")]
    pub token_preview: Option<serde_json::Value>,
    #[serde(rename = "senderEncryptionKey")]
    pub sender_encryption_key: Option<String>,
    #[serde(rename = "voiceKey")]
    pub voice_key: Option<String>,
    #[serde(rename = "voiceDuration")]
    pub voice_duration: Option<f64>,
    #[serde(rename = "voiceNonce")]
    pub voice_nonce: Option<String>,
    #[serde(rename = "voiceMimeType")]
    pub voice_mime_type: Option<String>,
    #[serde(rename = "voiceWaveform")]
    pub voice_waveform: Option<Vec<f64>>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub ok: bool,
    #[serde(rename = "messageId")]
    pub message_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageEnvelope {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ciphertext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(rename = "encryptionVersion", skip_serializing_if = "Option::is_none")]
    pub encryption_version: Option<i32>,
    pub timestamp: i64,
    #[serde(rename = "senderNickname", skip_serializing_if = "Option::is_none")]
    pub sender_nickname: Option<String>,
    #[serde(rename = "senderDisplayName", skip_serializing_if = "Option::is_none")]
    pub sender_display_name: Option<String>,
    #[serde(rename = "senderEncryptionKey", skip_serializing_if = "Option::is_none")]
    pub sender_encryption_key: Option<String>,
    #[serde(rename = "tokenPreview", skip_serializing_if = "Option::is_none")]
    pub token_preview: Option<serde_json::Value>,
    #[serde(rename = "voiceKey", skip_serializing_if = "Option::is_none")]
    pub voice_key: Option<String>,
    #[serde(rename = "voiceDuration", skip_serializing_if = "Option::is_none")]
    pub voice_duration: Option<f64>,
    #[serde(rename = "voiceNonce", skip_serializing_if = "Option::is_none")]
    pub voice_nonce: Option<String>,
    #[serde(rename = "voiceMimeType", skip_serializing_if = "Option::is_none")]
    pub voice_mime_type: Option<String>,
    #[serde(rename = "voiceWaveform", skip_serializing_if = "Option::is_none")]
    pub voice_waveform: Option<Vec<f64>>,
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub messages: Vec<MessageEnvelope>,
}

#[derive(Debug, Deserialize)]
pub struct AckRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

// --- Chat sync (encrypted backup) ---

#[derive(Debug, Deserialize)]
pub struct SyncPutRequest {
    pub encrypted: String,
}

#[derive(Debug, Serialize)]
pub struct SyncPutResponse {
    pub ok: bool,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct SyncGetResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<String>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

// --- Voice ---

#[derive(Debug, Deserialize)]
pub struct VoiceUploadRequest {
    #[serde(rename = "recipientPubkey")]
    pub recipient_pubkey: String,
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(rename = "encryptedAudio")]
    pub encrypted_audio: String,
    pub duration: f64,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
pub struct VoiceUploadResponse {
    pub ok: bool,
    #[serde(rename = "voiceKey")]
    pub voice_key: String,
    pub size: i64,
}

#[derive(Debug, Serialize)]
pub struct VoiceDownloadResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none", rename = "encryptedAudio")]
    pub encrypted_audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(rename = "senderPubkey", skip_serializing_if = "Option::is_none")]
    pub sender_pubkey: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VoiceBlobMetadata {
    #[serde(rename = "senderPubkey", skip_serializing_if = "Option::is_none")]
    pub sender_pubkey: Option<String>,
    #[serde(rename = "recipientPubkey", skip_serializing_if = "Option::is_none")]
    pub recipient_pubkey: Option<String>,
    #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: i64,
    pub size: i64,
    pub version: i32,
}

// --- Call signaling wire frames ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Ping,
    Offer { sdp: String },
    Answer { sdp: String },
    IceCandidate { candidate: serde_json::Value },
    CallAccept,
    CallReject,
    CallEnd { reason: Option<String> },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Pong,
    CallState { state: CallStateView },
    Offer { sdp: String, from: String },
    Answer { sdp: String, from: String },
    IceCandidate { candidate: serde_json::Value, from: String },
    CallAccepted { from: String },
    CallEnded { reason: String, #[serde(rename = "callState")] call_state: CallStateView },
    ParticipantDisconnected { participant: String },
    ErrorFrame { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Ringing,
    Connecting,
    Active,
    Ended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStateView {
    #[serde(rename = "callId")]
    pub call_id: String,
    #[serde(rename = "callerId")]
    pub caller_id: String,
    #[serde(rename = "calleeId")]
    pub callee_id: String,
    #[serde(rename = "callerName", skip_serializing_if = "Option::is_none")]
    pub caller_name: Option<String>,
    pub status: CallStatus,
    #[serde(rename = "initiatedAt")]
    pub initiated_at: i64,
    #[serde(rename = "answeredAt", skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<i64>,
    #[serde(rename = "endedAt", skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
    #[serde(rename = "endReason", skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<String>,
}
