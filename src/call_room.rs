//! Per-call signaling room: a durable two-participant state machine
//! that relays SDP offers/answers and ICE candidates over bidirectional
//! streams, with reconnection grace periods and alarm-driven lifecycle.
//!
//! Grounded on the teacher's `PresenceTracker` registry-of-trackers
//! pattern, generalized from a flat presence map to a map of per-room
//! actor handles. Each room is a dedicated task reachable only through
//! its `tokio::sync::mpsc` command channel, which is the literal
//! single-writer serialization the state machine needs — no extra
//! locking.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rusqlite::{params, OptionalExtension};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Duration};

use crate::config::AppConfig;
use crate::db::Db;
use crate::models::{CallStateView, CallStatus, ClientFrame, ServerFrame};
use crate::time::now_millis;

pub type OutgoingTx = mpsc::UnboundedSender<ServerFrame>;

fn status_str(status: &CallStatus) -> &'static str {
    match status {
        CallStatus::Ringing => "ringing",
        CallStatus::Connecting => "connecting",
        CallStatus::Active => "active",
        CallStatus::Ended => "ended",
    }
}

fn status_from_str(s: &str) -> CallStatus {
    match s {
        "connecting" => CallStatus::Connecting,
        "active" => CallStatus::Active,
        "ended" => CallStatus::Ended,
        _ => CallStatus::Ringing,
    }
}

enum RoomCommand {
    Attach {
        participant: String,
        outgoing: OutgoingTx,
        reply: oneshot::Sender<u64>,
    },
    Frame {
        participant: String,
        generation: u64,
        frame: ClientFrame,
    },
    Disconnect {
        participant: String,
        generation: u64,
        clean: bool,
    },
    CheckGrace {
        participant: String,
        generation: u64,
    },
    ForceEnd {
        reason: String,
    },
}

#[derive(Clone)]
pub struct CallRoomHandle {
    tx: mpsc::UnboundedSender<RoomCommand>,
}

impl CallRoomHandle {
    /// Attach a transport for `participant`, returning the generation
    /// assigned to this attachment. Any previously attached transport
    /// for the same participant is replaced.
    pub async fn attach(&self, participant: &str, outgoing: OutgoingTx) -> u64 {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(RoomCommand::Attach {
            participant: participant.to_string(),
            outgoing,
            reply,
        });
        rx.await.unwrap_or(0)
    }

    pub fn frame(&self, participant: &str, generation: u64, frame: ClientFrame) {
        let _ = self.tx.send(RoomCommand::Frame {
            participant: participant.to_string(),
            generation,
            frame,
        });
    }

    pub fn disconnect(&self, participant: &str, generation: u64, clean: bool) {
        let _ = self.tx.send(RoomCommand::Disconnect {
            participant: participant.to_string(),
            generation,
            clean,
        });
    }

    fn check_grace(&self, participant: &str, generation: u64) {
        let _ = self.tx.send(RoomCommand::CheckGrace {
            participant: participant.to_string(),
            generation,
        });
    }

    pub fn force_end(&self, reason: &str) {
        let _ = self.tx.send(RoomCommand::ForceEnd { reason: reason.to_string() });
    }
}

struct RoomActor {
    room_id: String,
    db: Arc<Db>,
    state: CallStateView,
    transports: HashMap<String, OutgoingTx>,
    generations: HashMap<String, u64>,
}

impl RoomActor {
    fn other_of(&self, participant: &str) -> String {
        if participant == self.state.caller_id {
            self.state.callee_id.clone()
        } else {
            self.state.caller_id.clone()
        }
    }

    fn send_to(&self, participant: &str, frame: ServerFrame) {
        if let Some(tx) = self.transports.get(participant) {
            let _ = tx.send(frame);
        }
    }

    fn persist(&self) {
        self.db
            .conn()
            .execute(
                "UPDATE call_rooms SET status = ?1, answered_at = ?2, ended_at = ?3, end_reason = ?4 WHERE room_id = ?5",
                params![
                    status_str(&self.state.status),
                    self.state.answered_at,
                    self.state.ended_at,
                    self.state.end_reason,
                    &self.room_id,
                ],
            )
            .expect("call_rooms update");
    }

    fn clear_pending_disconnect(&self, participant: &str) {
        self.db
            .conn()
            .execute(
                "DELETE FROM call_pending_disconnect WHERE room_id = ?1 AND participant_id = ?2",
                params![&self.room_id, participant],
            )
            .expect("pending disconnect delete");
    }

    fn record_pending_disconnect(&self, participant: &str, generation: u64) {
        self.db
            .conn()
            .execute(
                "INSERT INTO call_pending_disconnect (room_id, participant_id, at, generation)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(room_id, participant_id) DO UPDATE SET at = excluded.at, generation = excluded.generation",
                params![&self.room_id, participant, now_millis(), generation as i64],
            )
            .expect("pending disconnect insert");
    }

    fn end(&mut self, reason: &str) {
        self.state.status = CallStatus::Ended;
        self.state.ended_at = Some(now_millis());
        self.state.end_reason = Some(reason.to_string());
        self.persist();
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<RoomCommand>, self_handle: CallRoomHandle, grace_secs: u64) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                RoomCommand::Attach { participant, outgoing, reply } => {
                    let generation = self.generations.entry(participant.clone()).or_insert(0);
                    *generation += 1;
                    let generation = *generation;

                    self.clear_pending_disconnect(&participant);
                    if self.state.status != CallStatus::Ended {
                        let _ = outgoing.send(ServerFrame::CallState { state: self.state.clone() });
                    }
                    self.transports.insert(participant, outgoing);
                    let _ = reply.send(generation);
                }
                RoomCommand::Frame { participant, generation, frame } => {
                    if self.generations.get(&participant).copied() != Some(generation) {
                        continue;
                    }
                    if self.state.status == CallStatus::Ended {
                        continue;
                    }
                    let other = self.other_of(&participant);
                    match frame {
                        ClientFrame::Ping => {
                            self.send_to(&participant, ServerFrame::Pong);
                        }
                        ClientFrame::Offer { sdp } => {
                            self.send_to(&other, ServerFrame::Offer { sdp, from: participant });
                        }
                        ClientFrame::Answer { sdp } => {
                            self.send_to(&other, ServerFrame::Answer { sdp, from: participant });
                            if matches!(self.state.status, CallStatus::Ringing | CallStatus::Connecting) {
                                self.state.status = CallStatus::Active;
                                self.state.answered_at = Some(now_millis());
                                self.persist();
                            }
                        }
                        ClientFrame::IceCandidate { candidate } => {
                            self.send_to(&other, ServerFrame::IceCandidate { candidate, from: participant });
                        }
                        ClientFrame::CallAccept => {
                            if participant == self.state.callee_id {
                                self.send_to(&other, ServerFrame::CallAccepted { from: participant.clone() });
                                self.state.status = CallStatus::Connecting;
                                self.persist();
                            }
                        }
                        ClientFrame::CallReject => {
                            self.end("rejected");
                            let state = self.state.clone();
                            let caller = self.state.caller_id.clone();
                            let callee = self.state.callee_id.clone();
                            self.send_to(&caller, ServerFrame::CallEnded { reason: "rejected".into(), call_state: state.clone() });
                            self.send_to(&callee, ServerFrame::CallEnded { reason: "rejected".into(), call_state: state });
                        }
                        ClientFrame::CallEnd { reason } => {
                            let reason = reason.unwrap_or_else(|| "ended_by_user".to_string());
                            self.end(&reason);
                            let state = self.state.clone();
                            self.send_to(&other, ServerFrame::CallEnded { reason, call_state: state });
                        }
                    }
                }
                RoomCommand::Disconnect { participant, generation, clean } => {
                    if self.generations.get(&participant).copied() != Some(generation) {
                        continue;
                    }
                    self.transports.remove(&participant);
                    if self.state.status == CallStatus::Ended {
                        continue;
                    }
                    if clean {
                        self.finalize_disconnect(&participant);
                    } else {
                        self.record_pending_disconnect(&participant, generation);
                        let handle = self_handle.clone();
                        let participant = participant.clone();
                        tokio::spawn(async move {
                            sleep(Duration::from_secs(grace_secs)).await;
                            handle.check_grace(&participant, generation);
                        });
                    }
                }
                RoomCommand::CheckGrace { participant, generation } => {
                    if self.generations.get(&participant).copied() != Some(generation) {
                        continue;
                    }
                    if self.transports.contains_key(&participant) {
                        continue;
                    }
                    if self.state.status == CallStatus::Ended {
                        continue;
                    }
                    self.finalize_disconnect(&participant);
                }
                RoomCommand::ForceEnd { reason } => {
                    if self.state.status == CallStatus::Ended {
                        continue;
                    }
                    self.end(&reason);
                    let state = self.state.clone();
                    let caller = self.state.caller_id.clone();
                    let callee = self.state.callee_id.clone();
                    self.send_to(&caller, ServerFrame::CallEnded { reason: reason.clone(), call_state: state.clone() });
                    self.send_to(&callee, ServerFrame::CallEnded { reason, call_state: state });
                }
            }
        }
    }

    fn finalize_disconnect(&mut self, participant: &str) {
        self.clear_pending_disconnect(participant);
        let other = self.other_of(participant);
        self.send_to(&other, ServerFrame::ParticipantDisconnected { participant: participant.to_string() });
        self.end("disconnected");
        let state = self.state.clone();
        self.send_to(&other, ServerFrame::CallEnded { reason: "disconnected".into(), call_state: state });
    }
}

pub struct CallRoomRegistry {
    handles: RwLock<HashMap<String, CallRoomHandle>>,
    db: Arc<Db>,
    cfg: AppConfig,
}

impl CallRoomRegistry {
    pub fn new(db: Arc<Db>, cfg: AppConfig) -> Self {
        Self {
            handles: RwLock::new(HashMap::new()),
            db,
            cfg,
        }
    }

    fn spawn_actor(&self, room_id: &str, state: CallStateView) -> CallRoomHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = CallRoomHandle { tx };
        let actor = RoomActor {
            room_id: room_id.to_string(),
            db: self.db.clone(),
            state,
            transports: HashMap::new(),
            generations: HashMap::new(),
        };
        let grace_secs = self.cfg.call_disconnect_grace_secs;
        let self_handle = handle.clone();
        tokio::spawn(actor.run(rx, self_handle, grace_secs));
        handle
    }

    /// Start a new call, persisting its initial `ringing` state.
    pub fn initiate(&self, room_id: &str, caller_id: &str, callee_id: &str, caller_name: Option<String>) -> CallStateView {
        let now = now_millis();
        let state = CallStateView {
            call_id: room_id.to_string(),
            caller_id: caller_id.to_string(),
            callee_id: callee_id.to_string(),
            caller_name,
            status: CallStatus::Ringing,
            initiated_at: now,
            answered_at: None,
            ended_at: None,
            end_reason: None,
        };

        self.db
            .conn()
            .execute(
                "INSERT INTO call_rooms (room_id, caller_id, callee_id, caller_name, status, initiated_at, answered_at, ended_at, end_reason)
                 VALUES (?1, ?2, ?3, ?4, 'ringing', ?5, NULL, NULL, NULL)",
                params![room_id, caller_id, callee_id, &state.caller_name, now],
            )
            .expect("call_rooms insert");

        let handle = self.spawn_actor(room_id, state.clone());
        self.handles.write().unwrap_or_else(|e| e.into_inner()).insert(room_id.to_string(), handle);
        state
    }

    fn load_state(&self, room_id: &str) -> Option<CallStateView> {
        self.db
            .conn()
            .query_row(
                "SELECT caller_id, callee_id, caller_name, status, initiated_at, answered_at, ended_at, end_reason
                 FROM call_rooms WHERE room_id = ?1",
                params![room_id],
                |r| {
                    Ok(CallStateView {
                        call_id: room_id.to_string(),
                        caller_id: r.get(0)?,
                        callee_id: r.get(1)?,
                        caller_name: r.get(2)?,
                        status: status_from_str(&r.get::<_, String>(3)?),
                        initiated_at: r.get(4)?,
                        answered_at: r.get(5)?,
                        ended_at: r.get(6)?,
                        end_reason: r.get(7)?,
                    })
                },
            )
            .optional()
            .expect("call_rooms lookup")
    }

    /// Whether `identity` is one of the two participants on `room_id`.
    pub fn is_participant(&self, room_id: &str, identity: &str) -> bool {
        self.load_state(room_id)
            .is_some_and(|s| s.caller_id == identity || s.callee_id == identity)
    }

    /// Get a handle for an existing, non-ended room, rehydrating its
    /// actor from the database if this process doesn't have it in
    /// memory (e.g. after a restart).
    pub fn get(&self, room_id: &str) -> Option<CallRoomHandle> {
        if let Some(handle) = self.handles.read().unwrap_or_else(|e| e.into_inner()).get(room_id) {
            return Some(handle.clone());
        }

        let state = self.load_state(room_id)?;
        if state.status == CallStatus::Ended {
            return None;
        }

        let handle = self.spawn_actor(room_id, state);
        self.handles.write().unwrap_or_else(|e| e.into_inner()).insert(room_id.to_string(), handle.clone());
        Some(handle)
    }

    /// Scan for calls that rang for over 5 minutes without ever being
    /// answered and mark them stale. Ground: `retention.rs`'s sweep loop.
    pub fn sweep_stale(&self, stale_after_secs: i64) -> usize {
        let cutoff = now_millis() - stale_after_secs * 1000;
        let conn = self.db.conn();
        let mut stmt = conn
            .prepare(
                "SELECT room_id FROM call_rooms
                 WHERE status != 'ended' AND answered_at IS NULL AND initiated_at < ?1",
            )
            .expect("prepare stale scan");
        let stale_rooms: Vec<String> = stmt
            .query_map(params![cutoff], |r| r.get(0))
            .expect("stale scan query")
            .filter_map(Result::ok)
            .collect();
        drop(stmt);
        drop(conn);

        for room_id in &stale_rooms {
            self.db
                .conn()
                .execute(
                    "UPDATE call_rooms SET status = 'ended', ended_at = ?1, end_reason = 'stale' WHERE room_id = ?2",
                    params![now_millis(), room_id],
                )
                .expect("call_rooms stale update");

            if let Some(handle) = self.handles.read().unwrap_or_else(|e| e.into_inner()).get(room_id) {
                handle.force_end("stale");
            }
        }
        stale_rooms.len()
    }
}
