//! Virtual club rooms: in-memory presence and event fan-out.
//!
//! Each room owns a `tokio::sync::broadcast` channel and a presence map of
//! avatar states. WebSocket connections subscribe on join, receive a presence
//! snapshot, and then get `join` / `leave` / `chat` / `move` events as they
//! happen. Rooms exist only while occupied; the last leave drops the room.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use crate::config::ClubConfig;
use crate::errors::{Error, Result};

/// Identifies one live connection. Display names are not unique, so presence
/// is keyed by connection rather than by name.
pub type ConnectionId = u64;

/// One occupant's avatar state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvatarState {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub sprite: Option<String>,
    pub color: Option<String>,
}

/// Events fanned out to every subscriber of a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClubEvent {
    /// Sent once to a joining client, never broadcast.
    Snapshot { room: String, occupants: Vec<AvatarState> },
    Join { avatar: AvatarState },
    Leave { name: String },
    Chat { name: String, message: String },
    Move { name: String, x: f32, y: f32 },
}

/// Messages a connected client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Chat { message: String },
    Move { x: f32, y: f32 },
}

struct Room {
    tx: broadcast::Sender<ClubEvent>,
    presence: DashMap<ConnectionId, AvatarState>,
}

/// Shared club state, one per application.
pub struct ClubState {
    rooms: DashMap<String, Arc<Room>>,
    next_conn: AtomicU64,
    buffer: usize,
    max_chat_len: usize,
}

impl ClubState {
    pub fn new(config: &ClubConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            next_conn: AtomicU64::new(0),
            buffer: config.room_buffer,
            max_chat_len: config.max_chat_len,
        }
    }

    /// Join a room, creating it on first entry. Returns the connection id,
    /// the event receiver, and a snapshot of who was already there
    /// (excluding the joiner).
    pub fn join(
        &self,
        room_name: &str,
        avatar: AvatarState,
    ) -> (ConnectionId, broadcast::Receiver<ClubEvent>, ClubEvent) {
        let room = self
            .rooms
            .entry(room_name.to_string())
            .or_insert_with(|| {
                Arc::new(Room {
                    tx: broadcast::channel(self.buffer).0,
                    presence: DashMap::new(),
                })
            })
            .clone();

        let conn = self.next_conn.fetch_add(1, Ordering::Relaxed);
        let occupants: Vec<AvatarState> = room.presence.iter().map(|entry| entry.value().clone()).collect();
        let snapshot = ClubEvent::Snapshot {
            room: room_name.to_string(),
            occupants,
        };

        let rx = room.tx.subscribe();
        room.presence.insert(conn, avatar.clone());
        // Nobody listening yet is fine
        let _ = room.tx.send(ClubEvent::Join { avatar });

        (conn, rx, snapshot)
    }

    /// Leave a room. The room is dropped once the last occupant is gone.
    pub fn leave(&self, room_name: &str, conn: ConnectionId) {
        let Some(room) = self.rooms.get(room_name).map(|r| r.clone()) else {
            return;
        };

        if let Some((_, avatar)) = room.presence.remove(&conn) {
            let _ = room.tx.send(ClubEvent::Leave { name: avatar.name });
        }

        if room.presence.is_empty() {
            self.rooms.remove_if(room_name, |_, r| r.presence.is_empty());
        }
    }

    /// Broadcast a chat message, enforcing the length cap.
    pub fn chat(&self, room_name: &str, name: &str, message: &str) -> Result<()> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::BadRequest {
                message: "Chat message must not be empty".to_string(),
            });
        }
        if message.chars().count() > self.max_chat_len {
            return Err(Error::BadRequest {
                message: format!("Chat message exceeds {} characters", self.max_chat_len),
            });
        }

        let Some(room) = self.rooms.get(room_name).map(|r| r.clone()) else {
            return Ok(());
        };
        let _ = room.tx.send(ClubEvent::Chat {
            name: name.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    /// Update an occupant's position and broadcast the move.
    pub fn move_to(&self, room_name: &str, conn: ConnectionId, x: f32, y: f32) {
        let Some(room) = self.rooms.get(room_name).map(|r| r.clone()) else {
            return;
        };
        let name = {
            let Some(mut avatar) = room.presence.get_mut(&conn) else {
                return;
            };
            avatar.x = x;
            avatar.y = y;
            avatar.name.clone()
        };
        let _ = room.tx.send(ClubEvent::Move { name, x, y });
    }

    /// Number of occupied rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Occupants currently in a room.
    pub fn occupancy(&self, room_name: &str) -> usize {
        self.rooms.get(room_name).map(|r| r.presence.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ClubState {
        ClubState::new(&ClubConfig::default())
    }

    fn avatar(name: &str) -> AvatarState {
        AvatarState {
            name: name.to_string(),
            x: 0.0,
            y: 0.0,
            sprite: Some("dancer".to_string()),
            color: Some("#ff00aa".to_string()),
        }
    }

    #[test]
    fn test_join_creates_room_and_snapshot_excludes_joiner() {
        let club = state();
        let (_conn, _rx1, snapshot) = club.join("main-floor", avatar("ada"));

        assert_eq!(club.room_count(), 1);
        assert_eq!(club.occupancy("main-floor"), 1);
        match snapshot {
            ClubEvent::Snapshot { room, occupants } => {
                assert_eq!(room, "main-floor");
                assert!(occupants.is_empty());
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn test_second_joiner_sees_first_in_snapshot() {
        let club = state();
        let (_conn1, mut rx1, _) = club.join("main-floor", avatar("ada"));
        let (_conn2, _rx2, snapshot) = club.join("main-floor", avatar("ben"));

        match snapshot {
            ClubEvent::Snapshot { occupants, .. } => {
                assert_eq!(occupants.len(), 1);
                assert_eq!(occupants[0].name, "ada");
            }
            other => panic!("expected snapshot, got {other:?}"),
        }

        // First occupant sees the join event
        let event = rx1.try_recv().unwrap();
        assert!(matches!(event, ClubEvent::Join { avatar } if avatar.name == "ben"));
    }

    #[test]
    fn test_chat_fans_out_and_is_length_capped() {
        let club = state();
        let (_conn1, _rx1, _) = club.join("main-floor", avatar("ada"));
        let (_conn2, mut rx2, _) = club.join("main-floor", avatar("ben"));

        club.chat("main-floor", "ada", "  tune!  ").unwrap();
        let event = rx2.try_recv().unwrap();
        assert_eq!(
            event,
            ClubEvent::Chat {
                name: "ada".to_string(),
                message: "tune!".to_string()
            }
        );

        let too_long = "x".repeat(501);
        assert!(club.chat("main-floor", "ada", &too_long).is_err());
        assert!(club.chat("main-floor", "ada", "   ").is_err());
    }

    #[test]
    fn test_move_updates_presence() {
        let club = state();
        let (ada, _rx, _) = club.join("main-floor", avatar("ada"));
        let (_conn2, mut rx2, _) = club.join("main-floor", avatar("ben"));

        club.move_to("main-floor", ada, 3.5, -1.0);

        let event = rx2.try_recv().unwrap();
        assert!(matches!(event, ClubEvent::Move { name, x, y } if name == "ada" && x == 3.5 && y == -1.0));

        // A later joiner sees the updated position in the snapshot
        let (_conn3, _rx3, snapshot) = club.join("main-floor", avatar("cleo"));
        match snapshot {
            ClubEvent::Snapshot { occupants, .. } => {
                let ada = occupants.iter().find(|o| o.name == "ada").unwrap();
                assert_eq!((ada.x, ada.y), (3.5, -1.0));
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn test_last_leave_drops_room() {
        let club = state();
        let (ada, _rx1, _) = club.join("main-floor", avatar("ada"));
        let (ben, _rx2, _) = club.join("main-floor", avatar("ben"));

        club.leave("main-floor", ada);
        assert_eq!(club.room_count(), 1);
        assert_eq!(club.occupancy("main-floor"), 1);

        club.leave("main-floor", ben);
        assert_eq!(club.room_count(), 0);
    }

    #[test]
    fn test_same_name_occupants_do_not_collide() {
        let club = state();
        let (first, _rx1, _) = club.join("main-floor", avatar("ada"));
        let (_second, mut rx2, _) = club.join("main-floor", avatar("ada"));
        assert_eq!(club.occupancy("main-floor"), 2);

        club.move_to("main-floor", first, 9.0, 9.0);
        club.leave("main-floor", first);
        assert_eq!(club.occupancy("main-floor"), 1);

        let _ = rx2.try_recv(); // own join
        assert!(matches!(rx2.try_recv().unwrap(), ClubEvent::Move { .. }));
        assert!(matches!(rx2.try_recv().unwrap(), ClubEvent::Leave { name } if name == "ada"));
        assert!(rx2.try_recv().is_err());

        // The remaining namesake kept its own position
        let (_conn3, _rx3, snapshot) = club.join("main-floor", avatar("ben"));
        match snapshot {
            ClubEvent::Snapshot { occupants, .. } => {
                assert_eq!(occupants.len(), 1);
                assert_eq!(occupants[0].name, "ada");
                assert_eq!((occupants[0].x, occupants[0].y), (0.0, 0.0));
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn test_leave_with_unknown_connection_is_a_no_op() {
        let club = state();
        let (_conn, mut rx, _) = club.join("main-floor", avatar("ada"));

        let _ = rx.try_recv(); // own join
        club.leave("main-floor", 9999);
        assert_eq!(club.occupancy("main-floor"), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_rooms_are_isolated() {
        let club = state();
        let (_conn1, _rx1, _) = club.join("main-floor", avatar("ada"));
        let (_conn2, mut rx2, _) = club.join("rooftop", avatar("ben"));

        club.chat("main-floor", "ada", "hello").unwrap();
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_client_message_deserialization() {
        let chat: ClientMessage = serde_json::from_str(r#"{"type":"chat","message":"hi"}"#).unwrap();
        assert!(matches!(chat, ClientMessage::Chat { message } if message == "hi"));

        let mv: ClientMessage = serde_json::from_str(r#"{"type":"move","x":1.0,"y":2.0}"#).unwrap();
        assert!(matches!(mv, ClientMessage::Move { x, y } if x == 1.0 && y == 2.0));
    }
}
