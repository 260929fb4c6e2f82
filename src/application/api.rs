//! Public API types - External contracts of the event runtime
//!
//! Everything the runtime sends out (notifications) and everything it
//! accepts back (responses) is defined here. These types form the stable
//! contract with the transport layer and should be changed with care.

use crate::domain::value_objects::*;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Which clients a notification is delivered to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipients {
    /// The single player
    Player(PlayerId),
    /// Players near a map within one map instance
    Proximity { map: MapId, instance: MapInstanceId },
    /// The player's party, including the player
    Party(PlayerId),
    Guild(GuildId),
    Global,
}

/// Entity field that changed and needs to be resent to clients
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityChange {
    Vitals,
    Experience,
    Level,
    Stats,
    Inventory,
    Equipment,
    Spells,
    Appearance,
    Access,
    Visibility,
    Class,
    Guild,
    Name,
    Quests,
    Died,
}

/// Outbound message kinds
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", content = "args")]
#[non_exhaustive]
pub enum Notification {
    ShowText {
        instance: InstanceId,
        text: String,
        face: String,
    },
    ShowOptions {
        instance: InstanceId,
        text: String,
        face: String,
        options: Vec<String>,
    },
    InputVariable {
        instance: InstanceId,
        title: String,
        text: String,
        data_type: VariableDataType,
    },
    ChatMessage {
        text: String,
        color: Color,
        kind: ChatMessageKind,
        sender: Option<String>,
    },
    ChatBubble {
        entity: RouteEntity,
        map: MapId,
        text: String,
    },
    EntityUpdate {
        player: PlayerId,
        change: EntityChange,
    },
    PlayMusic {
        file: String,
    },
    FadeMusic,
    PlaySound {
        file: String,
    },
    StopSounds,
    ShowPicture {
        file: String,
        size: u32,
        clickable: bool,
        hide_time_ms: u64,
        /// Set when the script waits for the picture to close
        instance: Option<InstanceId>,
    },
    HidePicture,
    ScreenFade {
        fade: FadeType,
        wait_for_completion: bool,
        duration_ms: u64,
    },
    Animation {
        animation: AnimationId,
        /// Attached to an entity rather than played on a tile
        entity: Option<RouteEntity>,
        map: MapId,
        x: i32,
        y: i32,
        dir: Direction,
    },
    MoveRouteToggle {
        player: PlayerId,
        active: bool,
    },
    HoldPlayer {
        event: EventId,
        map: MapId,
    },
    ReleasePlayer {
        event: EventId,
    },
    Warp {
        player: PlayerId,
        map: MapId,
        x: i32,
        y: i32,
        dir: Direction,
    },
    OpenSession {
        kind: SessionKind,
        name: String,
        /// Guild bank sessions are opened on the guild rather than the player
        guild: bool,
    },
    QuestOffer {
        instance: InstanceId,
        quest: QuestId,
    },
}

/// Outbound notification sink (the network layer)
pub trait NotificationSink: Send + Sync {
    fn send(&self, to: Recipients, notification: Notification);
}

/// Sink that keeps every notification, used by the CLI and tests
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(Recipients, Notification)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything sent so far
    pub fn drain(&self) -> Vec<(Recipients, Notification)> {
        match self.sent.lock() {
            Ok(mut sent) => std::mem::take(&mut *sent),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationSink for RecordingSink {
    fn send(&self, to: Recipients, notification: Notification) {
        log::trace!(target: "eventweave::engine", "send {:?} -> {:?}", notification, to);
        match self.sent.lock() {
            Ok(mut sent) => sent.push((to, notification)),
            Err(poisoned) => poisoned.into_inner().push((to, notification)),
        }
    }
}

/// Inbound response to a suspended instance
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", content = "value")]
pub enum EventResponse {
    /// Text dialogue acknowledged
    Continue,
    /// Zero-based option index
    Option(usize),
    /// Value typed into an input prompt
    Input(String),
    /// Input prompt dismissed
    Cancel,
    PictureClosed,
    QuestOffer { accepted: bool },
}

/// Signal raised by another subsystem that may release a suspension
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    RouteCompleted(RouteTarget),
    SessionClosed(SessionKind),
    FadeCompleted,
}

/// Error types returned by the public API
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("unknown player: {0}")]
    UnknownPlayer(PlayerId),
    #[error("invalid operation: {0}")]
    Invalid(String),
    #[error("engine error: {0}")]
    Engine(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }
}
