//! Event records exchanged between the frame loop and script hooks.
//!
//! Every event has an [`EventKind`] and a strongly-typed [`EventPayload`]. The
//! two must agree; [`Event::new`] rejects a payload that belongs to another
//! kind. Kinds are numbered from `1` so scripts can pass them as plain
//! integers (`engine.dispatcher.update` and friends); any other integer is
//! rejected by [`EventKind::from_raw`].

use std::fmt;

use bevy_ecs::entity::Entity;

use crate::components::vector::Vector;
use crate::error::{EngineError, EngineResult};

/// Category of an event or hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    Update = 1,
    Render = 2,
    Phase = 3,
    Collision = 4,
    Keyboard = 5,
    Mouse = 6,
    Network = 7,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Update,
        EventKind::Render,
        EventKind::Phase,
        EventKind::Collision,
        EventKind::Keyboard,
        EventKind::Mouse,
        EventKind::Network,
    ];

    pub fn from_raw(raw: i64) -> EngineResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| *kind as i64 == raw)
            .ok_or_else(|| EngineError::validation(format!("invalid event type: {raw}")))
    }

    pub fn raw(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Update => "update",
            EventKind::Render => "render",
            EventKind::Phase => "phase",
            EventKind::Collision => "collision",
            EventKind::Keyboard => "keyboard",
            EventKind::Mouse => "mouse",
            EventKind::Network => "network",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key or button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Release = 0,
    Press = 1,
}

impl InputAction {
    pub fn raw(self) -> i64 {
        self as i64
    }

    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            InputAction::Press
        } else {
            InputAction::Release
        }
    }
}

/// Direction of an inbound network request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// The client asks for data (`GET`).
    Read = 0,
    /// The client sends data (`POST`).
    Write = 1,
}

impl Protocol {
    pub fn raw(self) -> i64 {
        self as i64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Update,
    Render,
    /// Informational overlap between two tiles.
    Phase { a: Entity, b: Entity },
    /// Overlap with physical response; `impulse` is non-zero on one axis only.
    Collision { a: Entity, b: Entity, impulse: Vector },
    Keyboard { code: i32, action: InputAction },
    Mouse { code: i32, action: InputAction },
    Network { protocol: Protocol },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Update => EventKind::Update,
            EventPayload::Render => EventKind::Render,
            EventPayload::Phase { .. } => EventKind::Phase,
            EventPayload::Collision { .. } => EventKind::Collision,
            EventPayload::Keyboard { .. } => EventKind::Keyboard,
            EventPayload::Mouse { .. } => EventKind::Mouse,
            EventPayload::Network { .. } => EventKind::Network,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: EventKind,
    payload: EventPayload,
}

impl Event {
    pub fn new(kind: EventKind, payload: EventPayload) -> EngineResult<Self> {
        if payload.kind() != kind {
            return Err(EngineError::validation(format!(
                "payload of kind {} sent as {kind}",
                payload.kind()
            )));
        }
        Ok(Self { kind, payload })
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }
}

impl From<EventPayload> for Event {
    fn from(payload: EventPayload) -> Self {
        Self {
            kind: payload.kind(),
            payload,
        }
    }
}
