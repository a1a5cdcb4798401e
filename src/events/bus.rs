//! Per-frame event bus between the world and its observers
//!
//! Producers publish the events of one world tick under that tick number.
//! During the frame the console printer, the evlog buffer and the SQLite
//! flush read them, and `end_frame` clears everything once they are done.

use bevy::prelude::*;

use super::types::GameEvent;

/// An event and the world tick it happened on
#[derive(Debug, Clone, PartialEq)]
pub struct BusEvent {
    pub tick: u64,
    pub event: GameEvent,
}

#[derive(Resource, Default)]
pub struct EventBus {
    /// Published this frame, not yet flushed to SQLite
    pending: Vec<BusEvent>,
    /// Flushed to SQLite this frame
    flushed: Vec<BusEvent>,
    /// A muted bus drops everything published to it
    muted: bool,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus for runs nobody observes
    pub fn muted() -> Self {
        Self {
            muted: true,
            ..Default::default()
        }
    }

    /// Publish the events of world tick `tick`
    pub fn publish(&mut self, tick: u64, events: impl IntoIterator<Item = GameEvent>) {
        if self.muted {
            return;
        }
        self.pending
            .extend(events.into_iter().map(|event| BusEvent { tick, event }));
    }

    /// Events published this frame and not yet flushed
    pub fn pending(&self) -> &[BusEvent] {
        &self.pending
    }

    /// Hand pending events to a writer; they stay readable through `flushed`
    pub fn take_for_flush(&mut self) -> Vec<(u64, GameEvent)> {
        let events = std::mem::take(&mut self.pending);
        let out = events.iter().map(|e| (e.tick, e.event.clone())).collect();
        self.flushed.extend(events);
        out
    }

    /// Events flushed so far this frame
    pub fn flushed(&self) -> &[BusEvent] {
        &self.flushed
    }

    /// Forget this frame's events, flushed or not
    pub fn end_frame(&mut self) {
        self.pending.clear();
        self.flushed.clear();
    }
}
