use crate::game::note::{Note, NoteId};
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum HitQuality {
    Perfect,
    Good,
    /// Resolved without hand evidence because the note's hand is disabled.
    Auto,
}

pub fn quality_points_for(quality: HitQuality) -> u32 {
    match quality {
        HitQuality::Perfect => 100,
        HitQuality::Good => 70,
        HitQuality::Auto => 50,
    }
}

/// Outcome notifications from the gameplay engine. This is the only channel
/// through which scoring, audio and presentation learn about results.
pub trait GameplayListener {
    /// Called once at the start of every engine tick with that tick's clock reading.
    fn on_tick(&mut self, _now: f32) {}
    fn on_hit(&mut self, note: &Note, quality: HitQuality);
    fn on_miss(&mut self, note: &Note);
    fn on_hold(&mut self, note: &Note);
    fn on_hold_complete(&mut self, _note: &Note) {}
    /// Once this turns true the engine stops judging, even mid-tick.
    fn has_failed(&self) -> bool {
        false
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum GameplayEvent {
    Hit { note: NoteId, time: f32, quality: HitQuality },
    Miss { note: NoteId, time: f32 },
    Hold { note: NoteId, time: f32 },
    HoldComplete { note: NoteId, time: f32 },
}

impl GameplayEvent {
    pub fn note(&self) -> NoteId {
        match self {
            GameplayEvent::Hit { note, .. }
            | GameplayEvent::Miss { note, .. }
            | GameplayEvent::Hold { note, .. }
            | GameplayEvent::HoldComplete { note, .. } => *note,
        }
    }
}

/// Listener that records every event, stamped with the current tick time.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    pub now: f32,
    pub events: Vec<GameplayEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, GameplayEvent::Hit { .. })).count()
    }

    pub fn misses(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, GameplayEvent::Miss { .. })).count()
    }

    pub fn for_note(&self, id: NoteId) -> impl Iterator<Item = &GameplayEvent> {
        self.events.iter().filter(move |e| e.note() == id)
    }
}

impl GameplayListener for EventLog {
    fn on_tick(&mut self, now: f32) {
        self.now = now;
    }

    fn on_hit(&mut self, note: &Note, quality: HitQuality) {
        self.events.push(GameplayEvent::Hit { note: note.id, time: self.now, quality });
    }

    fn on_miss(&mut self, note: &Note) {
        self.events.push(GameplayEvent::Miss { note: note.id, time: self.now });
    }

    fn on_hold(&mut self, note: &Note) {
        self.events.push(GameplayEvent::Hold { note: note.id, time: self.now });
    }

    fn on_hold_complete(&mut self, note: &Note) {
        self.events.push(GameplayEvent::HoldComplete { note: note.id, time: self.now });
    }
}

/// Fans one event stream out to two listeners, in order.
impl<A: GameplayListener, B: GameplayListener> GameplayListener for (A, B) {
    fn on_tick(&mut self, now: f32) {
        self.0.on_tick(now);
        self.1.on_tick(now);
    }

    fn on_hit(&mut self, note: &Note, quality: HitQuality) {
        self.0.on_hit(note, quality);
        self.1.on_hit(note, quality);
    }

    fn on_miss(&mut self, note: &Note) {
        self.0.on_miss(note);
        self.1.on_miss(note);
    }

    fn on_hold(&mut self, note: &Note) {
        self.0.on_hold(note);
        self.1.on_hold(note);
    }

    fn on_hold_complete(&mut self, note: &Note) {
        self.0.on_hold_complete(note);
        self.1.on_hold_complete(note);
    }

    fn has_failed(&self) -> bool {
        self.0.has_failed() || self.1.has_failed()
    }
}
