use crate::game::instrument::InstrumentClass;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const LANE_COUNT: usize = 4;
pub const LAYER_COUNT: usize = 3;

/// Stable note identity; equals the note's index in its chart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct NoteId(pub u32);

impl NoteId {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const ALL: [Hand; 2] = [Hand::Left, Hand::Right];

    #[inline(always)]
    pub fn index(self) -> usize {
        match self {
            Hand::Left => 0,
            Hand::Right => 1,
        }
    }

    /// Hand assignment used by the chart generator.
    #[inline(always)]
    pub fn for_pitch(pitch: u8) -> Hand {
        if pitch < 62 { Hand::Left } else { Hand::Right }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hand::Left => write!(f, "left"),
            Hand::Right => write!(f, "right"),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum CutDirection {
    #[default]
    Any,
}

/// Keysound payload played back when the note is hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct NoteAudio {
    pub instrument: InstrumentClass,
    pub midi: u8,
    pub name: String,
    pub duration: f32,
    pub velocity: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Note {
    pub id: NoteId,
    pub time: f32,
    pub length: f32,
    pub lane: u8,
    pub layer: u8,
    pub hand: Hand,
    pub cut_direction: CutDirection,
    pub audio: NoteAudio,

    // Written only by the gameplay engine.
    pub hit: bool,
    pub holding: bool,
    pub missed: bool,
    pub hit_time: Option<f32>,
}

impl Note {
    #[inline(always)]
    pub fn is_hold(&self) -> bool {
        self.length > 0.0
    }

    #[inline(always)]
    pub fn end_time(&self) -> f32 {
        self.time + self.length
    }

    #[inline(always)]
    pub fn is_resolved(&self) -> bool {
        self.hit || self.missed
    }

    pub fn phase(&self) -> NotePhase {
        if self.missed {
            NotePhase::Missed
        } else if !self.hit {
            NotePhase::Pending
        } else if self.holding {
            NotePhase::Holding
        } else {
            NotePhase::Hit
        }
    }
}

/// Coarse per-note state as seen from outside the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum NotePhase {
    Pending,
    Hit,
    Holding,
    Missed,
}
