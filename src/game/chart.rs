use crate::game::difficulty::Difficulty;
use crate::game::instrument::{self, InstrumentClass};
use crate::game::midi::{MidiEvent, MidiTrack};
use crate::game::note::{CutDirection, Hand, Note, NoteAudio, NoteId};
use bincode::{Decode, Encode};
use log::info;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LEAD_IN: f32 = 2.0;

const CHORD_WINDOW: f32 = 0.05;
const HOLD_MIN_DURATION: f32 = 0.2;
const LANE_HASH_FACTOR: f32 = 123.45;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    pub difficulty: Difficulty,
    /// Added to every generated time so the first note can spawn after the clock starts.
    pub lead_in: f32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            lead_in: DEFAULT_LEAD_IN,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct BackgroundAudioEvent {
    pub time: f32,
    pub instrument: InstrumentClass,
    pub name: String,
    pub duration: f32,
    pub velocity: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Chart {
    pub difficulty: Difficulty,
    pub notes: Vec<Note>,
}

impl Chart {
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn hold_count(&self) -> usize {
        self.notes.iter().filter(|n| n.is_hold()).count()
    }

    pub fn count_for(&self, hand: Hand) -> usize {
        self.notes.iter().filter(|n| n.hand == hand).count()
    }

    /// Time at which the last note (including its hold tail) is due.
    pub fn last_note_end(&self) -> f32 {
        self.notes
            .iter()
            .fold(0.0_f32, |acc, note| acc.max(note.end_time()))
    }
}

#[inline(always)]
pub fn layer_for_pitch(pitch: u8) -> u8 {
    if pitch < 55 {
        0
    } else if pitch > 70 {
        2
    } else {
        1
    }
}

/// Fixed, reproducible tie-break between the two lanes owned by a hand.
#[inline(always)]
pub fn lane_for(hand: Hand, source_time: f32) -> u8 {
    let base = match hand {
        Hand::Left => 0,
        Hand::Right => 2,
    };
    if (source_time * LANE_HASH_FACTOR).sin() > 0.0 {
        base + 1
    } else {
        base
    }
}

/// Converts decoded MIDI into an interactive chart plus the background
/// events the synth plays on its own. Every input note lands in exactly
/// one of the two outputs.
pub fn generate(tracks: &[MidiTrack], options: ChartOptions) -> (Chart, Vec<BackgroundAudioEvent>) {
    let difficulty = options.difficulty;

    let mut events: Vec<(&MidiEvent, InstrumentClass)> = tracks
        .iter()
        .flat_map(|track| track.notes.iter())
        .map(|event| (event, instrument::classify(event.is_percussion, event.pitch)))
        .collect();
    // Stable: simultaneous events keep their encounter order.
    events.sort_by(|a, b| a.0.time.total_cmp(&b.0.time));

    let mut notes: Vec<Note> = Vec::new();
    let mut background: Vec<BackgroundAudioEvent> = Vec::with_capacity(events.len());
    let mut previous_time: Option<f32> = None;
    let mut last_interactive = [f32::NEG_INFINITY; 2];

    for (event, class) in events {
        let interactive = 'rules: {
            if class == InstrumentClass::HiHat && !difficulty.is_hardest() {
                break 'rules false;
            }
            if class.is_rhythm_section() {
                break 'rules false;
            }

            let is_chord = previous_time
                .is_some_and(|prev| (event.time - prev).abs() < CHORD_WINDOW);
            previous_time = Some(event.time);
            if is_chord && !difficulty.is_hardest() {
                break 'rules false;
            }

            let hand = Hand::for_pitch(event.pitch);
            event.time - last_interactive[hand.index()] >= difficulty.min_gap()
        };

        if !interactive {
            background.push(BackgroundAudioEvent {
                time: event.time + options.lead_in,
                instrument: class,
                name: event.name.clone(),
                duration: event.duration,
                velocity: event.velocity,
            });
            continue;
        }

        let hand = Hand::for_pitch(event.pitch);
        let length = if event.duration > HOLD_MIN_DURATION {
            event.duration
        } else {
            0.0
        };

        notes.push(Note {
            id: NoteId(notes.len() as u32),
            time: event.time + options.lead_in,
            length,
            lane: lane_for(hand, event.time),
            layer: layer_for_pitch(event.pitch),
            hand,
            cut_direction: CutDirection::Any,
            audio: NoteAudio {
                instrument: class,
                midi: event.pitch,
                name: event.name.clone(),
                duration: event.duration,
                velocity: event.velocity,
            },
            hit: false,
            holding: false,
            missed: false,
            hit_time: None,
        });

        last_interactive[hand.index()] = event.time + length * 0.5;
    }

    info!(
        "Generated {} chart: {} notes ({} holds), {} background events.",
        difficulty,
        notes.len(),
        notes.iter().filter(|n| n.is_hold()).count(),
        background.len()
    );

    (Chart { difficulty, notes }, background)
}
