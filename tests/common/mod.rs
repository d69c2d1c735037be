#![allow(dead_code)]

use midly::num::{u4, u7, u15, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use midisaber::game::chart::Chart;
use midisaber::game::difficulty::Difficulty;
use midisaber::game::instrument::InstrumentClass;
use midisaber::game::note::{CutDirection, Hand, Note, NoteAudio, NoteId};
use std::path::Path;

/// Ticks per quarter note; at the default 120 BPM this is 960 ticks per second.
pub const TPQ: u16 = 480;

pub fn ticks(seconds: f32) -> u32 {
    (seconds * 960.0).round() as u32
}

/// Builds a single-track SMF from `(channel, key, start_s, end_s, velocity)`.
pub fn smf(notes: &[(u8, u8, f32, f32, u8)]) -> Vec<u8> {
    // (tick, is_on, channel, key, velocity); offs sort before ons on a tie.
    let mut timed: Vec<(u32, bool, u8, u8, u8)> = Vec::new();
    for &(channel, key, start, end, vel) in notes {
        timed.push((ticks(start), true, channel, key, vel));
        timed.push((ticks(end), false, channel, key, 0));
    }
    timed.sort_by_key(|&(tick, is_on, ..)| (tick, is_on));

    let mut events = Vec::new();
    let mut last = 0;
    for (tick, is_on, channel, key, vel) in timed {
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            }
        };
        events.push(TrackEvent {
            delta: u28::new(tick - last),
            kind: TrackEventKind::Midi {
                channel: u4::new(channel),
                message,
            },
        });
        last = tick;
    }
    events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header::new(Format::SingleTrack, Timing::Metrical(u15::new(TPQ))),
        tracks: vec![events],
    };
    let mut bytes = Vec::new();
    smf.write_std(&mut bytes).unwrap();
    bytes
}

pub fn write_midi(dir: &Path, name: &str, bytes: &[u8]) -> String {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path.to_string_lossy().into_owned()
}

pub fn note(id: u32, time: f32, length: f32, lane: u8, layer: u8, hand: Hand) -> Note {
    Note {
        id: NoteId(id),
        time,
        length,
        lane,
        layer,
        hand,
        cut_direction: CutDirection::Any,
        audio: NoteAudio {
            instrument: InstrumentClass::Lead,
            midi: if hand == Hand::Left { 57 } else { 64 },
            name: "note".to_string(),
            duration: length,
            velocity: 1.0,
        },
        hit: false,
        holding: false,
        missed: false,
        hit_time: None,
    }
}

pub fn make_chart(notes: Vec<Note>) -> Chart {
    Chart {
        difficulty: Difficulty::Medium,
        notes,
    }
}
