use crate::core::network;
use log::{debug, info};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

const PERCUSSION_CHANNEL: u8 = 9;
const DEFAULT_US_PER_QUARTER: u32 = 500_000;
const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("HTTP error fetching '{url}': {message}")]
    Http { url: String, message: String },

    #[error("MIDI parse error: {0}")]
    Parse(String),
}

/// One decoded note, with all timing already converted to seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub time: f32,
    pub pitch: u8,
    pub name: String,
    pub velocity: f32,
    pub duration: f32,
    pub track_index: usize,
    pub is_percussion: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MidiTrack {
    pub index: usize,
    pub channel: u8,
    pub is_percussion: bool,
    pub notes: Vec<MidiEvent>,
}

impl MidiTrack {
    pub fn new(index: usize, channel: u8) -> Self {
        Self {
            index,
            channel,
            is_percussion: channel == PERCUSSION_CHANNEL,
            notes: Vec::new(),
        }
    }

    /// Appends a note, deriving its name and percussion flag from the track.
    pub fn push_note(&mut self, time: f32, pitch: u8, velocity: f32, duration: f32) {
        self.notes.push(MidiEvent {
            time,
            pitch,
            name: pitch_name(pitch),
            velocity,
            duration,
            track_index: self.index,
            is_percussion: self.is_percussion,
        });
    }
}

/// Scientific pitch name with sharps, e.g. 60 -> "C4".
pub fn pitch_name(pitch: u8) -> String {
    let octave = (pitch / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(pitch % 12) as usize], octave)
}

/// Reads raw MIDI bytes from a local path or an http(s) URL.
pub fn load_source(source: &str) -> Result<Vec<u8>, LoadError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return network::fetch_bytes(source);
    }

    let path = Path::new(source);
    match fs::read(path) {
        Ok(bytes) => {
            info!("Read {} bytes from '{}'", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(LoadError::NotFound(path.display().to_string()))
        }
        Err(e) => Err(LoadError::Io {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

/// Convenience wrapper: fetch and decode in one go.
pub fn load_tracks(source: &str) -> Result<Vec<MidiTrack>, LoadError> {
    let bytes = load_source(source)?;
    parse_tracks(&bytes)
}

/// Piecewise tick -> seconds conversion for a standard MIDI file.
struct TempoMap {
    ticks_per_quarter: f64,
    seconds_per_tick_timecode: Option<f64>,
    // (tick, seconds at tick, microseconds per quarter from here on)
    segments: Vec<(u64, f64, u32)>,
}

impl TempoMap {
    fn new(timing: Timing, mut changes: Vec<(u64, u32)>) -> Self {
        let (ticks_per_quarter, seconds_per_tick_timecode) = match timing {
            Timing::Metrical(tpq) => (tpq.as_int().max(1) as f64, None),
            Timing::Timecode(fps, subframes) => {
                let per_second = fps.as_f32() as f64 * subframes.max(1) as f64;
                (1.0, Some(1.0 / per_second))
            }
        };

        changes.sort_by_key(|(tick, _)| *tick);
        let mut segments = vec![(0u64, 0.0f64, DEFAULT_US_PER_QUARTER)];
        for (tick, us_per_quarter) in changes {
            let (last_tick, last_seconds, last_tempo) = segments[segments.len() - 1];
            let seconds = last_seconds
                + (tick - last_tick) as f64 * last_tempo as f64 / 1_000_000.0 / ticks_per_quarter;
            if tick == last_tick {
                let last = segments.len() - 1;
                segments[last].2 = us_per_quarter;
            } else {
                segments.push((tick, seconds, us_per_quarter));
            }
        }

        Self {
            ticks_per_quarter,
            seconds_per_tick_timecode,
            segments,
        }
    }

    fn seconds_at(&self, tick: u64) -> f64 {
        if let Some(per_tick) = self.seconds_per_tick_timecode {
            return tick as f64 * per_tick;
        }
        let idx = self
            .segments
            .partition_point(|(segment_tick, _, _)| *segment_tick <= tick)
            .saturating_sub(1);
        let (segment_tick, segment_seconds, tempo) = self.segments[idx];
        segment_seconds
            + (tick - segment_tick) as f64 * tempo as f64 / 1_000_000.0 / self.ticks_per_quarter
    }
}

/// Decodes a standard MIDI file into per-(track, channel) note lists.
pub fn parse_tracks(bytes: &[u8]) -> Result<Vec<MidiTrack>, LoadError> {
    let smf = Smf::parse(bytes).map_err(|e| LoadError::Parse(e.to_string()))?;

    let mut tempo_changes = Vec::new();
    for track in &smf.tracks {
        let mut tick = 0u64;
        for event in track {
            tick += event.delta.as_int() as u64;
            if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                tempo_changes.push((tick, tempo.as_int()));
            }
        }
    }
    let tempo = TempoMap::new(smf.header.timing, tempo_changes);

    let mut tracks = Vec::new();
    for (track_index, track) in smf.tracks.iter().enumerate() {
        // (start tick, velocity) per (channel, key), closed first-in first-out.
        let mut open: HashMap<(u8, u8), VecDeque<(u64, u8)>> = HashMap::new();
        let mut closed: Vec<(u8, u8, u64, u64, u8)> = Vec::new();
        let mut tick = 0u64;

        for event in track {
            tick += event.delta.as_int() as u64;
            let TrackEventKind::Midi { channel, message } = event.kind else {
                continue;
            };
            let channel = channel.as_int();
            match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    open.entry((channel, key.as_int()))
                        .or_default()
                        .push_back((tick, vel.as_int()));
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    let key = key.as_int();
                    if let Some((start, vel)) = open.get_mut(&(channel, key)).and_then(|q| q.pop_front()) {
                        closed.push((channel, key, start, tick, vel));
                    }
                }
                _ => {}
            }
        }

        for ((channel, key), pending) in open {
            for (start, vel) in pending {
                debug!(
                    "Unterminated note {} on track {} closed at end of track",
                    pitch_name(key),
                    track_index
                );
                closed.push((channel, key, start, tick, vel));
            }
        }

        closed.sort_by(|a, b| a.2.cmp(&b.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));

        let mut by_channel: Vec<MidiTrack> = Vec::new();
        for (channel, key, start, end, vel) in closed {
            let slot = match by_channel.iter().position(|t| t.channel == channel) {
                Some(i) => i,
                None => {
                    by_channel.push(MidiTrack::new(track_index, channel));
                    by_channel.len() - 1
                }
            };
            let start_sec = tempo.seconds_at(start);
            let end_sec = tempo.seconds_at(end);
            by_channel[slot].push_note(
                start_sec as f32,
                key,
                vel as f32 / 127.0,
                (end_sec - start_sec).max(0.0) as f32,
            );
        }
        by_channel.sort_by_key(|t| t.channel);
        tracks.extend(by_channel);
    }

    let note_count: usize = tracks.iter().map(|t| t.notes.len()).sum();
    info!("Decoded {} notes across {} tracks.", note_count, tracks.len());
    Ok(tracks)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a format-1 SMF with one conductor track and one note track.
    /// `notes` are (channel, key, start tick, end tick, velocity).
    pub(crate) fn build_smf(tpq: u16, tempos: &[(u32, u32)], notes: &[(u8, u8, u32, u32, u8)]) -> Vec<u8> {
        fn vlq(mut value: u32, out: &mut Vec<u8>) {
            let mut buf = vec![(value & 0x7f) as u8];
            value >>= 7;
            while value > 0 {
                buf.push(((value & 0x7f) as u8) | 0x80);
                value >>= 7;
            }
            buf.reverse();
            out.extend(buf);
        }
        fn chunk(events: Vec<(u32, Vec<u8>)>) -> Vec<u8> {
            let mut events = events;
            events.sort_by_key(|(tick, _)| *tick);
            let mut body = Vec::new();
            let mut last = 0;
            for (tick, bytes) in events {
                vlq(tick - last, &mut body);
                body.extend(bytes);
                last = tick;
            }
            vlq(0, &mut body);
            body.extend([0xff, 0x2f, 0x00]);
            let mut out = b"MTrk".to_vec();
            out.extend((body.len() as u32).to_be_bytes());
            out.extend(body);
            out
        }

        let mut out = b"MThd".to_vec();
        out.extend(6u32.to_be_bytes());
        out.extend(1u16.to_be_bytes());
        out.extend(2u16.to_be_bytes());
        out.extend(tpq.to_be_bytes());

        let conductor = tempos
            .iter()
            .map(|&(tick, us)| {
                let b = us.to_be_bytes();
                (tick, vec![0xff, 0x51, 0x03, b[1], b[2], b[3]])
            })
            .collect();
        out.extend(chunk(conductor));

        let mut events = Vec::new();
        for &(channel, key, start, end, vel) in notes {
            events.push((start, vec![0x90 | channel, key, vel]));
            events.push((end, vec![0x80 | channel, key, 0]));
        }
        out.extend(chunk(events));
        out
    }

    #[test]
    fn pitch_names() {
        assert_eq!(pitch_name(60), "C4");
        assert_eq!(pitch_name(61), "C#4");
        assert_eq!(pitch_name(21), "A0");
        assert_eq!(pitch_name(0), "C-1");
        assert_eq!(pitch_name(127), "G9");
    }

    #[test]
    fn default_tempo_is_120_bpm() {
        let bytes = build_smf(480, &[], &[(0, 64, 480, 720, 100)]);
        let tracks = parse_tracks(&bytes).unwrap();
        assert_eq!(tracks.len(), 1);
        let note = &tracks[0].notes[0];
        assert!((note.time - 0.5).abs() < 1e-5);
        assert!((note.duration - 0.25).abs() < 1e-5);
        assert_eq!(note.name, "E4");
        assert!((note.velocity - 100.0 / 127.0).abs() < 1e-6);
        assert!(!note.is_percussion);
        assert_eq!(note.track_index, 1);
    }

    #[test]
    fn tempo_change_mid_song() {
        // 120 BPM for the first quarter, then 60 BPM.
        let bytes = build_smf(480, &[(0, 500_000), (480, 1_000_000)], &[(0, 60, 960, 1440, 90)]);
        let tracks = parse_tracks(&bytes).unwrap();
        let note = &tracks[0].notes[0];
        assert!((note.time - 1.5).abs() < 1e-5);
        assert!((note.duration - 1.0).abs() < 1e-5);
    }

    #[test]
    fn channels_split_and_percussion_flagged() {
        let bytes = build_smf(
            480,
            &[],
            &[(9, 36, 0, 120, 100), (0, 72, 0, 480, 80), (9, 38, 480, 600, 100)],
        );
        let tracks = parse_tracks(&bytes).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].channel, 0);
        assert!(!tracks[0].is_percussion);
        assert_eq!(tracks[1].channel, 9);
        assert!(tracks[1].is_percussion);
        assert_eq!(tracks[1].notes.len(), 2);
        assert!(tracks[1].notes.iter().all(|n| n.is_percussion));
    }

    #[test]
    fn velocity_zero_note_on_closes_note() {
        let mut bytes = build_smf(480, &[], &[]);
        // Replace the empty note track with one using running note-on/vel 0.
        let header_and_conductor = bytes.len() - 12;
        bytes.truncate(header_and_conductor);
        let body: Vec<u8> = vec![
            0x00, 0x90, 67, 100, // note on
            0x83, 0x60, 0x90, 67, 0, // 480 ticks later: note on vel 0
            0x00, 0xff, 0x2f, 0x00,
        ];
        bytes.extend(b"MTrk");
        bytes.extend((body.len() as u32).to_be_bytes());
        bytes.extend(body);
        let tracks = parse_tracks(&bytes).unwrap();
        let note = &tracks[0].notes[0];
        assert_eq!(note.pitch, 67);
        assert!((note.duration - 0.5).abs() < 1e-5);
    }

    #[test]
    fn garbage_is_parse_error() {
        let err = parse_tracks(b"definitely not a midi file").unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.mid");
        let err = load_source(missing.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn no_notes_is_empty_not_error() {
        let bytes = build_smf(480, &[(0, 500_000)], &[]);
        assert!(parse_tracks(&bytes).unwrap().is_empty());
    }
}
