use crate::game::chart::BackgroundAudioEvent;
use crate::game::judgment::{GameplayListener, HitQuality};
use crate::game::note::{Note, NoteAudio};
use log::{info, warn};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("audio sink is busy")]
    Busy,
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
}

/// Where note sounds go. Implementations must not block the tick.
pub trait AudioSink {
    /// Queues a background event to play at its own song time.
    fn schedule(&mut self, event: &BackgroundAudioEvent) -> Result<(), AudioError>;
    /// Plays a note's sound immediately; `at` is the song time of the hit.
    fn trigger(&mut self, audio: &NoteAudio, at: f32) -> Result<(), AudioError>;
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn schedule(&mut self, event: &BackgroundAudioEvent) -> Result<(), AudioError> {
        (**self).schedule(event)
    }

    fn trigger(&mut self, audio: &NoteAudio, at: f32) -> Result<(), AudioError> {
        (**self).trigger(audio, at)
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn schedule(&mut self, _event: &BackgroundAudioEvent) -> Result<(), AudioError> {
        Ok(())
    }

    fn trigger(&mut self, _audio: &NoteAudio, _at: f32) -> Result<(), AudioError> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AudioCommand {
    Schedule(BackgroundAudioEvent),
    Trigger { audio: NoteAudio, at: f32 },
}

/// Records every accepted command. Clones share the same log, so a test can
/// hand one to a session and inspect the other.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    log: Arc<Mutex<Vec<AudioCommand>>>,
    busy: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that refuses every command with `AudioError::Busy`.
    pub fn busy() -> Self {
        Self {
            busy: true,
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<AudioCommand> {
        self.log.lock().unwrap().clone()
    }

    pub fn triggered(&self) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, AudioCommand::Trigger { .. }))
            .count()
    }

    pub fn scheduled(&self) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, AudioCommand::Schedule(_)))
            .count()
    }

    fn record(&self, command: AudioCommand) -> Result<(), AudioError> {
        if self.busy {
            return Err(AudioError::Busy);
        }
        self.log.lock().unwrap().push(command);
        Ok(())
    }
}

impl AudioSink for RecordingSink {
    fn schedule(&mut self, event: &BackgroundAudioEvent) -> Result<(), AudioError> {
        self.record(AudioCommand::Schedule(event.clone()))
    }

    fn trigger(&mut self, audio: &NoteAudio, at: f32) -> Result<(), AudioError> {
        self.record(AudioCommand::Trigger {
            audio: audio.clone(),
            at,
        })
    }
}

/// Forwards commands to a synth running on another thread.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    command_sender: Sender<AudioCommand>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<AudioCommand>) {
        let (command_sender, command_receiver) = channel();
        (Self { command_sender }, command_receiver)
    }

    fn send(&self, command: AudioCommand) -> Result<(), AudioError> {
        self.command_sender
            .send(command)
            .map_err(|_| AudioError::Unavailable("synth thread has hung up".to_string()))
    }
}

impl AudioSink for ChannelSink {
    fn schedule(&mut self, event: &BackgroundAudioEvent) -> Result<(), AudioError> {
        self.send(AudioCommand::Schedule(event.clone()))
    }

    fn trigger(&mut self, audio: &NoteAudio, at: f32) -> Result<(), AudioError> {
        self.send(AudioCommand::Trigger {
            audio: audio.clone(),
            at,
        })
    }
}

/// Hands every background event to the sink once. Individual failures are
/// logged and skipped; returns how many were accepted.
pub fn schedule_background<S: AudioSink + ?Sized>(sink: &mut S, events: &[BackgroundAudioEvent]) -> usize {
    let mut accepted = 0;
    for event in events {
        match sink.schedule(event) {
            Ok(()) => accepted += 1,
            Err(e) => warn!("Failed to schedule {} at {:.2}s: {}", event.name, event.time, e),
        }
    }
    info!("Scheduled {}/{} background events.", accepted, events.len());
    accepted
}

/// Plays a note's own sound when it is hit.
pub struct Keysounder<S: AudioSink> {
    sink: S,
    now: f32,
    failures: u32,
}

impl<S: AudioSink> Keysounder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            now: 0.0,
            failures: 0,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

impl<S: AudioSink> GameplayListener for Keysounder<S> {
    fn on_tick(&mut self, now: f32) {
        self.now = now;
    }

    fn on_hit(&mut self, note: &Note, _quality: HitQuality) {
        if let Err(e) = self.sink.trigger(&note.audio, self.now) {
            self.failures += 1;
            warn!("Keysound for note {} ({}) dropped: {}", note.id, note.audio.name, e);
        }
    }

    fn on_miss(&mut self, _note: &Note) {}

    fn on_hold(&mut self, _note: &Note) {}
}
