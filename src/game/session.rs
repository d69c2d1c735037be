use crate::core::audio::{self, AudioSink, Keysounder};
use crate::core::clock::Transport;
use crate::core::tracking::{HandSnapshot, PoseSlot};
use crate::game::chart::{BackgroundAudioEvent, Chart};
use crate::game::gameplay::{self, GameMode, NoteView};
use crate::game::judgment::{GameplayListener, HitQuality};
use crate::game::note::Note;
use crate::game::scores::ScoreKeeper;
use log::info;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Ready,
    Playing,
    Paused,
    Finished,
    GameOver,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finished | Phase::GameOver)
    }
}

/// Scoring and keysounds, fed from the same event stream.
pub struct Reactor<S: AudioSink> {
    pub scores: ScoreKeeper,
    pub keysounder: Keysounder<S>,
}

impl<S: AudioSink> Reactor<S> {
    pub fn new(sink: S) -> Self {
        Self {
            scores: ScoreKeeper::new(),
            keysounder: Keysounder::new(sink),
        }
    }
}

impl<S: AudioSink> GameplayListener for Reactor<S> {
    fn on_tick(&mut self, now: f32) {
        self.scores.on_tick(now);
        self.keysounder.on_tick(now);
    }

    fn on_hit(&mut self, note: &Note, quality: HitQuality) {
        self.scores.on_hit(note, quality);
        self.keysounder.on_hit(note, quality);
    }

    fn on_miss(&mut self, note: &Note) {
        self.scores.on_miss(note);
        self.keysounder.on_miss(note);
    }

    fn on_hold(&mut self, note: &Note) {
        self.scores.on_hold(note);
        self.keysounder.on_hold(note);
    }

    fn on_hold_complete(&mut self, note: &Note) {
        self.scores.on_hold_complete(note);
        self.keysounder.on_hold_complete(note);
    }

    fn has_failed(&self) -> bool {
        self.scores.has_failed()
    }
}

/// One play of one chart: owns the engine, the transport and the reactor.
pub struct Session<C: Transport, S: AudioSink> {
    clock: C,
    state: gameplay::State,
    background: Vec<BackgroundAudioEvent>,
    reactor: Reactor<S>,
    phase: Phase,
}

impl<C: Transport, S: AudioSink> Session<C, S> {
    pub fn new(
        chart: Chart,
        background: Vec<BackgroundAudioEvent>,
        mode: GameMode,
        clock: C,
        sink: S,
    ) -> Self {
        Self {
            clock,
            state: gameplay::init(chart, mode),
            background,
            reactor: Reactor::new(sink),
            phase: Phase::Ready,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn engine(&self) -> &gameplay::State {
        &self.state
    }

    pub fn reactor(&self) -> &Reactor<S> {
        &self.reactor
    }

    pub fn scores(&self) -> &ScoreKeeper {
        &self.reactor.scores
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Note positions at the time the engine last judged, so what is drawn
    /// always agrees with what was tested for collisions.
    pub fn views(&self) -> Vec<NoteView> {
        self.state.views(self.state.current_time())
    }

    /// Starts the song from zero. Ignored unless the session is `Ready`.
    pub fn start(&mut self) {
        if self.phase != Phase::Ready {
            return;
        }
        self.clock.reset();
        self.clock.start();
        audio::schedule_background(self.reactor.keysounder.sink_mut(), &self.background);
        self.phase = Phase::Playing;
        info!("Session started with {} notes.", self.state.notes().len());
    }

    /// Runs one engine tick against `hands`. Only does work while playing.
    pub fn tick(&mut self, hands: &HandSnapshot) -> Phase {
        if self.phase != Phase::Playing {
            return self.phase;
        }

        let now = self.clock.current_time_seconds();
        gameplay::update(&mut self.state, now, hands, &mut self.reactor);

        if self.reactor.scores.is_failed() {
            gameplay::stop(&mut self.state);
            self.clock.pause();
            self.phase = Phase::GameOver;
            info!("Game over at {:.2}s, score {}.", now, self.reactor.scores.score());
        } else if self.state.is_complete() && now >= self.state.end_time() {
            self.clock.pause();
            self.phase = Phase::Finished;
            info!(
                "Song finished at {:.2}s: score {}, max combo {}, accuracy {:.1}%.",
                now,
                self.reactor.scores.score(),
                self.reactor.scores.max_combo(),
                self.reactor.scores.accuracy() * 100.0
            );
        }
        self.phase
    }

    /// Reads the latest tracker snapshot and ticks with it.
    pub fn tick_from(&mut self, slot: &PoseSlot) -> Phase {
        let hands = slot.latest();
        self.tick(&hands)
    }

    pub fn pause(&mut self) {
        if self.phase == Phase::Playing {
            self.clock.pause();
            self.phase = Phase::Paused;
            info!("Paused at {:.2}s.", self.clock.current_time_seconds());
        }
    }

    pub fn resume(&mut self) {
        if self.phase == Phase::Paused {
            self.clock.resume();
            self.phase = Phase::Playing;
            info!("Resumed at {:.2}s.", self.clock.current_time_seconds());
        }
    }

    /// Aborts the song.
    pub fn stop(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        gameplay::stop(&mut self.state);
        self.clock.pause();
        self.phase = Phase::Finished;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::RecordingSink;
    use crate::core::clock::{Clock, ManualClock};
    use crate::game::difficulty::Difficulty;
    use crate::game::instrument::InstrumentClass;
    use crate::game::note::{CutDirection, Hand, NoteAudio, NoteId};

    const DT: f32 = 1.0 / 60.0;

    fn chart(times: &[f32]) -> Chart {
        let notes = times
            .iter()
            .enumerate()
            .map(|(i, &time)| Note {
                id: NoteId(i as u32),
                time,
                length: 0.0,
                lane: 2,
                layer: 1,
                hand: Hand::Right,
                cut_direction: CutDirection::Any,
                audio: NoteAudio {
                    instrument: InstrumentClass::Lead,
                    midi: 64,
                    name: "E4".to_string(),
                    duration: 0.1,
                    velocity: 1.0,
                },
                hit: false,
                holding: false,
                missed: false,
                hit_time: None,
            })
            .collect();
        Chart {
            difficulty: Difficulty::Medium,
            notes,
        }
    }

    fn background() -> Vec<BackgroundAudioEvent> {
        vec![BackgroundAudioEvent {
            time: 2.5,
            instrument: InstrumentClass::Kick,
            name: "C2".to_string(),
            duration: 0.1,
            velocity: 1.0,
        }]
    }

    fn session(times: &[f32]) -> (Session<ManualClock, RecordingSink>, RecordingSink) {
        let sink = RecordingSink::new();
        let observer = sink.clone();
        let session = Session::new(
            chart(times),
            background(),
            GameMode::BothHands,
            ManualClock::new(),
            sink,
        );
        (session, observer)
    }

    fn play_until(session: &mut Session<ManualClock, RecordingSink>, until: f32) {
        while session.clock().current_time_seconds() < until && !session.phase().is_terminal() {
            session.clock_mut().advance(DT);
            session.tick(&HandSnapshot::default());
        }
    }

    #[test]
    fn ticks_before_start_do_nothing() {
        let (mut session, sink) = session(&[3.0]);
        assert_eq!(session.tick(&HandSnapshot::default()), Phase::Ready);
        session.start();
        session.start();
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(sink.scheduled(), 1);
    }

    #[test]
    fn pause_freezes_time_and_suppresses_misses() {
        let (mut session, _) = session(&[3.0]);
        session.start();
        play_until(&mut session, 3.1);
        session.pause();
        let frozen = session.clock().current_time_seconds();
        for _ in 0..120 {
            session.clock_mut().advance(DT);
            assert_eq!(session.tick(&HandSnapshot::default()), Phase::Paused);
        }
        assert_eq!(session.clock().current_time_seconds(), frozen);
        assert_eq!(session.scores().counts().miss, 0);
        assert!(!session.engine().note(NoteId(0)).unwrap().missed);

        session.resume();
        play_until(&mut session, 3.3);
        assert_eq!(session.scores().counts().miss, 1);
    }

    #[test]
    fn finishes_after_last_note() {
        let (mut session, sink) = session(&[3.0, 3.5]);
        session.start();
        let anchor = crate::game::space::anchor(2, 1);
        let hands = HandSnapshot::default().with(
            Hand::Right,
            Some(crate::core::tracking::HandPose::at(cgmath::Vector3::new(anchor.x, anchor.y, 0.0))),
        );
        while !session.phase().is_terminal() {
            session.clock_mut().advance(DT);
            session.tick(&hands);
        }
        assert_eq!(session.phase(), Phase::Finished);
        assert!(session.clock().current_time_seconds() >= session.engine().end_time());
        assert_eq!(session.scores().counts().hits(), 2);
        assert_eq!(sink.triggered(), 2);
    }

    #[test]
    fn running_out_of_life_ends_the_game() {
        let times: Vec<f32> = (0..10).map(|i| 3.0 + i as f32).collect();
        let (mut session, _) = session(&times);
        session.start();
        play_until(&mut session, 20.0);
        assert_eq!(session.phase(), Phase::GameOver);
        assert_eq!(session.scores().counts().miss, 7);
        assert!(session.engine().is_stopped());
        assert_eq!(session.engine().active_count(), 0);
        assert!(session.clock().is_paused());
    }

    #[test]
    fn simultaneous_misses_stop_at_the_failing_one() {
        let (mut session, _) = session(&[3.0; 10]);
        session.start();
        play_until(&mut session, 20.0);
        assert_eq!(session.phase(), Phase::GameOver);
        assert_eq!(session.scores().counts().miss, 7);
    }

    #[test]
    fn views_use_the_engine_time() {
        let (mut session, _) = session(&[3.0]);
        session.start();
        play_until(&mut session, 3.1);
        let engine_time = session.engine().current_time();
        session.clock_mut().advance(0.4);

        let views = session.views();
        assert_eq!(views.len(), 1);
        assert!(!views[0].missed);
        assert_eq!(views[0].position.z, crate::game::space::travel_z(3.0, engine_time));
        assert!(views[0].position.z <= crate::game::space::MISS_DISTANCE_PAST_PLAYER);
    }

    #[test]
    fn stop_aborts() {
        let (mut session, _) = session(&[3.0]);
        session.start();
        play_until(&mut session, 1.0);
        session.stop();
        assert_eq!(session.phase(), Phase::Finished);
        session.resume();
        assert_eq!(session.phase(), Phase::Finished);
    }
}
