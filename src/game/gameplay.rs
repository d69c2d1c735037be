use crate::core::tracking::HandSnapshot;
use crate::game::chart::Chart;
use crate::game::difficulty::Difficulty;
use crate::game::judgment::{GameplayListener, HitQuality};
use crate::game::note::{Hand, Note, NoteId};
use crate::game::space::{self, *};
use cgmath::Vector3;
use log::{debug, info};
use std::fmt;
use std::str::FromStr;

/// Zero-length notes stay in the active set this long after being hit so
/// the presentation layer can show their debris.
pub const DEBRIS_WINDOW: f32 = 1.0;
const LOG_INTERVAL: f32 = 1.0;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum GameMode {
    #[default]
    BothHands,
    LeftOnly,
    RightOnly,
}

impl GameMode {
    /// Whether notes assigned to `hand` need real hand evidence.
    #[inline(always)]
    pub fn is_enabled(self, hand: Hand) -> bool {
        match self {
            GameMode::BothHands => true,
            GameMode::LeftOnly => hand == Hand::Left,
            GameMode::RightOnly => hand == Hand::Right,
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameMode::BothHands => write!(f, "Both"),
            GameMode::LeftOnly => write!(f, "Left"),
            GameMode::RightOnly => write!(f, "Right"),
        }
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "both" | "bothhands" | "both-hands" => Ok(GameMode::BothHands),
            "left" | "leftonly" | "left-only" => Ok(GameMode::LeftOnly),
            "right" | "rightonly" | "right-only" => Ok(GameMode::RightOnly),
            other => Err(format!(
                "GameMode '{}' must be one of Both, Left or Right",
                other
            )),
        }
    }
}

/// Read-only per-note snapshot for the presentation layer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NoteView {
    pub id: NoteId,
    pub lane: u8,
    pub layer: u8,
    pub hand: Hand,
    pub time: f32,
    pub length: f32,
    pub hit: bool,
    pub holding: bool,
    pub missed: bool,
    pub position: Vector3<f32>,
}

/// Authoritative gameplay state. The note arena is written only by `update`
/// and `stop`; everything else gets copies.
pub struct State {
    notes: Vec<Note>,
    difficulty: Difficulty,
    mode: GameMode,
    note_spawn_cursor: usize,
    active: Vec<NoteId>,
    current_time: f32,
    end_time: f32,
    stopped: bool,
    next_log_time: f32,
}

pub fn init(chart: Chart, mode: GameMode) -> State {
    let end_time = if chart.is_empty() {
        0.0
    } else {
        chart.last_note_end() + DEBRIS_WINDOW + MISS_DISTANCE_PAST_PLAYER / NOTE_SPEED
    };
    info!(
        "Initializing gameplay: {} notes ({} holds) on {}, mode {}, lookahead {:.2}s.",
        chart.len(),
        chart.hold_count(),
        chart.difficulty,
        mode,
        lookahead()
    );

    State {
        notes: chart.notes,
        difficulty: chart.difficulty,
        mode,
        note_spawn_cursor: 0,
        active: Vec::new(),
        current_time: 0.0,
        end_time,
        stopped: false,
        next_log_time: 0.0,
    }
}

impl State {
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(id.index())
    }

    pub fn active_ids(&self) -> &[NoteId] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    /// Song time after which nothing can change any more.
    pub fn end_time(&self) -> f32 {
        self.end_time
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Every note has been spawned and has left the active set.
    pub fn is_complete(&self) -> bool {
        self.note_spawn_cursor >= self.notes.len() && self.active.is_empty()
    }

    pub fn views(&self, now: f32) -> Vec<NoteView> {
        self.active
            .iter()
            .map(|id| {
                let note = &self.notes[id.index()];
                NoteView {
                    id: note.id,
                    lane: note.lane,
                    layer: note.layer,
                    hand: note.hand,
                    time: note.time,
                    length: note.length,
                    hit: note.hit,
                    holding: note.holding,
                    missed: note.missed,
                    position: space::note_position(note, now),
                }
            })
            .collect()
    }
}

/// Halts gameplay: the active set is cleared and later updates are ignored.
pub fn stop(state: &mut State) {
    if state.stopped {
        return;
    }
    for id in state.active.drain(..) {
        state.notes[id.index()].holding = false;
    }
    state.stopped = true;
    info!("Gameplay stopped at {:.2}s.", state.current_time);
}

#[inline(always)]
fn spawn_lookahead_notes(state: &mut State, now: f32) {
    let lookahead = lookahead();
    while state.note_spawn_cursor < state.notes.len()
        && state.notes[state.note_spawn_cursor].time - lookahead <= now
    {
        state.active.push(state.notes[state.note_spawn_cursor].id);
        state.note_spawn_cursor += 1;
    }
}

#[inline(always)]
fn register_hit<L: GameplayListener + ?Sized>(
    note: &mut Note,
    now: f32,
    quality: HitQuality,
    listener: &mut L,
) {
    note.hit = true;
    note.hit_time = Some(now);
    note.holding = note.is_hold() && now >= note.time;
    info!(
        "HIT: Note {}, Hand {}, Lane {}, Layer {}, Error: {:.2}ms, Quality: {:?}",
        note.id,
        note.hand,
        note.lane,
        note.layer,
        (now - note.time) * 1000.0,
        quality
    );
    listener.on_hit(note, quality);
}

/// Returns whether the held note stays active.
fn update_hold<L: GameplayListener + ?Sized>(
    note: &mut Note,
    now: f32,
    hands: &HandSnapshot,
    mode: GameMode,
    listener: &mut L,
) -> bool {
    if now >= note.end_time() {
        note.holding = false;
        debug!("HOLD COMPLETE: Note {}", note.id);
        listener.on_hold_complete(note);
        return false;
    }

    let in_window = now >= note.time;
    let holding = in_window
        && if mode.is_enabled(note.hand) {
            hands.get(note.hand).is_some_and(|pose| {
                planar_distance(pose.position, note_anchor(note)) < HOLD_RADIUS
            })
        } else {
            true
        };

    if holding != note.holding {
        note.holding = holding;
        debug!(
            "HOLD {}: Note {} at {:.2}s",
            if holding { "ENGAGED" } else { "RELEASED" },
            note.id,
            now
        );
    }
    if note.holding {
        listener.on_hold(note);
    }
    true
}

/// Advances one active note by one tick. Returns whether it stays active.
///
/// Evaluation order is fixed: hold bookkeeping for notes already hit, then
/// the miss check, which always wins over any hit test in the same tick.
fn update_note<L: GameplayListener + ?Sized>(
    note: &mut Note,
    now: f32,
    hands: &HandSnapshot,
    mode: GameMode,
    listener: &mut L,
) -> bool {
    if note.missed {
        return false;
    }

    if note.hit {
        if note.is_hold() {
            return update_hold(note, now, hands, mode, listener);
        }
        return note.hit_time.is_some_and(|t| now < t + DEBRIS_WINDOW);
    }

    let z = travel_z(note.time, now);

    if z > PLAYER_Z + MISS_DISTANCE_PAST_PLAYER {
        note.missed = true;
        info!(
            "MISSED: Note {}, Hand {}, Lane {}, Time: {:.2}s",
            note.id, note.hand, note.lane, now
        );
        listener.on_miss(note);
        return false;
    }

    if !mode.is_enabled(note.hand) {
        if z >= PLAYER_Z - AUTO_HIT_TOLERANCE {
            register_hit(note, now, HitQuality::Auto, listener);
        }
        return true;
    }

    if (z - PLAYER_Z).abs() > COLLISION_WINDOW_Z {
        return true;
    }

    let Some(pose) = hands.get(note.hand) else {
        return true;
    };
    let planar = planar_distance(pose.position, note_anchor(note));
    let depth = (pose.position.z - z).abs();
    if planar < HIT_RADIUS && depth < HIT_DEPTH_TOLERANCE {
        let quality = if planar < PERFECT_RADIUS {
            HitQuality::Perfect
        } else {
            HitQuality::Good
        };
        register_hit(note, now, quality, listener);
    }
    true
}

/// One simulation tick: spawn, then update every active note against the
/// hand snapshot read for this tick. `now` must be the single clock reading
/// for the tick.
pub fn update<L: GameplayListener + ?Sized>(
    state: &mut State,
    now: f32,
    hands: &HandSnapshot,
    listener: &mut L,
) {
    if state.stopped {
        return;
    }
    state.current_time = now;
    listener.on_tick(now);

    spawn_lookahead_notes(state, now);

    let State {
        notes,
        active,
        mode,
        ..
    } = state;
    let mode = *mode;
    // Notes left after a failure stay active and unjudged.
    active.retain(|id| {
        listener.has_failed() || update_note(&mut notes[id.index()], now, hands, mode, listener)
    });

    if now >= state.next_log_time {
        info!(
            "Time: {:.2}, Active Notes: {}, Spawned: {}/{}",
            now,
            state.active.len(),
            state.note_spawn_cursor,
            state.notes.len()
        );
        state.next_log_time = now + LOG_INTERVAL;
    }
}
