use crate::game::judgment::{quality_points_for, GameplayListener, HitQuality};
use crate::game::life::{LifeChange, LifeMeter};
use crate::game::note::Note;
use log::{debug, info};
use serde::Serialize;

const COMBO_STEP: u32 = 8;
const MAX_BONUS: u32 = 3;
const HOLD_TICK_POINTS: u64 = 1;

/// Multiplier applied to a hit given the combo *before* that hit.
#[inline(always)]
pub fn multiplier_for(combo: u32) -> u32 {
    1 + (combo / COMBO_STEP).min(MAX_BONUS)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JudgmentCounts {
    pub perfect: u32,
    pub good: u32,
    pub auto: u32,
    pub miss: u32,
    pub holds_completed: u32,
}

impl JudgmentCounts {
    pub fn hits(&self) -> u32 {
        self.perfect + self.good + self.auto
    }
}

/// Final tally for a play, suitable for `--json` output.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub score: u64,
    pub max_combo: u32,
    pub accuracy: f32,
    pub health: f32,
    pub failed: bool,
    pub counts: JudgmentCounts,
}

/// Turns gameplay events into points, combo and health.
#[derive(Clone, Debug, Default)]
pub struct ScoreKeeper {
    score: u64,
    combo: u32,
    max_combo: u32,
    counts: JudgmentCounts,
    life: LifeMeter,
}

impl ScoreKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn counts(&self) -> JudgmentCounts {
        self.counts
    }

    pub fn health(&self) -> f32 {
        self.life.value()
    }

    pub fn is_failed(&self) -> bool {
        self.life.is_failed()
    }

    /// Fraction of judged notes that were hit; 1.0 before anything is judged.
    pub fn accuracy(&self) -> f32 {
        let hits = self.counts.hits();
        let judged = hits + self.counts.miss;
        if judged == 0 {
            1.0
        } else {
            hits as f32 / judged as f32
        }
    }

    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            score: self.score,
            max_combo: self.max_combo,
            accuracy: self.accuracy(),
            health: self.health(),
            failed: self.is_failed(),
            counts: self.counts,
        }
    }
}

impl GameplayListener for ScoreKeeper {
    fn on_hit(&mut self, note: &Note, quality: HitQuality) {
        let points = quality_points_for(quality) * multiplier_for(self.combo);
        self.score += u64::from(points);
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
        match quality {
            HitQuality::Perfect => self.counts.perfect += 1,
            HitQuality::Good => self.counts.good += 1,
            HitQuality::Auto => self.counts.auto += 1,
        }
        self.life.apply(LifeChange::HIT);
        debug!("Note {} +{} (combo {})", note.id, points, self.combo);
    }

    fn on_miss(&mut self, note: &Note) {
        if self.combo > 0 {
            debug!("Combo of {} broken by note {}", self.combo, note.id);
        }
        self.combo = 0;
        self.counts.miss += 1;
        let was_failed = self.life.is_failed();
        self.life.apply(LifeChange::MISS);
        if !was_failed && self.life.is_failed() {
            info!("Life depleted at note {}.", note.id);
        }
    }

    fn on_hold(&mut self, _note: &Note) {
        self.score += HOLD_TICK_POINTS;
        self.life.apply(LifeChange::HELD);
    }

    fn on_hold_complete(&mut self, _note: &Note) {
        self.counts.holds_completed += 1;
    }

    fn has_failed(&self) -> bool {
        self.is_failed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::instrument::InstrumentClass;
    use crate::game::note::{CutDirection, Hand, NoteAudio, NoteId};

    fn note() -> Note {
        Note {
            id: NoteId(0),
            time: 1.0,
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
            hit: true,
            holding: false,
            missed: false,
            hit_time: Some(1.0),
        }
    }

    #[test]
    fn multiplier_steps_every_eight_and_caps() {
        assert_eq!(multiplier_for(0), 1);
        assert_eq!(multiplier_for(7), 1);
        assert_eq!(multiplier_for(8), 2);
        assert_eq!(multiplier_for(24), 4);
        assert_eq!(multiplier_for(500), 4);
    }

    #[test]
    fn combo_builds_and_breaks() {
        let n = note();
        let mut keeper = ScoreKeeper::new();
        for _ in 0..9 {
            keeper.on_hit(&n, HitQuality::Perfect);
        }
        // Eight hits at x1, the ninth at x2.
        assert_eq!(keeper.score(), 8 * 100 + 200);
        assert_eq!(keeper.combo(), 9);
        keeper.on_miss(&n);
        assert_eq!(keeper.combo(), 0);
        assert_eq!(keeper.max_combo(), 9);
        keeper.on_hit(&n, HitQuality::Good);
        keeper.on_hit(&n, HitQuality::Auto);
        assert_eq!(keeper.score(), 1000 + 70 + 50);
        let counts = keeper.counts();
        assert_eq!((counts.perfect, counts.good, counts.auto, counts.miss), (9, 1, 1, 1));
        assert!((keeper.accuracy() - 11.0 / 12.0).abs() < 1e-6);
    }

    #[test]
    fn holds_tick_points_and_life() {
        let n = note();
        let mut keeper = ScoreKeeper::new();
        keeper.on_miss(&n);
        let before = keeper.health();
        for _ in 0..10 {
            keeper.on_hold(&n);
        }
        keeper.on_hold_complete(&n);
        assert_eq!(keeper.score(), 10);
        assert!(keeper.health() > before);
        assert_eq!(keeper.counts().holds_completed, 1);
    }

    #[test]
    fn seven_straight_misses_fail() {
        let n = note();
        let mut keeper = ScoreKeeper::new();
        for _ in 0..7 {
            keeper.on_miss(&n);
        }
        assert!(keeper.is_failed());
        keeper.on_hit(&n, HitQuality::Perfect);
        assert!(keeper.is_failed());
        assert_eq!(keeper.health(), 0.0);
        assert_eq!(ScoreKeeper::new().accuracy(), 1.0);
    }
}
