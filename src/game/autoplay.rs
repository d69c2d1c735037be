use crate::core::tracking::{HandPose, HandSnapshot};
use crate::game::chart::Chart;
use crate::game::note::Hand;
use crate::game::space::{self, PLAYER_Z};
use cgmath::Vector3;

/// How long before a note is due the hand starts reaching for it.
const APPROACH_TIME: f32 = 0.2;
/// How long after a note is due it still counts as the current target.
const HIT_MARGIN: f32 = 0.05;

#[derive(Clone, Copy, Debug)]
struct Target {
    time: f32,
    end: f32,
    position: Vector3<f32>,
}

/// Scripted tracker that plays a chart perfectly: each hand sits on the
/// anchor of its next note at the player plane.
#[derive(Clone, Debug)]
pub struct Autoplay {
    targets: [Vec<Target>; 2],
    enabled: [bool; 2],
}

impl Autoplay {
    pub fn new(chart: &Chart) -> Self {
        let mut targets: [Vec<Target>; 2] = [Vec::new(), Vec::new()];
        for note in &chart.notes {
            let anchor = space::note_anchor(note);
            targets[note.hand.index()].push(Target {
                time: note.time,
                end: note.end_time(),
                position: Vector3::new(anchor.x, anchor.y, PLAYER_Z),
            });
        }
        for list in &mut targets {
            list.sort_by(|a, b| a.time.total_cmp(&b.time));
        }
        Self {
            targets,
            enabled: [true; 2],
        }
    }

    /// Stops reporting `hand`, like a tracker that lost it for good.
    pub fn without(mut self, hand: Hand) -> Self {
        self.enabled[hand.index()] = false;
        self
    }

    fn position_for(&self, hand: Hand, now: f32) -> Vector3<f32> {
        let targets = &self.targets[hand.index()];
        let idx = targets.partition_point(|t| t.time + HIT_MARGIN < now);

        let upcoming = targets
            .get(idx)
            .filter(|t| t.time - space::lookahead() <= now);
        let held = idx
            .checked_sub(1)
            .map(|i| &targets[i])
            .filter(|t| t.time <= now && now < t.end);

        match (held, upcoming) {
            (Some(hold), Some(next)) if next.time - now > APPROACH_TIME => hold.position,
            (Some(hold), None) => hold.position,
            (_, Some(next)) => next.position,
            (None, None) => space::rest_position(hand),
        }
    }

    pub fn snapshot(&self, now: f32) -> HandSnapshot {
        let mut snapshot = HandSnapshot::default();
        for hand in Hand::ALL {
            if self.enabled[hand.index()] {
                let pose = HandPose::at(self.position_for(hand, now));
                snapshot = snapshot.with(hand, Some(pose));
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::difficulty::Difficulty;
    use crate::game::instrument::InstrumentClass;
    use crate::game::note::{CutDirection, Note, NoteAudio, NoteId};

    fn note(id: u32, time: f32, length: f32, lane: u8, hand: Hand) -> Note {
        Note {
            id: NoteId(id),
            time,
            length,
            lane,
            layer: 1,
            hand,
            cut_direction: CutDirection::Any,
            audio: NoteAudio {
                instrument: InstrumentClass::Lead,
                midi: 64,
                name: "E4".to_string(),
                duration: length,
                velocity: 1.0,
            },
            hit: false,
            holding: false,
            missed: false,
            hit_time: None,
        }
    }

    fn chart() -> Chart {
        Chart {
            difficulty: Difficulty::Medium,
            notes: vec![
                note(0, 4.0, 2.0, 3, Hand::Right),
                note(1, 5.0, 0.0, 0, Hand::Left),
                note(2, 7.0, 0.0, 2, Hand::Right),
            ],
        }
    }

    #[test]
    fn rests_until_something_is_in_view() {
        let auto = Autoplay::new(&chart());
        let snap = auto.snapshot(0.5);
        assert_eq!(snap.left.unwrap().position, space::rest_position(Hand::Left));
        assert_eq!(snap.right.unwrap().position, space::rest_position(Hand::Right));
    }

    #[test]
    fn reaches_for_next_note_and_stays_on_hold() {
        let auto = Autoplay::new(&chart());
        let a = space::anchor(3, 1);
        assert_eq!(auto.snapshot(1.5).right.unwrap().position, Vector3::new(a.x, a.y, PLAYER_Z));
        // Hold runs until 6.0 and the next right note is far away.
        assert_eq!(auto.snapshot(5.5).right.unwrap().position, Vector3::new(a.x, a.y, PLAYER_Z));
        let b = space::anchor(2, 1);
        assert_eq!(auto.snapshot(6.5).right.unwrap().position, Vector3::new(b.x, b.y, PLAYER_Z));
        assert_eq!(auto.snapshot(9.0).right.unwrap().position, space::rest_position(Hand::Right));
    }

    #[test]
    fn disabled_hand_is_never_reported() {
        let auto = Autoplay::new(&chart()).without(Hand::Left);
        let snap = auto.snapshot(4.9);
        assert!(snap.left.is_none());
        assert!(snap.right.is_some());
    }
}
