use crate::game::note::Hand;
use cgmath::{InnerSpace, Quaternion, Vector3, Zero};
use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandPose {
    pub position: Vector3<f32>,
    pub orientation: Quaternion<f32>,
    pub velocity: Vector3<f32>,
}

impl HandPose {
    pub fn at(position: Vector3<f32>) -> Self {
        Self {
            position,
            orientation: identity(),
            velocity: Vector3::zero(),
        }
    }
}

/// Latest known pose per hand; `None` means the hand is not currently tracked.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HandSnapshot {
    pub left: Option<HandPose>,
    pub right: Option<HandPose>,
}

impl HandSnapshot {
    pub fn get(&self, hand: Hand) -> Option<&HandPose> {
        match hand {
            Hand::Left => self.left.as_ref(),
            Hand::Right => self.right.as_ref(),
        }
    }

    pub fn with(mut self, hand: Hand, pose: Option<HandPose>) -> Self {
        match hand {
            Hand::Left => self.left = pose,
            Hand::Right => self.right = pose,
        }
        self
    }
}

/// Raw record from the tracker for one detection step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackerUpdate {
    pub timestamp: f32,
    pub left_position: Option<Vector3<f32>>,
    pub right_position: Option<Vector3<f32>>,
    pub left_orientation: Option<Quaternion<f32>>,
    pub right_orientation: Option<Quaternion<f32>>,
}

#[inline(always)]
fn identity() -> Quaternion<f32> {
    Quaternion::new(1.0, 0.0, 0.0, 0.0)
}

#[derive(Debug, Default)]
struct SlotInner {
    snapshot: HandSnapshot,
    last_timestamp: Option<f32>,
}

/// Single overwrite-in-place slot shared between the tracker and the engine.
/// Publishing replaces the snapshot wholesale; readers always get the latest.
#[derive(Clone, Debug, Default)]
pub struct PoseSlot {
    inner: Arc<Mutex<SlotInner>>,
}

impl PoseSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: HandSnapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.snapshot = snapshot;
    }

    /// Converts a tracker record into poses, deriving velocity from the
    /// previous position of the same hand.
    pub fn publish_update(&self, update: TrackerUpdate) {
        let mut inner = self.inner.lock().unwrap();
        let dt = inner
            .last_timestamp
            .map(|last| update.timestamp - last)
            .filter(|dt| *dt > 0.0);

        let build = |position: Option<Vector3<f32>>,
                     orientation: Option<Quaternion<f32>>,
                     previous: Option<HandPose>| {
            position.map(|position| {
                let velocity = match (previous, dt) {
                    (Some(prev), Some(dt)) => (position - prev.position) / dt,
                    _ => Vector3::zero(),
                };
                let orientation = orientation
                    .filter(|q| q.magnitude2() > 0.0)
                    .map(|q| q.normalize())
                    .unwrap_or_else(identity);
                HandPose {
                    position,
                    orientation,
                    velocity,
                }
            })
        };

        let left = build(update.left_position, update.left_orientation, inner.snapshot.left);
        let right = build(update.right_position, update.right_orientation, inner.snapshot.right);
        inner.snapshot = HandSnapshot { left, right };
        inner.last_timestamp = Some(update.timestamp);
    }

    pub fn latest(&self) -> HandSnapshot {
        self.inner.lock().unwrap().snapshot
    }
}
