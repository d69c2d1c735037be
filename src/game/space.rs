use crate::game::note::{Hand, LANE_COUNT, LAYER_COUNT, Note};
use cgmath::{Vector2, Vector3};

// -----------------------------------------------------------------------------
// World space: X right, Y up, notes travel toward +Z and reach the player at 0.
// -----------------------------------------------------------------------------
pub const PLAYER_Z: f32 = 0.0;
pub const SPAWN_Z: f32 = -30.0;
pub const NOTE_SPEED: f32 = 10.0; // units per second

pub const LANE_X: [f32; LANE_COUNT] = [-1.2, -0.4, 0.4, 1.2];
pub const LAYER_Y: [f32; LAYER_COUNT] = [0.8, 1.4, 2.0];

/// Where an idle hand rests when there is nothing to reach for.
pub const REST_POSITION: [[f32; 3]; 2] = [[-1.6, 0.0, 0.4], [1.6, 0.0, 0.4]];

// Collision tuning
pub const MISS_DISTANCE_PAST_PLAYER: f32 = 2.0;
pub const COLLISION_WINDOW_Z: f32 = 1.5;
pub const HIT_RADIUS: f32 = 0.6;
pub const HIT_DEPTH_TOLERANCE: f32 = 1.2; // generous: tracked depth is noisy
pub const HOLD_RADIUS: f32 = 0.7;
pub const PERFECT_RADIUS: f32 = 0.3;
pub const AUTO_HIT_TOLERANCE: f32 = 0.05;

/// Seconds between a note spawning and reaching the player plane.
#[inline(always)]
pub const fn lookahead() -> f32 {
    (PLAYER_Z - SPAWN_Z) / NOTE_SPEED
}

/// Fixed XY anchor of a lane/layer cell.
#[inline(always)]
pub fn anchor(lane: u8, layer: u8) -> Vector2<f32> {
    let x = LANE_X[(lane as usize).min(LANE_COUNT - 1)];
    let y = LAYER_Y[(layer as usize).min(LAYER_COUNT - 1)];
    Vector2::new(x, y)
}

#[inline(always)]
pub fn note_anchor(note: &Note) -> Vector2<f32> {
    anchor(note.lane, note.layer)
}

/// Depth of the note's leading edge at `now`.
#[inline(always)]
pub fn travel_z(note_time: f32, now: f32) -> f32 {
    PLAYER_Z - (note_time - now) * NOTE_SPEED
}

#[inline(always)]
pub fn note_position(note: &Note, now: f32) -> Vector3<f32> {
    let a = note_anchor(note);
    Vector3::new(a.x, a.y, travel_z(note.time, now))
}

#[inline(always)]
pub fn rest_position(hand: Hand) -> Vector3<f32> {
    let [x, y, z] = REST_POSITION[hand.index()];
    Vector3::new(x, y, z)
}

#[inline(always)]
pub fn planar_distance(a: Vector3<f32>, b: Vector2<f32>) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}
