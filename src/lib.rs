//! MIDI-driven hand-tracking rhythm game core: turns a MIDI file into a
//! two-handed note chart and plays it back against tracked hand poses.

pub mod config;
pub mod core;
pub mod game;
