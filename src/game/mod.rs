pub mod autoplay;
pub mod cache;
pub mod chart;
pub mod difficulty;
pub mod gameplay;
pub mod instrument;
pub mod judgment;
pub mod life;
pub mod midi;
pub mod note;
pub mod scores;
pub mod session;
pub mod song;
pub mod space;
