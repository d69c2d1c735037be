pub mod audio;
pub mod clock;
pub mod network;
pub mod tracking;
