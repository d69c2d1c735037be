use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum InstrumentClass {
    Kick,
    Snare,
    HiHat,
    Bass,
    Lead,
}

impl InstrumentClass {
    /// Kick and bass make up the rhythm section, which never becomes interactive.
    #[inline(always)]
    pub fn is_rhythm_section(self) -> bool {
        matches!(self, InstrumentClass::Kick | InstrumentClass::Bass)
    }
}

impl fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrumentClass::Kick => "kick",
            InstrumentClass::Snare => "snare",
            InstrumentClass::HiHat => "hihat",
            InstrumentClass::Bass => "bass",
            InstrumentClass::Lead => "lead",
        };
        f.write_str(name)
    }
}

/// General MIDI drum map subset; anything unrecognised on the percussion
/// channel falls back to snare.
pub fn classify(is_percussion: bool, pitch: u8) -> InstrumentClass {
    if is_percussion {
        match pitch {
            35 | 36 => InstrumentClass::Kick,
            38 | 40 => InstrumentClass::Snare,
            42..=46 => InstrumentClass::HiHat,
            _ => InstrumentClass::Snare,
        }
    } else if pitch < 50 {
        InstrumentClass::Bass
    } else {
        InstrumentClass::Lead
    }
}
