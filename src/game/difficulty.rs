use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    #[inline(always)]
    pub fn is_hardest(self) -> bool {
        matches!(self, Difficulty::Hard)
    }

    /// Minimum spacing between two interactive notes on the same hand, in seconds.
    pub fn min_gap(self) -> f32 {
        match self {
            Difficulty::Easy => 0.60,
            Difficulty::Medium => 0.35,
            Difficulty::Hard => 0.15,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("Difficulty value is empty".to_string());
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "normal" => Ok(Difficulty::Medium),
            "hard" | "expert" => Ok(Difficulty::Hard),
            _ => Err(format!(
                "Difficulty '{}' must be one of Easy, Medium or Hard",
                trimmed
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("easy".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert_eq!(" Medium ".parse::<Difficulty>(), Ok(Difficulty::Medium));
        assert_eq!("normal".parse::<Difficulty>(), Ok(Difficulty::Medium));
        assert_eq!("EXPERT".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("".parse::<Difficulty>().is_err());
        assert!("insane".parse::<Difficulty>().is_err());
    }

    #[test]
    fn gaps_shrink_with_difficulty() {
        assert!(Difficulty::Easy.min_gap() > Difficulty::Medium.min_gap());
        assert!(Difficulty::Medium.min_gap() > Difficulty::Hard.min_gap());
        assert!(Difficulty::Hard.is_hardest());
        assert_eq!(Difficulty::Hard.to_string(), "Hard");
    }
}
