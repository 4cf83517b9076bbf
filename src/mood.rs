use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Valence/energy split point for the mood quadrants (inclusive on the high side).
const QUADRANT_THRESHOLD: f64 = 0.5;

/// Coarse emotional tone of a track, derived from valence and energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Angry,
    Sad,
    Calm,
}

impl Mood {
    pub const ALL: [Mood; 4] = [Mood::Happy, Mood::Angry, Mood::Sad, Mood::Calm];

    /// Classify a track into one of four quadrants around 0.5 on each axis.
    ///
    /// ```text
    ///            valence < 0.5   valence >= 0.5
    /// energy >= 0.5   angry          happy
    /// energy <  0.5   sad            calm
    /// ```
    pub fn classify(valence: f64, energy: f64) -> Self {
        let positive = valence >= QUADRANT_THRESHOLD;
        let energetic = energy >= QUADRANT_THRESHOLD;
        match (positive, energetic) {
            (true, true) => Mood::Happy,
            (false, true) => Mood::Angry,
            (false, false) => Mood::Sad,
            (true, false) => Mood::Calm,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Angry => "angry",
            Mood::Sad => "sad",
            Mood::Calm => "calm",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "happy" => Ok(Mood::Happy),
            "angry" => Ok(Mood::Angry),
            "sad" => Ok(Mood::Sad),
            "calm" => Ok(Mood::Calm),
            other => Err(format!("unknown mood '{other}' (expected happy, angry, sad or calm)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrants() {
        assert_eq!(Mood::classify(0.6, 0.6), Mood::Happy);
        assert_eq!(Mood::classify(0.3, 0.7), Mood::Angry);
        assert_eq!(Mood::classify(0.2, 0.2), Mood::Sad);
        assert_eq!(Mood::classify(0.7, 0.3), Mood::Calm);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        assert_eq!(Mood::classify(0.5, 0.5), Mood::Happy);
        assert_eq!(Mood::classify(0.4999, 0.5), Mood::Angry);
        assert_eq!(Mood::classify(0.5, 0.4999), Mood::Calm);
    }

    #[test]
    fn test_parse_roundtrip() {
        for mood in Mood::ALL {
            assert_eq!(mood.as_str().parse::<Mood>().unwrap(), mood);
        }
        assert_eq!(" HAPPY ".parse::<Mood>().unwrap(), Mood::Happy);
        assert!("melancholy".parse::<Mood>().is_err());
    }
}
