use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The eight-category emotion taxonomy of the dataset naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Calm,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgust,
    Surprised,
}

impl Emotion {
    /// Default taxonomy in dataset-code order; used positionally when no encoding is loaded.
    pub const ALL: [Emotion; 8] = [
        Emotion::Neutral,
        Emotion::Calm,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgust,
        Emotion::Surprised,
    ];

    /// Map a two-digit dataset code (`"01"`..`"08"`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "01" => Some(Self::Neutral),
            "02" => Some(Self::Calm),
            "03" => Some(Self::Happy),
            "04" => Some(Self::Sad),
            "05" => Some(Self::Angry),
            "06" => Some(Self::Fearful),
            "07" => Some(Self::Disgust),
            "08" => Some(Self::Surprised),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Calm => "calm",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Fearful => "fearful",
            Self::Disgust => "disgust",
            Self::Surprised => "surprised",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|emotion| emotion.as_str() == s)
            .ok_or_else(|| format!("Unknown emotion '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_taxonomy_order() {
        for (idx, emotion) in Emotion::ALL.iter().enumerate() {
            let code = format!("{:02}", idx + 1);
            assert_eq!(Emotion::from_code(&code), Some(*emotion));
        }
        assert_eq!(Emotion::from_code("09"), None);
        assert_eq!(Emotion::from_code("5"), None);
    }

    #[test]
    fn names_round_trip() {
        for emotion in Emotion::ALL {
            assert_eq!(emotion.as_str().parse::<Emotion>(), Ok(emotion));
        }
        assert!("bored".parse::<Emotion>().is_err());
    }
}
