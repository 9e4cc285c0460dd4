// The match clock: seasons, daytimes, phases.
//
// A round walks the phase cycle Growth → Resting → Planning → Staging →
// Action → Decay → (next Growth). Daytime alternates Early/Late within
// Growth, and the season advances Spring → Summer → Autumn → Winter →
// Spring on each Early→Late wrap. Seasons parameterize the weather and
// marker tables in the ruleset (see `bible.rs`).
//
// All three enums parse from and display as lowercase words; an unknown
// word at the text boundary is a hard `ParseError`, unlike unknown type
// words in ruleset JSON which soft-resolve to the absent type.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four seasons. Index into season-keyed ruleset tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [
        Season::Spring,
        Season::Summer,
        Season::Autumn,
        Season::Winter,
    ];

    /// The season that follows this one (Winter wraps to Spring).
    pub fn next(self) -> Season {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }

    /// Index into `[T; 4]` season tables.
    pub fn index(self) -> usize {
        match self {
            Season::Spring => 0,
            Season::Summer => 1,
            Season::Autumn => 2,
            Season::Winter => 3,
        }
    }
}

/// Early or late part of the growth phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Daytime {
    Early,
    Late,
}

/// The phases of one round, in cycle order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Growth,
    Resting,
    Planning,
    Staging,
    Action,
    Decay,
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        };
        write!(f, "{word}")
    }
}

impl FromStr for Season {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "autumn" => Ok(Season::Autumn),
            "winter" => Ok(Season::Winter),
            _ => Err(ParseError::UnknownSeason(s.to_string())),
        }
    }
}

impl fmt::Display for Daytime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Daytime::Early => "early",
            Daytime::Late => "late",
        };
        write!(f, "{word}")
    }
}

impl FromStr for Daytime {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "early" => Ok(Daytime::Early),
            "late" => Ok(Daytime::Late),
            _ => Err(ParseError::UnknownDaytime(s.to_string())),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Phase::Growth => "growth",
            Phase::Resting => "resting",
            Phase::Planning => "planning",
            Phase::Staging => "staging",
            Phase::Action => "action",
            Phase::Decay => "decay",
        };
        write!(f, "{word}")
    }
}

impl FromStr for Phase {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "growth" => Ok(Phase::Growth),
            "resting" => Ok(Phase::Resting),
            "planning" => Ok(Phase::Planning),
            "staging" => Ok(Phase::Staging),
            "action" => Ok(Phase::Action),
            "decay" => Ok(Phase::Decay),
            _ => Err(ParseError::UnknownPhase(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_cycle_wraps() {
        assert_eq!(Season::Spring.next(), Season::Summer);
        assert_eq!(Season::Winter.next(), Season::Spring);
        // Four steps returns to the start.
        let mut s = Season::Autumn;
        for _ in 0..4 {
            s = s.next();
        }
        assert_eq!(s, Season::Autumn);
    }

    #[test]
    fn season_indices_match_all_order() {
        for (i, s) in Season::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }

    #[test]
    fn words_roundtrip() {
        for s in Season::ALL {
            assert_eq!(s.to_string().parse::<Season>().unwrap(), s);
        }
        for d in [Daytime::Early, Daytime::Late] {
            assert_eq!(d.to_string().parse::<Daytime>().unwrap(), d);
        }
        for p in [
            Phase::Growth,
            Phase::Resting,
            Phase::Planning,
            Phase::Staging,
            Phase::Action,
            Phase::Decay,
        ] {
            assert_eq!(p.to_string().parse::<Phase>().unwrap(), p);
        }
    }

    #[test]
    fn unknown_words_raise() {
        assert!("monsoon".parse::<Season>().is_err());
        assert!("noon".parse::<Daytime>().is_err());
        assert!("twilight".parse::<Phase>().is_err());
    }

    #[test]
    fn serde_matches_display() {
        assert_eq!(serde_json::to_string(&Season::Autumn).unwrap(), "\"autumn\"");
        assert_eq!(serde_json::to_string(&Phase::Action).unwrap(), "\"action\"");
    }
}
