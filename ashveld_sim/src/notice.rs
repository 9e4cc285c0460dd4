// Notices: private explanations attached to order dispositions.
//
// When an order is discarded or postponed, the engine may attach a notice
// telling the issuing player (and only them) why. Notices are data riding on
// a change — game-logic failures are never control flow.

use serde::{Deserialize, Serialize};

/// Why an order was discarded, postponed or halted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Notice {
    #[default]
    None,
    /// The subject was ordered to stop whatever it was doing.
    Halted,
    /// Frostbitten units cannot attack or use abilities until they move.
    ColdFeet,
    /// Not enough funds to pay the order's cost.
    LackingMoney,
    /// Not enough stacks, e.g. to capture against a strength check.
    LackingStacks,
    /// The subject building lacks the power to perform the order.
    LackingPower,
    /// The target cell holds an enemy token.
    OccupiedByEnemy,
    /// The target cell holds a friendly token.
    OccupiedByAlly,
    /// The destination cell already holds a unit.
    DestinationOccupied,
    /// The target cell cannot hold the requested construction.
    Unbuildable,
    /// The target is outside the subject's ability range.
    OutOfRange,
    /// The target is not a valid object for this order.
    InvalidTarget,
    /// The order's subject died before the order could execute.
    SubjectKilled,
    /// The order's subject was replaced by a different token mid-round.
    SubjectReplaced,
    /// The subject is locked down by an enemy unit.
    Lockdown,
    /// No object at the subject position matches the order.
    NoSuitableSubject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_lowercase_words() {
        assert_eq!(
            serde_json::to_string(&Notice::LackingMoney).unwrap(),
            "\"lackingmoney\""
        );
        let back: Notice = serde_json::from_str("\"coldfeet\"").unwrap();
        assert_eq!(back, Notice::ColdFeet);
    }

    #[test]
    fn default_is_none() {
        assert_eq!(Notice::default(), Notice::None);
    }
}
