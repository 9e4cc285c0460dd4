// Damage resolution: the combat math.
//
// A self-contained module: given attacking figures (each a discrete shot
// with its own roll), an ordered list of taker tokens, and an optional
// defensive background, resolve every shot into `Hit` records. The caller
// turns hits into `Attacked`/`Shelled`/… changes and decides death; this
// module never touches the board.
//
// Mechanics. Each shot rolls over the live taker figures plus the
// background's phantom miss bodies, so a taker's share of incoming fire is
// weighted by its remaining stack count. A shot that lands on a phantom is
// a miss; the phantom absorbs `miss_hitpoints` of the shot's damage and any
// remainder spills into the takers. Damage distributes figure by figure,
// lowest-index taker first: each full `hitpoints` removes one figure. A hit
// that removes a taker's last figure is `killing`; a hit on a powered
// building drains power before figures and is `depowering`. Leftover
// damage below one figure's hitpoints lands as a harmless scratch.
//
// **Critical constraint: determinism.** The resolution is a pure function
// of its inputs plus the shared RNG stream; identical inputs and RNG state
// produce identical hit sequences.

use crate::token::{Descriptor, UnitToken};
use ashveld_prng::MatchRng;
use smallvec::SmallVec;

/// One attacking figure group: `shots` discrete shots of `damage` each.
#[derive(Clone, Copy, Debug)]
pub struct Attacker {
    pub subject: Descriptor,
    pub token: UnitToken,
    pub shots: i32,
    pub damage: i32,
}

/// One token that can absorb hits, in taker-list order.
#[derive(Clone, Copy, Debug)]
pub struct Taker {
    pub subject: Descriptor,
    /// Remaining figures.
    pub stacks: i32,
    /// Damage required to remove one figure.
    pub hitpoints: i32,
    /// Remaining power, for powered buildings; 0 otherwise.
    pub power: i32,
}

/// Defensive background: phantom bodies that soak shots.
#[derive(Clone, Copy, Debug, Default)]
pub struct Background {
    /// Number of phantom miss bodies added to every roll.
    pub miss_count: i32,
    /// Damage a phantom body absorbs before spilling.
    pub miss_hitpoints: i32,
}

/// One resolved outcome consumed by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    /// The attacker whose shot produced this hit.
    pub attacker: UnitToken,
    /// The taker the hit landed on. For a pure miss, the taker the shot
    /// was rolled against is absent and `subject` is the first taker's.
    pub subject: Descriptor,
    pub missed: bool,
    /// The hit removed the taker's last remaining figure.
    pub killing: bool,
    /// The hit drained one power from a powered building.
    pub depowering: bool,
}

/// Resolve all shots of all attackers against the taker list.
pub fn resolve(
    attackers: &[Attacker],
    takers: &[Taker],
    background: Background,
    rng: &mut MatchRng,
) -> Vec<Hit> {
    let mut hits = Vec::new();
    if takers.is_empty() {
        return hits;
    }
    let mut state: SmallVec<[Taker; 4]> = SmallVec::from_slice(takers);

    for attacker in attackers {
        for _ in 0..attacker.shots {
            let live: i32 = state.iter().map(|t| t.stacks.max(0)).sum();
            let phantoms = background.miss_count.max(0);
            if live + phantoms <= 0 {
                return hits;
            }

            let roll = rng.range_u64(0, (live + phantoms) as u64) as i32;
            let mut damage = attacker.damage;

            if roll >= live {
                // The shot landed on a phantom body.
                let subject = state
                    .iter()
                    .find(|t| t.stacks > 0)
                    .map(|t| t.subject)
                    .unwrap_or(state[0].subject);
                hits.push(Hit {
                    attacker: attacker.token,
                    subject,
                    missed: true,
                    killing: false,
                    depowering: false,
                });
                damage -= background.miss_hitpoints.max(0);
                if damage <= 0 {
                    continue;
                }
            }

            // Distribute remaining damage figure by figure, lowest-index
            // taker first.
            for taker in state.iter_mut() {
                while damage > 0 && (taker.stacks > 0 || taker.power > 0) {
                    if taker.hitpoints > damage {
                        // A scratch: announced but harmless.
                        hits.push(Hit {
                            attacker: attacker.token,
                            subject: taker.subject,
                            missed: false,
                            killing: false,
                            depowering: false,
                        });
                        damage = 0;
                        break;
                    }
                    damage -= taker.hitpoints;
                    if taker.power > 0 {
                        // Powered buildings drain power before figures.
                        taker.power -= 1;
                        hits.push(Hit {
                            attacker: attacker.token,
                            subject: taker.subject,
                            missed: false,
                            killing: false,
                            depowering: true,
                        });
                    } else {
                        taker.stacks -= 1;
                        hits.push(Hit {
                            attacker: attacker.token,
                            subject: taker.subject,
                            missed: false,
                            killing: taker.stacks == 0,
                            depowering: false,
                        });
                    }
                }
                if damage <= 0 {
                    break;
                }
            }
        }
    }
    hits
}
