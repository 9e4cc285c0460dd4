// Whole-match helpers for the integration tests.
//
// `run_scripted` plays a small fixed two-player match on the demo map:
// moves, production, a standing guard, and a couple of rounds of weather
// and terrain drift. Everything the tests need — determinism, replay
// equivalence, vision filtering — falls out of the recording it returns.

use ashveld_sim::automaton::Automaton;
use ashveld_sim::bible::Bible;
use ashveld_sim::change::ChangeSet;
use ashveld_sim::map::Map;
use ashveld_sim::order::Order;
use ashveld_sim::player::Player;
use ashveld_sim::position::Position;
use ashveld_sim::token::Descriptor;
use smallvec::smallvec;

/// A fresh two-player match on the demo map with the shipped ruleset.
pub fn demo_match(seed: u64) -> Automaton {
    Automaton::new(
        vec![Player::Red, Player::Blue],
        Bible::current(),
        &Map::demo(),
        seed,
    )
}

/// Act until the automaton needs player input, collecting every changeset.
pub fn drain(auto: &mut Automaton) -> Vec<ChangeSet> {
    let mut sets = Vec::new();
    while auto.active() {
        sets.push(auto.act());
    }
    sets
}

fn submit(auto: &mut Automaton, round: usize) {
    let militia = auto.bible().unit_type("militia");
    match round {
        0 => {
            auto.receive(
                Player::Red,
                vec![
                    Order::Move {
                        subject: Descriptor::ground(Position::new(1, 2)),
                        moves: smallvec![Position::new(2, 2), Position::new(3, 2)],
                    },
                    Order::Produce {
                        subject: Descriptor::tile(Position::new(1, 1)),
                        target: Position::new(2, 1),
                        unit: militia,
                    },
                ],
            );
            auto.receive(
                Player::Blue,
                vec![Order::Move {
                    subject: Descriptor::ground(Position::new(6, 5)),
                    moves: smallvec![Position::new(5, 5), Position::new(4, 5)],
                }],
            );
        }
        1 => {
            auto.receive(
                Player::Red,
                vec![Order::Guard {
                    subject: Descriptor::ground(Position::new(3, 2)),
                    target: Position::new(3, 3),
                }],
            );
            auto.receive(
                Player::Blue,
                vec![Order::Produce {
                    subject: Descriptor::tile(Position::new(6, 6)),
                    target: Position::new(5, 6),
                    unit: militia,
                }],
            );
        }
        _ => {}
    }
}

/// Play `rounds` scripted rounds and return the finished automaton with
/// its recording.
pub fn run_scripted(seed: u64, rounds: usize) -> Automaton {
    let mut auto = demo_match(seed);
    drain(&mut auto);
    for round in 0..rounds {
        auto.act(); // resting → planning
        submit(&mut auto, round);
        drain(&mut auto); // deliver the order announcements
        auto.act(); // close planning
        drain(&mut auto); // action, decay, growth, next resting
    }
    auto
}
