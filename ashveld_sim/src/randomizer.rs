// Weighted shuffle without replacement.
//
// The quantitative-chaos and randomized-hazard passes need "pick N distinct
// cells, chaos-heavy cells more likely" with a bounded, reproducible count.
// A `Randomizer` is loaded once per pass with (item, weight) entries and
// drained by `draw`, each draw removing the drawn entry so no cell is
// affected twice in one pass.
//
// **Critical constraint: determinism.** Draw order is a pure function of
// the push order and the RNG stream; entries are stored in a plain vector
// and removal uses `swap_remove`, which is deterministic.

use ashveld_prng::MatchRng;

/// A bag of weighted entries drawn without replacement.
#[derive(Clone, Debug, Default)]
pub struct Randomizer<T> {
    entries: Vec<(T, i32)>,
    total: i64,
}

impl<T> Randomizer<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            total: 0,
        }
    }

    /// Add an entry. Non-positive weights are never drawn and are dropped.
    pub fn push(&mut self, item: T, weight: i32) {
        if weight <= 0 {
            return;
        }
        self.entries.push((item, weight));
        self.total += weight as i64;
    }

    /// Remove and return one entry with probability proportional to its
    /// weight, or `None` when the bag is empty.
    pub fn draw(&mut self, rng: &mut MatchRng) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        let mut roll = rng.range_u64(0, self.total as u64) as i64;
        let mut found = 0;
        for (ix, (_, weight)) in self.entries.iter().enumerate() {
            roll -= *weight as i64;
            if roll < 0 {
                found = ix;
                break;
            }
        }
        let (item, weight) = self.entries.swap_remove(found);
        self.total -= weight as i64;
        Some(item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_every_entry_exactly_once() {
        let mut rng = MatchRng::new(42);
        let mut bag = Randomizer::new();
        for i in 0..20 {
            bag.push(i, 1 + i % 3);
        }
        let mut drawn = Vec::new();
        while let Some(item) = bag.draw(&mut rng) {
            drawn.push(item);
        }
        drawn.sort_unstable();
        assert_eq!(drawn, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn nonpositive_weights_are_dropped() {
        let mut bag = Randomizer::new();
        bag.push("never", 0);
        bag.push("also never", -4);
        assert!(bag.is_empty());
        let mut rng = MatchRng::new(1);
        assert_eq!(bag.draw(&mut rng), None);
    }

    #[test]
    fn draw_order_is_deterministic() {
        let fill = |bag: &mut Randomizer<u32>| {
            for i in 0..10 {
                bag.push(i, (i as i32 % 4) + 1);
            }
        };
        let mut rng_a = MatchRng::new(7);
        let mut rng_b = MatchRng::new(7);
        let mut bag_a = Randomizer::new();
        let mut bag_b = Randomizer::new();
        fill(&mut bag_a);
        fill(&mut bag_b);
        for _ in 0..10 {
            assert_eq!(bag_a.draw(&mut rng_a), bag_b.draw(&mut rng_b));
        }
    }

    #[test]
    fn heavier_entries_are_drawn_earlier_on_average() {
        // One heavy entry against many light ones: the heavy entry should
        // come out first well over half the time.
        let mut firsts = 0;
        for seed in 0..200 {
            let mut rng = MatchRng::new(seed);
            let mut bag = Randomizer::new();
            bag.push("heavy", 100);
            for _ in 0..10 {
                bag.push("light", 1);
            }
            if bag.draw(&mut rng) == Some("heavy") {
                firsts += 1;
            }
        }
        assert!(firsts > 150, "heavy drawn first only {firsts}/200 times");
    }
}
