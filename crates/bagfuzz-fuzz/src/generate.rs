//! Input generators and the random bag mutator.
//!
//! Generators produce a lazy, unbounded stream of inputs from a fixed
//! seed pool.  The [`CyclicGenerator`] replays the pool round-robin; the
//! [`RandomInputGenerator`] samples a seed and applies one mutator step.
//! All randomness is seeded `ChaCha8Rng`, so the same seed yields the
//! same stream of inputs.

use crate::input::{Input, Mutation};
use bagfuzz_bag::{Bag, BagMutation, Timestamp};
use log::warn;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use thiserror::Error;

/// Errors from generator construction.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The seed pool was empty.
    #[error("at least one seed must be provided")]
    EmptySeedPool,
}

/// Produces the next fuzzing input.  The stream never ends; budgets live
/// in the harness, not here.
pub trait InputGenerator<T, M: Mutation<T>> {
    /// Produce the next input.
    fn next_input(&mut self) -> Input<T, M>;
}

/// Round-robins a fixed seed pool, yielding each seed unmutated.
///
/// Infinite and restartable: [`restart`](CyclicGenerator::restart) rewinds
/// to the start of the pool.
#[derive(Debug, Clone)]
pub struct CyclicGenerator<T> {
    seeds: Vec<T>,
    next: usize,
}

impl<T: Clone> CyclicGenerator<T> {
    /// Create a generator over a non-empty seed pool.
    pub fn new(seeds: Vec<T>) -> Result<Self, GenerateError> {
        if seeds.is_empty() {
            return Err(GenerateError::EmptySeedPool);
        }
        Ok(Self { seeds, next: 0 })
    }

    /// Rewind to the first seed in the pool.
    pub fn restart(&mut self) {
        self.next = 0;
    }
}

impl<T: Clone, M: Mutation<T>> InputGenerator<T, M> for CyclicGenerator<T> {
    fn next_input(&mut self) -> Input<T, M> {
        let seed = self.seeds[self.next].clone();
        self.next = (self.next + 1) % self.seeds.len();
        Input::new(seed)
    }
}

/// Mutates inputs according to some strategy.
pub trait Mutator<T, M: Mutation<T>> {
    /// Produce a mutated variant of the given input.
    fn mutate(&mut self, input: Input<T, M>) -> Input<T, M>;
}

/// On each pull, samples one seed uniformly from the pool, wraps it, and
/// applies one mutator step.
///
/// Infinite but not restartable: rewinding would require resetting the
/// random source, so build a fresh generator instead.
pub struct RandomInputGenerator<T, U> {
    seeds: Vec<T>,
    mutator: U,
    rng: ChaCha8Rng,
}

impl<T: Clone, U> RandomInputGenerator<T, U> {
    /// Create a generator over a non-empty seed pool.
    pub fn new(seeds: Vec<T>, mutator: U, rng_seed: u64) -> Result<Self, GenerateError> {
        if seeds.is_empty() {
            return Err(GenerateError::EmptySeedPool);
        }
        Ok(Self {
            seeds,
            mutator,
            rng: ChaCha8Rng::seed_from_u64(rng_seed),
        })
    }
}

impl<T, M, U> InputGenerator<T, M> for RandomInputGenerator<T, U>
where
    T: Clone,
    M: Mutation<T>,
    U: Mutator<T, M>,
{
    fn next_input(&mut self) -> Input<T, M> {
        let index = self.rng.gen_range(0..self.seeds.len());
        let seed = self.seeds[index].clone();
        self.mutator.mutate(Input::new(seed))
    }
}

/// The closed set of random bag mutation strategies.
#[derive(Debug, Clone)]
pub enum MutationStrategy {
    /// Drop a random message.
    DropMessage,
    /// Delay a random message by a random amount.
    DelayMessage {
        /// Upper bound on the sampled delay.
        max_delay: Duration,
    },
    /// Exchange a random pair of equal-timestamp messages.
    SwapMessages,
    /// Replace a random message with a copy of another, keeping the
    /// target's timestamp.
    ReplaceMessage,
    /// Insert a copy of a random message at a random time within the
    /// bag's span.
    InsertMessage,
    /// Replace a random message's payload with random bytes.
    ReplaceMessageData {
        /// Upper bound on the sampled payload length.
        max_len: usize,
    },
}

/// Applies one randomly parameterized [`BagMutation`] per step.
///
/// Deterministic given its RNG seed.  Bags too small for the chosen
/// strategy (e.g. dropping from an empty bag, or swapping when no two
/// messages share a timestamp) leave the input unchanged.
#[derive(Debug)]
pub struct BagMutator {
    strategy: MutationStrategy,
    rng: ChaCha8Rng,
}

impl BagMutator {
    /// Create a mutator with a strategy and an RNG seed.
    pub fn new(strategy: MutationStrategy, rng_seed: u64) -> Self {
        Self {
            strategy,
            rng: ChaCha8Rng::seed_from_u64(rng_seed),
        }
    }

    fn pick_drop(&mut self, bag: &Bag) -> Option<BagMutation> {
        if bag.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..bag.len());
        Some(BagMutation::Drop { index })
    }

    fn pick_delay(&mut self, bag: &Bag, max_delay: Duration) -> Option<BagMutation> {
        if bag.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..bag.len());
        let max_millis = (max_delay.as_millis() as u64).max(1);
        let delay = Duration::from_millis(self.rng.gen_range(1..=max_millis));
        Some(BagMutation::Delay { index, delay })
    }

    fn pick_swap(&mut self, bag: &Bag) -> Option<BagMutation> {
        // Only equal-timestamp pairs survive the bag's ordering policy.
        let messages = bag.as_slice();
        let mut pairs = Vec::new();
        for i in 0..messages.len() {
            for j in (i + 1)..messages.len() {
                if messages[i].time == messages[j].time {
                    pairs.push((i, j));
                }
            }
        }
        if pairs.is_empty() {
            return None;
        }
        let (i, j) = pairs[self.rng.gen_range(0..pairs.len())];
        Some(BagMutation::Swap { i, j })
    }

    fn pick_replace(&mut self, bag: &Bag) -> Option<BagMutation> {
        if bag.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..bag.len());
        let source = self.rng.gen_range(0..bag.len());
        let time = bag.get(index)?.time;
        let message = bag.get(source)?.at(time);
        Some(BagMutation::Replace { index, message })
    }

    fn pick_insert(&mut self, bag: &Bag) -> Option<BagMutation> {
        let (start, end) = bag.span()?;
        let source = self.rng.gen_range(0..bag.len());
        let nanos = self.rng.gen_range(start.as_nanos()..=end.as_nanos());
        let time = Timestamp::new(
            (nanos / 1_000_000_000) as u64,
            (nanos % 1_000_000_000) as u64,
        );
        let message = bag.get(source)?.at(time);
        Some(BagMutation::Insert { message })
    }

    fn pick_replace_data(&mut self, bag: &Bag, max_len: usize) -> Option<BagMutation> {
        if bag.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..bag.len());
        let len = self.rng.gen_range(0..=max_len);
        let mut data = vec![0u8; len];
        self.rng.fill(data.as_mut_slice());
        Some(BagMutation::ReplaceData { index, data })
    }
}

impl Mutator<Bag, BagMutation> for BagMutator {
    fn mutate(&mut self, input: Input<Bag, BagMutation>) -> Input<Bag, BagMutation> {
        let bag = match input.value() {
            Ok(bag) => bag,
            Err(err) => {
                warn!("mutation chain no longer applies, leaving input unchanged: {err}");
                return input;
            }
        };

        let strategy = self.strategy.clone();
        let mutation = match strategy {
            MutationStrategy::DropMessage => self.pick_drop(&bag),
            MutationStrategy::DelayMessage { max_delay } => self.pick_delay(&bag, max_delay),
            MutationStrategy::SwapMessages => self.pick_swap(&bag),
            MutationStrategy::ReplaceMessage => self.pick_replace(&bag),
            MutationStrategy::InsertMessage => self.pick_insert(&bag),
            MutationStrategy::ReplaceMessageData { max_len } => {
                self.pick_replace_data(&bag, max_len)
            }
        };

        match mutation {
            Some(mutation) => input.mutate(mutation),
            None => input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::build_test_bag;
    use bagfuzz_bag::Message;

    fn next_bag_input<G: InputGenerator<Bag, BagMutation>>(
        generator: &mut G,
    ) -> Input<Bag, BagMutation> {
        generator.next_input()
    }

    #[test]
    fn cyclic_generator_round_robins_forever() {
        let seeds = vec![build_test_bag(1), build_test_bag(2), build_test_bag(3)];
        let mut generator = CyclicGenerator::new(seeds).unwrap();

        let lengths: Vec<usize> = (0..7)
            .map(|_| next_bag_input(&mut generator).value().unwrap().len())
            .collect();
        assert_eq!(lengths, vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn cyclic_generator_restart_rewinds() {
        let seeds = vec![build_test_bag(1), build_test_bag(2)];
        let mut generator = CyclicGenerator::new(seeds).unwrap();
        let _ = next_bag_input(&mut generator);
        generator.restart();
        assert_eq!(next_bag_input(&mut generator).value().unwrap().len(), 1);
    }

    #[test]
    fn empty_seed_pool_rejected() {
        assert!(matches!(
            CyclicGenerator::<Bag>::new(vec![]),
            Err(GenerateError::EmptySeedPool)
        ));
        let mutator = BagMutator::new(MutationStrategy::DropMessage, 0);
        assert!(matches!(
            RandomInputGenerator::<Bag, _>::new(vec![], mutator, 0),
            Err(GenerateError::EmptySeedPool)
        ));
    }

    #[test]
    fn random_generator_always_mutates_single_seed() {
        let seed = build_test_bag(5);
        let mutator = BagMutator::new(MutationStrategy::DropMessage, 7);
        let mut generator =
            RandomInputGenerator::new(vec![seed.clone()], mutator, 7).unwrap();

        for _ in 0..10 {
            let input = next_bag_input(&mut generator);
            assert_eq!(input.seed(), &seed);
            assert_eq!(input.mutations().len(), 1);
            assert_eq!(input.value().unwrap().len(), 4);
        }
    }

    #[test]
    fn random_generator_is_deterministic_per_seed() {
        let pool = vec![build_test_bag(6)];
        let make = || {
            RandomInputGenerator::new(
                pool.clone(),
                BagMutator::new(MutationStrategy::DropMessage, 99),
                1234,
            )
            .unwrap()
        };
        let mut a = make();
        let mut b = make();
        for _ in 0..5 {
            let left = next_bag_input(&mut a);
            let right = next_bag_input(&mut b);
            assert_eq!(left.mutations(), right.mutations());
        }
    }

    #[test]
    fn drop_strategy_leaves_empty_bag_unchanged() {
        let mut mutator = BagMutator::new(MutationStrategy::DropMessage, 0);
        let input = mutator.mutate(Input::new(Bag::empty()));
        assert!(input.mutations().is_empty());
    }

    #[test]
    fn delay_strategy_keeps_bag_sorted() {
        let mut mutator = BagMutator::new(
            MutationStrategy::DelayMessage {
                max_delay: Duration::from_secs(10),
            },
            3,
        );
        for _ in 0..20 {
            let input = mutator.mutate(Input::new(build_test_bag(5)));
            let bag = input.value().unwrap();
            assert_eq!(bag.len(), 5);
            let times: Vec<_> = bag.iter().map(|m| m.time).collect();
            assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }

    #[test]
    fn swap_strategy_needs_equal_timestamps() {
        // Strictly increasing timestamps: no legal swap exists.
        let mut mutator = BagMutator::new(MutationStrategy::SwapMessages, 5);
        let input = mutator.mutate(Input::new(build_test_bag(4)));
        assert!(input.mutations().is_empty());

        // Two messages at the same instant: the swap applies cleanly.
        let bag = Bag::new(vec![
            Message::new("/pos", Timestamp::from_secs(1), vec![0]),
            Message::new("/cmd_vel", Timestamp::from_secs(1), vec![1]),
        ])
        .unwrap();
        let input = mutator.mutate(Input::new(bag));
        assert_eq!(input.mutations().len(), 1);
        let swapped = input.value().unwrap();
        assert_eq!(swapped.get(0).unwrap().topic, "/cmd_vel");
    }

    #[test]
    fn replace_strategy_preserves_length_and_order() {
        let mut mutator = BagMutator::new(MutationStrategy::ReplaceMessage, 11);
        for _ in 0..20 {
            let input = mutator.mutate(Input::new(build_test_bag(5)));
            assert_eq!(input.mutations().len(), 1);
            let bag = input.value().unwrap();
            assert_eq!(bag.len(), 5);
        }
    }

    #[test]
    fn insert_strategy_grows_bag_within_span() {
        let mut mutator = BagMutator::new(MutationStrategy::InsertMessage, 13);
        for _ in 0..20 {
            let input = mutator.mutate(Input::new(build_test_bag(5)));
            let bag = input.value().unwrap();
            assert_eq!(bag.len(), 6);
            let times: Vec<_> = bag.iter().map(|m| m.time).collect();
            assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }

    #[test]
    fn replace_data_strategy_bounds_payload_length() {
        let mut mutator = BagMutator::new(
            MutationStrategy::ReplaceMessageData { max_len: 8 },
            17,
        );
        for _ in 0..20 {
            let input = mutator.mutate(Input::new(build_test_bag(3)));
            let bag = input.value().unwrap();
            assert_eq!(bag.len(), 3);
            assert!(bag.iter().all(|m| m.data.len() <= 8));
        }
    }
}
