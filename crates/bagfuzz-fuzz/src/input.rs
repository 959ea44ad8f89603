//! Fuzzing inputs: a seed value plus an ordered mutation chain.

use bagfuzz_bag::{Bag, BagError, BagMutation};
use std::fmt;

/// A named, pure transform from one value to another.
///
/// Mutations are stateless and deterministic given their input; all the
/// randomness lives in the [`Mutator`](crate::generate::Mutator) that
/// picks their parameters.
pub trait Mutation<T>: fmt::Debug + Clone + Send {
    /// The error produced when a mutation cannot apply (e.g. an index
    /// that no longer exists).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Apply the mutation, producing a new value.
    fn apply(&self, value: &T) -> Result<T, Self::Error>;
}

impl Mutation<Bag> for BagMutation {
    type Error = BagError;

    fn apply(&self, value: &Bag) -> Result<Bag, Self::Error> {
        BagMutation::apply(self, value)
    }
}

/// A generated fuzzing input: a seed and the mutations applied to it.
///
/// The concrete value is the left-to-right fold of the mutation chain
/// over the seed, recomputed on every [`value`](Input::value) call —
/// chains are expected to stay short, and recomputing keeps inputs plain
/// immutable data.  [`mutate`](Input::mutate) returns a new input with
/// one appended mutation; the receiver is never changed.
#[derive(Debug, Clone)]
pub struct Input<T, M> {
    seed: T,
    mutations: Vec<M>,
}

impl<T: Clone, M: Mutation<T>> Input<T, M> {
    /// Wrap a seed with an empty mutation chain.
    pub fn new(seed: T) -> Self {
        Self {
            seed,
            mutations: Vec::new(),
        }
    }

    /// The unmutated seed.
    pub fn seed(&self) -> &T {
        &self.seed
    }

    /// The mutation chain, in application order.
    pub fn mutations(&self) -> &[M] {
        &self.mutations
    }

    /// The concrete value: the mutation chain folded over the seed.
    pub fn value(&self) -> Result<T, M::Error> {
        self.mutations
            .iter()
            .try_fold(self.seed.clone(), |value, mutation| mutation.apply(&value))
    }

    /// A new input with one more mutation appended.
    pub fn mutate(&self, mutation: M) -> Self {
        let mut mutations = self.mutations.clone();
        mutations.push(mutation);
        Self {
            seed: self.seed.clone(),
            mutations,
        }
    }
}
