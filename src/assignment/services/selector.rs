//! Random reviewer selection.

use crate::assignment::domain::{User, UserId};
use rand::{CryptoRng, Rng, RngCore, rngs::OsRng};
use std::collections::HashSet;

/// Picks reviewers uniformly at random from a candidate pool.
///
/// Each draw is uniform over the candidates that remain after excluded and
/// previously drawn users are removed, so a single call never returns the
/// same user twice. The default source is the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateSelector;

impl CandidateSelector {
    /// Creates a selector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Picks up to `count` users from `pool` that are not in `exclude`.
    ///
    /// Returns `min(count, eligible)` users, or an empty vector when nobody
    /// is eligible.
    #[must_use]
    pub fn pick(&self, pool: &[User], exclude: &HashSet<UserId>, count: usize) -> Vec<User> {
        self.pick_with(&mut OsRng, pool, exclude, count)
    }

    /// Same as [`Self::pick`] but draws from the supplied cryptographic
    /// source.
    #[must_use]
    pub fn pick_with<R>(
        &self,
        rng: &mut R,
        pool: &[User],
        exclude: &HashSet<UserId>,
        count: usize,
    ) -> Vec<User>
    where
        R: RngCore + CryptoRng,
    {
        let mut seen = HashSet::with_capacity(pool.len());
        let mut eligible: Vec<&User> = pool
            .iter()
            .filter(|user| !exclude.contains(user.id()) && seen.insert(user.id()))
            .collect();

        let mut selected = Vec::with_capacity(count.min(eligible.len()));
        while selected.len() < count && !eligible.is_empty() {
            let index = rng.gen_range(0..eligible.len());
            selected.push(eligible.swap_remove(index).clone());
        }
        selected
    }
}
