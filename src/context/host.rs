//! Capabilities the interpreter borrows from whoever runs it.
//!
//! Plain contexts only need dice. Inside a match the `MatchContext` is the
//! host and also answers the character operators.

use rand::Rng;

use super::eval::EvalError;
use super::store::ContextRef;

pub trait Host {
    /// Roll `count` dice with `sides` faces on behalf of `scope`
    fn roll(&mut self, scope: &ContextRef, count: u32, sides: u32) -> Result<i64, EvalError>;

    /// Quantity of a character's resource pool
    fn quantity(&self, _character: &str, _resource: &str) -> Option<f64> {
        None
    }

    /// Cached initiative of a character
    fn initiative(&self, _character: &str) -> Option<f64> {
        None
    }

    fn in_play(&self, _character: &str) -> Option<bool> {
        None
    }
}

/// Sum of `count` rolls of a `sides`-faced die
pub fn roll_dice<R: Rng + ?Sized>(rng: &mut R, count: u32, sides: u32) -> i64 {
    (0..count).map(|_| rng.gen_range(1..=sides as i64)).sum()
}

/// Host that can only roll dice
pub struct Dice<R: Rng> {
    rng: R,
}

impl<R: Rng> Dice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Host for Dice<R> {
    fn roll(&mut self, _scope: &ContextRef, count: u32, sides: u32) -> Result<i64, EvalError> {
        let total = roll_dice(&mut self.rng, count, sides);
        tracing::trace!("Rolled {}d{} = {}", count, sides, total);
        Ok(total)
    }
}
