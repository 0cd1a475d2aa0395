use rand::Rng;

/// Bernoulli trials with the `f32` probabilities
/// used throughout the configuration types.
pub(crate) trait Chance {
    /// Returns `true` with probability `chance`.
    fn chance(&mut self, chance: f32) -> bool;
}

impl<R: Rng + ?Sized> Chance for R {
    fn chance(&mut self, chance: f32) -> bool {
        self.gen::<f32>() < chance
    }
}
