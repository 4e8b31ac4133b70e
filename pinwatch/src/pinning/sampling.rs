//! Sampling policy for detail rendering
//!
//! Every event is counted, but only a random fraction is rendered and
//! buffered. The random source is pluggable so both branches can be forced.

use rand::Rng;

/// Produces uniformly distributed values in `[0, 1)`
pub trait RandomSource: Send + Sync {
    fn next_unit(&self) -> f64;
}

/// Thread-local RNG from the `rand` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn next_unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Always returns the same value
#[derive(Debug, Clone, Copy)]
pub struct FixedSource(pub f64);

impl RandomSource for FixedSource {
    fn next_unit(&self) -> f64 {
        self.0
    }
}

/// Decides whether an event gets its detail rendered
pub struct Sampler {
    probability: f64,
    source: Box<dyn RandomSource>,
}

impl Sampler {
    /// Fraction of events sampled by default (1%)
    pub const DEFAULT_PROBABILITY: f64 = 0.01;

    /// `probability` is clamped to `[0, 1]`
    pub fn new(probability: f64, source: Box<dyn RandomSource>) -> Self {
        let probability = if probability.is_nan() { 0.0 } else { probability.clamp(0.0, 1.0) };
        Self { probability, source }
    }

    /// Sampler backed by the thread-local RNG
    pub fn with_probability(probability: f64) -> Self {
        Self::new(probability, Box::new(ThreadRngSource))
    }

    /// Samples every event
    pub fn always() -> Self {
        Self::with_probability(1.0)
    }

    /// Samples nothing
    pub fn never() -> Self {
        Self::with_probability(0.0)
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn should_sample(&self) -> bool {
        if self.probability >= 1.0 {
            return true;
        }
        if self.probability <= 0.0 {
            return false;
        }
        self.source.next_unit() < self.probability
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::with_probability(Self::DEFAULT_PROBABILITY)
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler").field("probability", &self.probability).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_source_below_probability_samples() {
        let sampler = Sampler::new(0.01, Box::new(FixedSource(0.005)));
        assert!(sampler.should_sample());
    }

    #[test]
    fn test_fixed_source_above_probability_skips() {
        let sampler = Sampler::new(0.01, Box::new(FixedSource(0.5)));
        assert!(!sampler.should_sample());
    }

    #[test]
    fn test_always_and_never() {
        assert!(Sampler::always().should_sample());
        assert!(!Sampler::never().should_sample());
    }

    #[test]
    fn test_probability_is_clamped() {
        assert!((Sampler::with_probability(7.0).probability() - 1.0).abs() < f64::EPSILON);
        assert!(Sampler::with_probability(-1.0).probability().abs() < f64::EPSILON);
        assert!(Sampler::with_probability(f64::NAN).probability().abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_rate_is_roughly_one_percent() {
        let sampler = Sampler::default();
        let hits = (0..100_000).filter(|_| sampler.should_sample()).count();
        assert!((500..1_500).contains(&hits), "sampled {hits} of 100000");
    }
}
