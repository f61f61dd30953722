//! Synthetic random-walk price process.
//!
//! next = max(floor, price + ε)            (additive)
//! next = max(floor, price · (1 + ε))      (multiplicative)
//!
//! where ε is drawn from the configured [`NoiseModel`].

use rand::distributions::{Distribution, Uniform};
use rand::RngCore;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use super::ExogenousProcess;
use crate::domain::State;
use crate::error::SimError;

const NAME: &str = "synthetic";

/// Distribution of the per-step increment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoiseModel {
    /// Gaussian increments.
    Normal { mean: f64, std_dev: f64 },
    /// Uniform increments on `[low, high]`.
    Uniform { low: f64, high: f64 },
    /// No noise; the price never moves.
    Zero,
}

impl Default for NoiseModel {
    fn default() -> Self {
        NoiseModel::Normal {
            mean: 0.0,
            std_dev: 1.0,
        }
    }
}

/// How the increment is applied to the current price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Increment {
    #[default]
    Additive,
    Multiplicative,
}

#[derive(Debug, Clone)]
enum Sampler {
    Normal(Normal<f64>),
    Uniform(Uniform<f64>),
    Zero,
}

/// Random-walk process. Immutable after construction.
#[derive(Debug, Clone)]
pub struct SyntheticProcess {
    noise: NoiseModel,
    increment: Increment,
    price_floor: f64,
    sampler: Sampler,
}

impl SyntheticProcess {
    /// Additive walk with a zero price floor.
    pub fn new(noise: NoiseModel) -> Result<Self, SimError> {
        Self::with_options(noise, Increment::Additive, 0.0)
    }

    pub fn with_options(
        noise: NoiseModel,
        increment: Increment,
        price_floor: f64,
    ) -> Result<Self, SimError> {
        if !price_floor.is_finite() {
            return Err(SimError::invalid_parameter(NAME, "price_floor must be finite"));
        }
        let sampler = match noise {
            NoiseModel::Normal { mean, std_dev } => {
                if !mean.is_finite() || !std_dev.is_finite() || std_dev < 0.0 {
                    return Err(SimError::invalid_parameter(
                        NAME,
                        format!("normal noise needs finite mean and std_dev >= 0, got ({mean}, {std_dev})"),
                    ));
                }
                let dist = Normal::new(mean, std_dev)
                    .map_err(|e| SimError::invalid_parameter(NAME, e.to_string()))?;
                Sampler::Normal(dist)
            }
            NoiseModel::Uniform { low, high } => {
                if !low.is_finite() || !high.is_finite() || low > high {
                    return Err(SimError::invalid_parameter(
                        NAME,
                        format!("uniform noise needs finite low <= high, got [{low}, {high}]"),
                    ));
                }
                Sampler::Uniform(Uniform::new_inclusive(low, high))
            }
            NoiseModel::Zero => Sampler::Zero,
        };
        Ok(Self {
            noise,
            increment,
            price_floor,
            sampler,
        })
    }

    /// Process whose price never moves. Handy for deterministic checks.
    pub fn constant() -> Self {
        Self {
            noise: NoiseModel::Zero,
            increment: Increment::Additive,
            price_floor: 0.0,
            sampler: Sampler::Zero,
        }
    }

    pub fn noise(&self) -> NoiseModel {
        self.noise
    }

    pub fn increment(&self) -> Increment {
        self.increment
    }

    pub fn price_floor(&self) -> f64 {
        self.price_floor
    }

    fn draw(&self, rng: &mut dyn RngCore) -> f64 {
        match &self.sampler {
            Sampler::Normal(d) => d.sample(rng),
            Sampler::Uniform(d) => d.sample(rng),
            Sampler::Zero => 0.0,
        }
    }
}

impl ExogenousProcess for SyntheticProcess {
    fn name(&self) -> &str {
        NAME
    }

    fn sample(
        &self,
        _episode_id: u64,
        state: &State,
        rng: &mut dyn RngCore,
    ) -> Result<f64, SimError> {
        let eps = self.draw(rng);
        let next = match self.increment {
            Increment::Additive => state.price + eps,
            Increment::Multiplicative => state.price * (1.0 + eps),
        };
        Ok(next.max(self.price_floor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn walk(process: &SyntheticProcess, seed: u64, steps: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut state = State::initial(0, 20.0);
        let mut prices = Vec::with_capacity(steps);
        for _ in 0..steps {
            let p = process.sample(0, &state, &mut rng).unwrap();
            prices.push(p);
            state.t += 1;
            state.price = p;
        }
        prices
    }

    #[test]
    fn zero_noise_keeps_price_fixed() {
        let p = SyntheticProcess::new(NoiseModel::Zero).unwrap();
        assert!(walk(&p, 1, 30).iter().all(|&x| x == 20.0));
        assert!(walk(&SyntheticProcess::constant(), 1, 5).iter().all(|&x| x == 20.0));
    }

    #[test]
    fn same_seed_same_path() {
        let p = SyntheticProcess::new(NoiseModel::default()).unwrap();
        assert_eq!(walk(&p, 9, 50), walk(&p, 9, 50));
        assert_ne!(walk(&p, 9, 50), walk(&p, 10, 50));
    }

    #[test]
    fn uniform_increments_stay_in_band() {
        let p = SyntheticProcess::new(NoiseModel::Uniform { low: -1.0, high: 1.0 }).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let state = State::initial(0, 20.0);
        for _ in 0..200 {
            let next = p.sample(0, &state, &mut rng).unwrap();
            assert!((19.0..=21.0).contains(&next));
        }
    }

    #[test]
    fn price_never_drops_below_floor() {
        let p = SyntheticProcess::new(NoiseModel::Uniform { low: -50.0, high: -40.0 }).unwrap();
        let prices = walk(&p, 4, 10);
        assert!(prices.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn multiplicative_increment_scales_price() {
        let p = SyntheticProcess::with_options(
            NoiseModel::Uniform { low: 0.1, high: 0.1 },
            Increment::Multiplicative,
            0.0,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let next = p.sample(0, &State::initial(0, 20.0), &mut rng).unwrap();
        assert!((next - 22.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_noise_is_rejected() {
        assert!(SyntheticProcess::new(NoiseModel::Normal { mean: 0.0, std_dev: -1.0 }).is_err());
        assert!(SyntheticProcess::new(NoiseModel::Uniform { low: 2.0, high: 1.0 }).is_err());
        assert!(SyntheticProcess::new(NoiseModel::Normal { mean: f64::NAN, std_dev: 1.0 }).is_err());
        assert!(SyntheticProcess::with_options(NoiseModel::Zero, Increment::Additive, f64::INFINITY).is_err());
    }
}
