use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::{MlErr, Result};

/// The distribution a layer's parameters are initially sampled from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightGen {
    Const(f32),
    Uniform { low: f32, high: f32 },
    XavierUniform { fan_in: usize, fan_out: usize },
}

impl WeightGen {
    /// Samples `n` weights.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `n` - The amount of weights to generate.
    ///
    /// # Returns
    /// The weights or an error if the distribution's range is invalid.
    pub fn sample<R>(&self, rng: &mut R, n: usize) -> Result<Vec<f32>>
    where
        R: Rng + ?Sized,
    {
        match *self {
            WeightGen::Const(value) => Ok(vec![value; n]),
            WeightGen::Uniform { low, high } => Self::sample_uniform(rng, n, low, high),
            WeightGen::XavierUniform { fan_in, fan_out } => {
                if fan_in + fan_out == 0 {
                    return Err(MlErr::InvalidInit(
                        "xavier uniform needs at least one unit".into(),
                    ));
                }

                let range = (6. / (fan_in + fan_out) as f32).sqrt();
                Self::sample_uniform(rng, n, -range, range)
            }
        }
    }

    fn sample_uniform<R>(rng: &mut R, n: usize, low: f32, high: f32) -> Result<Vec<f32>>
    where
        R: Rng + ?Sized,
    {
        let distribution = Uniform::new(low, high)
            .map_err(|e| MlErr::InvalidInit(format!("uniform [{low}, {high}): {e}")))?;

        Ok((0..n).map(|_| distribution.sample(rng)).collect())
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn constant_yields_the_same_value() {
        let mut rng = StdRng::seed_from_u64(0);
        let sample = WeightGen::Const(1.0).sample(&mut rng, 3).unwrap();
        assert_eq!(sample, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn xavier_uniform_stays_within_its_limit() {
        let mut rng = StdRng::seed_from_u64(7);
        let weight_gen = WeightGen::XavierUniform {
            fan_in: 4,
            fan_out: 2,
        };

        let sample = weight_gen.sample(&mut rng, 1000).unwrap();
        assert_eq!(sample.len(), 1000);
        assert!(sample.iter().all(|w| w.abs() <= 1.0));
        assert!(sample.iter().any(|w| *w != sample[0]));
    }

    #[test]
    fn invalid_uniform_range_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let weight_gen = WeightGen::Uniform {
            low: 1.0,
            high: 0.0,
        };
        assert!(weight_gen.sample(&mut rng, 1).is_err());
    }
}
