//! Shared helpers for the synthetic device models.

use rand::{Rng, rngs::StdRng};

/// Utility function to generate Gaussian noise using Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
///
/// # Returns
///
/// Random value from a Gaussian distribution with mean 0 and specified standard deviation
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-9, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// Half-sine daylight shape for a given hour of day.
///
/// # Arguments
///
/// * `hour` - Hour of day, fractional (e.g. 12.5 for 12:30)
/// * `sunrise` - Sunrise hour, fractional
/// * `sunset` - Sunset hour, fractional
///
/// # Returns
///
/// A value in `[0, 1]`: 0 outside daylight, 1 at solar noon.
pub fn daylight_frac(hour: f64, sunrise: f64, sunset: f64) -> f64 {
    if sunset <= sunrise || hour <= sunrise || hour >= sunset {
        return 0.0;
    }
    let x = (hour - sunrise) / (sunset - sunrise);
    (std::f64::consts::PI * x).sin().max(0.0)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn zero_std_gives_zero_noise() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(gaussian_noise(&mut rng, 0.0), 0.0);
        assert_eq!(gaussian_noise(&mut rng, -1.0), 0.0);
    }

    #[test]
    fn noise_is_reproducible_for_a_seed() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..10 {
            assert_eq!(gaussian_noise(&mut a, 0.2), gaussian_noise(&mut b, 0.2));
        }
    }

    #[test]
    fn daylight_peaks_mid_day() {
        assert_eq!(daylight_frac(5.0, 6.0, 18.0), 0.0);
        assert_eq!(daylight_frac(18.0, 6.0, 18.0), 0.0);
        assert!((daylight_frac(12.0, 6.0, 18.0) - 1.0).abs() < 1e-12);
        assert!(daylight_frac(9.0, 6.0, 18.0) > 0.0);
        assert!(daylight_frac(9.0, 6.0, 18.0) < 1.0);
    }
}
