use crate::math::quadrature::Quadrature;

pub struct StatsHelper;

impl StatsHelper {
    /// Mean of `f` over `[e_min, e_max]` weighted by a reference power-law
    /// spectrum `E^-index`.
    pub fn spectral_mean<F>(f: F, e_min: f64, e_max: f64, index: f64) -> f64
    where
        F: Fn(f64) -> f64,
    {
        if e_max <= e_min {
            return f(e_min);
        }
        let quad = Quadrature::default();
        let weight = |e: f64| e.powf(-index);
        let norm = quad.integrate_log(weight, e_min, e_max);
        if norm <= 0.0 {
            return f(e_min);
        }
        quad.integrate_log(|e| weight(e) * f(e), e_min, e_max) / norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn spectral_mean_of_constant_is_constant() {
        let mean = StatsHelper::spectral_mean(|_| 7.5, 100.0, 1000.0, 2.2);
        assert_relative_eq!(mean, 7.5, max_relative = 1e-9);
    }

    #[test]
    fn spectral_mean_weights_toward_low_energy() {
        let mean = StatsHelper::spectral_mean(|e| e, 100.0, 1000.0, 2.0);
        // E^-2 weighting of E over [a, b]: ln(b/a) / (1/a - 1/b)
        let expected = (10f64).ln() / (0.01 - 0.001);
        assert_relative_eq!(mean, expected, max_relative = 1e-7);
        assert!(mean < 550.0);
    }

    #[test]
    fn degenerate_interval_evaluates_at_edge() {
        assert_eq!(StatsHelper::spectral_mean(|e| e * 2.0, 5.0, 5.0, 2.0), 10.0);
    }
}
