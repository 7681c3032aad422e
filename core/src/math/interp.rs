use crate::prelude::{AnalysisError, AnalysisResult};

/// Piecewise power-law interpolation: linear in `ln y` against `ln x`.
///
/// Outside the tabulated range the end values are held constant.
#[derive(Debug, Clone)]
pub struct LogLogInterpolator {
    log_x: Vec<f64>,
    log_y: Vec<f64>,
}

impl LogLogInterpolator {
    pub fn new(xs: &[f64], ys: &[f64]) -> AnalysisResult<Self> {
        if xs.len() != ys.len() {
            return Err(AnalysisError::UpstreamData(format!(
                "interpolation table has {} abscissae but {} ordinates",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(AnalysisError::UpstreamData(
                "interpolation table needs at least 2 points".into(),
            ));
        }
        if let Some(bad) = xs.iter().chain(ys).find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(AnalysisError::UpstreamData(format!(
                "log-log interpolation requires positive finite values, found {}",
                bad
            )));
        }
        if xs.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(AnalysisError::UpstreamData(
                "interpolation abscissae must be strictly increasing".into(),
            ));
        }

        Ok(Self {
            log_x: xs.iter().map(|x| x.ln()).collect(),
            log_y: ys.iter().map(|y| y.ln()).collect(),
        })
    }

    pub fn eval(&self, x: f64) -> f64 {
        let lx = x.ln();
        let last = self.log_x.len() - 1;
        if lx <= self.log_x[0] {
            return self.log_y[0].exp();
        }
        if lx >= self.log_x[last] {
            return self.log_y[last].exp();
        }

        let idx = self.log_x.partition_point(|&val| val <= lx);
        let (x1, x2) = (self.log_x[idx - 1], self.log_x[idx]);
        let (y1, y2) = (self.log_y[idx - 1], self.log_y[idx]);
        let t = (lx - x1) / (x2 - x1);
        (y1 + t * (y2 - y1)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reproduces_power_law_between_nodes() {
        let xs = [1.0, 10.0, 100.0];
        let ys: Vec<f64> = xs.iter().map(|x: &f64| x.powf(-2.0)).collect();
        let interp = LogLogInterpolator::new(&xs, &ys).unwrap();
        assert_relative_eq!(interp.eval(3.0), 3f64.powf(-2.0), max_relative = 1e-12);
        assert_relative_eq!(interp.eval(50.0), 50f64.powf(-2.0), max_relative = 1e-12);
    }

    #[test]
    fn clamps_outside_table() {
        let interp = LogLogInterpolator::new(&[1.0, 2.0], &[4.0, 8.0]).unwrap();
        assert_relative_eq!(interp.eval(0.5), 4.0, max_relative = 1e-12);
        assert_relative_eq!(interp.eval(10.0), 8.0, max_relative = 1e-12);
    }

    #[test]
    fn rejects_non_positive_values() {
        let err = LogLogInterpolator::new(&[1.0, 2.0], &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, AnalysisError::UpstreamData(_)));
    }

    #[test]
    fn rejects_unsorted_abscissae() {
        assert!(LogLogInterpolator::new(&[2.0, 1.0], &[1.0, 1.0]).is_err());
    }
}
