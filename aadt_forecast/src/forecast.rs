use crate::config::*;

/// A constant annual growth model anchored on two observations.
///
/// ```
/// use aadt_forecast::GrowthModel;
///
/// let model = GrowthModel::new(2022, 1000.0, 2042, 2000.0)?;
/// assert_eq!(model.project(2042), 2000);
/// assert_eq!(model.project(2032), 1414);
/// # Ok::<(), aadt_forecast::PipelineError>(())
/// ```
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct GrowthModel {
    present_year: i32,
    present_value: f64,
    future_year: i32,
    future_value: f64,
    rate: f64,
}

impl GrowthModel {
    pub fn new(
        present_year: i32,
        present_value: f64,
        future_year: i32,
        future_value: f64,
    ) -> Result<GrowthModel, PipelineError> {
        let invalid = |reason: String| Err(PipelineError::InvalidForecastInput { reason });
        if !present_value.is_finite() || !future_value.is_finite() {
            return invalid(format!(
                "non-finite counts {} and {}",
                present_value, future_value
            ));
        }
        if present_value <= 0.0 || future_value <= 0.0 {
            return invalid(format!(
                "counts must be positive, got {} and {}",
                present_value, future_value
            ));
        }
        if future_year <= present_year {
            return invalid(format!(
                "future year {} is not after present year {}",
                future_year, present_year
            ));
        }
        let span = (future_year - present_year) as f64;
        let rate = (future_value / present_value).powf(1.0 / span) - 1.0;
        Ok(GrowthModel {
            present_year,
            present_value,
            future_year,
            future_value,
            rate,
        })
    }

    /// The implied compound annual growth rate.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// The projected count for a year, truncated to a whole count.
    ///
    /// Years up to the future anchor are projected from the present anchor
    /// (this covers interpolation and backward extrapolation), later years
    /// from the future anchor.
    pub fn project(&self, target_year: i32) -> u64 {
        let value = if target_year == self.present_year {
            self.present_value
        } else if target_year == self.future_year {
            self.future_value
        } else if target_year < self.future_year {
            self.present_value * (1.0 + self.rate).powi(target_year - self.present_year)
        } else {
            self.future_value * (1.0 + self.rate).powi(target_year - self.future_year)
        };
        value.trunc() as u64
    }
}

/// Projects a single target year from two reference observations.
pub fn forecast(
    present_year: i32,
    present_value: f64,
    future_year: i32,
    future_value: f64,
    target_year: i32,
) -> Result<u64, PipelineError> {
    GrowthModel::new(present_year, present_value, future_year, future_value)
        .map(|m| m.project(target_year))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_growth_is_flat() {
        for year in [1990, 2022, 2030, 2042, 2100] {
            assert_eq!(forecast(2022, 850.0, 2042, 850.0, year), Ok(850));
        }
    }

    #[test]
    fn anchors_are_exact() {
        for (p, f) in [(1000.0, 2000.0), (333.0, 777.0), (12345.0, 54321.0), (7.0, 7.5)] {
            let m = GrowthModel::new(2021, p, 2045, f).unwrap();
            assert_eq!(m.project(2021), p as u64);
            assert_eq!(m.project(2045), f as u64);
        }
    }

    #[test]
    fn interpolation_and_extrapolation() {
        let m = GrowthModel::new(2022, 1000.0, 2042, 2000.0).unwrap();
        // Ten years is half the span: the value is multiplied by sqrt(2).
        assert_eq!(m.project(2032), 1414);
        // Ten years after the future anchor.
        assert_eq!(m.project(2052), 2828);
        // Ten years before the present anchor.
        assert_eq!(m.project(2012), 707);
    }

    #[test]
    fn target_years_are_independent() {
        let a = forecast(2022, 1000.0, 2042, 2000.0, 2032).unwrap();
        let b = forecast(2022, 1000.0, 2042, 2000.0, 2052).unwrap();
        assert_eq!((a, b), (1414, 2828));
    }

    #[test]
    fn non_decreasing_with_growth() {
        let m = GrowthModel::new(2020, 4321.0, 2045, 9876.0).unwrap();
        let mut last = 0;
        for year in 2000..2080 {
            let v = m.project(year);
            assert!(v >= last, "{} {} {}", year, v, last);
            last = v;
        }
    }

    #[test]
    fn truncation_not_rounding() {
        // 1000 * 1.5^(1/2) = 1224.74...
        let m = GrowthModel::new(2020, 1000.0, 2022, 1500.0).unwrap();
        assert_eq!(m.project(2021), 1224);
        assert!((m.rate() - 0.224744).abs() < 1e-6);
    }

    #[test]
    fn degenerate_inputs() {
        assert!(matches!(
            forecast(2022, 0.0, 2042, 100.0, 2030),
            Err(PipelineError::InvalidForecastInput { .. })
        ));
        assert!(matches!(
            forecast(2022, 100.0, 2022, 100.0, 2030),
            Err(PipelineError::InvalidForecastInput { .. })
        ));
        assert!(matches!(
            forecast(2042, 100.0, 2022, 200.0, 2030),
            Err(PipelineError::InvalidForecastInput { .. })
        ));
        assert!(matches!(
            forecast(2022, -5.0, 2042, 100.0, 2030),
            Err(PipelineError::InvalidForecastInput { .. })
        ));
        assert!(matches!(
            forecast(2022, 5.0, 2042, f64::NAN, 2030),
            Err(PipelineError::InvalidForecastInput { .. })
        ));
    }
}
