//! Quantile breakpoints and the colour ramp of the choropleth layers.

use crate::error::PipelineError;

pub const QUANTILES: [f64; 6] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];

/// ColorBrewer YlGnBu, five classes.
pub const YL_GN_BU: [&str; 5] = ["#ffffcc", "#a1dab4", "#41b6c4", "#2c7fb8", "#253494"];

pub const NO_DATA_COLOR: &str = "#000000";

/// Quantile of an ascending slice, interpolating linearly between closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    /// `colors.len() + 1` non-decreasing thresholds from min to max.
    pub breaks: Vec<f64>,
    pub colors: Vec<&'static str>,
}

impl ColorScale {
    pub fn quantile_ylgnbu(metric: &str, values: &[f64]) -> Result<Self, PipelineError> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let breaks = QUANTILES
            .iter()
            .map(|&q| quantile(&sorted, q))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| PipelineError::NoValues(metric.to_string()))?;

        Ok(ColorScale {
            breaks,
            colors: YL_GN_BU.to_vec(),
        })
    }

    /// Index of the class a value falls in: the last threshold not above it.
    /// Values on or past the maximum land in the top class.
    pub fn class_of(&self, value: f64) -> usize {
        let at_or_below = self.breaks.iter().filter(|&&b| b <= value).count();
        at_or_below.saturating_sub(1).min(self.colors.len() - 1)
    }

    pub fn color(&self, value: Option<f64>) -> &'static str {
        match value {
            Some(v) => self.colors[self.class_of(v)],
            None => NO_DATA_COLOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_interpolation_between_ranks() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile(&sorted, 0.5), Some(3.0));
        assert_eq!(quantile(&sorted, 1.0), Some(5.0));
        let q = quantile(&sorted, 0.2).unwrap();
        assert!((q - 1.8).abs() < 1e-12);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn breaks_are_monotonic_and_span_the_range() {
        let values = [43.1, 12.0, 7.5, 61.9, 25.0, 25.0, 33.3, 18.2, 9.9];
        let scale = ColorScale::quantile_ylgnbu("migrbg_perc", &values).unwrap();

        assert_eq!(scale.breaks.len(), 6);
        assert!(scale.breaks.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(scale.breaks[0], 7.5);
        assert_eq!(scale.breaks[5], 61.9);
    }

    #[test]
    fn classes_follow_thresholds() {
        let scale = ColorScale {
            breaks: vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0],
            colors: YL_GN_BU.to_vec(),
        };
        assert_eq!(scale.class_of(0.0), 0);
        assert_eq!(scale.class_of(9.9), 0);
        assert_eq!(scale.class_of(10.0), 1);
        assert_eq!(scale.class_of(45.0), 4);
        assert_eq!(scale.class_of(50.0), 4);
        assert_eq!(scale.class_of(-1.0), 0);
        assert_eq!(scale.color(Some(25.0)), "#41b6c4");
        assert_eq!(scale.color(None), NO_DATA_COLOR);
    }

    #[test]
    fn constant_metric_collapses_to_one_class() {
        let scale = ColorScale::quantile_ylgnbu("foreign_perc", &[5.0, 5.0, 5.0]).unwrap();
        assert!(scale.breaks.iter().all(|&b| b == 5.0));
        assert_eq!(scale.class_of(5.0), 4);
    }

    #[test]
    fn no_values_is_an_error() {
        assert!(matches!(
            ColorScale::quantile_ylgnbu("res10yrs_perc", &[]),
            Err(PipelineError::NoValues(_))
        ));
    }
}
