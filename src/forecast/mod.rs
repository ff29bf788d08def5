//! Visit-trend forecasting.
//!
//! Fits an ordinary-least-squares line through the full visit history and
//! solves for the instant a target count will be crossed. The fit always
//! covers the entire history rather than a recent window; an early outlier
//! or an offline gap permanently perturbs the slope, which is an accepted
//! bias of this approach.

use chrono::{DateTime, Duration, Utc};

use crate::storage::VisitPoint;

/// Seconds in one day, for slope-to-daily-growth conversion.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Result of a trend fit against a target visit count.
///
/// Both fields are `None` whenever a line cannot be meaningfully fit: fewer
/// than two observations, all observations at the same instant, or a flat or
/// shrinking trend that never reaches a higher target. A degenerate fit is a
/// defined result, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecast {
    /// When the target is expected to be crossed.
    pub predicted_at: Option<DateTime<Utc>>,
    /// Fitted growth in visits per 24-hour period.
    pub daily_growth: Option<f64>,
}

impl Forecast {
    /// The degenerate no-fit result.
    pub fn none() -> Self {
        Self {
            predicted_at: None,
            daily_growth: None,
        }
    }
}

/// Predict when `target_visits` will be crossed, given the full ascending
/// visit history.
///
/// Pure function of its inputs: identical history and target always yield
/// an identical forecast.
pub fn predict_crossing(history: &[VisitPoint], target_visits: i64) -> Forecast {
    if history.len() < 2 {
        return Forecast::none();
    }

    let t0 = history[0].collected_at;

    let n = history.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;

    for point in history {
        let x = seconds_since(t0, point.collected_at);
        let y = point.visits as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    // All observations at the same instant collapse the regression.
    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return Forecast::none();
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    // A flat or shrinking trend never reaches a higher target.
    if slope <= 0.0 {
        return Forecast::none();
    }

    let crossing_offset_secs = (target_visits as f64 - intercept) / slope;
    let offset = Duration::milliseconds((crossing_offset_secs * 1000.0).round() as i64);

    // A near-flat slope can put the crossing so far out that it exceeds the
    // representable date range; that is as good as no forecast.
    let Some(predicted_at) = t0.checked_add_signed(offset) else {
        return Forecast::none();
    };

    Forecast {
        predicted_at: Some(predicted_at),
        daily_growth: Some(slope * SECONDS_PER_DAY),
    }
}

fn seconds_since(t0: DateTime<Utc>, t: DateTime<Utc>) -> f64 {
    (t - t0).num_milliseconds() as f64 / 1000.0
}
