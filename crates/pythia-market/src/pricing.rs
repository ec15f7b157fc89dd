//! Deterministic cost estimation for prediction requests.
//!
//! Pricing is a pure function of the request: a base rate keyed by the
//! forecast category, scaled by one multiplier into which independent
//! surcharges compound additively. Same request, same estimate, always.

use pythia_core::{DataSource, ForecastCategory, ModelClass, PredictionRequest};

/// Base rate for short-term forecasts.
pub const SHORT_TERM_BASE: f64 = 6.00;
/// Base rate for long-term forecasts.
pub const LONG_TERM_BASE: f64 = 12.00;
/// Base rate for custom forecasts.
pub const CUSTOM_BASE: f64 = 20.00;

/// Horizon above which the long-horizon surcharge applies.
pub const HORIZON_SURCHARGE_DAYS: u32 = 30;
/// Lookback above which the deep-history surcharge applies.
pub const LOOKBACK_SURCHARGE_DAYS: u32 = 180;
/// Priority at or above which the high-priority surcharge applies.
pub const HIGH_PRIORITY_THRESHOLD: u8 = 8;

/// Surcharge for horizons past [`HORIZON_SURCHARGE_DAYS`].
pub const HORIZON_SURCHARGE: f64 = 0.20;
/// Surcharge for lookbacks past [`LOOKBACK_SURCHARGE_DAYS`].
pub const LOOKBACK_SURCHARGE: f64 = 0.10;
/// Surcharge for premium data feeds.
pub const PREMIUM_DATA_SURCHARGE: f64 = 0.30;
/// Surcharge for heavy model classes.
pub const HEAVY_MODEL_SURCHARGE: f64 = 0.50;
/// Surcharge for high-priority jobs.
pub const HIGH_PRIORITY_SURCHARGE: f64 = 0.25;

/// Base rate for a forecast category.
#[must_use]
pub const fn base_rate(category: ForecastCategory) -> f64 {
    match category {
        ForecastCategory::ShortTerm => SHORT_TERM_BASE,
        ForecastCategory::LongTerm => LONG_TERM_BASE,
        ForecastCategory::Custom => CUSTOM_BASE,
    }
}

/// The combined surcharge multiplier for a request.
///
/// Each surcharge applies independently; they sum into a single
/// multiplier applied once to the base rate.
#[must_use]
pub fn surcharge_multiplier(request: &PredictionRequest) -> f64 {
    let mut surcharge = 0.0;
    if request.horizon_days > HORIZON_SURCHARGE_DAYS {
        surcharge += HORIZON_SURCHARGE;
    }
    if request.lookback_days > LOOKBACK_SURCHARGE_DAYS {
        surcharge += LOOKBACK_SURCHARGE;
    }
    if request.data_source == DataSource::Premium {
        surcharge += PREMIUM_DATA_SURCHARGE;
    }
    if request.model_class == ModelClass::Heavy {
        surcharge += HEAVY_MODEL_SURCHARGE;
    }
    if request.priority >= HIGH_PRIORITY_THRESHOLD {
        surcharge += HIGH_PRIORITY_SURCHARGE;
    }
    1.0 + surcharge
}

/// Estimates the cost of a request, rounded to 2 decimal places.
#[must_use]
pub fn estimate(request: &PredictionRequest) -> f64 {
    round2(base_rate(request.category) * surcharge_multiplier(request))
}

/// Rounds a monetary amount to 2 decimal places.
#[must_use]
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn request(category: ForecastCategory) -> PredictionRequest {
        PredictionRequest::new("EURUSD", category)
    }

    #[test_case(ForecastCategory::ShortTerm, 6.00; "short term base")]
    #[test_case(ForecastCategory::LongTerm, 12.00; "long term base")]
    #[test_case(ForecastCategory::Custom, 20.00; "custom base")]
    fn base_estimate_without_surcharges(category: ForecastCategory, expected: f64) {
        assert!((estimate(&request(category)) - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn high_priority_long_term_scenario() {
        // 12.00 * 1.25 = 15.00: priority surcharge only.
        let request = request(ForecastCategory::LongTerm).with_priority(8);
        assert!((estimate(&request) - 15.00).abs() < f64::EPSILON);
    }

    #[test_case(31, 0, 1.20; "horizon surcharge")]
    #[test_case(30, 0, 1.00; "horizon at threshold is free")]
    #[test_case(0, 181, 1.10; "lookback surcharge")]
    #[test_case(0, 180, 1.00; "lookback at threshold is free")]
    #[test_case(31, 181, 1.30; "horizon and lookback compound additively")]
    fn window_surcharges(horizon: u32, lookback: u32, expected_multiplier: f64) {
        let mut request = request(ForecastCategory::ShortTerm);
        if horizon > 0 {
            request = request.with_horizon_days(horizon);
        }
        if lookback > 0 {
            request = request.with_lookback_days(lookback);
        }
        assert!((surcharge_multiplier(&request) - expected_multiplier).abs() < f64::EPSILON);
    }

    #[test]
    fn premium_and_heavy_surcharges() {
        let request = request(ForecastCategory::ShortTerm)
            .with_data_source(pythia_core::DataSource::Premium)
            .with_model_class(pythia_core::ModelClass::Heavy);
        assert!((surcharge_multiplier(&request) - 1.80).abs() < f64::EPSILON);
    }

    #[test]
    fn all_surcharges_compound_additively() {
        let request = request(ForecastCategory::LongTerm)
            .with_horizon_days(60)
            .with_lookback_days(365)
            .with_data_source(pythia_core::DataSource::Premium)
            .with_model_class(pythia_core::ModelClass::Heavy)
            .with_priority(10);
        // 1 + 0.20 + 0.10 + 0.30 + 0.50 + 0.25 = 2.35
        assert!((surcharge_multiplier(&request) - 2.35).abs() < f64::EPSILON);
        assert!((estimate(&request) - 28.20).abs() < f64::EPSILON);
    }

    #[test]
    fn priority_below_threshold_is_free() {
        let request = request(ForecastCategory::ShortTerm).with_priority(7);
        assert!((surcharge_multiplier(&request) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn estimate_is_rounded_to_cents() {
        let value = estimate(
            &request(ForecastCategory::Custom)
                .with_priority(9)
                .with_lookback_days(365),
        );
        assert!((value * 100.0 - (value * 100.0).round()).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_estimate_is_deterministic(
            horizon in 0u32..1000,
            lookback in 0u32..5000,
            priority in 1u8..=10,
            premium in proptest::bool::ANY,
            heavy in proptest::bool::ANY,
        ) {
            let mut request = request(ForecastCategory::Custom)
                .with_horizon_days(horizon)
                .with_lookback_days(lookback)
                .with_priority(priority);
            if premium {
                request = request.with_data_source(pythia_core::DataSource::Premium);
            }
            if heavy {
                request = request.with_model_class(pythia_core::ModelClass::Heavy);
            }
            prop_assert_eq!(estimate(&request).to_bits(), estimate(&request).to_bits());
        }

        #[test]
        fn prop_estimate_never_below_base(
            horizon in 0u32..1000,
            lookback in 0u32..5000,
            priority in 1u8..=10,
        ) {
            let request = request(ForecastCategory::ShortTerm)
                .with_horizon_days(horizon)
                .with_lookback_days(lookback)
                .with_priority(priority);
            prop_assert!(estimate(&request) >= SHORT_TERM_BASE);
        }
    }
}
