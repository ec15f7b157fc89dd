//! The typed prediction request submitted by clients.
//!
//! The request is an explicit tagged record rather than a loose metadata
//! map: every field the engine prices or schedules on has its own slot.

use serde::{Deserialize, Serialize};

/// Lowest allowed job priority.
pub const PRIORITY_MIN: u8 = 1;
/// Highest allowed job priority.
pub const PRIORITY_MAX: u8 = 10;

/// Forecast category, the base-rate key for pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForecastCategory {
    /// Intraday to a few days out.
    #[default]
    ShortTerm,
    /// Weeks to months out.
    LongTerm,
    /// Caller-defined horizon and methodology.
    Custom,
}

impl std::fmt::Display for ForecastCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShortTerm => write!(f, "short_term"),
            Self::LongTerm => write!(f, "long_term"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// Market data source backing the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Delayed/aggregated feeds.
    #[default]
    Standard,
    /// Real-time and alternative data feeds.
    Premium,
}

/// Model class the evaluator is asked to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelClass {
    /// Statistical or small learned models.
    #[default]
    Light,
    /// Ensemble or deep models with significant compute cost.
    Heavy,
}

/// A client's request for one financial prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Instrument to forecast. Opaque to the engine.
    pub symbol: String,
    /// Forecast category.
    pub category: ForecastCategory,
    /// Forecast horizon in days.
    pub horizon_days: u32,
    /// Historical lookback in days.
    pub lookback_days: u32,
    /// Data source tier.
    pub data_source: DataSource,
    /// Model class.
    pub model_class: ModelClass,
    /// Priority 1-10; higher is claimed first.
    pub priority: u8,
    /// Optional ceiling on the estimated cost the caller will accept.
    pub max_cost: Option<f64>,
}

impl PredictionRequest {
    /// Creates a request with default horizon, lookback, tiers, and priority.
    #[must_use]
    pub fn new(symbol: impl Into<String>, category: ForecastCategory) -> Self {
        Self {
            symbol: symbol.into(),
            category,
            horizon_days: 7,
            lookback_days: 90,
            data_source: DataSource::default(),
            model_class: ModelClass::default(),
            priority: 5,
            max_cost: None,
        }
    }

    /// Sets the forecast horizon in days.
    #[must_use]
    pub const fn with_horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = days;
        self
    }

    /// Sets the historical lookback in days.
    #[must_use]
    pub const fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    /// Sets the data source tier.
    #[must_use]
    pub const fn with_data_source(mut self, source: DataSource) -> Self {
        self.data_source = source;
        self
    }

    /// Sets the model class.
    #[must_use]
    pub const fn with_model_class(mut self, class: ModelClass) -> Self {
        self.model_class = class;
        self
    }

    /// Sets the priority (1-10).
    #[must_use]
    pub const fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the cost ceiling.
    #[must_use]
    pub const fn with_max_cost(mut self, ceiling: f64) -> Self {
        self.max_cost = Some(ceiling);
        self
    }
}
