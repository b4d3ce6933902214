//! # Insurance Analytics Engine
//!
//! A library for turning raw vehicle-insurance snapshot rows into validated
//! records and computing the operational KPIs a weekly reporting dashboard
//! is built on.
//!
//! ## Core Concepts
//!
//! - **Raw rows**: loosely typed key-value rows as exported upstream, with
//!   inconsistent number, boolean and date encodings
//! - **Canonical records**: validated, whitespace-cleaned, typed rows; the
//!   only shape the rest of the engine reads
//! - **Base aggregation**: nine summed measures every KPI formula draws on
//! - **Safe division**: zero denominators yield `None`, never `NaN` or
//!   infinity, and `None` is distinct from a true zero
//! - **Current vs. increment mode**: year-to-date view, or week-over-week
//!   delta whose ratio metrics deliberately stay cumulative
//! - **Exclusion-aware filtering**: per-dimension predicates that can be
//!   skipped selectively, which is what makes cascading dropdowns work
//!
//! ## Example
//!
//! ```rust,ignore
//! use insurance_analytics_engine::*;
//! use serde_json::json;
//!
//! let raw: Vec<RawRecord> = vec![
//!     serde_json::from_value(json!({
//!         "week_number": 12,
//!         "policy_start_year": 2024,
//!         "third_level_organization": "城区一部",
//!         "signed_premium_yuan": "1,250.50",
//!         "matured_premium_yuan": 900.0,
//!         "policy_count": 3,
//!     }))
//!     .unwrap(),
//! ];
//!
//! let outcome = normalize_batch(&raw);
//! assert!(outcome.is_fully_successful());
//!
//! let mut engine = KpiEngine::new();
//! let options = KpiOptions {
//!     current_week_number: Some(12),
//!     ..Default::default()
//! };
//! let kpis = engine.calculate(&outcome.success, &options);
//! println!("maturity ratio: {:?}", kpis.ratios.maturity_ratio);
//! ```

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod filter;
pub mod kpi;
pub mod normalize;
pub mod schema;
pub mod utils;

pub use aggregate::{aggregate, latest_week_number, BaseAggregation};
pub use engine::KpiEngine;
pub use error::{AnalyticsError, Result};
pub use filter::{
    filter_records, filter_with_exclusions, selectable_values, FilterDimension,
    FilterSpecification, ViewMode,
};
pub use kpi::{
    compute_increment_kpis, compute_kpis, safe_percentage, safe_ratio, AbsoluteMetrics,
    AverageMetrics, KpiResult, RatioMetrics, WORKING_WEEKS_PER_YEAR, YUAN_PER_WAN,
};
pub use normalize::*;
pub use schema::*;
pub use utils::*;

use log::{debug, info};

/// Normalizes a raw batch and computes KPIs over the accepted records in one
/// call. Rejected rows are returned alongside the result so callers can
/// surface them; they never abort the computation.
pub fn normalize_and_calculate(
    raw_records: &[RawRecord],
    options: &KpiOptions,
) -> (KpiResult, BatchOutcome) {
    info!(
        "Computing KPIs for a batch of {} raw rows in {} mode",
        raw_records.len(),
        options.mode.as_str()
    );

    let outcome = normalize_batch(raw_records);
    if !outcome.is_fully_successful() {
        debug!(
            "{} of {} rows failed validation",
            outcome.failed.len(),
            outcome.total()
        );
    }

    // One-shot computation: the engine is dropped right after, so caching
    // would only allocate.
    let mut engine = KpiEngine::with_caching(false);
    let result = engine.calculate(&outcome.success, options);
    (result, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_row(week: u32, signed: f64, matured: f64) -> RawRecord {
        serde_json::from_value(json!({
            "week_number": week,
            "policy_start_year": 2024,
            "third_level_organization": "城区一部",
            "signed_premium_yuan": signed,
            "matured_premium_yuan": matured,
            "reported_claim_payment_yuan": matured * 0.5,
            "policy_count": 2,
            "claim_case_count": 1,
        }))
        .unwrap()
    }

    #[test]
    fn test_normalize_and_calculate_end_to_end() {
        let raw = vec![raw_row(3, 1000.0, 800.0), raw_row(4, 3000.0, 1200.0)];
        let options = KpiOptions {
            current_week_number: Some(4),
            ..Default::default()
        };

        let (kpis, outcome) = normalize_and_calculate(&raw, &options);
        assert!(outcome.is_fully_successful());
        assert_eq!(outcome.success.len(), 2);

        let loss = kpis.ratios.loss_ratio.unwrap();
        assert!((loss - 50.0).abs() < 1e-10);
        assert_eq!(kpis.absolutes.policy_count, 4);
        assert_eq!(kpis.averages.average_premium_per_policy_yuan, Some(1000));
    }

    #[test]
    fn test_normalize_and_calculate_collects_rejections() {
        let mut bad_week = raw_row(3, 1000.0, 800.0);
        bad_week.week_number = Some(json!(400));
        let raw = vec![raw_row(3, 1000.0, 800.0), bad_week];

        let (kpis, outcome) = normalize_and_calculate(&raw, &KpiOptions::default());
        assert_eq!(outcome.success.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].index, 1);

        // Only the accepted row contributes.
        assert_eq!(kpis.absolutes.policy_count, 2);
    }

    #[test]
    fn test_normalize_and_calculate_empty_batch() {
        let (kpis, outcome) = normalize_and_calculate(&[], &KpiOptions::default());
        assert_eq!(outcome.total(), 0);
        assert_eq!(kpis, KpiResult::empty());
    }
}
