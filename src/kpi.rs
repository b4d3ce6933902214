use crate::aggregate::BaseAggregation;
use crate::schema::{ComputationMode, KpiOptions};
use chrono::{Datelike, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Denominator for every time-progress calculation. Both computation modes
/// divide by the same constant so their results stay comparable; using 365
/// calendar days in one place and weeks in another would skew them.
pub const WORKING_WEEKS_PER_YEAR: f64 = 50.0;

/// Monetary totals are reported in units of ten thousand yuan.
pub const YUAN_PER_WAN: f64 = 10_000.0;

/// Safe division. Returns `None` when the denominator is zero or either side
/// is non-finite, so a missing denominator reads as "undefined" rather than
/// `NaN` or infinity. A zero numerator over a positive denominator yields
/// `Some(0.0)`, which is deliberately distinct from `None`.
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if !numerator.is_finite() || !denominator.is_finite() || denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

/// [`safe_ratio`] scaled to a percentage.
pub fn safe_percentage(numerator: f64, denominator: f64) -> Option<f64> {
    safe_ratio(numerator, denominator).map(|v| v * 100.0)
}

/// Year progress implied by a reporting week.
pub fn year_progress_from_week(week_number: u32) -> f64 {
    week_number as f64 / WORKING_WEEKS_PER_YEAR
}

/// Year progress estimated from the calendar day of year when no explicit
/// week is supplied. The estimate divides by 7 to approximate a week count
/// and is capped at 1.0 so late-December invocations cannot exceed a full
/// year. This path can drift slightly from the explicit-week path; callers
/// that care pass `current_week_number`.
pub fn year_progress_from_day_of_year(day_of_year: u32) -> f64 {
    let estimated_weeks = day_of_year as f64 / 7.0;
    (estimated_weeks / WORKING_WEEKS_PER_YEAR).min(1.0)
}

fn current_year_progress(week_number: Option<u32>) -> f64 {
    match week_number {
        Some(week) => year_progress_from_week(week),
        None => year_progress_from_day_of_year(Utc::now().ordinal()),
    }
}

/// Percentage and plain-ratio metrics. Every field is `None` when its
/// denominator is zero, never `NaN`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RatioMetrics {
    /// reported claim payment over matured premium, percent.
    pub loss_ratio: Option<f64>,
    /// expense amount over signed premium, percent.
    pub expense_ratio: Option<f64>,
    /// matured premium over signed premium, percent.
    pub maturity_ratio: Option<f64>,
    /// marginal contribution over matured premium, percent.
    pub contribution_margin_ratio: Option<f64>,
    /// expense ratio plus loss ratio; requires both.
    pub variable_cost_ratio: Option<f64>,
    /// claim frequency scaled by the maturity ratio; requires both factors.
    pub matured_claim_ratio: Option<f64>,
    /// signed premium over commercial premium before discount. A plain
    /// ratio, not a percentage.
    pub autonomy_coefficient: Option<f64>,
    /// signed premium over the annual plan, percent.
    pub premium_progress: Option<f64>,
    /// policy count over the annual policy count target, percent. Only
    /// available when a target is supplied.
    pub policy_count_progress: Option<f64>,
    /// plan attainment judged against elapsed time, percent. The formula
    /// depends on the computation mode.
    pub time_progress_achievement: Option<f64>,
}

/// Rounded monetary totals in ten-thousand-yuan units plus raw counts.
/// Always present; an empty input produces zeros.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AbsoluteMetrics {
    pub signed_premium_wan: i64,
    pub matured_premium_wan: i64,
    pub reported_claim_payment_wan: i64,
    pub expense_amount_wan: i64,
    pub commercial_premium_before_discount_wan: i64,
    pub premium_plan_wan: i64,
    pub marginal_contribution_wan: i64,
    pub policy_count: i64,
    pub claim_case_count: i64,
}

/// Per-policy and per-case averages in whole yuan, `None` when the relevant
/// count is zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AverageMetrics {
    pub average_premium_per_policy_yuan: Option<i64>,
    pub average_claim_per_case_yuan: Option<i64>,
    pub average_expense_per_policy_yuan: Option<i64>,
    pub average_contribution_per_policy_yuan: Option<i64>,
}

/// The full KPI output: nullable ratios, required absolutes, nullable
/// averages. Splitting the groups keeps the safe-division contract visible
/// in the types instead of ad hoc nullability on one flat struct.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct KpiResult {
    pub ratios: RatioMetrics,
    pub absolutes: AbsoluteMetrics,
    pub averages: AverageMetrics,
}

impl KpiResult {
    /// Canonical result for an empty record set: all ratios and averages
    /// undefined, all absolutes zero.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pretty-printed JSON, the shape the dashboard consumes.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn round_to_wan(yuan: f64) -> i64 {
    (yuan / YUAN_PER_WAN).round() as i64
}

fn rounded_average(numerator: f64, count: i64) -> Option<i64> {
    safe_ratio(numerator, count as f64).map(|v| v.round() as i64)
}

/// The annual premium plan: an explicit target override wins, otherwise the
/// plan summed from the records.
fn resolve_annual_plan(aggregation: &BaseAggregation, options: &KpiOptions) -> f64 {
    options
        .premium_target_yuan
        .unwrap_or(aggregation.premium_plan)
}

fn current_time_progress(
    signed_premium: f64,
    annual_plan: f64,
    week_number: Option<u32>,
) -> Option<f64> {
    let progress_ratio = safe_ratio(signed_premium, annual_plan)?;
    let year_progress = current_year_progress(week_number);
    safe_percentage(progress_ratio, year_progress)
}

fn increment_time_progress(premium_increment: f64, annual_plan: f64) -> Option<f64> {
    let weekly_plan_share = annual_plan / WORKING_WEEKS_PER_YEAR;
    safe_percentage(premium_increment, weekly_plan_share)
}

/// Ratio block shared by both modes. The time-progress achievement is
/// supplied by the caller because its premium source differs between modes
/// (cumulative premium in current mode, premium delta in increment mode)
/// while every other ratio is always computed from the cumulative
/// aggregation.
fn ratio_metrics(
    aggregation: &BaseAggregation,
    annual_plan: f64,
    policy_count_target: Option<u64>,
    time_progress_achievement: Option<f64>,
) -> RatioMetrics {
    let loss_ratio = safe_percentage(
        aggregation.reported_claim_payment,
        aggregation.matured_premium,
    );
    let expense_ratio = safe_percentage(aggregation.expense_amount, aggregation.signed_premium);
    let maturity_ratio = safe_percentage(aggregation.matured_premium, aggregation.signed_premium);
    let contribution_margin_ratio = safe_percentage(
        aggregation.marginal_contribution,
        aggregation.matured_premium,
    );

    let variable_cost_ratio = match (expense_ratio, loss_ratio) {
        (Some(expense), Some(loss)) => Some(expense + loss),
        _ => None,
    };

    let claim_frequency = safe_ratio(
        aggregation.claim_case_count as f64,
        aggregation.policy_count as f64,
    );
    let matured_claim_ratio = match (claim_frequency, maturity_ratio) {
        (Some(frequency), Some(maturity)) => Some(frequency * maturity),
        _ => None,
    };

    let autonomy_coefficient = safe_ratio(
        aggregation.signed_premium,
        aggregation.commercial_premium_before_discount,
    );

    let premium_progress = safe_percentage(aggregation.signed_premium, annual_plan);
    let policy_count_progress = policy_count_target
        .and_then(|target| safe_percentage(aggregation.policy_count as f64, target as f64));

    RatioMetrics {
        loss_ratio,
        expense_ratio,
        maturity_ratio,
        contribution_margin_ratio,
        variable_cost_ratio,
        matured_claim_ratio,
        autonomy_coefficient,
        premium_progress,
        policy_count_progress,
        time_progress_achievement,
    }
}

fn absolute_metrics(aggregation: &BaseAggregation) -> AbsoluteMetrics {
    AbsoluteMetrics {
        signed_premium_wan: round_to_wan(aggregation.signed_premium),
        matured_premium_wan: round_to_wan(aggregation.matured_premium),
        reported_claim_payment_wan: round_to_wan(aggregation.reported_claim_payment),
        expense_amount_wan: round_to_wan(aggregation.expense_amount),
        commercial_premium_before_discount_wan: round_to_wan(
            aggregation.commercial_premium_before_discount,
        ),
        premium_plan_wan: round_to_wan(aggregation.premium_plan),
        marginal_contribution_wan: round_to_wan(aggregation.marginal_contribution),
        policy_count: aggregation.policy_count,
        claim_case_count: aggregation.claim_case_count,
    }
}

fn average_metrics(aggregation: &BaseAggregation) -> AverageMetrics {
    AverageMetrics {
        average_premium_per_policy_yuan: rounded_average(
            aggregation.signed_premium,
            aggregation.policy_count,
        ),
        average_claim_per_case_yuan: rounded_average(
            aggregation.reported_claim_payment,
            aggregation.claim_case_count,
        ),
        average_expense_per_policy_yuan: rounded_average(
            aggregation.expense_amount,
            aggregation.policy_count,
        ),
        average_contribution_per_policy_yuan: rounded_average(
            aggregation.marginal_contribution,
            aggregation.policy_count,
        ),
    }
}

/// Computes every KPI from a single aggregation.
///
/// In current mode the aggregation is read as a year-to-date snapshot. In
/// increment mode the aggregation is read as a single-week delta, which only
/// changes the time-progress formula; callers comparing two cumulative
/// periods should use [`compute_increment_kpis`] instead, which also applies
/// the asymmetric ratio merge.
pub fn compute_kpis(aggregation: &BaseAggregation, options: &KpiOptions) -> KpiResult {
    let annual_plan = resolve_annual_plan(aggregation, options);

    let time_progress = match options.mode {
        ComputationMode::Current => current_time_progress(
            aggregation.signed_premium,
            annual_plan,
            options.current_week_number,
        ),
        ComputationMode::Increment => {
            increment_time_progress(aggregation.signed_premium, annual_plan)
        }
    };

    KpiResult {
        ratios: ratio_metrics(
            aggregation,
            annual_plan,
            options.policy_count_target,
            time_progress,
        ),
        absolutes: absolute_metrics(aggregation),
        averages: average_metrics(aggregation),
    }
}

/// Computes the week-over-week KPI view from two cumulative aggregations.
///
/// Absolute and average metrics come from the field-wise difference
/// `current - previous`, which may legitimately be negative. Ratio metrics
/// come from the cumulative current aggregation, because the delta of a
/// cumulative ratio is not itself a meaningful ratio. The one exception is
/// the time-progress achievement, which judges the premium delta against a
/// flat weekly share of the annual plan.
pub fn compute_increment_kpis(
    current: &BaseAggregation,
    previous: &BaseAggregation,
    options: &KpiOptions,
) -> KpiResult {
    let increment = current.minus(previous);
    let annual_plan = resolve_annual_plan(current, options);
    let time_progress = increment_time_progress(increment.signed_premium, annual_plan);

    KpiResult {
        ratios: ratio_metrics(
            current,
            annual_plan,
            options.policy_count_target,
            time_progress,
        ),
        absolutes: absolute_metrics(&increment),
        averages: average_metrics(&increment),
    }
}
