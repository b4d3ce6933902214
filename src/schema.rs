use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single row as exported from the upstream reporting system, before any
/// cleaning. Every field is optional and loosely typed: numbers may arrive as
/// JSON numbers or as strings with thousands separators, booleans as native
/// booleans, 0/1, or localized yes/no vocabulary. [`crate::normalize_record`]
/// turns this into an [`InsuranceRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RawRecord {
    #[serde(default)]
    #[schemars(
        description = "Date the snapshot was taken. Accepted formats: YYYY-MM-DD, YYYY/MM/DD, YYYY.MM.DD. Unparsable values are normalized to an empty string."
    )]
    pub snapshot_date: Option<Value>,

    #[serde(default)]
    #[schemars(
        description = "Calendar year the policies in this row started. Must fall between 2000 and 2100 or the row is rejected."
    )]
    pub policy_start_year: Option<Value>,

    #[serde(default)]
    #[schemars(
        description = "Reporting week number within the two-year tracking window. Must fall between 1 and 105 or the row is rejected."
    )]
    pub week_number: Option<Value>,

    #[serde(default)]
    #[schemars(
        description = "Second-level organization name. Used as the organization dimension only when the third-level organization is absent."
    )]
    pub chengdu_branch: Option<Value>,

    #[serde(default)]
    #[schemars(
        description = "Third-level organization name. Preferred source for the organization dimension."
    )]
    pub third_level_organization: Option<Value>,

    #[serde(default)]
    #[schemars(description = "Business type category, e.g. fleet vs. individual business.")]
    pub business_type_category: Option<Value>,

    #[serde(default)]
    #[schemars(description = "Third-level customer segmentation label.")]
    pub customer_category_3: Option<Value>,

    #[serde(default)]
    #[schemars(description = "Insurance type, e.g. compulsory or commercial motor insurance.")]
    pub insurance_type: Option<Value>,

    #[serde(default)]
    #[schemars(description = "Coverage type label within the insurance type.")]
    pub coverage_type: Option<Value>,

    #[serde(default)]
    #[schemars(
        description = "Whether the vehicles are new-energy vehicles. Accepts true/false, yes/no, y/n, 1/0 and the localized equivalents. Defaults to false."
    )]
    pub is_new_energy_vehicle: Option<Value>,

    #[serde(default)]
    #[schemars(
        description = "Whether the policies cover ownership-transferred vehicles. Same accepted vocabulary as is_new_energy_vehicle. Defaults to false."
    )]
    pub is_transferred_vehicle: Option<Value>,

    #[serde(default)]
    #[schemars(description = "Renewal status label, e.g. new business, renewal, or lapsed-renewal.")]
    pub renewal_status: Option<Value>,

    #[serde(default)]
    #[schemars(description = "Sales terminal or channel the business was written through.")]
    pub terminal_source: Option<Value>,

    #[serde(default)]
    #[schemars(
        description = "Vehicle insurance grade. Blank values stay absent rather than becoming an empty grade."
    )]
    pub vehicle_insurance_grade: Option<Value>,

    #[serde(default)]
    #[schemars(description = "Risk grade. Blank values stay absent, like vehicle_insurance_grade.")]
    pub risk_grade: Option<Value>,

    #[serde(default)]
    #[schemars(
        description = "Written (signed) premium in yuan. Missing or unparsable values default to 0."
    )]
    pub signed_premium_yuan: Option<Value>,

    #[serde(default)]
    #[schemars(description = "Earned (matured) premium in yuan. Defaults to 0.")]
    pub matured_premium_yuan: Option<Value>,

    #[serde(default)]
    #[schemars(description = "Number of policies in this row. Defaults to 0.")]
    pub policy_count: Option<Value>,

    #[serde(default)]
    #[schemars(description = "Number of reported claim cases. Defaults to 0.")]
    pub claim_case_count: Option<Value>,

    #[serde(default)]
    #[schemars(description = "Reported claim payments in yuan. Defaults to 0.")]
    pub reported_claim_payment_yuan: Option<Value>,

    #[serde(default)]
    #[schemars(description = "Allocated expense amount in yuan. Defaults to 0.")]
    pub expense_amount_yuan: Option<Value>,

    #[serde(default)]
    #[schemars(
        description = "Commercial premium before discount in yuan. Denominator of the autonomy coefficient. Defaults to 0."
    )]
    pub commercial_premium_before_discount_yuan: Option<Value>,

    #[serde(default)]
    #[schemars(
        description = "Annual premium plan allocated to this row in yuan. Defaults to 0, which makes plan-based ratios unavailable rather than wrong."
    )]
    pub premium_plan_yuan: Option<Value>,

    #[serde(default)]
    #[schemars(description = "Marginal contribution amount in yuan. Defaults to 0.")]
    pub marginal_contribution_amount_yuan: Option<Value>,
}

impl RawRecord {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RawRecord)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// A validated, canonically typed insurance snapshot row.
///
/// Text dimensions have been cleaned (zero-width characters removed,
/// full-width spaces converted, whitespace collapsed and trimmed), booleans
/// and numbers parsed with explicit defaults, and the week number and policy
/// start year checked against their valid ranges. Measures are non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InsuranceRecord {
    /// Canonical YYYY-MM-DD date, or empty when the source date was absent
    /// or unparsable.
    pub snapshot_date: String,
    pub policy_start_year: i32,
    pub week_number: u32,

    /// Organization dimension, sourced from the third-level organization with
    /// the branch name as fallback.
    pub organization: String,
    pub business_type_category: String,
    pub customer_category_3: String,
    pub insurance_type: String,
    pub coverage_type: String,
    pub is_new_energy_vehicle: bool,
    pub is_transferred_vehicle: bool,
    pub renewal_status: String,
    pub terminal_source: String,

    /// Grades keep absence distinct from an empty label so that grade filters
    /// never exclude ungraded business.
    pub vehicle_insurance_grade: Option<String>,
    pub risk_grade: Option<String>,

    pub signed_premium_yuan: f64,
    pub matured_premium_yuan: f64,
    pub policy_count: u32,
    pub claim_case_count: u32,
    pub reported_claim_payment_yuan: f64,
    pub expense_amount_yuan: f64,
    pub commercial_premium_before_discount_yuan: f64,
    pub premium_plan_yuan: f64,
    pub marginal_contribution_yuan: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComputationMode {
    #[schemars(
        description = "Cumulative view: every metric is computed from the selected records as one year-to-date aggregation."
    )]
    Current,

    #[schemars(
        description = "Week-over-week view: absolute and average metrics come from the difference between the current and previous period, while ratio metrics stay cumulative."
    )]
    Increment,
}

impl Default for ComputationMode {
    fn default() -> Self {
        Self::Current
    }
}

impl ComputationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Increment => "increment",
        }
    }
}

/// Options steering a KPI computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KpiOptions {
    #[serde(default)]
    #[schemars(description = "Computation mode. Defaults to the cumulative current view.")]
    pub mode: ComputationMode,

    #[serde(default)]
    #[schemars(
        description = "Annual premium target in yuan. When set it overrides the premium plan summed from the records as the denominator of the plan-progress metrics."
    )]
    pub premium_target_yuan: Option<f64>,

    #[serde(default)]
    #[schemars(
        description = "Annual policy count target. When absent the policy count progress metric is unavailable."
    )]
    pub policy_count_target: Option<u64>,

    #[serde(default)]
    #[schemars(
        description = "Reporting week the computation is anchored to. When absent, current-mode time progress falls back to the day of year of the wall clock."
    )]
    pub current_week_number: Option<u32>,

    #[serde(default)]
    #[schemars(
        description = "Calendar year the computation refers to. Used to identify periods in increment-mode cache keys."
    )]
    pub year: Option<i32>,
}
