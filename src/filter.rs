use crate::schema::InsuranceRecord;
use crate::utils::clean_text;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// How the week-number selection is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[schemars(
        description = "Focus on one reporting week: records must match the latest week in the selection."
    )]
    SingleWeek,

    #[schemars(
        description = "Trend view across weeks: records may match any week in the selection."
    )]
    WeekTrend,
}

impl Default for ViewMode {
    fn default() -> Self {
        Self::SingleWeek
    }
}

/// Names one filterable dimension, used to build exclusion sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FilterDimension {
    Organizations,
    BusinessTypeCategories,
    CustomerCategories,
    InsuranceTypes,
    CoverageTypes,
    RenewalStatuses,
    TerminalSources,
    VehicleInsuranceGrades,
    RiskGrades,
    NewEnergyVehicle,
    TransferredVehicle,
    PolicyStartYears,
    WeekNumbers,
}

/// One set of dashboard filter selections.
///
/// Empty lists and unset flags mean "no constraint". List values are cleaned
/// with the same text normalization applied to records, so selections pasted
/// with stray whitespace still match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FilterSpecification {
    #[serde(default)]
    #[schemars(description = "Allowed organization names. Empty means all organizations.")]
    pub organizations: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Allowed business type categories.")]
    pub business_type_categories: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Allowed third-level customer categories.")]
    pub customer_categories: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Allowed insurance types.")]
    pub insurance_types: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Allowed coverage types.")]
    pub coverage_types: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Allowed renewal statuses.")]
    pub renewal_statuses: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Allowed terminal sources.")]
    pub terminal_sources: Vec<String>,

    #[serde(default)]
    #[schemars(
        description = "Allowed vehicle insurance grades. Records without a grade always pass."
    )]
    pub vehicle_insurance_grades: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Allowed risk grades. Records without a grade always pass.")]
    pub risk_grades: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Require the new-energy flag to equal this value when set.")]
    pub is_new_energy_vehicle: Option<bool>,

    #[serde(default)]
    #[schemars(description = "Require the transferred-vehicle flag to equal this value when set.")]
    pub is_transferred_vehicle: Option<bool>,

    #[serde(default)]
    #[schemars(description = "Allowed policy start years.")]
    pub policy_start_years: Vec<i32>,

    #[serde(default)]
    #[schemars(
        description = "Selected week numbers, interpreted according to the view mode."
    )]
    pub week_numbers: Vec<u32>,

    #[serde(default)]
    #[schemars(description = "Single-week or trend interpretation of the week selection.")]
    pub view_mode: ViewMode,
}

/// Filter selections with the categorical lists cleaned once up front, so a
/// batch evaluation does not re-normalize the same values per record.
struct PreparedFilter {
    organizations: Vec<String>,
    business_type_categories: Vec<String>,
    customer_categories: Vec<String>,
    insurance_types: Vec<String>,
    coverage_types: Vec<String>,
    renewal_statuses: Vec<String>,
    terminal_sources: Vec<String>,
    vehicle_insurance_grades: Vec<String>,
    risk_grades: Vec<String>,
    is_new_energy_vehicle: Option<bool>,
    is_transferred_vehicle: Option<bool>,
    policy_start_years: Vec<i32>,
    week_numbers: Vec<u32>,
    view_mode: ViewMode,
    /// The week a single-week view focuses on: the latest selected week.
    single_week: Option<u32>,
}

fn cleaned_list(values: &[String]) -> Vec<String> {
    values.iter().map(|v| clean_text(v)).collect()
}

impl PreparedFilter {
    fn new(spec: &FilterSpecification) -> Self {
        Self {
            organizations: cleaned_list(&spec.organizations),
            business_type_categories: cleaned_list(&spec.business_type_categories),
            customer_categories: cleaned_list(&spec.customer_categories),
            insurance_types: cleaned_list(&spec.insurance_types),
            coverage_types: cleaned_list(&spec.coverage_types),
            renewal_statuses: cleaned_list(&spec.renewal_statuses),
            terminal_sources: cleaned_list(&spec.terminal_sources),
            vehicle_insurance_grades: cleaned_list(&spec.vehicle_insurance_grades),
            risk_grades: cleaned_list(&spec.risk_grades),
            is_new_energy_vehicle: spec.is_new_energy_vehicle,
            is_transferred_vehicle: spec.is_transferred_vehicle,
            policy_start_years: spec.policy_start_years.clone(),
            week_numbers: spec.week_numbers.clone(),
            view_mode: spec.view_mode,
            single_week: spec.week_numbers.iter().max().copied(),
        }
    }

    fn matches(&self, record: &InsuranceRecord, exclude: &HashSet<FilterDimension>) -> bool {
        use FilterDimension as D;

        let active = |dimension: D| !exclude.contains(&dimension);

        if active(D::Organizations) && !passes_list(&self.organizations, &record.organization) {
            return false;
        }
        if active(D::BusinessTypeCategories)
            && !passes_list(&self.business_type_categories, &record.business_type_category)
        {
            return false;
        }
        if active(D::CustomerCategories)
            && !passes_list(&self.customer_categories, &record.customer_category_3)
        {
            return false;
        }
        if active(D::InsuranceTypes) && !passes_list(&self.insurance_types, &record.insurance_type)
        {
            return false;
        }
        if active(D::CoverageTypes) && !passes_list(&self.coverage_types, &record.coverage_type) {
            return false;
        }
        if active(D::RenewalStatuses)
            && !passes_list(&self.renewal_statuses, &record.renewal_status)
        {
            return false;
        }
        if active(D::TerminalSources)
            && !passes_list(&self.terminal_sources, &record.terminal_source)
        {
            return false;
        }
        if active(D::VehicleInsuranceGrades)
            && !passes_optional_grade(
                &self.vehicle_insurance_grades,
                record.vehicle_insurance_grade.as_deref(),
            )
        {
            return false;
        }
        if active(D::RiskGrades)
            && !passes_optional_grade(&self.risk_grades, record.risk_grade.as_deref())
        {
            return false;
        }
        if active(D::NewEnergyVehicle)
            && !passes_flag(self.is_new_energy_vehicle, record.is_new_energy_vehicle)
        {
            return false;
        }
        if active(D::TransferredVehicle)
            && !passes_flag(self.is_transferred_vehicle, record.is_transferred_vehicle)
        {
            return false;
        }
        if active(D::PolicyStartYears)
            && !self.policy_start_years.is_empty()
            && !self.policy_start_years.contains(&record.policy_start_year)
        {
            return false;
        }
        if active(D::WeekNumbers) && !self.passes_weeks(record) {
            return false;
        }

        true
    }

    fn passes_weeks(&self, record: &InsuranceRecord) -> bool {
        if self.week_numbers.is_empty() {
            return true;
        }
        match self.view_mode {
            ViewMode::SingleWeek => Some(record.week_number) == self.single_week,
            ViewMode::WeekTrend => self.week_numbers.contains(&record.week_number),
        }
    }
}

fn passes_list(allowed: &[String], value: &str) -> bool {
    allowed.is_empty() || allowed.iter().any(|v| v == value)
}

/// Grade predicates treat absence as "not applicable": a record without a
/// grade is never excluded by a grade filter, only records carrying a grade
/// outside the selection are.
fn passes_optional_grade(allowed: &[String], value: Option<&str>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    match value {
        None => true,
        Some(grade) => allowed.iter().any(|v| v == grade),
    }
}

fn passes_flag(expected: Option<bool>, actual: bool) -> bool {
    expected.map_or(true, |e| e == actual)
}

/// Applies every filter dimension not named in `exclude`. A record is kept
/// only when it passes all active predicates; empty predicates pass
/// everything.
pub fn filter_with_exclusions(
    records: &[InsuranceRecord],
    spec: &FilterSpecification,
    exclude: &HashSet<FilterDimension>,
) -> Vec<InsuranceRecord> {
    let prepared = PreparedFilter::new(spec);
    records
        .iter()
        .filter(|record| prepared.matches(record, exclude))
        .cloned()
        .collect()
}

/// Applies the full filter specification with no exclusions.
pub fn filter_records(
    records: &[InsuranceRecord],
    spec: &FilterSpecification,
) -> Vec<InsuranceRecord> {
    filter_with_exclusions(records, spec, &HashSet::new())
}

/// Distinct values available for one dimension, given the current
/// selections on every other dimension.
///
/// The dimension's own selection is excluded from the evaluation so a choice
/// cannot hide itself from its own option list, which is what makes
/// cascading filter dropdowns behave. Blank values are skipped; numeric
/// dimensions sort numerically, text dimensions lexicographically.
pub fn selectable_values(
    records: &[InsuranceRecord],
    spec: &FilterSpecification,
    dimension: FilterDimension,
) -> Vec<String> {
    let mut exclude = HashSet::new();
    exclude.insert(dimension);

    let prepared = PreparedFilter::new(spec);
    let visible = records
        .iter()
        .filter(|record| prepared.matches(record, &exclude));

    use FilterDimension as D;
    match dimension {
        D::Organizations => distinct_strings(visible.map(|r| r.organization.as_str())),
        D::BusinessTypeCategories => {
            distinct_strings(visible.map(|r| r.business_type_category.as_str()))
        }
        D::CustomerCategories => distinct_strings(visible.map(|r| r.customer_category_3.as_str())),
        D::InsuranceTypes => distinct_strings(visible.map(|r| r.insurance_type.as_str())),
        D::CoverageTypes => distinct_strings(visible.map(|r| r.coverage_type.as_str())),
        D::RenewalStatuses => distinct_strings(visible.map(|r| r.renewal_status.as_str())),
        D::TerminalSources => distinct_strings(visible.map(|r| r.terminal_source.as_str())),
        D::VehicleInsuranceGrades => {
            distinct_strings(visible.filter_map(|r| r.vehicle_insurance_grade.as_deref()))
        }
        D::RiskGrades => distinct_strings(visible.filter_map(|r| r.risk_grade.as_deref())),
        D::NewEnergyVehicle => distinct_bools(visible.map(|r| r.is_new_energy_vehicle)),
        D::TransferredVehicle => distinct_bools(visible.map(|r| r.is_transferred_vehicle)),
        D::PolicyStartYears => {
            let years: BTreeSet<i32> = visible.map(|r| r.policy_start_year).collect();
            years.into_iter().map(|y| y.to_string()).collect()
        }
        D::WeekNumbers => {
            let weeks: BTreeSet<u32> = visible.map(|r| r.week_number).collect();
            weeks.into_iter().map(|w| w.to_string()).collect()
        }
    }
}

fn distinct_strings<'a, I>(values: I) -> Vec<String>
where
    I: Iterator<Item = &'a str>,
{
    let set: BTreeSet<&str> = values.filter(|v| !v.is_empty()).collect();
    set.into_iter().map(str::to_string).collect()
}

fn distinct_bools<I>(values: I) -> Vec<String>
where
    I: Iterator<Item = bool>,
{
    let set: BTreeSet<bool> = values.collect();
    set.into_iter().map(|v| v.to_string()).collect()
}
