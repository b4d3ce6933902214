use crate::error::{AnalyticsError, Result};
use crate::schema::{InsuranceRecord, RawRecord};
use crate::utils::{
    date_or_empty, optional_text, parse_bool_or, parse_f64_or, parse_i64_or, parse_u32_or,
    text_or_empty,
};
use log::debug;

/// Valid reporting week range. The tracking window spans two calendar years,
/// hence 105 rather than 53.
pub const MIN_WEEK_NUMBER: i64 = 1;
pub const MAX_WEEK_NUMBER: i64 = 105;

/// Valid policy start year range.
pub const MIN_POLICY_YEAR: i64 = 2000;
pub const MAX_POLICY_YEAR: i64 = 2100;

/// A raw row that failed validation, together with its position in the
/// original batch so callers can point back at the offending source line.
#[derive(Debug)]
pub struct RejectedRecord {
    pub index: usize,
    pub error: AnalyticsError,
}

/// Result of normalizing a batch. Accepted records keep their relative input
/// order; rejected rows never abort the batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub success: Vec<InsuranceRecord>,
    pub failed: Vec<RejectedRecord>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.success.len() + self.failed.len()
    }

    pub fn is_fully_successful(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Validates and canonicalizes a single raw row.
///
/// The week number and policy start year are hard requirements: values
/// outside their ranges (including missing values, which parse to 0) reject
/// the row. Everything else degrades gracefully with defaults so that one
/// messy cell never discards an otherwise usable row.
pub fn normalize_record(raw: &RawRecord) -> Result<InsuranceRecord> {
    let week_number = parse_i64_or(raw.week_number.as_ref(), 0);
    if !(MIN_WEEK_NUMBER..=MAX_WEEK_NUMBER).contains(&week_number) {
        return Err(AnalyticsError::WeekOutOfRange(week_number));
    }

    let policy_start_year = parse_i64_or(raw.policy_start_year.as_ref(), 0);
    if !(MIN_POLICY_YEAR..=MAX_POLICY_YEAR).contains(&policy_start_year) {
        return Err(AnalyticsError::YearOutOfRange(policy_start_year));
    }

    // The third-level organization is the finer dimension; older exports only
    // carry the branch column.
    let organization = {
        let third_level = text_or_empty(raw.third_level_organization.as_ref());
        if third_level.is_empty() {
            text_or_empty(raw.chengdu_branch.as_ref())
        } else {
            third_level
        }
    };

    Ok(InsuranceRecord {
        snapshot_date: date_or_empty(raw.snapshot_date.as_ref()),
        policy_start_year: policy_start_year as i32,
        week_number: week_number as u32,
        organization,
        business_type_category: text_or_empty(raw.business_type_category.as_ref()),
        customer_category_3: text_or_empty(raw.customer_category_3.as_ref()),
        insurance_type: text_or_empty(raw.insurance_type.as_ref()),
        coverage_type: text_or_empty(raw.coverage_type.as_ref()),
        is_new_energy_vehicle: parse_bool_or(raw.is_new_energy_vehicle.as_ref(), false),
        is_transferred_vehicle: parse_bool_or(raw.is_transferred_vehicle.as_ref(), false),
        renewal_status: text_or_empty(raw.renewal_status.as_ref()),
        terminal_source: text_or_empty(raw.terminal_source.as_ref()),
        vehicle_insurance_grade: optional_text(raw.vehicle_insurance_grade.as_ref()),
        risk_grade: optional_text(raw.risk_grade.as_ref()),
        signed_premium_yuan: parse_f64_or(raw.signed_premium_yuan.as_ref(), 0.0).max(0.0),
        matured_premium_yuan: parse_f64_or(raw.matured_premium_yuan.as_ref(), 0.0).max(0.0),
        policy_count: parse_u32_or(raw.policy_count.as_ref(), 0),
        claim_case_count: parse_u32_or(raw.claim_case_count.as_ref(), 0),
        reported_claim_payment_yuan: parse_f64_or(raw.reported_claim_payment_yuan.as_ref(), 0.0)
            .max(0.0),
        expense_amount_yuan: parse_f64_or(raw.expense_amount_yuan.as_ref(), 0.0).max(0.0),
        commercial_premium_before_discount_yuan: parse_f64_or(
            raw.commercial_premium_before_discount_yuan.as_ref(),
            0.0,
        )
        .max(0.0),
        premium_plan_yuan: parse_f64_or(raw.premium_plan_yuan.as_ref(), 0.0).max(0.0),
        marginal_contribution_yuan: parse_f64_or(
            raw.marginal_contribution_amount_yuan.as_ref(),
            0.0,
        )
        .max(0.0),
    })
}

/// Parses a JSON array of raw rows, as delivered by the upstream export API.
/// Parse failures are structural (the payload is not an array of objects);
/// per-row validation happens in [`normalize_batch`].
pub fn raw_records_from_json(json: &str) -> Result<Vec<RawRecord>> {
    Ok(serde_json::from_str(json)?)
}

/// Normalizes a whole batch, partitioning rows into accepted records and
/// rejections. The batch never fails as a whole.
pub fn normalize_batch(raw_records: &[RawRecord]) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for (index, raw) in raw_records.iter().enumerate() {
        match normalize_record(raw) {
            Ok(record) => outcome.success.push(record),
            Err(error) => outcome.failed.push(RejectedRecord { index, error }),
        }
    }

    debug!(
        "Normalized batch of {} rows: {} accepted, {} rejected",
        raw_records.len(),
        outcome.success.len(),
        outcome.failed.len()
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_row(week: serde_json::Value, year: serde_json::Value) -> RawRecord {
        serde_json::from_value(json!({
            "week_number": week,
            "policy_start_year": year,
            "third_level_organization": " 城区\u{3000}一部 ",
            "business_type_category": "车队业务",
            "signed_premium_yuan": "1,000.50",
            "policy_count": "3",
            "is_new_energy_vehicle": "是"
        }))
        .unwrap()
    }

    #[test]
    fn test_normalize_record_happy_path() {
        let record = normalize_record(&raw_row(json!(12), json!(2024))).unwrap();

        assert_eq!(record.week_number, 12);
        assert_eq!(record.policy_start_year, 2024);
        assert_eq!(record.organization, "城区 一部");
        assert_eq!(record.business_type_category, "车队业务");
        assert_eq!(record.signed_premium_yuan, 1000.50);
        assert_eq!(record.policy_count, 3);
        assert!(record.is_new_energy_vehicle);
        assert!(!record.is_transferred_vehicle);
        assert_eq!(record.vehicle_insurance_grade, None);
        assert_eq!(record.matured_premium_yuan, 0.0);
    }

    #[test]
    fn test_week_number_bounds() {
        assert!(normalize_record(&raw_row(json!(1), json!(2024))).is_ok());
        assert!(normalize_record(&raw_row(json!(105), json!(2024))).is_ok());

        let err = normalize_record(&raw_row(json!(0), json!(2024))).unwrap_err();
        assert!(matches!(err, AnalyticsError::WeekOutOfRange(0)));

        let err = normalize_record(&raw_row(json!(106), json!(2024))).unwrap_err();
        assert!(matches!(err, AnalyticsError::WeekOutOfRange(106)));

        // A missing week parses to 0 and fails the range check.
        let err = normalize_record(&raw_row(json!(null), json!(2024))).unwrap_err();
        assert!(matches!(err, AnalyticsError::WeekOutOfRange(0)));
    }

    #[test]
    fn test_policy_year_bounds() {
        assert!(normalize_record(&raw_row(json!(1), json!(2000))).is_ok());
        assert!(normalize_record(&raw_row(json!(1), json!(2100))).is_ok());

        let err = normalize_record(&raw_row(json!(1), json!(1999))).unwrap_err();
        assert!(matches!(err, AnalyticsError::YearOutOfRange(1999)));

        let err = normalize_record(&raw_row(json!(1), json!(2101))).unwrap_err();
        assert!(matches!(err, AnalyticsError::YearOutOfRange(2101)));
    }

    #[test]
    fn test_organization_falls_back_to_branch() {
        let raw: RawRecord = serde_json::from_value(json!({
            "week_number": 5,
            "policy_start_year": 2024,
            "chengdu_branch": "成都分公司"
        }))
        .unwrap();
        let record = normalize_record(&raw).unwrap();
        assert_eq!(record.organization, "成都分公司");

        let raw: RawRecord = serde_json::from_value(json!({
            "week_number": 5,
            "policy_start_year": 2024,
            "chengdu_branch": "成都分公司",
            "third_level_organization": "城区一部"
        }))
        .unwrap();
        let record = normalize_record(&raw).unwrap();
        assert_eq!(record.organization, "城区一部");
    }

    #[test]
    fn test_measures_default_and_stay_non_negative() {
        let raw: RawRecord = serde_json::from_value(json!({
            "week_number": 5,
            "policy_start_year": 2024,
            "signed_premium_yuan": "garbage",
            "matured_premium_yuan": -50.0,
            "claim_case_count": -4
        }))
        .unwrap();

        let record = normalize_record(&raw).unwrap();
        assert_eq!(record.signed_premium_yuan, 0.0);
        assert_eq!(record.matured_premium_yuan, 0.0);
        assert_eq!(record.claim_case_count, 0);
    }

    #[test]
    fn test_grades_keep_absence() {
        let raw: RawRecord = serde_json::from_value(json!({
            "week_number": 5,
            "policy_start_year": 2024,
            "vehicle_insurance_grade": "  ",
            "risk_grade": "B"
        }))
        .unwrap();

        let record = normalize_record(&raw).unwrap();
        assert_eq!(record.vehicle_insurance_grade, None);
        assert_eq!(record.risk_grade, Some("B".to_string()));
    }

    #[test]
    fn test_normalize_batch_partitions_and_preserves_order() {
        let rows = vec![
            raw_row(json!(3), json!(2024)),
            raw_row(json!(999), json!(2024)),
            raw_row(json!(7), json!(2024)),
            raw_row(json!(4), json!(1800)),
        ];

        let outcome = normalize_batch(&rows);
        assert_eq!(outcome.total(), 4);
        assert!(!outcome.is_fully_successful());

        assert_eq!(outcome.success.len(), 2);
        assert_eq!(outcome.success[0].week_number, 3);
        assert_eq!(outcome.success[1].week_number, 7);

        assert_eq!(outcome.failed.len(), 2);
        assert_eq!(outcome.failed[0].index, 1);
        assert!(matches!(
            outcome.failed[0].error,
            AnalyticsError::WeekOutOfRange(999)
        ));
        assert_eq!(outcome.failed[1].index, 3);
        assert!(matches!(
            outcome.failed[1].error,
            AnalyticsError::YearOutOfRange(1800)
        ));
    }

    #[test]
    fn test_normalize_batch_empty() {
        let outcome = normalize_batch(&[]);
        assert_eq!(outcome.total(), 0);
        assert!(outcome.is_fully_successful());
    }

    #[test]
    fn test_raw_records_from_json() {
        let rows = raw_records_from_json(
            r#"[{"week_number": 3, "policy_start_year": 2024}, {"week_number": "4"}]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].week_number, Some(json!(3)));

        let err = raw_records_from_json("{not json").unwrap_err();
        assert!(matches!(err, AnalyticsError::SerializationError(_)));
    }
}
