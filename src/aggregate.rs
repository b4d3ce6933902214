use crate::schema::InsuranceRecord;
use serde::Serialize;

/// Sums of every measure a KPI formula draws on. Counts are kept signed so
/// that a period-over-period difference can go negative without wrapping.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BaseAggregation {
    pub signed_premium: f64,
    pub matured_premium: f64,
    pub policy_count: i64,
    pub claim_case_count: i64,
    pub reported_claim_payment: f64,
    pub expense_amount: f64,
    pub commercial_premium_before_discount: f64,
    pub premium_plan: f64,
    pub marginal_contribution: f64,
}

impl BaseAggregation {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn add_record(&mut self, record: &InsuranceRecord) {
        self.signed_premium += record.signed_premium_yuan;
        self.matured_premium += record.matured_premium_yuan;
        self.policy_count += record.policy_count as i64;
        self.claim_case_count += record.claim_case_count as i64;
        self.reported_claim_payment += record.reported_claim_payment_yuan;
        self.expense_amount += record.expense_amount_yuan;
        self.commercial_premium_before_discount += record.commercial_premium_before_discount_yuan;
        self.premium_plan += record.premium_plan_yuan;
        self.marginal_contribution += record.marginal_contribution_yuan;
    }

    /// Field-wise difference, used to turn two cumulative periods into a
    /// single-period increment.
    pub fn minus(&self, other: &Self) -> Self {
        Self {
            signed_premium: self.signed_premium - other.signed_premium,
            matured_premium: self.matured_premium - other.matured_premium,
            policy_count: self.policy_count - other.policy_count,
            claim_case_count: self.claim_case_count - other.claim_case_count,
            reported_claim_payment: self.reported_claim_payment - other.reported_claim_payment,
            expense_amount: self.expense_amount - other.expense_amount,
            commercial_premium_before_discount: self.commercial_premium_before_discount
                - other.commercial_premium_before_discount,
            premium_plan: self.premium_plan - other.premium_plan,
            marginal_contribution: self.marginal_contribution - other.marginal_contribution,
        }
    }
}

/// Folds records into a single [`BaseAggregation`]. An empty input yields the
/// zero aggregation.
pub fn aggregate<'a, I>(records: I) -> BaseAggregation
where
    I: IntoIterator<Item = &'a InsuranceRecord>,
{
    let mut total = BaseAggregation::zero();
    for record in records {
        total.add_record(record);
    }
    total
}

/// The highest week number present, or `None` for an empty slice.
pub fn latest_week_number(records: &[InsuranceRecord]) -> Option<u32> {
    records.iter().map(|r| r.week_number).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(week: u32, signed: f64, matured: f64, policies: u32, claims: u32) -> InsuranceRecord {
        InsuranceRecord {
            snapshot_date: String::new(),
            policy_start_year: 2024,
            week_number: week,
            organization: "城区一部".to_string(),
            business_type_category: String::new(),
            customer_category_3: String::new(),
            insurance_type: String::new(),
            coverage_type: String::new(),
            is_new_energy_vehicle: false,
            is_transferred_vehicle: false,
            renewal_status: String::new(),
            terminal_source: String::new(),
            vehicle_insurance_grade: None,
            risk_grade: None,
            signed_premium_yuan: signed,
            matured_premium_yuan: matured,
            policy_count: policies,
            claim_case_count: claims,
            reported_claim_payment_yuan: 100.0,
            expense_amount_yuan: 50.0,
            commercial_premium_before_discount_yuan: signed * 1.2,
            premium_plan_yuan: 10_000.0,
            marginal_contribution_yuan: 200.0,
        }
    }

    #[test]
    fn test_aggregate_sums_every_field() {
        let records = vec![
            record(1, 1000.0, 800.0, 2, 1),
            record(2, 500.0, 400.0, 1, 0),
        ];

        let total = aggregate(&records);
        assert_eq!(total.signed_premium, 1500.0);
        assert_eq!(total.matured_premium, 1200.0);
        assert_eq!(total.policy_count, 3);
        assert_eq!(total.claim_case_count, 1);
        assert_eq!(total.reported_claim_payment, 200.0);
        assert_eq!(total.expense_amount, 100.0);
        assert!((total.commercial_premium_before_discount - 1800.0).abs() < 1e-10);
        assert_eq!(total.premium_plan, 20_000.0);
        assert_eq!(total.marginal_contribution, 400.0);
    }

    #[test]
    fn test_aggregate_empty_is_zero() {
        let total = aggregate(&[]);
        assert_eq!(total, BaseAggregation::zero());
    }

    #[test]
    fn test_minus_can_go_negative() {
        let current = aggregate(&[record(2, 500.0, 400.0, 1, 0)]);
        let previous = aggregate(&[record(1, 1000.0, 800.0, 2, 1)]);

        let increment = current.minus(&previous);
        assert_eq!(increment.signed_premium, -500.0);
        assert_eq!(increment.policy_count, -1);
        assert_eq!(increment.claim_case_count, -1);
    }

    #[test]
    fn test_latest_week_number() {
        let records = vec![
            record(3, 0.0, 0.0, 0, 0),
            record(17, 0.0, 0.0, 0, 0),
            record(9, 0.0, 0.0, 0, 0),
        ];
        assert_eq!(latest_week_number(&records), Some(17));
        assert_eq!(latest_week_number(&[]), None);
    }
}
