use insurance_analytics_engine::*;
use serde_json::json;

fn raw_row(
    week: u32,
    organization: &str,
    signed: f64,
    matured: f64,
    claims_paid: f64,
    policies: u32,
    plan: f64,
) -> RawRecord {
    serde_json::from_value(json!({
        "snapshot_date": "2024/03/24",
        "week_number": week,
        "policy_start_year": 2024,
        "third_level_organization": organization,
        "business_type_category": "车队业务",
        "insurance_type": "商业险",
        "is_new_energy_vehicle": "否",
        "signed_premium_yuan": signed,
        "matured_premium_yuan": matured,
        "reported_claim_payment_yuan": claims_paid,
        "expense_amount_yuan": signed * 0.15,
        "commercial_premium_before_discount_yuan": signed * 1.25,
        "premium_plan_yuan": plan,
        "policy_count": policies,
        "claim_case_count": policies / 4,
        "marginal_contribution_amount_yuan": matured * 0.12,
    }))
    .unwrap()
}

fn fmt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}

fn main() {
    println!("📊 Weekly Dashboard Demo\n");
    println!("Two cumulative weekly snapshots for two organizations, plus one");
    println!("corrupt row. The engine computes the year-to-date view for the");
    println!("latest week, then the week-over-week increment view.\n");

    let raw = vec![
        raw_row(11, "城区一部", 180_000.0, 120_000.0, 54_000.0, 60, 1_200_000.0),
        raw_row(11, "城区二部", 95_000.0, 60_000.0, 21_000.0, 40, 800_000.0),
        raw_row(12, "城区一部", 200_000.0, 135_000.0, 60_000.0, 66, 1_200_000.0),
        raw_row(12, "城区二部", 104_000.0, 66_000.0, 24_000.0, 44, 800_000.0),
        raw_row(0, "城区一部", 100.0, 100.0, 0.0, 1, 0.0),
    ];

    let outcome = normalize_batch(&raw);
    println!("📋 Normalization:");
    println!("  Accepted: {}", outcome.success.len());
    for rejected in &outcome.failed {
        println!("  Rejected row {}: {}", rejected.index, rejected.error);
    }

    let latest = FilterSpecification {
        week_numbers: vec![11, 12],
        view_mode: ViewMode::SingleWeek,
        ..Default::default()
    };
    let current_records = filter_records(&outcome.success, &latest);

    let previous = FilterSpecification {
        week_numbers: vec![11],
        view_mode: ViewMode::SingleWeek,
        ..Default::default()
    };
    let previous_records = filter_records(&outcome.success, &previous);

    let mut engine = KpiEngine::new();
    let options = KpiOptions {
        current_week_number: Some(12),
        ..Default::default()
    };

    let current = engine.calculate(&current_records, &options);
    println!("\n✅ Year-to-date view (week 12, {} rows):", current_records.len());
    println!("  Loss ratio:            {}%", fmt(current.ratios.loss_ratio));
    println!("  Expense ratio:         {}%", fmt(current.ratios.expense_ratio));
    println!("  Maturity ratio:        {}%", fmt(current.ratios.maturity_ratio));
    println!("  Autonomy coefficient:  {}", fmt(current.ratios.autonomy_coefficient));
    println!("  Premium progress:      {}%", fmt(current.ratios.premium_progress));
    println!(
        "  Time progress:         {}%",
        fmt(current.ratios.time_progress_achievement)
    );
    println!("  Signed premium:        {} wan", current.absolutes.signed_premium_wan);
    println!("  Policies:              {}", current.absolutes.policy_count);

    let increment = engine.calculate_increment(&current_records, &previous_records, &options);
    println!("\n✅ Week-over-week view (week 12 vs week 11):");
    println!(
        "  Loss ratio (cumulative): {}%",
        fmt(increment.ratios.loss_ratio)
    );
    println!(
        "  Signed premium delta:    {} wan",
        increment.absolutes.signed_premium_wan
    );
    println!("  Policy delta:            {}", increment.absolutes.policy_count);
    println!(
        "  Time progress:           {}%",
        fmt(increment.ratios.time_progress_achievement)
    );

    // A repeated query is served from the cache.
    engine.calculate(&current_records, &options);
    println!(
        "\n📊 Cache: {} entries, {} hits, {} misses",
        engine.cache_len(),
        engine.cache_hits(),
        engine.cache_misses()
    );
}
