use crate::aggregate::{aggregate, latest_week_number, BaseAggregation};
use crate::kpi::{compute_increment_kpis, compute_kpis, KpiResult};
use crate::schema::{InsuranceRecord, KpiOptions};
use log::debug;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// KPI orchestrator with memoization.
///
/// The cache is plain instance state: construct one engine per execution
/// context and drop or [`clear_cache`](Self::clear_cache) it when the
/// underlying records change. Entries have no TTL and are never evicted,
/// which is acceptable for the narrow key domain a reporting session
/// produces.
///
/// Keys are cheap, collision-tolerant fingerprints rather than cryptographic
/// hashes. A collision returns a stale result instead of recomputing, a
/// trade accepted for lookup speed.
pub struct KpiEngine {
    cache: HashMap<String, KpiResult>,
    caching: bool,
    cache_hits: u64,
    cache_misses: u64,
}

impl Default for KpiEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl KpiEngine {
    pub fn new() -> Self {
        Self::with_caching(true)
    }

    pub fn with_caching(caching: bool) -> Self {
        Self {
            cache: HashMap::new(),
            caching,
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    /// Computes KPIs over one record set. An empty set short-circuits to the
    /// canonical empty result without touching the cache.
    pub fn calculate(&mut self, records: &[InsuranceRecord], options: &KpiOptions) -> KpiResult {
        if records.is_empty() {
            return KpiResult::empty();
        }

        let aggregation = aggregate(records);
        if !self.caching {
            return compute_kpis(&aggregation, options);
        }

        let key = current_cache_key(records.len(), &aggregation, options);
        if let Some(cached) = self.cache.get(&key) {
            self.cache_hits += 1;
            debug!("KPI cache hit: {}", key);
            return cached.clone();
        }

        self.cache_misses += 1;
        let result = compute_kpis(&aggregation, options);
        self.cache.insert(key, result.clone());
        result
    }

    /// Computes the week-over-week view from two cumulative record sets.
    /// An empty current set short-circuits to the canonical empty result.
    pub fn calculate_increment(
        &mut self,
        current_records: &[InsuranceRecord],
        previous_records: &[InsuranceRecord],
        options: &KpiOptions,
    ) -> KpiResult {
        if current_records.is_empty() {
            return KpiResult::empty();
        }

        let current = aggregate(current_records);
        let previous = aggregate(previous_records);
        if !self.caching {
            return compute_increment_kpis(&current, &previous, options);
        }

        let key = increment_cache_key(
            current_records,
            &current,
            previous_records,
            &previous,
            options,
        );
        if let Some(cached) = self.cache.get(&key) {
            self.cache_hits += 1;
            debug!("KPI cache hit: {}", key);
            return cached.clone();
        }

        self.cache_misses += 1;
        let result = compute_increment_kpis(&current, &previous, options);
        self.cache.insert(key, result.clone());
        result
    }

    /// Drops every memoized entry and resets the hit statistics. This is the
    /// only invalidation mechanism; call it whenever the record source is
    /// reloaded.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.cache_hits = 0;
        self.cache_misses = 0;
        debug!("KPI cache cleared");
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses
    }

    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

fn target_key_part(options: &KpiOptions) -> String {
    match options.premium_target_yuan {
        Some(target) => format!("{:.2}", target),
        None => "none".to_string(),
    }
}

fn current_cache_key(
    record_count: usize,
    aggregation: &BaseAggregation,
    options: &KpiOptions,
) -> String {
    format!(
        "{}:{}:{:.2}:{}",
        record_count,
        options.mode.as_str(),
        aggregation.signed_premium,
        target_key_part(options)
    )
}

/// Week and year identifying one cumulative period. Empty periods fall back
/// to the year supplied in the options.
fn period_identifier(records: &[InsuranceRecord], options: &KpiOptions) -> (u32, i32) {
    let week = latest_week_number(records).unwrap_or(0);
    let year = records
        .iter()
        .map(|r| r.policy_start_year)
        .max()
        .or(options.year)
        .unwrap_or(0);
    (week, year)
}

/// Content hash over the six aggregate fields the increment view depends on
/// most. Hashing the sums rather than the record count keeps two periods
/// with equal counts but different content apart.
fn aggregation_fingerprint(aggregation: &BaseAggregation) -> u64 {
    let mut hasher = DefaultHasher::new();
    aggregation.signed_premium.to_bits().hash(&mut hasher);
    aggregation.matured_premium.to_bits().hash(&mut hasher);
    aggregation.policy_count.hash(&mut hasher);
    aggregation.claim_case_count.hash(&mut hasher);
    aggregation
        .reported_claim_payment
        .to_bits()
        .hash(&mut hasher);
    aggregation.expense_amount.to_bits().hash(&mut hasher);
    hasher.finish()
}

fn increment_cache_key(
    current_records: &[InsuranceRecord],
    current: &BaseAggregation,
    previous_records: &[InsuranceRecord],
    previous: &BaseAggregation,
    options: &KpiOptions,
) -> String {
    let (current_week, current_year) = period_identifier(current_records, options);
    let (previous_week, previous_year) = period_identifier(previous_records, options);

    format!(
        "incr:{}:{}:{}:{}:{:016x}:{:016x}:{}",
        current_week,
        current_year,
        previous_week,
        previous_year,
        aggregation_fingerprint(current),
        aggregation_fingerprint(previous),
        target_key_part(options)
    )
}
