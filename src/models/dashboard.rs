//! Dashboard statistics response types and the month-bucketing computation.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use super::{ContributionType, ContributionWithRelations, PaymentMethod};

/// Full dashboard snapshot, recomputed per request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub overview: Overview,
    pub recent_contributions: Vec<ContributionWithRelations>,
    pub top_contributors: Vec<TopContributor>,
    pub charts: Charts,
}

/// Aggregate totals over the week/month/year/all-time windows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_members: i64,
    /// Active members that contributed this month
    pub active_members: i64,
    pub monthly_total: f64,
    pub monthly_count: i64,
    pub yearly_total: f64,
    pub weekly_total: f64,
    pub total_amount: f64,
    pub total_count: i64,
}

/// One entry of the current month's top-contributor ranking.
#[derive(Debug, Serialize)]
pub struct TopContributor {
    pub id: String,
    pub name: String,
    pub total: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Charts {
    pub monthly_evolution: Vec<MonthBucket>,
    pub type_distribution: Vec<TypeBucket>,
    pub payment_method_distribution: Vec<PaymentMethodBucket>,
}

/// One populated month of the trailing 12-month evolution series.
#[derive(Debug, PartialEq, Serialize)]
pub struct MonthBucket {
    /// First instant of the month, RFC 3339
    pub month: String,
    pub total: f64,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeBucket {
    #[serde(rename = "type")]
    pub contribution_type: ContributionType,
    pub total: f64,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodBucket {
    pub payment_method: PaymentMethod,
    pub total: f64,
    pub count: i64,
}

/// Bucket contributions by the (year, month) of their own date.
///
/// Months with no contributions produce no bucket. The result is sorted by
/// month descending (most recent first).
pub fn bucket_by_month(rows: &[(DateTime<Utc>, f64)]) -> Vec<MonthBucket> {
    use std::collections::BTreeMap;

    let mut buckets: BTreeMap<(i32, u32), (f64, i64)> = BTreeMap::new();
    for (date, amount) in rows {
        let entry = buckets.entry((date.year(), date.month())).or_insert((0.0, 0));
        entry.0 += amount;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .rev()
        .map(|((year, month), (total, count))| MonthBucket {
            month: format!("{:04}-{:02}-01T00:00:00Z", year, month),
            total,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_bucket_by_month_sums_and_counts() {
        let rows = vec![
            (at(2025, 1, 5), 100.0),
            (at(2025, 1, 20), 50.0),
            (at(2025, 3, 1), 200.0),
        ];
        let buckets = bucket_by_month(&rows);

        assert_eq!(buckets.len(), 2);
        // Sorted descending: March before January
        assert_eq!(buckets[0].month, "2025-03-01T00:00:00Z");
        assert_eq!(buckets[0].total, 200.0);
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[1].month, "2025-01-01T00:00:00Z");
        assert_eq!(buckets[1].total, 150.0);
        assert_eq!(buckets[1].count, 2);
    }

    #[test]
    fn test_empty_months_are_absent_not_zero() {
        let rows = vec![(at(2024, 11, 3), 10.0), (at(2025, 2, 3), 20.0)];
        let buckets = bucket_by_month(&rows);

        // December and January produce no entries at all
        assert_eq!(buckets.len(), 2);
        assert!(buckets.iter().all(|b| b.count > 0));
    }

    #[test]
    fn test_year_boundary_ordering() {
        let rows = vec![(at(2024, 12, 31), 1.0), (at(2025, 1, 1), 2.0)];
        let buckets = bucket_by_month(&rows);

        assert_eq!(buckets[0].month, "2025-01-01T00:00:00Z");
        assert_eq!(buckets[1].month, "2024-12-01T00:00:00Z");
    }

    #[test]
    fn test_no_rows_no_buckets() {
        assert!(bucket_by_month(&[]).is_empty());
    }
}
