//! Dashboard statistics endpoint.
//!
//! The snapshot is recomputed on every request from the live tables; nothing
//! is materialized. The six read groups are independent, so they run
//! concurrently and the response merges their results.

use axum::extract::State;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::api::Json;
use crate::auth::AuthUser;
use crate::db::timestamp;
use crate::errors::AppError;
use crate::models::{bucket_by_month, Charts, DashboardStats, Overview};
use crate::AppState;

/// `GET /api/dashboard/stats`
pub async fn dashboard_stats(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<DashboardStats>, AppError> {
    let now = Utc::now();
    let week_start = timestamp(start_of_week(now));
    let month_start = timestamp(start_of_month(now));
    let year_start = timestamp(start_of_year(now));
    let evolution_start = timestamp(trailing_year_start(now));

    let repo = &state.repo;
    let (overview, type_distribution, payment_method_distribution, top_contributors, evolution_rows, recent_contributions) =
        tokio::try_join!(
            async {
                let (total_amount, total_count) =
                    repo.aggregate_contributions_since(None).await?;
                let (monthly_total, monthly_count) =
                    repo.aggregate_contributions_since(Some(&month_start)).await?;
                let (yearly_total, _) =
                    repo.aggregate_contributions_since(Some(&year_start)).await?;
                let (weekly_total, _) =
                    repo.aggregate_contributions_since(Some(&week_start)).await?;
                let total_members = repo.count_active_members().await?;
                let active_members =
                    repo.count_contributing_members_since(&month_start).await?;

                Ok::<_, AppError>(Overview {
                    total_members,
                    active_members,
                    monthly_total,
                    monthly_count,
                    yearly_total,
                    weekly_total,
                    total_amount,
                    total_count,
                })
            },
            repo.distribution_by_type_since(&month_start),
            repo.distribution_by_payment_method_since(&month_start),
            repo.top_contributors_since(&month_start, 5),
            repo.contributions_dated_since(&evolution_start),
            repo.recent_contributions(5),
        )?;

    Ok(Json(DashboardStats {
        overview,
        recent_contributions,
        top_contributors,
        charts: Charts {
            monthly_evolution: bucket_by_month(&evolution_rows),
            type_distribution,
            payment_method_distribution,
        },
    }))
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Midnight of the most recent Sunday (UTC).
fn start_of_week(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let back = today.weekday().num_days_from_sunday() as i64;
    day_start(today - chrono::Duration::days(back))
}

fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    day_start(today.with_day(1).expect("day 1 is always valid"))
}

fn start_of_year(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    day_start(NaiveDate::from_ymd_opt(today.year(), 1, 1).expect("jan 1 is always valid"))
}

/// First day of the current month, one year back. Anchors the trailing
/// 12-month evolution window.
fn trailing_year_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    day_start(
        NaiveDate::from_ymd_opt(today.year() - 1, today.month(), 1)
            .expect("day 1 is always valid"),
    )
}
