//! Risk classifier: snapshot + calendar date → [`BudgetSummary`].
//!
//! Pure and deterministic. Never panics for any finite input; a
//! non-positive monthly budget means "unlimited".

use chrono::{Datelike, NaiveDate};

use ff_domain::budget::{BudgetSnapshot, BudgetStatus, BudgetSummary};

/// Number of days in the calendar month containing `date`.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = (date.year(), date.month());
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next_first)) => (next_first - first).num_days() as u32,
        // Only reachable at the edges of chrono's representable range.
        _ => 30,
    }
}

/// Classify a snapshot as of `today`.
///
/// `warning_threshold` is the utilization percent at which an otherwise
/// unremarkable month is reported as `on_track` instead of `under_budget`.
pub fn classify(snapshot: &BudgetSnapshot, today: NaiveDate, warning_threshold: f64) -> BudgetSummary {
    let spending = finite_or_zero(snapshot.spending_usd);
    let budget = finite_or_zero(snapshot.settings.monthly_budget_usd);

    let days_in_month = days_in_month(today);
    let days_elapsed = today.day().max(1);
    let days_remaining = days_in_month - days_elapsed + 1;

    if budget <= 0.0 {
        return BudgetSummary {
            project_id: snapshot.project_id.clone(),
            current_spending_usd: spending,
            monthly_budget_usd: budget,
            remaining_budget_usd: 0.0,
            budget_used_percent: 0.0,
            days_elapsed,
            days_in_month,
            days_remaining,
            projected_month_end: None,
            days_until_exhausted: None,
            status: BudgetStatus::UnderBudget,
        };
    }

    let budget_used_percent = spending / budget * 100.0;
    let remaining_budget_usd = budget - spending;
    let daily_burn = spending / f64::from(days_elapsed);
    // On the last day the projection is the spend itself, with no rounding.
    let projected_month_end = if days_elapsed >= days_in_month {
        spending
    } else {
        spending * f64::from(days_in_month) / f64::from(days_elapsed)
    };

    let status = if spending > budget {
        BudgetStatus::OverBudget
    } else if projected_month_end > budget {
        BudgetStatus::AtRisk
    } else if budget_used_percent >= warning_threshold {
        BudgetStatus::OnTrack
    } else {
        BudgetStatus::UnderBudget
    };

    let days_until_exhausted = match status {
        BudgetStatus::AtRisk | BudgetStatus::OverBudget if daily_burn > 0.0 => {
            Some((remaining_budget_usd / daily_burn).floor().max(0.0) as u32)
        }
        _ => None,
    };

    BudgetSummary {
        project_id: snapshot.project_id.clone(),
        current_spending_usd: spending,
        monthly_budget_usd: budget,
        remaining_budget_usd,
        budget_used_percent,
        days_elapsed,
        days_in_month,
        days_remaining,
        projected_month_end: Some(projected_month_end),
        days_until_exhausted,
        status,
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ff_domain::budget::BudgetSettings;

    fn snapshot(spending: f64, budget: f64) -> BudgetSnapshot {
        BudgetSnapshot {
            project_id: "p1".into(),
            spending_usd: spending,
            settings: BudgetSettings::defaults_for("p1".into(), budget),
            settings_defaulted: false,
            read_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 30-day month so the arithmetic matches the worked examples.
    fn day_of_september(d: u32) -> NaiveDate {
        date(2026, 9, d)
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(date(2026, 1, 15)), 31);
        assert_eq!(days_in_month(date(2026, 2, 1)), 28);
        assert_eq!(days_in_month(date(2028, 2, 29)), 29);
        assert_eq!(days_in_month(date(2026, 9, 30)), 30);
        assert_eq!(days_in_month(date(2026, 12, 31)), 31);
    }

    #[test]
    fn high_burn_mid_month_is_at_risk() {
        let s = classify(&snapshot(450.0, 500.0), day_of_september(20), 75.0);
        assert!((s.budget_used_percent - 90.0).abs() < 1e-9);
        assert!((s.projected_month_end.unwrap() - 675.0).abs() < 1e-9);
        assert_eq!(s.status, BudgetStatus::AtRisk);
        assert_eq!(s.days_remaining, 11);
        // 50 left at 22.5/day.
        assert_eq!(s.days_until_exhausted, Some(2));
    }

    #[test]
    fn overspend_is_over_budget_with_negative_remaining() {
        let s = classify(&snapshot(600.0, 500.0), day_of_september(10), 75.0);
        assert_eq!(s.status, BudgetStatus::OverBudget);
        assert!((s.remaining_budget_usd + 100.0).abs() < 1e-9);
        assert!(s.budget_used_percent > 100.0);
        assert_eq!(s.days_until_exhausted, Some(0));
    }

    #[test]
    fn zero_budget_is_unlimited() {
        for spending in [0.0, 1.0, 10_000.0] {
            let s = classify(&snapshot(spending, 0.0), day_of_september(5), 75.0);
            assert_eq!(s.status, BudgetStatus::UnderBudget);
            assert_eq!(s.budget_used_percent, 0.0);
            assert!(s.projected_month_end.is_none());
            assert!(s.days_until_exhausted.is_none());
        }
    }

    #[test]
    fn first_day_of_month_does_not_divide_by_zero() {
        let s = classify(&snapshot(10.0, 500.0), day_of_september(1), 75.0);
        assert_eq!(s.days_elapsed, 1);
        assert_eq!(s.days_remaining, 30);
        assert!((s.projected_month_end.unwrap() - 300.0).abs() < 1e-9);
        assert_eq!(s.status, BudgetStatus::UnderBudget);
    }

    #[test]
    fn late_month_high_utilization_is_on_track() {
        // 380/500 = 76% on day 30: projection 380 <= 500, utilization >= 75.
        let s = classify(&snapshot(380.0, 500.0), day_of_september(30), 75.0);
        assert_eq!(s.status, BudgetStatus::OnTrack);
        assert!(s.days_until_exhausted.is_none());
    }

    #[test]
    fn threshold_is_configurable() {
        let s = classify(&snapshot(300.0, 500.0), day_of_september(30), 50.0);
        assert_eq!(s.status, BudgetStatus::OnTrack);
        let s = classify(&snapshot(300.0, 500.0), day_of_september(30), 75.0);
        assert_eq!(s.status, BudgetStatus::UnderBudget);
    }

    #[test]
    fn spending_exactly_at_budget_is_not_over() {
        let s = classify(&snapshot(500.0, 500.0), day_of_september(30), 75.0);
        assert_eq!(s.status, BudgetStatus::OnTrack);
        assert_eq!(s.remaining_budget_usd, 0.0);
    }

    #[test]
    fn month_end_projection_equals_spend() {
        for (y, m, d) in [(2026, 2, 28), (2026, 10, 31), (2028, 2, 29), (2026, 4, 30)] {
            let today = NaiveDate::from_ymd_opt(y, m, d).unwrap();
            for spend in [0.1, 7.3, 333.33, 500.0, 1234.56] {
                let s = classify(&snapshot(spend, spend), today, 75.0);
                assert_eq!(s.projected_month_end, Some(spend), "{today} {spend}");
                assert_eq!(s.status, BudgetStatus::OnTrack, "{today} {spend}");
            }
        }
    }

    #[test]
    fn zero_spend_has_no_exhaustion_estimate() {
        let s = classify(&snapshot(0.0, 500.0), day_of_september(15), 75.0);
        assert_eq!(s.status, BudgetStatus::UnderBudget);
        assert!(s.days_until_exhausted.is_none());
        assert_eq!(s.budget_used_percent, 0.0);
    }

    #[test]
    fn non_finite_inputs_never_leak_nan() {
        let s = classify(&snapshot(f64::NAN, 500.0), day_of_september(15), 75.0);
        assert!(s.budget_used_percent.is_finite());
        let s = classify(&snapshot(10.0, f64::INFINITY), day_of_september(15), 75.0);
        assert!(s.budget_used_percent.is_finite());
        assert_eq!(s.status, BudgetStatus::UnderBudget);
    }

    #[test]
    fn classify_is_idempotent() {
        let snap = snapshot(321.0, 500.0);
        let today = day_of_september(17);
        assert_eq!(classify(&snap, today, 75.0), classify(&snap, today, 75.0));
    }

    #[test]
    fn over_budget_iff_spending_exceeds_budget() {
        let budgets = [0.0, 1.0, 50.0, 500.0];
        let spends = [0.0, 0.5, 1.0, 1.01, 49.99, 50.0, 50.01, 499.0, 500.0, 501.0, 10_000.0];
        for &budget in &budgets {
            for &spending in &spends {
                for day in [1, 15, 30] {
                    let s = classify(&snapshot(spending, budget), day_of_september(day), 75.0);
                    let expected = budget > 0.0 && spending > budget;
                    assert_eq!(
                        s.status == BudgetStatus::OverBudget,
                        expected,
                        "spending={spending} budget={budget} day={day}"
                    );
                }
            }
        }
    }

    #[test]
    fn percent_matches_formula_and_is_never_nan() {
        for &(spending, budget) in &[(0.0, 10.0), (5.0, 10.0), (25.0, 10.0), (3.0, 0.0)] {
            let s = classify(&snapshot(spending, budget), day_of_september(12), 75.0);
            let expected = if budget > 0.0 { spending / budget * 100.0 } else { 0.0 };
            assert!(s.budget_used_percent.is_finite());
            assert!((s.budget_used_percent - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn more_spend_never_lowers_percent_or_risk() {
        let budget = 500.0;
        for day in [1, 8, 15, 22, 30] {
            let mut prev: Option<BudgetSummary> = None;
            let mut spending = 0.0;
            while spending <= 800.0 {
                let s = classify(&snapshot(spending, budget), day_of_september(day), 75.0);
                if let Some(p) = &prev {
                    assert!(s.budget_used_percent >= p.budget_used_percent);
                    assert!(s.status.rank() >= p.status.rank(), "day={day} spending={spending}");
                }
                prev = Some(s);
                spending += 12.5;
            }
        }
    }
}
