use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::format::{format_time_saved, format_time_to_payoff};
use super::metrics::{normalize_minimums, total_effective_minimum};
use super::strategy::{Strategy, calculate_payoff_strategy};
use super::types::PayoffStrategyResult;
use super::types::Debt;

/// Which minimum payment each debt contributes to a simulation.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MinimumPolicy {
    /// Declared minimum raised to the 25-year amortizing payment.
    #[default]
    Effective,
    /// Declared minimum as entered.
    Declared,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoffSummary {
    pub strategy: Strategy,
    pub minimum_policy: MinimumPolicy,
    pub extra_payment: Decimal,
    /// Sum of effective minimums across outstanding debts.
    pub baseline_payment: Decimal,
    pub baseline: PayoffStrategyResult,
    pub with_extra: PayoffStrategyResult,
    pub time_to_payoff: String,
    pub baseline_time_to_payoff: String,
    pub time_saved: String,
    pub interest_saved: Decimal,
}

pub fn summarize(
    debts: &[Debt],
    extra_payment: Decimal,
    strategy: Strategy,
    minimum_policy: MinimumPolicy,
    now: DateTime<Utc>,
) -> PayoffSummary {
    let simulated = match minimum_policy {
        MinimumPolicy::Effective => normalize_minimums(debts),
        MinimumPolicy::Declared => debts.to_vec(),
    };

    let baseline = calculate_payoff_strategy(&simulated, Decimal::ZERO, strategy, now);
    let with_extra = calculate_payoff_strategy(&simulated, extra_payment, strategy, now);

    PayoffSummary {
        strategy,
        minimum_policy,
        extra_payment,
        baseline_payment: total_effective_minimum(debts),
        time_to_payoff: format_time_to_payoff(with_extra.payoff_date, now),
        baseline_time_to_payoff: format_time_to_payoff(baseline.payoff_date, now),
        time_saved: format_time_saved(with_extra.time_saved_ms),
        interest_saved: with_extra.total_interest - with_extra.total_interest_with_extra,
        baseline,
        with_extra,
    }
}
