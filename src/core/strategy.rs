use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::engine::simulate_payoff;
use super::types::{Debt, InterestEncoding, PayoffStrategyResult};
use crate::error::PayoffError;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Highest interest rate first.
    #[default]
    Avalanche,
    /// Smallest balance first.
    Snowball,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Avalanche, Strategy::Snowball];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Avalanche => "avalanche",
            Strategy::Snowball => "snowball",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = PayoffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| PayoffError::UnknownStrategy(s.to_string()))
    }
}

/// Outstanding debts in the order the strategy pays them down. The sort is
/// stable, so ties keep their input order.
pub fn order_debts(debts: &[Debt], strategy: Strategy) -> Vec<Debt> {
    let mut ordered: Vec<Debt> = debts.iter().filter(|d| d.is_outstanding()).cloned().collect();
    match strategy {
        Strategy::Avalanche => ordered.sort_by(|a, b| b.interest_rate.cmp(&a.interest_rate)),
        Strategy::Snowball => ordered.sort_by(|a, b| a.balance.cmp(&b.balance)),
    }
    ordered
}

/// Compares minimum-only payoff against paying `extra_payment` on top, aimed
/// at the strategy's priority debt.
///
/// Callers normalize minimums first (see
/// [`normalize_minimums`](super::metrics::normalize_minimums)); this function
/// uses each debt's declared minimum as given.
pub fn calculate_payoff_strategy(
    debts: &[Debt],
    extra_payment: Decimal,
    strategy: Strategy,
    now: DateTime<Utc>,
) -> PayoffStrategyResult {
    let open: Vec<Debt> = debts.iter().filter(|d| d.is_outstanding()).cloned().collect();
    if open.is_empty() {
        return PayoffStrategyResult::settled(now);
    }

    let ordered = order_debts(&open, strategy);
    let baseline = simulate_payoff(&open, Decimal::ZERO, now);
    let with_extra = simulate_payoff(&ordered, extra_payment, now);
    debug!(
        %strategy,
        debts = open.len(),
        baseline_months = ?baseline.months(),
        months = ?with_extra.months(),
        "simulated payoff strategy"
    );

    let time_saved_ms = match (baseline.payoff_date(), with_extra.payoff_date()) {
        (Some(base), Some(extra)) => Some((base - extra).num_milliseconds()),
        _ => None,
    };

    PayoffStrategyResult {
        payoff_date: with_extra.payoff_date(),
        total_interest: baseline.total_interest(InterestEncoding::Accrued),
        total_interest_with_extra: with_extra.total_interest(InterestEncoding::Accrued),
        time_saved_ms,
        payoff_order: ordered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::months_from;
    use crate::core::types::DebtStatus;
    use chrono::TimeZone;
    use proptest::collection::vec;
    use proptest::prelude::{prop_assert, proptest};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn strategy_tokens_parse_case_insensitively() {
        assert_eq!("avalanche".parse::<Strategy>().unwrap(), Strategy::Avalanche);
        assert_eq!(" Snowball ".parse::<Strategy>().unwrap(), Strategy::Snowball);
        assert_eq!(Strategy::Snowball.to_string(), "snowball");
    }

    #[test]
    fn unknown_strategy_token_is_rejected() {
        let err = "highest-balance".parse::<Strategy>().expect_err("must reject");
        assert!(matches!(err, PayoffError::UnknownStrategy(ref token) if token == "highest-balance"));
        assert!(err.to_string().contains("avalanche"));
    }

    #[test]
    fn no_open_debts_is_settled_now() {
        let result = calculate_payoff_strategy(&[], Decimal::ZERO, Strategy::Avalanche, now());
        assert_eq!(result.payoff_date, Some(now()));
        assert_eq!(result.total_interest, Decimal::ZERO);
        assert_eq!(result.total_interest_with_extra, Decimal::ZERO);
        assert_eq!(result.time_saved_ms, None);
        assert!(result.payoff_order.is_empty());

        let closed = vec![
            Debt::new(dec!(0), dec!(0), dec!(0)).with_status(DebtStatus::Closed),
            Debt::new(dec!(0), dec!(0), dec!(0)).with_status(DebtStatus::Closed),
        ];
        let result = calculate_payoff_strategy(&closed, Decimal::ZERO, Strategy::Snowball, now());
        assert_eq!(result, PayoffStrategyResult::settled(now()));
    }

    #[test]
    fn avalanche_orders_by_interest_rate() {
        let debts = vec![
            Debt::new(dec!(1000), dec!(10), dec!(50)),
            Debt::new(dec!(1000), dec!(20), dec!(50)),
        ];
        let result = calculate_payoff_strategy(&debts, Decimal::ZERO, Strategy::Avalanche, now());
        assert_eq!(result.payoff_order[0].interest_rate, dec!(20));
        assert_eq!(result.payoff_order[1].interest_rate, dec!(10));
    }

    #[test]
    fn snowball_orders_by_balance() {
        let debts = vec![
            Debt::new(dec!(1000), dec!(20), dec!(50)),
            Debt::new(dec!(500), dec!(10), dec!(50)),
        ];
        let result = calculate_payoff_strategy(&debts, Decimal::ZERO, Strategy::Snowball, now());
        assert_eq!(result.payoff_order[0].balance, dec!(500));
        assert_eq!(result.payoff_order[1].balance, dec!(1000));
    }

    #[test]
    fn ordering_skips_paid_off_debts_and_keeps_ties_stable() {
        let debts = vec![
            Debt::new(dec!(300), dec!(12), dec!(10)).named("a", "A"),
            Debt::new(dec!(900), dec!(12), dec!(10)).named("b", "B"),
            Debt::new(dec!(100), dec!(30), dec!(10))
                .named("c", "C")
                .with_status(DebtStatus::Closed),
            Debt::new(dec!(0), dec!(25), dec!(10)).named("d", "D"),
        ];
        let ids: Vec<String> = order_debts(&debts, Strategy::Avalanche)
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn extra_payment_reduces_total_interest_and_time() {
        let debts = vec![Debt::new(dec!(1000), dec!(10), dec!(50))];
        let no_extra = calculate_payoff_strategy(&debts, Decimal::ZERO, Strategy::Avalanche, now());
        let with_extra = calculate_payoff_strategy(&debts, dec!(100), Strategy::Avalanche, now());

        assert!(with_extra.total_interest_with_extra < no_extra.total_interest);
        assert!(with_extra.payoff_date < no_extra.payoff_date);
        assert_eq!(with_extra.payoff_date, months_from(now(), 7));
        assert_eq!(no_extra.time_saved_ms, Some(0));

        let fifteen_months = (15.0_f64 * 30.44 * 86_400_000.0).round() as i64;
        let saved = with_extra.time_saved_ms.expect("both scenarios converge");
        assert!((saved - fifteen_months).abs() <= 1, "got {saved}");
    }

    #[test]
    fn time_saved_is_absent_when_baseline_never_pays_off() {
        let debts = vec![Debt::new(dec!(1000), dec!(10), dec!(8.35))];
        let result = calculate_payoff_strategy(&debts, dec!(100), Strategy::Snowball, now());

        assert!(result.payoff_date.is_some());
        assert_eq!(result.time_saved_ms, None);
        assert!(result.total_interest > result.total_interest_with_extra);
    }

    #[test]
    fn caller_debts_are_not_mutated() {
        let debts = vec![
            Debt::new(dec!(1000), dec!(10), dec!(50)),
            Debt::new(dec!(400), dec!(22), dec!(25)),
        ];
        let before = debts.clone();
        let result = calculate_payoff_strategy(&debts, dec!(75), Strategy::Avalanche, now());

        assert_eq!(debts, before);
        assert_eq!(result.payoff_order[0], before[1]);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_orderings_are_monotone(
            specs in vec((1i64..5_000_000, 0i64..3_500, 0i64..50_000), 0..8)
        ) {
            let debts: Vec<Debt> = specs
                .iter()
                .map(|&(balance, rate, minimum)| {
                    Debt::new(Decimal::new(balance, 2), Decimal::new(rate, 2), Decimal::new(minimum, 2))
                })
                .collect();

            let avalanche = order_debts(&debts, Strategy::Avalanche);
            prop_assert!(avalanche.windows(2).all(|w| w[0].interest_rate >= w[1].interest_rate));

            let snowball = order_debts(&debts, Strategy::Snowball);
            prop_assert!(snowball.windows(2).all(|w| w[0].balance <= w[1].balance));
            prop_assert!(snowball.len() == debts.len());
        }

        #[test]
        fn prop_more_extra_never_costs_more(
            specs in vec((10_000i64..2_000_000, 0i64..3_000, 1_000i64..60_000), 1..4),
            low_extra in 0i64..40_000,
            bump in 0i64..40_000,
            snowball in proptest::bool::ANY
        ) {
            let debts: Vec<Debt> = specs
                .iter()
                .map(|&(balance, rate, minimum)| {
                    Debt::new(Decimal::new(balance, 2), Decimal::new(rate, 2), Decimal::new(minimum, 2))
                })
                .collect();
            let strategy = if snowball { Strategy::Snowball } else { Strategy::Avalanche };
            let low = Decimal::new(low_extra, 2);
            let high = low + Decimal::new(bump, 2);

            let slow = calculate_payoff_strategy(&debts, low, strategy, now());
            let fast = calculate_payoff_strategy(&debts, high, strategy, now());
            prop_assert!(fast.total_interest_with_extra <= slow.total_interest_with_extra);
            if let Some(slow_date) = slow.payoff_date {
                prop_assert!(fast.payoff_date.is_some_and(|fast_date| fast_date <= slow_date));
            }
        }
    }
}
