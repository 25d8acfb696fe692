use chrono::{DateTime, Datelike, Months, NaiveDate, TimeDelta, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use super::metrics::{closed_form_projection, monthly_rate};
use super::types::{Debt, Payment, Projection};

/// Simulation cap: 50 years.
pub const MAX_MONTHS: u32 = 600;
/// A balance at or below one cent counts as paid.
pub const BALANCE_EPSILON: Decimal = dec!(0.01);
pub const DAYS_PER_MONTH: f64 = 30.44;
pub(crate) const MS_PER_DAY: f64 = 86_400_000.0;

/// `now` plus `months` average-length months.
pub(crate) fn months_from(now: DateTime<Utc>, months: u32) -> Option<DateTime<Utc>> {
    let millis = (f64::from(months) * DAYS_PER_MONTH * MS_PER_DAY).round();
    if millis >= i64::MAX as f64 {
        return None;
    }
    now.checked_add_signed(TimeDelta::try_milliseconds(millis as i64)?)
}

#[derive(Debug, Clone, Copy)]
struct DebtState {
    balance: Decimal,
    interest_rate: Decimal,
    minimum_payment: Decimal,
}

impl DebtState {
    fn from_debt(debt: &Debt) -> Self {
        Self {
            balance: debt.balance,
            interest_rate: debt.interest_rate,
            minimum_payment: debt.minimum_payment,
        }
    }

    /// `None` once the balance outgrows `Decimal`.
    fn accrue(&mut self) -> Option<Decimal> {
        let interest = self.balance.checked_mul(self.interest_rate)? / dec!(100) / dec!(12);
        self.balance = self.balance.checked_add(interest)?;
        Some(interest)
    }

    fn pay(&mut self, amount: Decimal) {
        self.balance -= amount.min(self.balance);
    }
}

/// Runs every debt forward together: interest on each, then each minimum,
/// then `extra_payment` on the first debt (in slice order) that still owes.
/// Extra left over after that debt is cleared is not carried to the next one.
/// Closed and zero-balance debts are skipped.
pub fn simulate_payoff(debts: &[Debt], extra_payment: Decimal, now: DateTime<Utc>) -> Projection {
    let mut states: Vec<DebtState> = debts
        .iter()
        .filter(|debt| debt.is_outstanding())
        .map(DebtState::from_debt)
        .collect();
    let mut total_interest = Decimal::ZERO;
    let mut months = 0;

    while states.iter().any(|s| s.balance > BALANCE_EPSILON) && months < MAX_MONTHS {
        let accrued = states
            .iter_mut()
            .filter(|s| s.balance > Decimal::ZERO)
            .try_fold(total_interest, |sum, state| sum.checked_add(state.accrue()?));
        let Some(accrued) = accrued else {
            return overflowed(months);
        };
        total_interest = accrued;
        for state in states.iter_mut().filter(|s| s.balance > Decimal::ZERO) {
            let minimum = state.minimum_payment;
            state.pay(minimum);
        }
        if extra_payment > Decimal::ZERO {
            if let Some(target) = states.iter_mut().find(|s| s.balance > Decimal::ZERO) {
                target.pay(extra_payment);
            }
        }
        months += 1;
    }

    if states.iter().any(|s| s.balance > BALANCE_EPSILON) {
        debug!(
            debts = debts.len(),
            %extra_payment,
            "multi-debt simulation reached the horizon"
        );
        return Projection::Horizon {
            months,
            accrued_interest: total_interest,
        };
    }
    paid_off_after(months, total_interest, now)
}

/// Single debt replayed against its recorded payments, then continued with
/// the minimum payment once the history runs out.
///
/// Months are calendar months starting at the first payment's month; every
/// payment dated inside a month is applied after that month's interest. The
/// payoff date is midnight on the first day of the calendar month in which
/// the balance cleared. Without any history this is
/// [`closed_form_projection`]. Closed debts are `Invalid`.
pub fn simulate_with_history(debt: &Debt, now: DateTime<Utc>) -> Projection {
    if !debt.is_outstanding() || debt.interest_rate < Decimal::ZERO {
        return Projection::Invalid;
    }
    let payments = debt.sorted_payments();
    let Some(first) = payments.first() else {
        return closed_form_projection(
            debt.balance,
            debt.interest_rate,
            debt.minimum_payment,
            now,
        );
    };

    let rate = monthly_rate(debt.interest_rate);
    let mut run = FixedPaymentRun::new(debt.balance, rate, debt.minimum_payment);
    let first_day = first.date.date_naive().with_day(1);
    let Some(mut current) = first_day else {
        return Projection::Invalid;
    };
    let mut pending = payments.iter().peekable();

    while pending.peek().is_some() && run.balance > BALANCE_EPSILON && run.months < MAX_MONTHS {
        let Some(month_end) = next_month_start(current) else {
            return run.horizon();
        };
        if run.accrue().is_none() {
            return overflowed(run.months);
        }
        while let Some(payment) = pending.next_if(|p: &&Payment| p.date.date_naive() < month_end) {
            run.balance -= payment.amount;
            if run.balance <= BALANCE_EPSILON {
                break;
            }
        }
        run.months += 1;
        if run.balance <= BALANCE_EPSILON {
            return run.paid_off_on(current);
        }
        current = month_end;
    }

    while run.balance > BALANCE_EPSILON && run.months < MAX_MONTHS {
        match run.step() {
            MonthStep::Stalled => return run.stalled(),
            MonthStep::PaidOff => return run.paid_off_on(current),
            MonthStep::Continue => {}
        }
        current = match next_month_start(current) {
            Some(next) => next,
            None => return run.horizon(),
        };
    }

    if run.balance <= BALANCE_EPSILON {
        return run.paid_off_on(current);
    }
    run.horizon()
}

/// Single debt paying `minimum_payment` every month from today's balance.
/// Report with [`InterestEncoding::Sentinel`](super::types::InterestEncoding).
pub fn simulate_from_balance(
    balance: Decimal,
    annual_rate_percent: Decimal,
    minimum_payment: Decimal,
    now: DateTime<Utc>,
) -> Projection {
    simulate_with_extra_payment(balance, annual_rate_percent, minimum_payment, Decimal::ZERO, now)
}

pub fn simulate_with_extra_payment(
    balance: Decimal,
    annual_rate_percent: Decimal,
    minimum_payment: Decimal,
    extra_payment: Decimal,
    now: DateTime<Utc>,
) -> Projection {
    let payment = minimum_payment + extra_payment;
    if balance <= Decimal::ZERO || payment <= Decimal::ZERO {
        return Projection::Invalid;
    }

    let mut run = FixedPaymentRun::new(balance, monthly_rate(annual_rate_percent), payment);
    while run.balance > BALANCE_EPSILON && run.months < MAX_MONTHS {
        match run.step() {
            MonthStep::Stalled => return run.stalled(),
            MonthStep::PaidOff | MonthStep::Continue => {}
        }
    }

    if run.balance <= BALANCE_EPSILON {
        return paid_off_after(run.months, run.total_interest, now);
    }
    run.horizon()
}

/// Looks the debt up by id and replays its history; an unknown id is invalid.
pub fn project_debt(debts: &[Debt], id: &str, now: DateTime<Utc>) -> Projection {
    debts
        .iter()
        .find(|debt| debt.id == id)
        .map_or(Projection::Invalid, |debt| simulate_with_history(debt, now))
}

fn paid_off_after(months: u32, total_interest: Decimal, now: DateTime<Utc>) -> Projection {
    match months_from(now, months) {
        Some(payoff_date) => Projection::PaidOff {
            months,
            payoff_date,
            total_interest,
        },
        None => Projection::Horizon {
            months,
            accrued_interest: total_interest,
        },
    }
}

/// Balance growth exceeded `Decimal`'s range, which only a debt that never
/// amortizes can do.
fn overflowed(months: u32) -> Projection {
    debug!(months, "balance outgrew the representable range");
    Projection::Horizon {
        months: MAX_MONTHS,
        accrued_interest: Decimal::MAX,
    }
}

fn next_month_start(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?.checked_add_months(Months::new(1))
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum MonthStep {
    Continue,
    PaidOff,
    Stalled,
}

#[derive(Debug)]
struct FixedPaymentRun {
    balance: Decimal,
    monthly_rate: Decimal,
    payment: Decimal,
    total_interest: Decimal,
    months: u32,
}

impl FixedPaymentRun {
    fn new(balance: Decimal, monthly_rate: Decimal, payment: Decimal) -> Self {
        Self {
            balance,
            monthly_rate,
            payment,
            total_interest: Decimal::ZERO,
            months: 0,
        }
    }

    fn accrue(&mut self) -> Option<Decimal> {
        let interest = self.balance.checked_mul(self.monthly_rate)?;
        self.total_interest = self.total_interest.checked_add(interest)?;
        self.balance = self.balance.checked_add(interest)?;
        Some(interest)
    }

    fn step(&mut self) -> MonthStep {
        let Some(interest) = self.accrue() else {
            return MonthStep::Stalled;
        };
        let applied = self.payment.min(self.balance);
        if applied - interest < BALANCE_EPSILON {
            return MonthStep::Stalled;
        }
        self.balance -= applied;
        self.months += 1;
        if self.balance <= BALANCE_EPSILON {
            MonthStep::PaidOff
        } else {
            MonthStep::Continue
        }
    }

    fn paid_off_on(&self, date: NaiveDate) -> Projection {
        match date.and_hms_opt(0, 0, 0) {
            Some(midnight) => Projection::PaidOff {
                months: self.months,
                payoff_date: midnight.and_utc(),
                total_interest: self.total_interest,
            },
            None => self.horizon(),
        }
    }

    fn stalled(&self) -> Projection {
        debug!(
            months = self.months,
            payment = %self.payment,
            "payment no longer reduces principal"
        );
        Projection::Stalled {
            months: self.months,
            accrued_interest: self.total_interest,
        }
    }

    fn horizon(&self) -> Projection {
        debug!(months = self.months, "single-debt simulation reached the horizon");
        Projection::Horizon {
            months: self.months,
            accrued_interest: self.total_interest,
        }
    }
}
