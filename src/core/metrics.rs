use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal_macros::dec;

use super::engine::{BALANCE_EPSILON, MAX_MONTHS, months_from};
use super::types::{Debt, Projection};

/// Horizon the effective minimum is sized against.
pub const EFFECTIVE_MINIMUM_MONTHS: i32 = 300;

pub fn monthly_rate(annual_rate_percent: Decimal) -> Decimal {
    annual_rate_percent / dec!(100) / dec!(12)
}

/// Months needed to clear `balance` with a fixed `minimum_payment`, from the
/// closed-form annuity solution. `None` when the payment never amortizes the
/// debt or the inputs are not positive.
pub fn months_to_payoff(
    balance: Decimal,
    annual_rate_percent: Decimal,
    minimum_payment: Decimal,
) -> Option<u32> {
    if balance <= Decimal::ZERO || minimum_payment <= Decimal::ZERO {
        return None;
    }
    let rate = monthly_rate(annual_rate_percent);
    if minimum_payment <= balance * rate {
        return None;
    }
    if rate.is_zero() {
        return balance.checked_div(minimum_payment)?.ceil().to_u32();
    }

    let ratio = (balance * rate).to_f64()? / minimum_payment.to_f64()?;
    let rate = rate.to_f64()?;
    let months = (-(1.0 - ratio).ln() / (1.0 + rate).ln()).ceil();
    if !months.is_finite() || months < 0.0 || months > f64::from(u32::MAX) {
        return None;
    }
    Some(months as u32)
}

pub fn payoff_date(
    balance: Decimal,
    annual_rate_percent: Decimal,
    minimum_payment: Decimal,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    months_to_payoff(balance, annual_rate_percent, minimum_payment)
        .and_then(|months| months_from(now, months))
}

/// Lifetime interest paying only `minimum_payment`. `Decimal::MAX` when the
/// payment can never cover the monthly interest, zero for non-positive inputs.
pub fn total_interest(
    balance: Decimal,
    annual_rate_percent: Decimal,
    minimum_payment: Decimal,
) -> Decimal {
    if balance <= Decimal::ZERO || minimum_payment <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let rate = monthly_rate(annual_rate_percent);
    if minimum_payment <= balance * rate {
        return Decimal::MAX;
    }

    let mut remaining = balance;
    let mut interest_paid = Decimal::ZERO;
    let mut months = 0;
    while remaining > BALANCE_EPSILON && months < MAX_MONTHS {
        let interest = remaining * rate;
        interest_paid += interest;
        remaining -= (minimum_payment - interest).min(remaining);
        months += 1;
    }
    interest_paid
}

/// Closed-form date and iterative interest as one tagged outcome.
///
/// The interest loop stops at [`MAX_MONTHS`], so a closed-form month count
/// beyond the horizon still reports `PaidOff` with only the first 600 months
/// of interest.
pub fn closed_form_projection(
    balance: Decimal,
    annual_rate_percent: Decimal,
    minimum_payment: Decimal,
    now: DateTime<Utc>,
) -> Projection {
    if balance <= Decimal::ZERO || minimum_payment <= Decimal::ZERO {
        return Projection::Invalid;
    }
    if minimum_payment <= balance * monthly_rate(annual_rate_percent) {
        return Projection::NeverAmortizes;
    }

    let interest = total_interest(balance, annual_rate_percent, minimum_payment);
    let dated = months_to_payoff(balance, annual_rate_percent, minimum_payment)
        .and_then(|months| months_from(now, months).map(|date| (months, date)));
    match dated {
        Some((months, payoff_date)) => Projection::PaidOff {
            months,
            payoff_date,
            total_interest: interest,
        },
        None => Projection::Horizon {
            months: MAX_MONTHS,
            accrued_interest: interest,
        },
    }
}

/// Level payment that clears `balance` in `months`, rounded up to the cent.
pub fn amortized_payment_for_months(
    balance: Decimal,
    annual_rate_percent: Decimal,
    months: i32,
) -> Decimal {
    if balance <= Decimal::ZERO || months <= 0 {
        return Decimal::ZERO;
    }
    let term = Decimal::from(months);
    let rate = monthly_rate(annual_rate_percent);
    if rate.is_zero() {
        return balance / term;
    }

    let discount = rate
        .to_f64()
        .map(|r| (1.0 + r).powi(-months))
        .and_then(Decimal::from_f64)
        .unwrap_or(Decimal::ONE);
    let denominator = Decimal::ONE - discount;
    if denominator.is_zero() {
        return balance / term;
    }

    let payment = rate * balance / denominator;
    (payment * dec!(100)).ceil() / dec!(100)
}

pub fn amortized_payment_for_25_years(balance: Decimal, annual_rate_percent: Decimal) -> Decimal {
    amortized_payment_for_months(balance, annual_rate_percent, EFFECTIVE_MINIMUM_MONTHS)
}

/// The larger of the declared minimum and the 25-year amortizing payment.
pub fn effective_minimum(debt: &Debt) -> Decimal {
    debt.minimum_payment
        .max(amortized_payment_for_25_years(debt.balance, debt.interest_rate))
}

pub fn total_effective_minimum(debts: &[Debt]) -> Decimal {
    debts
        .iter()
        .filter(|debt| debt.is_outstanding())
        .map(effective_minimum)
        .sum()
}

/// Copies of `debts` whose minimum payment is the effective minimum.
pub fn normalize_minimums(debts: &[Debt]) -> Vec<Debt> {
    debts
        .iter()
        .map(|debt| debt.with_minimum_payment(effective_minimum(debt)))
        .collect()
}
