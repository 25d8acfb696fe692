use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    #[default]
    Open,
    Closed,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    #[default]
    Minimum,
    Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default)]
    pub id: String,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    #[serde(default, rename = "type")]
    pub kind: PaymentKind,
}

impl Payment {
    pub fn new(amount: Decimal, date: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            amount,
            date,
            kind: PaymentKind::Minimum,
        }
    }
}

/// A debt as the caller owns it. Simulations never mutate it; they derive
/// their own working state from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub balance: Decimal,
    /// Annual rate in percent (`19.99` means 19.99% APR).
    pub interest_rate: Decimal,
    pub minimum_payment: Decimal,
    #[serde(default)]
    pub status: DebtStatus,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Debt {
    pub fn new(balance: Decimal, interest_rate: Decimal, minimum_payment: Decimal) -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            balance,
            interest_rate,
            minimum_payment,
            status: DebtStatus::Open,
            payments: Vec::new(),
            created_at: None,
        }
    }

    pub fn named(mut self, id: &str, name: &str) -> Self {
        self.id = id.to_string();
        self.name = name.to_string();
        self
    }

    pub fn with_status(mut self, status: DebtStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_payments(mut self, payments: Vec<Payment>) -> Self {
        self.payments = payments;
        self
    }

    pub fn with_minimum_payment(&self, minimum_payment: Decimal) -> Self {
        Self {
            minimum_payment,
            ..self.clone()
        }
    }

    /// Open with something left to pay. Everything else is already paid off
    /// and stays out of aggregates and simulations.
    pub fn is_outstanding(&self) -> bool {
        self.status == DebtStatus::Open && self.balance > Decimal::ZERO
    }

    /// Payment history in chronological order, regardless of insertion order.
    pub fn sorted_payments(&self) -> Vec<Payment> {
        let mut payments = self.payments.clone();
        payments.sort_by_key(|p| p.date);
        payments
    }
}

/// How a non-converging run reports its interest at the boundary.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InterestEncoding {
    /// Interest accrued up to the point the run stopped.
    Accrued,
    /// `Decimal::MAX`, read as "effectively infinite interest".
    Sentinel,
}

/// Outcome of a single amortization run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Projection {
    #[serde(rename_all = "camelCase")]
    PaidOff {
        months: u32,
        payoff_date: DateTime<Utc>,
        total_interest: Decimal,
    },
    /// Still owing after the 600-month horizon.
    #[serde(rename_all = "camelCase")]
    Horizon { months: u32, accrued_interest: Decimal },
    /// The payment stopped reducing principal by at least a cent.
    #[serde(rename_all = "camelCase")]
    Stalled { months: u32, accrued_interest: Decimal },
    /// The payment never exceeds the first month's interest.
    NeverAmortizes,
    Invalid,
}

impl Projection {
    pub fn payoff_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Projection::PaidOff { payoff_date, .. } => Some(*payoff_date),
            _ => None,
        }
    }

    pub fn months(&self) -> Option<u32> {
        match self {
            Projection::PaidOff { months, .. }
            | Projection::Horizon { months, .. }
            | Projection::Stalled { months, .. } => Some(*months),
            Projection::NeverAmortizes | Projection::Invalid => None,
        }
    }

    pub fn is_paid_off(&self) -> bool {
        matches!(self, Projection::PaidOff { .. })
    }

    pub fn total_interest(&self, encoding: InterestEncoding) -> Decimal {
        match (self, encoding) {
            (Projection::PaidOff { total_interest, .. }, _) => *total_interest,
            (
                Projection::Horizon {
                    accrued_interest, ..
                }
                | Projection::Stalled {
                    accrued_interest, ..
                },
                InterestEncoding::Accrued,
            ) => *accrued_interest,
            (Projection::Horizon { .. } | Projection::Stalled { .. }, InterestEncoding::Sentinel)
            | (Projection::NeverAmortizes, _) => Decimal::MAX,
            (Projection::Invalid, _) => Decimal::ZERO,
        }
    }

    /// The `(payoff date, total interest)` pair callers historically consume.
    pub fn to_pair(&self, encoding: InterestEncoding) -> (Option<DateTime<Utc>>, Decimal) {
        (self.payoff_date(), self.total_interest(encoding))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoffStrategyResult {
    /// Payoff date with the extra payment applied; `None` past the horizon.
    pub payoff_date: Option<DateTime<Utc>>,
    /// Minimum payments only.
    pub total_interest: Decimal,
    pub total_interest_with_extra: Decimal,
    /// Baseline payoff date minus extra-payment payoff date, in milliseconds.
    pub time_saved_ms: Option<i64>,
    pub payoff_order: Vec<Debt>,
}

impl PayoffStrategyResult {
    /// Nothing left to pay: paid off as of `now`.
    pub fn settled(now: DateTime<Utc>) -> Self {
        Self {
            payoff_date: Some(now),
            total_interest: Decimal::ZERO,
            total_interest_with_extra: Decimal::ZERO,
            time_saved_ms: None,
            payoff_order: Vec::new(),
        }
    }
}
