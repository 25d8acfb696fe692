mod engine;
mod format;
mod metrics;
mod strategy;
mod summary;
mod types;

pub use engine::{
    BALANCE_EPSILON, DAYS_PER_MONTH, MAX_MONTHS, project_debt, simulate_from_balance,
    simulate_payoff, simulate_with_extra_payment, simulate_with_history,
};
pub use format::{describe_months, format_time_saved, format_time_to_payoff};
pub use metrics::{
    EFFECTIVE_MINIMUM_MONTHS, amortized_payment_for_25_years, amortized_payment_for_months,
    closed_form_projection, effective_minimum, monthly_rate, months_to_payoff,
    normalize_minimums, payoff_date, total_effective_minimum, total_interest,
};
pub use strategy::{Strategy, calculate_payoff_strategy, order_debts};
pub use summary::{MinimumPolicy, PayoffSummary, summarize};
pub use types::{
    Debt, DebtStatus, InterestEncoding, Payment, PaymentKind, PayoffStrategyResult, Projection,
};
