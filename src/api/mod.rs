use axum::{
    Router,
    extract::{Json, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    Debt, InterestEncoding, MinimumPolicy, PayoffSummary, Projection, Strategy,
    amortized_payment_for_25_years, closed_form_projection, effective_minimum,
    format_time_to_payoff, months_to_payoff, simulate_from_balance, simulate_with_extra_payment,
    simulate_with_history, summarize, total_effective_minimum,
};
use crate::error::{PayoffError, Result};

/// Largest balance, payment or extra amount accepted from callers.
const MAX_AMOUNT: Decimal = dec!(1000000000000);
const MIN_RATE: Decimal = dec!(-100);
const MAX_RATE: Decimal = dec!(1000);

#[derive(Parser, Debug)]
#[command(
    name = "payoff",
    version,
    about = "Debt payoff simulator (avalanche / snowball strategies)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the JSON HTTP API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Print the payoff summary for a JSON file of debts
    Plan(PlanArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[arg(long, help = "Path to a JSON array of debts")]
    pub debts: PathBuf,
    #[arg(
        long,
        default_value = "0",
        help = "Extra monthly payment on top of the minimums"
    )]
    pub extra: Decimal,
    #[arg(long, default_value = "avalanche", help = "avalanche or snowball")]
    pub strategy: String,
    #[arg(long, help = "Simulation start as RFC 3339; defaults to the current time")]
    pub now: Option<String>,
    #[arg(
        long,
        help = "Simulate declared minimums instead of raising them to the 25-year payment"
    )]
    pub raw_minimums: bool,
}

/// Unvalidated plan settings: CLI flags or a JSON payload overlaid on the
/// defaults.
#[derive(Debug, Clone)]
struct PlanDraft {
    debts: Vec<Debt>,
    extra_payment: Decimal,
    strategy: String,
    now: Option<String>,
    minimum_policy: MinimumPolicy,
}

#[derive(Debug, Clone)]
pub struct PlanInputs {
    pub debts: Vec<Debt>,
    pub extra_payment: Decimal,
    pub strategy: Strategy,
    pub minimum_policy: MinimumPolicy,
    pub now: DateTime<Utc>,
}

impl PlanInputs {
    pub fn summarize(&self) -> PayoffSummary {
        summarize(
            &self.debts,
            self.extra_payment,
            self.strategy,
            self.minimum_policy,
            self.now,
        )
    }
}

fn default_plan_draft() -> PlanDraft {
    PlanDraft {
        debts: Vec::new(),
        extra_payment: Decimal::ZERO,
        strategy: Strategy::default().to_string(),
        now: None,
        minimum_policy: MinimumPolicy::Effective,
    }
}

fn build_plan(draft: PlanDraft, clock_now: DateTime<Utc>) -> Result<PlanInputs> {
    for (index, debt) in draft.debts.iter().enumerate() {
        validate_debt(debt, &format!("debts[{index}]"))?;
    }
    validate_amount("extraPayment", draft.extra_payment)?;
    let strategy = draft.strategy.parse::<Strategy>()?;
    let now = resolve_now(draft.now.as_deref(), clock_now)?;

    Ok(PlanInputs {
        debts: draft.debts,
        extra_payment: draft.extra_payment,
        strategy,
        minimum_policy: draft.minimum_policy,
        now,
    })
}

fn validate_debt(debt: &Debt, field: &str) -> Result<()> {
    validate_amount(&format!("{field}.balance"), debt.balance)?;
    validate_amount(&format!("{field}.minimumPayment"), debt.minimum_payment)?;
    if debt.interest_rate < MIN_RATE || debt.interest_rate > MAX_RATE {
        return Err(PayoffError::invalid(
            &format!("{field}.interestRate"),
            format!("must be between {MIN_RATE} and {MAX_RATE}"),
        ));
    }
    for (index, payment) in debt.payments.iter().enumerate() {
        validate_amount(&format!("{field}.payments[{index}].amount"), payment.amount)?;
    }
    Ok(())
}

fn validate_amount(field: &str, amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(PayoffError::invalid(field, "must be >= 0"));
    }
    if amount > MAX_AMOUNT {
        return Err(PayoffError::invalid(field, format!("must be <= {MAX_AMOUNT}")));
    }
    Ok(())
}

fn resolve_now(raw: Option<&str>, clock_now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match raw {
        None => Ok(clock_now),
        Some(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|_| PayoffError::InvalidTimestamp(raw.to_string())),
    }
}

/// Reads the debts file, validates the flags and renders the summary as
/// pretty JSON.
pub fn run_plan(args: PlanArgs, clock_now: DateTime<Utc>) -> Result<String> {
    let raw = fs::read_to_string(&args.debts)?;
    let debts: Vec<Debt> = serde_json::from_str(&raw)?;

    let draft = PlanDraft {
        debts,
        extra_payment: args.extra,
        strategy: args.strategy,
        now: args.now,
        minimum_policy: if args.raw_minimums {
            MinimumPolicy::Declared
        } else {
            MinimumPolicy::Effective
        },
    };
    let plan = build_plan(draft, clock_now)?;
    let summary = plan.summarize();
    info!(
        strategy = %plan.strategy,
        debts = plan.debts.len(),
        time_to_payoff = %summary.time_to_payoff,
        "computed payoff plan"
    );
    Ok(serde_json::to_string_pretty(&summary)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StrategyPayload {
    debts: Option<Vec<Debt>>,
    extra_payment: Option<Decimal>,
    strategy: Option<String>,
    normalize_minimums: Option<bool>,
    now: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    debt: Option<Debt>,
    extra_payment: Option<Decimal>,
    now: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MinimumsPayload {
    debts: Option<Vec<Debt>>,
}

/// One single-debt simulation, with the pair its encoding produces.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionView {
    projection: Projection,
    payoff_date: Option<DateTime<Utc>>,
    total_interest: Decimal,
}

impl ProjectionView {
    fn new(projection: Projection, encoding: InterestEncoding) -> Self {
        let (payoff_date, total_interest) = projection.to_pair(encoding);
        Self {
            projection,
            payoff_date,
            total_interest,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionResponse {
    months_to_payoff: Option<u32>,
    closed_form: ProjectionView,
    time_to_payoff: String,
    history: ProjectionView,
    from_balance: ProjectionView,
    with_extra: Option<ProjectionView>,
    effective_minimum: Decimal,
    payment_for_25_years: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebtMinimum {
    id: String,
    name: String,
    minimum_payment: Decimal,
    payment_for_25_years: Decimal,
    effective_minimum: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MinimumsResponse {
    debts: Vec<DebtMinimum>,
    total_effective_minimum: Decimal,
}

#[derive(Debug, Serialize)]
struct StrategiesResponse {
    strategies: Vec<&'static str>,
    default: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn plan_from_payload(payload: StrategyPayload, clock_now: DateTime<Utc>) -> Result<PlanInputs> {
    let mut draft = default_plan_draft();

    if let Some(v) = payload.debts {
        draft.debts = v;
    }
    if let Some(v) = payload.extra_payment {
        draft.extra_payment = v;
    }
    if let Some(v) = payload.strategy {
        draft.strategy = v;
    }
    if payload.normalize_minimums == Some(false) {
        draft.minimum_policy = MinimumPolicy::Declared;
    }
    if let Some(v) = payload.now {
        draft.now = Some(v);
    }

    build_plan(draft, clock_now)
}

fn projection_from_payload(
    payload: ProjectionPayload,
    clock_now: DateTime<Utc>,
) -> Result<ProjectionResponse> {
    let debt = payload
        .debt
        .ok_or_else(|| PayoffError::invalid("debt", "is required"))?;
    validate_debt(&debt, "debt")?;
    if let Some(extra) = payload.extra_payment {
        validate_amount("extraPayment", extra)?;
    }
    let now = resolve_now(payload.now.as_deref(), clock_now)?;

    let closed_form =
        closed_form_projection(debt.balance, debt.interest_rate, debt.minimum_payment, now);
    let from_balance =
        simulate_from_balance(debt.balance, debt.interest_rate, debt.minimum_payment, now);
    let with_extra = payload.extra_payment.map(|extra| {
        let projection = simulate_with_extra_payment(
            debt.balance,
            debt.interest_rate,
            debt.minimum_payment,
            extra,
            now,
        );
        ProjectionView::new(projection, InterestEncoding::Sentinel)
    });

    Ok(ProjectionResponse {
        months_to_payoff: months_to_payoff(debt.balance, debt.interest_rate, debt.minimum_payment),
        time_to_payoff: format_time_to_payoff(closed_form.payoff_date(), now),
        closed_form: ProjectionView::new(closed_form, InterestEncoding::Accrued),
        history: ProjectionView::new(simulate_with_history(&debt, now), InterestEncoding::Accrued),
        from_balance: ProjectionView::new(from_balance, InterestEncoding::Sentinel),
        with_extra,
        effective_minimum: effective_minimum(&debt),
        payment_for_25_years: amortized_payment_for_25_years(debt.balance, debt.interest_rate),
    })
}

fn minimums_from_payload(payload: MinimumsPayload) -> Result<MinimumsResponse> {
    let debts = payload.debts.unwrap_or_default();
    for (index, debt) in debts.iter().enumerate() {
        validate_debt(debt, &format!("debts[{index}]"))?;
    }

    Ok(MinimumsResponse {
        total_effective_minimum: total_effective_minimum(&debts),
        debts: debts
            .iter()
            .filter(|debt| debt.is_outstanding())
            .map(|debt| DebtMinimum {
                id: debt.id.clone(),
                name: debt.name.clone(),
                minimum_payment: debt.minimum_payment,
                payment_for_25_years: amortized_payment_for_25_years(
                    debt.balance,
                    debt.interest_rate,
                ),
                effective_minimum: effective_minimum(debt),
            })
            .collect(),
    })
}

fn strategies_response() -> StrategiesResponse {
    StrategiesResponse {
        strategies: Strategy::ALL.iter().map(|s| s.as_str()).collect(),
        default: Strategy::default().as_str(),
    }
}

fn router() -> Router {
    Router::new()
        .route("/api/strategy", post(strategy_handler))
        .route("/api/projection", post(projection_handler))
        .route("/api/minimums", post(minimums_handler))
        .route("/api/strategies", get(strategies_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "payoff HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/api/strategies");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn strategies_handler() -> Response {
    json_response(StatusCode::OK, strategies_response())
}

async fn strategy_handler(
    payload: std::result::Result<Json<StrategyPayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => return rejected(rejection),
    };
    match plan_from_payload(payload, Utc::now()) {
        Ok(plan) => json_response(StatusCode::OK, plan.summarize()),
        Err(err) => bad_request("strategy", err),
    }
}

async fn projection_handler(
    payload: std::result::Result<Json<ProjectionPayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => return rejected(rejection),
    };
    match projection_from_payload(payload, Utc::now()) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => bad_request("projection", err),
    }
}

async fn minimums_handler(
    payload: std::result::Result<Json<MinimumsPayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => return rejected(rejection),
    };
    match minimums_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => bad_request("minimums", err),
    }
}

fn rejected(rejection: JsonRejection) -> Response {
    warn!(error = %rejection.body_text(), "rejected request body");
    error_response(
        StatusCode::BAD_REQUEST,
        &format!("Invalid API JSON payload: {}", rejection.body_text()),
    )
}

fn bad_request(endpoint: &str, err: PayoffError) -> Response {
    warn!(endpoint, error = %err, "rejected request");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn plan_from_json(json: &str, clock_now: DateTime<Utc>) -> Result<PlanInputs> {
    let payload = serde_json::from_str::<StrategyPayload>(json)?;
    plan_from_payload(payload, clock_now)
}
