use crate::config::{self, Environment};
use crate::oanda;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
pub struct EnvQuery {
    pub env: Environment,
}

/// Account summary shown in the dashboard header.
#[derive(Serialize, Debug, Clone)]
pub struct SummaryView {
    pub environment: Environment,
    pub account_id: String,
    pub currency: String,
    pub balance: f64,
    /// Unrealized P/L across open positions.
    pub unrealized_pl: f64,
    pub margin_available: f64,
    pub last_transaction_id: i64,
}

pub(super) fn parse_money(value: &str, field: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .map_err(|_| format!("Oanda returned a non-numeric {}: {:?}", field, value))
}

/// Fetch the live account summary for an environment.
#[axum::debug_handler]
pub async fn get_account(
    State(state): State<AppState>,
    Query(q): Query<EnvQuery>,
) -> Result<(StatusCode, Json<SummaryView>), (StatusCode, Json<String>)> {
    // No credentials, no fetch.
    let creds = config::load(&state.config_dir, q.env)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(e)))?;

    let summary = oanda::fetch_account_summary(&creds)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, Json(e)))?;

    let view = SummaryView {
        environment: q.env,
        account_id: summary.id.clone(),
        currency: summary.currency.clone(),
        balance: parse_money(&summary.balance, "balance")
            .map_err(|e| (StatusCode::BAD_GATEWAY, Json(e)))?,
        unrealized_pl: parse_money(&summary.pl, "unrealized P/L")
            .map_err(|e| (StatusCode::BAD_GATEWAY, Json(e)))?,
        margin_available: parse_money(&summary.margin_available, "margin available")
            .map_err(|e| (StatusCode::BAD_GATEWAY, Json(e)))?,
        last_transaction_id: summary
            .last_transaction_id
            .parse::<i64>()
            .map_err(|_| {
                (
                    StatusCode::BAD_GATEWAY,
                    Json("Oanda returned a non-numeric last transaction id".to_string()),
                )
            })?,
    };

    Ok((StatusCode::OK, Json(view)))
}
