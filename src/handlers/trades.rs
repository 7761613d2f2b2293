use crate::config::{self, Environment};
use crate::history::{self, DatePreset, TradeRecord};
use crate::oanda;
use crate::state::AppState;
use crate::stats::{self, ChartData, Statistics};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
pub struct TradesQuery {
    pub env: Environment,
    #[serde(default)]
    pub preset: DatePreset,
    /// Custom window start, `YYYY-MM-DD`.
    pub start: Option<NaiveDate>,
    /// Custom window end, `YYYY-MM-DD`.
    pub end: Option<NaiveDate>,
    /// Comma-separated instrument names; empty means all.
    pub instruments: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct Window {
    pub preset: DatePreset,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Everything the dashboard needs to render the trade section in one
/// response: the filtered table, statistics, chart series, and the filter
/// vocabulary.
#[derive(Serialize, Debug)]
pub struct TradesResponse {
    pub environment: Environment,
    pub account_id: String,
    /// False when the account has no closed trades at all.
    pub has_trades: bool,
    /// True when any filter narrows the full history.
    pub filtered: bool,
    pub window: Option<Window>,
    /// All instruments in the unfiltered history.
    pub instruments: Vec<String>,
    /// Filtered trades, most recent first.
    pub trades: Vec<TradeRecord>,
    pub stats: Statistics,
    pub charts: ChartData,
}

/// Load (or reuse) the full derived history for an environment. The cache
/// is keyed on the account's last transaction id, so it refreshes itself as
/// soon as the account sees new activity.
async fn load_history(
    state: &AppState,
    env: Environment,
) -> Result<(String, Vec<TradeRecord>), (StatusCode, Json<String>)> {
    // No credentials, no fetch.
    let creds = config::load(&state.config_dir, env)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(e)))?;

    let summary = oanda::fetch_account_summary(&creds)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, Json(e)))?;

    let last_id = summary.last_transaction_id.parse::<i64>().map_err(|_| {
        (
            StatusCode::BAD_GATEWAY,
            Json("Oanda returned a non-numeric last transaction id".to_string()),
        )
    })?;

    if let Some(trades) = state.cached_trades(env, last_id).await {
        tracing::debug!("history cache hit for {} at id {}", env, last_id);
        return Ok((summary.id, trades));
    }

    let raw = oanda::fetch_transactions(&creds, last_id)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, Json(e)))?;
    let trades = history::closed_trades(&raw);

    state.store_trades(env, last_id, trades.clone()).await;
    Ok((summary.id, trades))
}

fn parse_instruments(raw: &Option<String>) -> Vec<String> {
    raw.as_deref()
        .unwrap_or("")
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Resolve the query into a concrete window and the filtered trades.
fn apply_filters(
    q: &TradesQuery,
    trades: &[TradeRecord],
) -> (Window, Vec<String>, Vec<TradeRecord>, bool) {
    let today = Utc::now().date_naive();
    let earliest = trades
        .iter()
        .map(|t| t.time.date_naive())
        .min()
        .unwrap_or(today);

    let (mut start, mut end) = history::resolve_preset(q.preset, earliest, today);
    if q.preset == DatePreset::Custom {
        start = q.start.unwrap_or(start);
        end = q.end.unwrap_or(end);
    }

    let selected = parse_instruments(&q.instruments);
    let filtered_trades = history::filter_trades(trades, start, end, &selected);
    let filtered = start != earliest || end != today || !selected.is_empty();

    (
        Window {
            preset: q.preset,
            start,
            end,
        },
        selected,
        filtered_trades,
        filtered,
    )
}

/// Trades, statistics, and chart data for the selected window.
pub async fn get_trades(
    State(state): State<AppState>,
    Query(q): Query<TradesQuery>,
) -> Result<(StatusCode, Json<TradesResponse>), (StatusCode, Json<String>)> {
    let (account_id, all_trades) = load_history(&state, q.env).await?;

    if all_trades.is_empty() {
        // No closed trades with P/L is a normal state, not an error.
        return Ok((
            StatusCode::OK,
            Json(TradesResponse {
                environment: q.env,
                account_id,
                has_trades: false,
                filtered: false,
                window: None,
                instruments: Vec::new(),
                trades: Vec::new(),
                stats: Statistics::default(),
                charts: ChartData::default(),
            }),
        ));
    }

    let (window, _selected, filtered_trades, filtered) = apply_filters(&q, &all_trades);

    let response = TradesResponse {
        environment: q.env,
        account_id,
        has_trades: true,
        filtered,
        window: Some(window),
        instruments: history::instruments(&all_trades),
        stats: stats::compute(&filtered_trades),
        charts: stats::chart_data(&filtered_trades),
        trades: filtered_trades,
    };

    Ok((StatusCode::OK, Json(response)))
}

fn weekday_name(t: &TradeRecord) -> &'static str {
    use chrono::{Datelike, Weekday};
    match t.time.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn trades_to_csv(trades: &[TradeRecord]) -> Result<Vec<u8>, String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    wtr.write_record([
        "Date",
        "Day",
        "Instrument",
        "Buy/Sell",
        "Amount",
        "Profit/Loss",
        "Account Balance",
    ])
    .map_err(|e| format!("CSV error: {}", e))?;

    for t in trades {
        wtr.write_record([
            t.time.to_rfc3339(),
            weekday_name(t).to_string(),
            t.instrument.clone(),
            t.side.as_str().to_string(),
            format!("{}", t.units),
            format!("{:.2}", t.pl),
            t.account_balance
                .map(|b| format!("{:.2}", b))
                .unwrap_or_default(),
        ])
        .map_err(|e| format!("CSV error: {}", e))?;
    }

    wtr.into_inner().map_err(|e| format!("CSV error: {}", e))
}

/// Download the filtered trades as CSV.
pub async fn export_trades(
    State(state): State<AppState>,
    Query(q): Query<TradesQuery>,
) -> Result<Response, (StatusCode, Json<String>)> {
    let (_account_id, all_trades) = load_history(&state, q.env).await?;
    let (window, _selected, filtered_trades, _filtered) = apply_filters(&q, &all_trades);

    let body = trades_to_csv(&filtered_trades)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(e)))?;

    let filename = format!("fxboard_trades_{}_to_{}.csv", window.start, window.end);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

#[derive(Deserialize, Debug)]
pub struct RefreshQuery {
    pub env: Option<Environment>,
}

/// Drop the cached history so the next request re-fetches from Oanda.
pub async fn refresh(
    State(state): State<AppState>,
    Query(q): Query<RefreshQuery>,
) -> (StatusCode, Json<String>) {
    state.invalidate(q.env).await;
    tracing::info!(
        "history cache cleared for {}",
        q.env.map(|e| e.to_string()).unwrap_or_else(|| "all environments".to_string())
    );
    (StatusCode::OK, Json("refreshed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::TradeSide;
    use chrono::DateTime;

    fn trade(time: &str, instrument: &str, pl: f64) -> TradeRecord {
        TradeRecord {
            time: DateTime::parse_from_rfc3339(time).unwrap().with_timezone(&Utc),
            instrument: instrument.to_string(),
            side: TradeSide::Buy,
            units: 1000.0,
            pl,
            account_balance: Some(1000.0 + pl),
        }
    }

    #[test]
    fn instrument_list_parsing() {
        assert!(parse_instruments(&None).is_empty());
        assert!(parse_instruments(&Some("".to_string())).is_empty());
        assert_eq!(
            parse_instruments(&Some("EUR_USD, USD_JPY,,".to_string())),
            vec!["EUR_USD", "USD_JPY"]
        );
    }

    #[test]
    fn custom_preset_honors_explicit_dates() {
        let trades = vec![
            trade("2024-01-01T10:00:00Z", "EUR_USD", 10.0),
            trade("2024-02-01T10:00:00Z", "EUR_USD", 20.0),
            trade("2024-03-01T10:00:00Z", "EUR_USD", 30.0),
        ];
        let q = TradesQuery {
            env: Environment::Demo,
            preset: DatePreset::Custom,
            start: Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            end: Some(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()),
            instruments: None,
        };

        let (window, _, filtered, is_filtered) = apply_filters(&q, &trades);
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(filtered.len(), 1);
        assert!((filtered[0].pl - 20.0).abs() < 1e-9);
        assert!(is_filtered);
    }

    #[test]
    fn all_time_with_no_instruments_is_unfiltered() {
        let trades = vec![
            trade("2024-01-01T10:00:00Z", "EUR_USD", 10.0),
            trade("2024-02-01T10:00:00Z", "USD_JPY", 20.0),
        ];
        let q = TradesQuery {
            env: Environment::Demo,
            preset: DatePreset::AllTime,
            start: None,
            end: None,
            instruments: None,
        };

        let (window, _, filtered, is_filtered) = apply_filters(&q, &trades);
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(filtered.len(), 2);
        assert!(!is_filtered);
    }

    #[test]
    fn csv_has_a_header_and_one_row_per_trade() {
        let trades = vec![
            trade("2024-01-01T10:00:00Z", "EUR_USD", 12.5),
            trade("2024-01-02T10:00:00Z", "USD_JPY", -3.25),
        ];
        let bytes = trades_to_csv(&trades).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Date,Day,Instrument,Buy/Sell"));
        assert!(lines[1].contains("EUR_USD"));
        assert!(lines[1].contains("12.50"));
        assert!(lines[2].contains("-3.25"));
    }
}
