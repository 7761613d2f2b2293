use crate::config::Credentials;
use serde::Deserialize;
use url::Url;

/// The idrange endpoint caps each response at 1000 transactions, so history
/// is fetched in windows of this many ids.
pub const PAGE_SIZE: i64 = 1000;

// One client shared by every request for the lifetime of the process.
lazy_static::lazy_static! {
    static ref CLIENT: reqwest::Client = reqwest::Client::new();
}

/// Envelope around the account summary endpoint.
#[derive(Deserialize, Debug, Clone)]
pub struct SummaryResponse {
    pub account: AccountSummary,
}

/// Account summary as Oanda returns it. All numeric fields are encoded as
/// JSON strings by the v20 API and parsed downstream.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub balance: String,
    /// Unrealized profit/loss across open positions.
    pub pl: String,
    pub margin_available: String,
    // The API spells this one with a capital ID.
    #[serde(rename = "lastTransactionID")]
    pub last_transaction_id: String,
    #[serde(default)]
    pub currency: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
struct TransactionsPage {
    #[serde(default)]
    transactions: Vec<RawTransaction>,
}

/// A single transaction from the idrange endpoint. Only the fields the
/// dashboard consumes are kept; everything is optional because the log mixes
/// order fills with funding, fees, and administrative entries.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub time: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub instrument: Option<String>,
    /// Signed units; negative closes a long position.
    pub units: Option<String>,
    /// Realized profit/loss, present on fills that close a trade.
    pub pl: Option<String>,
    /// Account balance after the transaction, when the API records it.
    pub account_balance: Option<String>,
}

/// Fetch the account summary (balance, unrealized P/L, margin, last
/// transaction id) for the given credentials.
pub async fn fetch_account_summary(creds: &Credentials) -> Result<AccountSummary, String> {
    let url = format!(
        "{}/v3/accounts/{}/summary",
        creds.environment.api_base(),
        creds.account_id
    );

    tracing::debug!("GET {}", url);

    let response = CLIENT
        .get(&url)
        .bearer_auth(&creds.access_token)
        .send()
        .await
        .map_err(|e| format!("Could not reach Oanda: {}", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!(
            "Oanda rejected the account summary request: HTTP {} {}",
            status, body
        ));
    }

    let summary: SummaryResponse = response
        .json()
        .await
        .map_err(|e| format!("Could not parse the account summary: {}", e))?;

    Ok(summary.account)
}

/// Fetch every transaction from id 1 up to `last_transaction_id`, in
/// [`PAGE_SIZE`]-wide id windows. Stops early if the API returns an empty
/// window.
pub async fn fetch_transactions(
    creds: &Credentials,
    last_transaction_id: i64,
) -> Result<Vec<RawTransaction>, String> {
    let mut all = Vec::new();

    for (from, to) in chunk_ranges(last_transaction_id) {
        tracing::debug!("fetching transactions {}..={}", from, to);

        let mut url = Url::parse(creds.environment.api_base())
            .map_err(|e| format!("Bad API base URL: {}", e))?;
        url.set_path(&format!(
            "/v3/accounts/{}/transactions/idrange",
            creds.account_id
        ));
        url.query_pairs_mut()
            .append_pair("from", &from.to_string())
            .append_pair("to", &to.to_string());

        let response = CLIENT
            .get(url)
            .bearer_auth(&creds.access_token)
            .send()
            .await
            .map_err(|e| format!("Could not reach Oanda: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!(
                "Oanda rejected transactions {}..{}: HTTP {} {}",
                from, to, status, body
            ));
        }

        let page: TransactionsPage = response
            .json()
            .await
            .map_err(|e| format!("Could not parse transactions {}..{}: {}", from, to, e))?;

        if page.transactions.is_empty() {
            break;
        }
        all.extend(page.transactions);
    }

    tracing::info!("fetched {} transactions", all.len());
    Ok(all)
}

/// The inclusive (from, to) id windows covering `1..=last_id`.
pub fn chunk_ranges(last_id: i64) -> Vec<(i64, i64)> {
    let mut ranges = Vec::new();
    let mut from = 1;
    while from <= last_id {
        let to = (from + PAGE_SIZE - 1).min(last_id);
        ranges.push((from, to));
        from = to + 1;
    }
    ranges
}
