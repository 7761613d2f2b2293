use crate::oanda::RawTransaction;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Direction of the original trade that a closing fill realized.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "Buy",
            TradeSide::Sell => "Sell",
        }
    }
}

/// A closed trade derived from the account's transaction log. Never
/// persisted; recomputed from the raw transactions on each fetch.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TradeRecord {
    /// Closing time of the trade (UTC, as Oanda reports it).
    pub time: DateTime<Utc>,
    pub instrument: String,
    pub side: TradeSide,
    /// Closed size, absolute value.
    pub units: f64,
    /// Realized profit/loss.
    pub pl: f64,
    /// Account balance after the close, when the log records it.
    pub account_balance: Option<f64>,
}

/// Project the raw transaction log onto closed trades.
///
/// A transaction counts as a closed trade when it carries a non-zero `pl`.
/// Oanda closes a long position with negative units, so a negative closing
/// size means the original trade was a buy. The result is sorted most
/// recent first.
pub fn closed_trades(raw: &[RawTransaction]) -> Vec<TradeRecord> {
    let mut trades: Vec<TradeRecord> = raw
        .iter()
        .filter_map(|t| {
            let pl = t.pl.as_deref()?.parse::<f64>().ok()?;
            if pl == 0.0 {
                return None;
            }

            let time = DateTime::parse_from_rfc3339(&t.time)
                .ok()?
                .with_timezone(&Utc);

            let units = t
                .units
                .as_deref()
                .and_then(|u| u.parse::<f64>().ok())
                .unwrap_or(0.0);
            let side = if units < 0.0 {
                TradeSide::Buy
            } else {
                TradeSide::Sell
            };

            Some(TradeRecord {
                time,
                instrument: t.instrument.clone().unwrap_or_default(),
                side,
                units: units.abs(),
                pl,
                account_balance: t
                    .account_balance
                    .as_deref()
                    .and_then(|b| b.parse::<f64>().ok()),
            })
        })
        .collect();

    trades.sort_by(|a, b| b.time.cmp(&a.time));
    trades
}

/// Sorted unique instrument names across the whole history, for the filter
/// dropdown.
pub fn instruments(trades: &[TradeRecord]) -> Vec<String> {
    let mut names: Vec<String> = trades.iter().map(|t| t.instrument.clone()).collect();
    names.sort();
    names.dedup();
    names
}

/// Date-range presets offered by the dashboard.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DatePreset {
    #[default]
    AllTime,
    YearToDate,
    ThisMonth,
    LastMonth,
    Last7Days,
    Custom,
}

/// Resolve a preset to an inclusive (start, end) date window.
///
/// `earliest` is the date of the oldest trade in the history and bounds the
/// all-time window; `Custom` also resolves to the full window and is
/// narrowed by explicit start/end parameters at the call site.
pub fn resolve_preset(preset: DatePreset, earliest: NaiveDate, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    match preset {
        DatePreset::AllTime | DatePreset::Custom => (earliest, today),
        DatePreset::YearToDate => (
            NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(earliest),
            today,
        ),
        DatePreset::ThisMonth => (today.with_day(1).unwrap_or(today), today),
        DatePreset::LastMonth => {
            let first_of_current = today.with_day(1).unwrap_or(today);
            let last_of_previous = first_of_current.pred_opt().unwrap_or(first_of_current);
            (
                last_of_previous.with_day(1).unwrap_or(last_of_previous),
                last_of_previous,
            )
        }
        DatePreset::Last7Days => (today - Duration::days(6), today),
    }
}

/// Filter trades to an inclusive date window and an optional instrument
/// subset. An empty instrument list means "all instruments".
pub fn filter_trades(
    trades: &[TradeRecord],
    start: NaiveDate,
    end: NaiveDate,
    selected: &[String],
) -> Vec<TradeRecord> {
    // Inclusive on both ends: [start 00:00, end + 1 day) in UTC.
    let from = start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let to = (end + Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc();

    trades
        .iter()
        .filter(|t| t.time >= from && t.time < to)
        .filter(|t| selected.is_empty() || selected.iter().any(|s| s == &t.instrument))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oanda::RawTransaction;

    fn fill(id: &str, time: &str, instrument: &str, units: &str, pl: &str) -> RawTransaction {
        RawTransaction {
            id: id.to_string(),
            time: time.to_string(),
            kind: "ORDER_FILL".to_string(),
            instrument: Some(instrument.to_string()),
            units: Some(units.to_string()),
            pl: Some(pl.to_string()),
            account_balance: Some("1000.00".to_string()),
        }
    }

    #[test]
    fn only_nonzero_pl_transactions_become_trades() {
        let raw = vec![
            fill("1", "2024-01-10T09:00:00.000000000Z", "EUR_USD", "1000", "0.0"),
            fill("2", "2024-01-11T09:00:00.000000000Z", "EUR_USD", "-1000", "12.5"),
            RawTransaction {
                id: "3".to_string(),
                time: "2024-01-12T09:00:00.000000000Z".to_string(),
                kind: "TRANSFER_FUNDS".to_string(),
                ..Default::default()
            },
        ];

        let trades = closed_trades(&raw);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].pl, 12.5);
    }

    #[test]
    fn side_follows_the_sign_of_the_closing_units() {
        let raw = vec![
            // Negative units close a long: the original trade was a buy.
            fill("1", "2024-01-10T09:00:00.000000000Z", "EUR_USD", "-2000", "5.0"),
            // Positive units close a short: the original trade was a sell.
            fill("2", "2024-01-11T09:00:00.000000000Z", "GBP_USD", "1500", "-3.0"),
        ];

        let trades = closed_trades(&raw);
        assert_eq!(trades.len(), 2);

        // Most recent first.
        assert_eq!(trades[0].instrument, "GBP_USD");
        assert_eq!(trades[0].side, TradeSide::Sell);
        assert_eq!(trades[0].units, 1500.0);
        assert_eq!(trades[1].side, TradeSide::Buy);
        assert_eq!(trades[1].units, 2000.0);
    }

    #[test]
    fn missing_balance_becomes_none() {
        let mut t = fill("1", "2024-01-10T09:00:00.000000000Z", "EUR_USD", "-100", "1.0");
        t.account_balance = None;
        let trades = closed_trades(&[t]);
        assert_eq!(trades[0].account_balance, None);

        let mut garbled = fill("2", "2024-01-10T09:00:00.000000000Z", "EUR_USD", "-100", "1.0");
        garbled.account_balance = Some("n/a".to_string());
        let trades = closed_trades(&[garbled]);
        assert_eq!(trades[0].account_balance, None);
    }

    #[test]
    fn instruments_are_sorted_and_unique() {
        let raw = vec![
            fill("1", "2024-01-10T09:00:00.000000000Z", "USD_JPY", "-1", "1.0"),
            fill("2", "2024-01-11T09:00:00.000000000Z", "EUR_USD", "-1", "1.0"),
            fill("3", "2024-01-12T09:00:00.000000000Z", "USD_JPY", "-1", "1.0"),
        ];
        let trades = closed_trades(&raw);
        assert_eq!(instruments(&trades), vec!["EUR_USD", "USD_JPY"]);
    }

    #[test]
    fn presets_resolve_to_the_expected_boundaries() {
        let earliest = NaiveDate::from_ymd_opt(2023, 5, 20).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

        assert_eq!(
            resolve_preset(DatePreset::AllTime, earliest, today),
            (earliest, today)
        );
        assert_eq!(
            resolve_preset(DatePreset::YearToDate, earliest, today),
            (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), today)
        );
        assert_eq!(
            resolve_preset(DatePreset::ThisMonth, earliest, today),
            (NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), today)
        );
        assert_eq!(
            resolve_preset(DatePreset::LastMonth, earliest, today),
            (
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
            )
        );
        assert_eq!(
            resolve_preset(DatePreset::Last7Days, earliest, today),
            (NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(), today)
        );
    }

    #[test]
    fn last_month_crosses_year_boundaries() {
        let earliest = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(
            resolve_preset(DatePreset::LastMonth, earliest, today),
            (
                NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
            )
        );
    }

    #[test]
    fn date_window_is_inclusive_on_both_ends() {
        let raw = vec![
            fill("1", "2024-01-10T00:00:00.000000000Z", "EUR_USD", "-1", "1.0"),
            fill("2", "2024-01-12T23:59:59.000000000Z", "EUR_USD", "-1", "2.0"),
            fill("3", "2024-01-13T00:00:00.000000000Z", "EUR_USD", "-1", "3.0"),
        ];
        let trades = closed_trades(&raw);

        let start = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();
        let filtered = filter_trades(&trades, start, end, &[]);

        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|t| t.pl != 3.0));
    }

    #[test]
    fn instrument_filter_applies_only_when_non_empty() {
        let raw = vec![
            fill("1", "2024-01-10T09:00:00.000000000Z", "EUR_USD", "-1", "1.0"),
            fill("2", "2024-01-10T10:00:00.000000000Z", "USD_JPY", "-1", "2.0"),
        ];
        let trades = closed_trades(&raw);
        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

        assert_eq!(filter_trades(&trades, day, day, &[]).len(), 2);

        let only_jpy = filter_trades(&trades, day, day, &["USD_JPY".to_string()]);
        assert_eq!(only_jpy.len(), 1);
        assert_eq!(only_jpy[0].instrument, "USD_JPY");
    }
}
