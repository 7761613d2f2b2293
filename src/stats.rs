use crate::history::TradeRecord;
use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Summary statistics over a set of closed trades.
#[derive(Serialize, Debug, Clone, Default)]
pub struct Statistics {
    pub total_pl: f64,
    pub total_trades: usize,
    pub win_count: usize,
    pub loss_count: usize,
    /// Percentage of trades with positive P/L, 0..=100.
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    /// Most negative single P/L.
    pub largest_loss: f64,
    /// Gross profit / gross loss. `None` when there are winning trades but
    /// no losing ones (the ratio is unbounded).
    pub profit_factor: Option<f64>,
    /// Win count / loss count. `None` under the same condition.
    pub win_loss_ratio: Option<f64>,
    pub most_traded: Option<String>,
    /// Largest peak-to-trough fall of the cumulative P/L curve.
    pub max_drawdown: f64,
    /// The same fall as a percentage of the peak it started from; 0 when
    /// that peak was not positive.
    pub max_drawdown_pct: f64,
}

/// One point of a time series sent to the charts.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TimePoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// One bucket of a grouped-P/L bar chart.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Bucket {
    pub label: String,
    pub pl: f64,
}

/// One bucket of the trade-count bar chart.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CountBucket {
    pub label: String,
    pub count: usize,
}

/// Pre-aggregated series for the dashboard charts.
#[derive(Serialize, Debug, Clone, Default)]
pub struct ChartData {
    /// Cumulative P/L after each trade, chronological.
    pub cumulative_pl: Vec<TimePoint>,
    /// Account balance after each trade that recorded one, chronological.
    pub balance_trend: Vec<TimePoint>,
    pub pl_by_year: Vec<Bucket>,
    pub pl_by_month: Vec<Bucket>,
    /// Monday through Sunday, always all seven buckets.
    pub pl_by_weekday: Vec<Bucket>,
    /// Sorted by P/L, best first.
    pub pl_by_instrument: Vec<Bucket>,
    /// Sorted by count, busiest first.
    pub count_by_instrument: Vec<CountBucket>,
    /// Raw per-trade P/L values for the histogram; the client bins them.
    pub pl_values: Vec<f64>,
}

/// Compute summary statistics for a set of trades (any order).
pub fn compute(trades: &[TradeRecord]) -> Statistics {
    let mut stats = Statistics::default();
    if trades.is_empty() {
        return stats;
    }

    let wins: Vec<f64> = trades.iter().map(|t| t.pl).filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = trades.iter().map(|t| t.pl).filter(|p| *p < 0.0).collect();

    stats.total_pl = trades.iter().map(|t| t.pl).sum();
    stats.win_count = wins.len();
    stats.loss_count = losses.len();
    stats.total_trades = wins.len() + losses.len();

    if stats.total_trades > 0 {
        stats.win_rate = stats.win_count as f64 / stats.total_trades as f64 * 100.0;
    }

    if !wins.is_empty() {
        stats.avg_win = wins.iter().sum::<f64>() / wins.len() as f64;
        stats.largest_win = wins.iter().cloned().fold(f64::MIN, f64::max);
    }
    if !losses.is_empty() {
        stats.avg_loss = losses.iter().sum::<f64>() / losses.len() as f64;
        stats.largest_loss = losses.iter().cloned().fold(f64::MAX, f64::min);
    }

    let gross_profit: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().map(|l| l.abs()).sum();
    stats.profit_factor = ratio(gross_profit, gross_loss);
    stats.win_loss_ratio = ratio(stats.win_count as f64, stats.loss_count as f64);

    stats.most_traded = most_traded(trades);

    let (dd, dd_pct) = max_drawdown(trades);
    stats.max_drawdown = dd;
    stats.max_drawdown_pct = dd_pct;

    stats
}

// Some(n/d), except: no denominator with a positive numerator means the
// ratio is unbounded (None), and 0/0 is just 0.
fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator > 0.0 {
        Some(numerator / denominator)
    } else if numerator > 0.0 {
        None
    } else {
        Some(0.0)
    }
}

fn most_traded(trades: &[TradeRecord]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in trades {
        *counts.entry(t.instrument.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        // Tie-break on the name so the answer is stable across runs.
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(name, _)| name.to_string())
}

/// Maximum drawdown of the cumulative P/L curve, as (value, percent).
///
/// The curve starts from a virtual 0 before the first trade. The percentage
/// is taken against the peak the deepest fall started from, and reported as
/// 0 when that peak is not positive.
fn max_drawdown(trades: &[TradeRecord]) -> (f64, f64) {
    let mut chronological: Vec<&TradeRecord> = trades.iter().collect();
    chronological.sort_by_key(|t| t.time);

    let mut equity = 0.0f64;
    let mut peak = 0.0f64;
    let mut max_dd = 0.0f64;
    let mut peak_at_max_dd = 0.0f64;

    for t in chronological {
        equity += t.pl;
        if equity > peak {
            peak = equity;
        }
        let dd = peak - equity;
        if dd > max_dd {
            max_dd = dd;
            peak_at_max_dd = peak;
        }
    }

    let pct = if max_dd > 0.0 && peak_at_max_dd > 0.0 {
        max_dd / peak_at_max_dd * 100.0
    } else {
        0.0
    };
    (max_dd, pct)
}

const WEEKDAYS: [(Weekday, &str); 7] = [
    (Weekday::Mon, "Monday"),
    (Weekday::Tue, "Tuesday"),
    (Weekday::Wed, "Wednesday"),
    (Weekday::Thu, "Thursday"),
    (Weekday::Fri, "Friday"),
    (Weekday::Sat, "Saturday"),
    (Weekday::Sun, "Sunday"),
];

/// Build every chart series from a set of trades (any order).
pub fn chart_data(trades: &[TradeRecord]) -> ChartData {
    let mut chronological: Vec<&TradeRecord> = trades.iter().collect();
    chronological.sort_by_key(|t| t.time);

    let mut charts = ChartData::default();

    let mut cumulative = 0.0;
    for t in &chronological {
        cumulative += t.pl;
        charts.cumulative_pl.push(TimePoint {
            time: t.time,
            value: cumulative,
        });
        if let Some(balance) = t.account_balance {
            charts.balance_trend.push(TimePoint {
                time: t.time,
                value: balance,
            });
        }
    }

    let mut by_year: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_month: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_weekday: HashMap<Weekday, f64> = HashMap::new();
    let mut by_instrument: HashMap<String, f64> = HashMap::new();
    let mut count_by_instrument: HashMap<String, usize> = HashMap::new();

    for t in &chronological {
        *by_year.entry(t.time.format("%Y").to_string()).or_default() += t.pl;
        *by_month.entry(t.time.format("%Y-%m").to_string()).or_default() += t.pl;
        *by_weekday.entry(t.time.weekday()).or_default() += t.pl;
        *by_instrument.entry(t.instrument.clone()).or_default() += t.pl;
        *count_by_instrument.entry(t.instrument.clone()).or_default() += 1;
        charts.pl_values.push(t.pl);
    }

    charts.pl_by_year = by_year
        .into_iter()
        .map(|(label, pl)| Bucket { label, pl })
        .collect();
    charts.pl_by_month = by_month
        .into_iter()
        .map(|(label, pl)| Bucket { label, pl })
        .collect();
    charts.pl_by_weekday = WEEKDAYS
        .iter()
        .map(|(day, label)| Bucket {
            label: label.to_string(),
            pl: by_weekday.get(day).copied().unwrap_or(0.0),
        })
        .collect();

    let mut pl_by_instrument: Vec<Bucket> = by_instrument
        .into_iter()
        .map(|(label, pl)| Bucket { label, pl })
        .collect();
    pl_by_instrument.sort_by(|a, b| b.pl.total_cmp(&a.pl).then_with(|| a.label.cmp(&b.label)));
    charts.pl_by_instrument = pl_by_instrument;

    let mut counts: Vec<CountBucket> = count_by_instrument
        .into_iter()
        .map(|(label, count)| CountBucket { label, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    charts.count_by_instrument = counts;

    charts
}
