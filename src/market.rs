//! Key-performance panel: latest close, day change and volatility per ticker,
//! plus a correlation table of daily returns.

use anyhow::Result;
use console::{Term, style};
use futures_util::future::join_all;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::config::RuntimeConfig;
use crate::news::http_client;
use crate::ui::MenuChoice;

const TRADING_DAYS: f64 = 252.0;
const VOLATILITY_WINDOW: usize = 30;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Api(String),
    #[error("no price data")]
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub ticker: String,
    pub closes: Vec<f64>,
}

impl Quote {
    pub fn new(ticker: impl Into<String>, closes: Vec<f64>) -> Result<Self, MarketError> {
        if closes.is_empty() {
            return Err(MarketError::NoData);
        }
        Ok(Self {
            ticker: ticker.into(),
            closes,
        })
    }

    pub fn current(&self) -> f64 {
        self.closes.last().copied().unwrap_or(0.0)
    }

    /// Close before the latest one, 0 when there is only one.
    pub fn previous(&self) -> f64 {
        let n = self.closes.len();
        if n < 2 { 0.0 } else { self.closes[n - 2] }
    }

    pub fn change(&self) -> f64 {
        self.current() - self.previous()
    }

    pub fn change_pct(&self) -> f64 {
        let prev = self.previous();
        if prev == 0.0 { 0.0 } else { self.change() / prev * 100.0 }
    }

    /// Daily returns, one per consecutive pair of closes. A zero close gives
    /// NaN so positions stay aligned with the dates.
    pub fn returns(&self) -> Vec<f64> {
        self.closes
            .windows(2)
            .map(|w| if w[0] == 0.0 { f64::NAN } else { w[1] / w[0] - 1.0 })
            .collect()
    }

    /// Annualized sample standard deviation of the last 30 daily returns.
    pub fn volatility(&self) -> Option<f64> {
        let returns: Vec<f64> = self.returns().into_iter().filter(|r| r.is_finite()).collect();
        let window = &returns[returns.len().saturating_sub(VOLATILITY_WINDOW)..];
        if window.len() < 2 {
            return None;
        }
        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let var = window.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(var.sqrt() * TRADING_DAYS.sqrt())
    }
}

/// Best and worst day change among quotes that have a previous close.
pub fn performers(quotes: &[Quote]) -> Option<(&Quote, &Quote)> {
    let mut ranked = quotes.iter().filter(|q| q.previous() != 0.0);
    let first = ranked.next()?;
    Some(ranked.fold((first, first), |(best, worst), q| {
        (
            if q.change_pct() > best.change_pct() { q } else { best },
            if q.change_pct() < worst.change_pct() { q } else { worst },
        )
    }))
}

/// Pearson correlation of two return series, aligned on their most recent
/// entries. Pairs with a non-finite value are skipped.
fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    let pairs: Vec<(f64, f64)> = a[a.len() - n..]
        .iter()
        .zip(&b[b.len() - n..])
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let len = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / len;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / len;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some((cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
}

/// Pairwise correlation of daily returns. `None` where a pair has fewer than
/// two overlapping returns or one side never moves.
pub fn correlation_matrix(quotes: &[Quote]) -> Vec<Vec<Option<f64>>> {
    let returns: Vec<Vec<f64>> = quotes.iter().map(Quote::returns).collect();
    returns
        .iter()
        .map(|a| returns.iter().map(|b| pearson(a, b)).collect())
        .collect()
}

fn correlation_lines(quotes: &[Quote]) -> Vec<String> {
    let matrix = correlation_matrix(quotes);
    let mut out = vec![String::from("Returns correlation:")];
    let mut head = format!("{:>8}", "");
    for q in quotes {
        head.push_str(&format!("{:>8}", q.ticker));
    }
    out.push(head);
    for (q, row) in quotes.iter().zip(&matrix) {
        let mut line = format!("{:>8}", q.ticker);
        for cell in row {
            match cell {
                Some(c) => line.push_str(&format!("{:>8.2}", c)),
                None => line.push_str(&format!("{:>8}", "N/A")),
            }
        }
        out.push(line);
    }
    out
}

/// Daily closes from a Yahoo Finance chart response, nulls skipped.
pub fn parse_closes(v: &Value) -> Result<Vec<f64>, MarketError> {
    let chart = v.get("chart").ok_or(MarketError::NoData)?;
    if let Some(err) = chart.get("error").filter(|e| !e.is_null()) {
        let msg = err
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("unknown error");
        return Err(MarketError::Api(msg.to_string()));
    }
    let closes = chart
        .get("result")
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
        .and_then(|r| r.pointer("/indicators/quote/0/close"))
        .and_then(|c| c.as_array())
        .ok_or(MarketError::NoData)?;
    Ok(closes.iter().filter_map(|c| c.as_f64()).collect())
}

async fn fetch_quote(client: &Client, ticker: &str, period: &str) -> Result<Quote, MarketError> {
    let url = format!(
        "https://query1.finance.yahoo.com/v8/finance/chart/{}?range={}&interval=1d",
        ticker, period
    );
    let v: Value = client.get(url).send().await?.json().await?;
    Quote::new(ticker, parse_closes(&v)?)
}

pub async fn fetch_quotes(
    client: &Client,
    tickers: &[String],
    period: &str,
) -> Vec<(String, Result<Quote, MarketError>)> {
    let futs = tickers.iter().map(|t| fetch_quote(client, t, period));
    let results = join_all(futs).await;
    tickers.iter().cloned().zip(results).collect()
}

pub fn quote_line(ticker: &str, quote: &Result<Quote, MarketError>) -> String {
    match quote {
        Ok(q) => {
            let change = q.change();
            let arrow = if change >= 0.0 { "↗" } else { "↘" };
            let delta = format!("{} {:+.2} ({:+.2}%)", arrow, change, q.change_pct());
            let delta = if change >= 0.0 {
                style(delta).green()
            } else {
                style(delta).red()
            };
            let vol = match q.volatility() {
                Some(v) => format!("{:.1}%", v * 100.0),
                None => "N/A".into(),
            };
            format!("- {}: ${:.2} {}  vol {}", ticker, q.current(), delta, vol)
        }
        Err(e) => format!("- {}: no data ({})", ticker, e),
    }
}

pub fn panel_lines(quotes: &[(String, Result<Quote, MarketError>)]) -> Vec<String> {
    let mut out: Vec<String> = quotes.iter().map(|(t, q)| quote_line(t, q)).collect();
    let ok: Vec<Quote> = quotes
        .iter()
        .filter_map(|(_, q)| q.as_ref().ok().cloned())
        .collect();
    if let Some((best, worst)) = performers(&ok) {
        out.push(String::new());
        out.push(
            style(format!("Best performer: {} ({:+.2}%)", best.ticker, best.change_pct()))
                .green()
                .to_string(),
        );
        out.push(
            style(format!("Worst performer: {} ({:+.2}%)", worst.ticker, worst.change_pct()))
                .red()
                .to_string(),
        );
    }
    if ok.len() >= 2 {
        out.push(String::new());
        out.extend(correlation_lines(&ok));
    }
    out
}

pub async fn fetch_panel(cfg: &RuntimeConfig) -> Result<Vec<String>> {
    let client = http_client(concat!("news-sentiment/", env!("CARGO_PKG_VERSION"), " quotes"))?;
    let quotes = fetch_quotes(&client, &cfg.tickers, &cfg.period).await;
    for (ticker, q) in &quotes {
        if let Err(e) = q {
            tracing::warn!(%ticker, "quote unavailable: {}", e);
        }
    }
    Ok(panel_lines(&quotes))
}

pub async fn run(cfg: &RuntimeConfig) -> Result<MenuChoice> {
    let term = Term::stdout();
    let _ = term.clear_screen();

    let lines = fetch_panel(cfg).await?;
    if let Some(h) = cfg.header.as_deref() {
        println!("{}", h);
    }
    println!("Key Performance Indicators ({}, q = quit, b = back)", cfg.period);
    println!();
    for line in lines {
        println!("{}", line);
    }
    println!();
    println!("Press Enter to return, 'q' to quit.");
    match term.read_key()? {
        console::Key::Char('q') | console::Key::Char('Q') => Ok(MenuChoice::Quit),
        _ => Ok(MenuChoice::Back),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quote(t: &str, closes: &[f64]) -> Quote {
        Quote::new(t, closes.to_vec()).unwrap()
    }

    #[test]
    fn test_change_and_pct() {
        let q = quote("AAPL", &[95.0, 100.0, 110.0]);
        assert_eq!(q.current(), 110.0);
        assert_eq!(q.previous(), 100.0);
        assert_eq!(q.change(), 10.0);
        assert!((q.change_pct() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_close_has_zero_pct() {
        let q = quote("NEW", &[42.0]);
        assert_eq!(q.previous(), 0.0);
        assert_eq!(q.change_pct(), 0.0);
        assert_eq!(q.volatility(), None);
        assert!(matches!(Quote::new("X", vec![]), Err(MarketError::NoData)));
    }

    #[test]
    fn test_volatility() {
        let q = quote("V", &[100.0, 110.0, 99.0]);
        let expected = 0.02f64.sqrt() * 252f64.sqrt();
        assert!((q.volatility().unwrap() - expected).abs() < 1e-9);

        let flat = quote("F", &[10.0; 50]);
        assert_eq!(flat.volatility(), Some(0.0));
    }

    #[test]
    fn test_performers_skip_missing_previous() {
        let quotes = vec![
            quote("UP", &[100.0, 105.0]),
            quote("DOWN", &[100.0, 90.0]),
            quote("ONE", &[50.0]),
            quote("FLAT", &[20.0, 20.0]),
        ];
        let (best, worst) = performers(&quotes).unwrap();
        assert_eq!(best.ticker, "UP");
        assert_eq!(worst.ticker, "DOWN");
        assert!(performers(&[quote("ONE", &[1.0])]).is_none());
    }

    #[test]
    fn test_correlation_matrix() {
        let quotes = vec![
            quote("A", &[100.0, 110.0, 99.0]),
            quote("B", &[50.0, 55.0, 49.5]),
            quote("C", &[10.0, 9.0, 9.9]),
            quote("ONE", &[42.0]),
        ];
        let m = correlation_matrix(&quotes);
        assert_eq!(m.len(), 4);
        assert!((m[0][0].unwrap() - 1.0).abs() < 1e-9);
        assert!((m[0][1].unwrap() - 1.0).abs() < 1e-9);
        assert!((m[0][2].unwrap() + 1.0).abs() < 1e-9);
        assert_eq!(m[1][2], m[2][1]);
        assert!(m[3].iter().all(|c| c.is_none()));
        assert!(m.iter().all(|row| row[3].is_none()));
    }

    #[test]
    fn test_correlation_aligns_on_latest_returns() {
        // Only the last two returns of LONG overlap with SHORT.
        let long = quote("LONG", &[100.0, 50.0, 100.0, 110.0, 99.0]);
        let short = quote("SHORT", &[20.0, 22.0, 19.8]);
        let flat = quote("FLAT", &[5.0, 5.0, 5.0]);
        let m = correlation_matrix(&[long, short, flat]);
        assert!((m[0][1].unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(m[0][2], None);
    }

    #[test]
    fn test_parse_closes() {
        let v = json!({
            "chart": {
                "result": [{
                    "meta": {"symbol": "MSFT"},
                    "indicators": {"quote": [{"close": [410.5, null, 415.25]}]}
                }],
                "error": null
            }
        });
        assert_eq!(parse_closes(&v).unwrap(), vec![410.5, 415.25]);

        let err = json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found"}
            }
        });
        match parse_closes(&err) {
            Err(MarketError::Api(msg)) => assert_eq!(msg, "No data found"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(parse_closes(&json!({})), Err(MarketError::NoData)));
    }

    #[test]
    fn test_panel_lines_report_failures() {
        let quotes = vec![
            ("AAPL".to_string(), Ok(quote("AAPL", &[100.0, 102.0]))),
            ("ZZZZ".to_string(), Err(MarketError::NoData)),
        ];
        let lines = panel_lines(&quotes);
        assert!(lines[0].starts_with("- AAPL: $102.00"));
        assert_eq!(lines[1], "- ZZZZ: no data (no price data)");
        assert!(lines.iter().any(|l| l.contains("Best performer: AAPL (+2.00%)")));
        assert!(!lines.iter().any(|l| l.starts_with("Returns correlation")));

        let quotes = vec![
            ("AAPL".to_string(), Ok(quote("AAPL", &[100.0, 110.0, 99.0]))),
            ("MSFT".to_string(), Ok(quote("MSFT", &[10.0, 9.0, 9.9]))),
        ];
        let lines = panel_lines(&quotes);
        let at = lines.iter().position(|l| l == "Returns correlation:").unwrap();
        assert_eq!(lines[at + 1], "            AAPL    MSFT");
        assert_eq!(lines[at + 2], "    AAPL    1.00   -1.00");
        assert_eq!(lines[at + 3], "    MSFT   -1.00    1.00");
    }
}
