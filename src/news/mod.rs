mod fetch;
mod model;

use crate::config::RuntimeConfig;
use crate::open_url::open_url;
use crate::sentiment::{
    Classifier, Label, PolarityScorer, SentimentError, SentimentResult, SentimentSummary,
    aggregate,
};
use crate::ui::{MenuChoice, prompt_index};
use crate::util::sanitize::sanitize_for_terminal;
use anyhow::Result;
use console::style;
use std::collections::HashMap;

pub use fetch::{FetchOptions, http_client};
pub use model::{Article, Published};

const HEADLINES_PER_SOURCE: usize = 10;

/// One refresh cycle's worth of classified news.
pub struct Report {
    pub results: Vec<SentimentResult>,
    pub summary: Result<SentimentSummary, SentimentError>,
}

impl Report {
    pub fn build<S: PolarityScorer>(articles: &[Article], classifier: &Classifier<S>) -> Self {
        let results = classifier.classify_all(articles);
        let summary = aggregate(&results);
        Report { results, summary }
    }

    /// Results grouped by source, sources in `order` first, then any others
    /// in order of first appearance.
    fn by_source<'a>(&'a self, order: &[String]) -> Vec<(String, Vec<&'a SentimentResult>)> {
        let mut groups: HashMap<&str, Vec<&SentimentResult>> = HashMap::new();
        let mut appearance: Vec<String> = Vec::new();
        for r in &self.results {
            let entry = groups.entry(r.article.source.as_str()).or_default();
            if entry.is_empty() {
                appearance.push(r.article.source.clone());
            }
            entry.push(r);
        }
        let mut names: Vec<String> = order
            .iter()
            .filter(|n| groups.contains_key(n.as_str()))
            .cloned()
            .collect();
        names.extend(appearance.into_iter().filter(|n| !order.contains(n)));
        names
            .into_iter()
            .filter_map(|n| groups.remove(n.as_str()).map(|v| (n, v)))
            .collect()
    }
}

pub async fn fetch_report<S: PolarityScorer>(
    cfg: &RuntimeConfig,
    classifier: &Classifier<S>,
) -> Result<Report> {
    let opts = FetchOptions::new(cfg.max_articles, cfg.feeds.len(), cfg.summary_chars);
    let articles = fetch::collect_articles(&cfg.feeds, opts).await?;
    tracing::info!(articles = articles.len(), "classifying headlines");
    Ok(Report::build(&articles, classifier))
}

fn styled_label(label: Label, text: String) -> String {
    match label {
        Label::Positive => style(text).green().to_string(),
        Label::Negative => style(text).red().to_string(),
        Label::Neutral => style(text).yellow().to_string(),
    }
}

pub fn summary_lines(summary: &Result<SentimentSummary, SentimentError>) -> Vec<String> {
    match summary {
        Ok(s) => vec![
            format!(
                "{} Positive: {}   {} Negative: {}   {} Neutral: {}   ({} articles)",
                Label::Positive.emoji(),
                s.positive_count,
                Label::Negative.emoji(),
                s.negative_count,
                Label::Neutral.emoji(),
                s.neutral_count,
                s.total()
            ),
            styled_label(
                s.trend,
                format!("Overall market sentiment: {} ({:.2})", s.trend, s.mean_score),
            ),
        ],
        Err(SentimentError::EmptyInput) => {
            vec!["No news available; unable to fetch financial news at this time.".into()]
        }
    }
}

pub fn headline_label(r: &SentimentResult) -> String {
    format!(
        "{} {} ({:+.2})",
        r.label.emoji(),
        sanitize_for_terminal(&r.article.title),
        r.score
    )
}

/// Plain-text report for `--once`.
pub fn render_report(report: &Report, feed_order: &[String]) -> Vec<String> {
    let mut out = summary_lines(&report.summary);
    for (source, results) in report.by_source(feed_order) {
        out.push(String::new());
        out.push(format!("== {} ==", sanitize_for_terminal(&source.to_uppercase())));
        for r in results.iter().take(HEADLINES_PER_SOURCE) {
            out.push(format!("  {}", headline_label(r)));
            let when = r.article.published.to_string();
            if !when.is_empty() {
                out.push(format!("      {}", when));
            }
            out.push(format!("      {}", r.article.link));
        }
    }
    out
}

/// Machine-readable report for `--once --json`; `summary` is null when there
/// were no articles.
pub fn json_report(report: &Report) -> serde_json::Value {
    serde_json::json!({
        "summary": report.summary.as_ref().ok(),
        "articles": report.results,
    })
}

enum Item<'a> {
    Source(&'a str),
    Headline(&'a SentimentResult),
}

pub async fn run<S: PolarityScorer>(
    cfg: &RuntimeConfig,
    classifier: &Classifier<S>,
) -> Result<MenuChoice> {
    let report = fetch_report(cfg, classifier).await?;
    news_menu(cfg, &report)
}

fn news_menu(cfg: &RuntimeConfig, report: &Report) -> Result<MenuChoice> {
    let order: Vec<String> = cfg.feeds.iter().map(|f| f.name.clone()).collect();
    let groups = report.by_source(&order);

    let mut header: Vec<String> = cfg.header.iter().cloned().collect();
    header.extend(summary_lines(&report.summary));

    let mut labels: Vec<String> = Vec::new();
    let mut items: Vec<Item> = Vec::new();
    let mut section_starts: Vec<usize> = Vec::new();
    for (source, results) in &groups {
        section_starts.push(labels.len());
        labels.push(format!(
            "== {} == ({} entries)",
            sanitize_for_terminal(&source.to_uppercase()),
            results.len()
        ));
        items.push(Item::Source(source));
        for r in results.iter().take(HEADLINES_PER_SOURCE) {
            labels.push(format!("  - {}", headline_label(r)));
            items.push(Item::Headline(r));
        }
    }

    loop {
        match prompt_index(
            "News sentiment. Select a headline to open it; select a source to see all entries.",
            &labels,
            &header,
            &section_starts,
        ) {
            Ok(MenuChoice::Index(i)) => match items.get(i) {
                Some(Item::Source(source)) => {
                    if let Some((_, results)) = groups.iter().find(|(n, _)| n == source) {
                        if source_menu(&header, cfg, source, results)? == MenuChoice::Quit {
                            return Ok(MenuChoice::Quit);
                        }
                    }
                }
                Some(Item::Headline(r)) => open_url(&r.article.link, cfg.open_command.as_deref()),
                None => {}
            },
            Ok(choice) => return Ok(choice),
            Err(err) => tracing::debug!("ignored selection: {}", err),
        }
    }
}

fn source_menu(
    header: &[String],
    cfg: &RuntimeConfig,
    source: &str,
    results: &[&SentimentResult],
) -> Result<MenuChoice> {
    let labels: Vec<String> = results.iter().map(|r| headline_label(r)).collect();
    loop {
        match prompt_index(&format!("{} - all entries", source), &labels, header, &[]) {
            Ok(MenuChoice::Index(i)) => {
                if let Some(r) = results.get(i) {
                    open_url(&r.article.link, cfg.open_command.as_deref());
                }
            }
            Ok(choice) => return Ok(choice),
            Err(err) => tracing::debug!("ignored selection: {}", err),
        }
    }
}
