use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

pub const PERIODS: &[&str] = &["1mo", "3mo", "6mo", "1y", "2y"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Feed {
    pub name: String,
    pub url: String,
}

/// On-disk `config.toml`. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub feeds: Vec<Feed>,
    pub open_command: Option<String>,
    pub header: Option<String>,
    pub max_articles: Option<usize>,
    pub summary_chars: Option<usize>,
    pub lexicon: Option<PathBuf>,
    pub tickers: Option<Vec<String>>,
    pub period: Option<String>,
}

/// Command line overrides, applied on top of the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub feeds: Option<String>,
    pub tickers: Option<String>,
    pub period: Option<String>,
    pub lexicon: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub feeds: Vec<Feed>,
    pub open_command: Option<String>,
    pub header: Option<String>,
    pub max_articles: usize,
    pub summary_chars: usize,
    pub lexicon: Option<PathBuf>,
    pub tickers: Vec<String>,
    pub period: String,
}

impl RuntimeConfig {
    fn from_file(parsed: AppConfig, base_dir: Option<&Path>) -> Self {
        let feeds = if parsed.feeds.is_empty() {
            default_feeds()
        } else {
            parsed.feeds
        };
        // A relative lexicon path is relative to the config file.
        let lexicon = parsed.lexicon.map(|p| match base_dir {
            Some(dir) if p.is_relative() => dir.join(p),
            _ => p,
        });
        Self {
            feeds,
            open_command: parsed.open_command,
            header: parsed.header,
            max_articles: parsed.max_articles.unwrap_or(20),
            summary_chars: parsed.summary_chars.unwrap_or(200),
            lexicon,
            tickers: parsed
                .tickers
                .map(|t| normalize_tickers(&t.join(",")))
                .unwrap_or_else(default_tickers),
            period: parsed.period.unwrap_or_else(|| "6mo".into()),
        }
    }

    fn single_feed(feed: Feed) -> Self {
        let mut cfg = Self::from_file(AppConfig::default(), None);
        cfg.feeds = vec![feed];
        cfg
    }

    fn apply(mut self, ov: Overrides) -> Result<Self> {
        if let Some(t) = ov.tickers {
            self.tickers = normalize_tickers(&t);
        }
        if let Some(p) = ov.period {
            self.period = p;
        }
        if let Some(l) = ov.lexicon {
            self.lexicon = Some(l);
        }
        if !PERIODS.contains(&self.period.as_str()) {
            bail!(
                "invalid period '{}', expected one of {}",
                self.period,
                PERIODS.join(", ")
            );
        }
        if self.max_articles == 0 {
            bail!("max_articles must be at least 1");
        }
        Ok(self)
    }
}

pub fn load(ov: Overrides) -> Result<RuntimeConfig> {
    load_with_default_path(ov, default_config_path())
}

fn load_with_default_path(
    mut ov: Overrides,
    default_path: Option<PathBuf>,
) -> Result<RuntimeConfig> {
    if let Some(path_str) = ov.feeds.take() {
        let p = PathBuf::from(&path_str);
        if p.is_file() {
            // TOML is a full config; anything else is a single local feed
            if path_str.to_ascii_lowercase().ends_with(".toml") {
                return read_config(&p)?.apply(ov);
            }
            let name = p
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("local-feed")
                .to_string();
            return RuntimeConfig::single_feed(Feed { name, url: path_str }).apply(ov);
        }
        if path_str.starts_with("http://") || path_str.starts_with("https://") {
            return RuntimeConfig::single_feed(Feed {
                name: "Custom".into(),
                url: path_str,
            })
            .apply(ov);
        }
        bail!("--feeds: '{}' is neither a file nor an http(s) URL", path_str);
    }

    if let Some(path) = default_path.filter(|p| p.is_file()) {
        tracing::debug!(path = %path.display(), "using config file");
        return read_config(&path)?.apply(ov);
    }

    RuntimeConfig::from_file(AppConfig::default(), None).apply(ov)
}

fn read_config(path: &Path) -> Result<RuntimeConfig> {
    let txt = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let parsed: AppConfig = toml::from_str(&txt)
        .with_context(|| format!("failed to parse toml: {}", path.display()))?;
    Ok(RuntimeConfig::from_file(parsed, path.parent()))
}

pub fn normalize_tickers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn default_tickers() -> Vec<String> {
    normalize_tickers("AAPL,MSFT,GOOGL,TSLA")
}

fn default_feeds() -> Vec<Feed> {
    vec![
        Feed {
            name: "Seeking Alpha".into(),
            url: "https://seekingalpha.com/feed.xml".into(),
        },
        Feed {
            name: "MarketWatch".into(),
            url: "https://feeds.content.dowjones.io/public/rss/mw_topstories".into(),
        },
        Feed {
            name: "Yahoo Finance".into(),
            url: "https://finance.yahoo.com/rss/".into(),
        },
    ]
}

fn default_config_path() -> Option<PathBuf> {
    let base = match env::var("XDG_CONFIG_HOME") {
        Ok(xdg) => PathBuf::from(xdg),
        Err(_) => PathBuf::from(env::var("HOME").ok()?).join(".config"),
    };
    Some(base.join("news-sentiment").join("config.toml"))
}
