mod config;
mod market;
mod news;
mod open_url;
mod sentiment;
mod ui;
mod util;

use anyhow::{Context, Result, anyhow};
use console::Term;
use sentiment::{Classifier, LexiconScorer};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, PartialEq)]
struct Cli {
    feeds: Option<String>,
    tickers: Option<String>,
    period: Option<String>,
    lexicon: Option<PathBuf>,
    once: bool,
    json: bool,
    verbose: bool,
    help: bool,
}

impl Cli {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            feeds: self.feeds.clone(),
            tickers: self.tickers.clone(),
            period: self.period.clone(),
            lexicon: self.lexicon.clone(),
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().ok_or_else(|| anyhow!("{} needs a value", flag));
        match arg.as_str() {
            "--feeds" => cli.feeds = Some(value("--feeds")?),
            "--tickers" => cli.tickers = Some(value("--tickers")?),
            "--period" => cli.period = Some(value("--period")?),
            "--lexicon" => cli.lexicon = Some(PathBuf::from(value("--lexicon")?)),
            "--once" => cli.once = true,
            "--json" => {
                cli.once = true;
                cli.json = true;
            }
            "-v" | "--verbose" => cli.verbose = true,
            "-h" | "--help" => cli.help = true,
            other => return Err(anyhow!("unknown argument: {}", other)),
        }
    }
    Ok(cli)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match parse_args(env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}", e);
            print_help();
            std::process::exit(2);
        }
    };
    if cli.help {
        print_help();
        return Ok(());
    }
    init_logging(cli.verbose);

    let cfg = config::load(cli.overrides())?;
    let scorer = match cfg.lexicon.as_deref() {
        Some(path) => LexiconScorer::from_file(path).context("failed to load lexicon")?,
        None => LexiconScorer::default(),
    };
    let classifier = Classifier::new(scorer);

    if cli.once {
        if cli.json {
            let report = news::fetch_report(&cfg, &classifier).await?;
            println!("{}", serde_json::to_string_pretty(&news::json_report(&report))?);
            return Ok(());
        }
        return print_once(&cfg, &classifier).await;
    }

    let _ = Term::stdout().clear_screen();
    let menu: Vec<String> = vec!["News sentiment".into(), "Market overview".into(), "Quit".into()];
    let header: Vec<String> = cfg.header.iter().cloned().collect();
    loop {
        let choice = match ui::prompt_index("Main menu", &menu, &header, &[]) {
            Ok(ui::MenuChoice::Index(0)) => news::run(&cfg, &classifier).await?,
            Ok(ui::MenuChoice::Index(1)) => market::run(&cfg).await?,
            Ok(ui::MenuChoice::Index(_))
            | Ok(ui::MenuChoice::Back)
            | Ok(ui::MenuChoice::Quit) => break,
            Err(err) => {
                tracing::debug!("ignored selection: {}", err);
                continue;
            }
        };
        if choice == ui::MenuChoice::Quit {
            break;
        }
    }
    Ok(())
}

async fn print_once(
    cfg: &config::RuntimeConfig,
    classifier: &Classifier<LexiconScorer>,
) -> Result<()> {
    let (report, panel) = futures_util::join!(
        news::fetch_report(cfg, classifier),
        market::fetch_panel(cfg)
    );
    if let Some(h) = cfg.header.as_deref() {
        println!("{}", h);
        println!();
    }
    println!("Key Performance Indicators ({})", cfg.period);
    for line in panel? {
        println!("{}", line);
    }
    println!();
    println!("News Sentiment");
    let order: Vec<String> = cfg.feeds.iter().map(|f| f.name.clone()).collect();
    for line in news::render_report(&report?, &order) {
        println!("{}", line);
    }
    Ok(())
}

fn print_help() {
    println!("news-sentiment");
    println!(
        "Usage: news-sentiment [--feeds <path|url>] [--tickers A,B] [--period P] \
         [--lexicon <path>] [--once] [--json] [-v]"
    );
    println!("  --feeds <path>     config.toml, a local RSS/Atom XML file, or a feed URL");
    println!("  --tickers <list>   comma-separated stock tickers (default AAPL,MSFT,GOOGL,TSLA)");
    println!("  --period <p>       price history: {}", config::PERIODS.join(", "));
    println!("  --lexicon <path>   TOML file extending the sentiment word list");
    println!("  --once             print the report and exit");
    println!("  --json             print the news sentiment report as JSON and exit");
    println!("  -v, --verbose      debug logging (RUST_LOG overrides)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let argv = args(&["--feeds", "cfg.toml", "--tickers", "nvda", "--once", "-v"]);
        let cli = parse_args(argv).unwrap();
        assert_eq!(cli.feeds.as_deref(), Some("cfg.toml"));
        assert_eq!(cli.tickers.as_deref(), Some("nvda"));
        assert!(cli.once);
        assert!(cli.verbose);
        assert!(!cli.help);
        assert!(!cli.json);

        let cli = parse_args(args(&["--json"])).unwrap();
        assert!(cli.once && cli.json);

        assert_eq!(parse_args(args(&[])).unwrap(), Cli::default());
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse_args(args(&["--period"])).is_err());
        assert!(parse_args(args(&["--bogus"])).is_err());
    }
}
