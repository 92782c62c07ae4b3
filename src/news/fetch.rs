use super::model::{Article, Published};
use crate::config::Feed;
use crate::util::sanitize::{sanitize_for_terminal, strip_html, truncate_chars};
use anyhow::{Context, Result, bail};
use feed_rs::parser;
use futures_util::StreamExt;
use futures_util::future::join_all;
use reqwest::Client;
use std::collections::HashSet;
use std::{path::Path, time::Duration};
use url::Url;

// 5 MB cap
const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub per_feed: usize,
    pub summary_chars: usize,
}

impl FetchOptions {
    /// Split `max_articles` evenly across feeds, at least one each.
    pub fn new(max_articles: usize, feed_count: usize, summary_chars: usize) -> Self {
        Self {
            per_feed: (max_articles / feed_count.max(1)).max(1),
            summary_chars,
        }
    }
}

pub fn http_client(agent: &str) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(agent)
        .gzip(true)
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(20))
        .build()?)
}

/// Fetch every feed concurrently. A failing feed is logged and contributes
/// nothing; the result keeps feed order and drops repeated links.
pub async fn collect_articles(feeds: &[Feed], opts: FetchOptions) -> Result<Vec<Article>> {
    let client = http_client(concat!("news-sentiment/", env!("CARGO_PKG_VERSION")))?;

    let results = join_all(feeds.iter().map(|f| fetch_feed(&client, f, opts))).await;

    let mut seen: HashSet<String> = HashSet::new();
    let mut all: Vec<Article> = Vec::new();
    for (feed, result) in feeds.iter().zip(results) {
        match result {
            Ok(articles) => {
                tracing::debug!(feed = %feed.name, count = articles.len(), "fetched feed");
                all.extend(articles.into_iter().filter(|a| seen.insert(a.link.clone())));
            }
            Err(err) => tracing::warn!(feed = %feed.name, url = %feed.url, "{:#}", err),
        }
    }
    Ok(all)
}

async fn fetch_feed(client: &Client, f: &Feed, opts: FetchOptions) -> Result<Vec<Article>> {
    let (bytes, base) = if Path::new(&f.url).is_file() {
        let bytes = tokio::fs::read(&f.url)
            .await
            .with_context(|| format!("failed to read file feed {}", f.url))?;
        if bytes.len() > MAX_FEED_BYTES {
            bail!("feed too large ({} bytes)", bytes.len());
        }
        (bytes, None)
    } else {
        let base = Url::parse(&f.url).with_context(|| format!("invalid feed url {}", f.url))?;
        (download(client, &base).await?, Some(base))
    };

    let feed = parser::parse(&bytes[..]).context("failed to parse feed")?;
    Ok(to_articles(feed, &f.name, base.as_ref(), opts))
}

async fn download(client: &Client, url: &Url) -> Result<Vec<u8>> {
    let resp = client
        .get(url.as_str())
        .send()
        .await
        .context("request failed")?
        .error_for_status()?;
    let mut stream = resp.bytes_stream();
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = stream.next().await {
        let c = chunk.context("failed to read body")?;
        if buf.len() + c.len() > MAX_FEED_BYTES {
            bail!("feed too large (>{} bytes)", MAX_FEED_BYTES);
        }
        buf.extend_from_slice(&c);
    }
    Ok(buf)
}

fn to_articles(
    feed: feed_rs::model::Feed,
    source: &str,
    base: Option<&Url>,
    opts: FetchOptions,
) -> Vec<Article> {
    // Local files have no URL of their own; resolve against the channel link.
    let channel = feed.links.first().and_then(|l| Url::parse(&l.href).ok());
    let base = base.or(channel.as_ref());

    let mut out = Vec::new();
    for entry in feed.entries.into_iter().take(opts.per_feed) {
        let title = entry
            .title
            .as_ref()
            .map(|t| sanitize_for_terminal(&t.content))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "No title".into());

        let raw_link = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref().unwrap_or("") == "alternate")
            .or_else(|| entry.links.first())
            .map(|l| l.href.clone())
            .unwrap_or_default();
        let Some(link) = normalize_link(&raw_link, base) else {
            tracing::debug!(%title, "skipping entry without usable link");
            continue;
        };

        let summary = entry
            .summary
            .as_ref()
            .map(|s| s.content.clone())
            .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
            .map(|s| strip_html(&s))
            .filter(|s| !s.is_empty())
            .map(|s| truncate_chars(&s, opts.summary_chars))
            .unwrap_or_else(|| "No summary available".into());

        let published = entry
            .published
            .or(entry.updated)
            .map(|dt| Published::parse(&dt.to_rfc3339()))
            .unwrap_or(Published::Missing);

        out.push(Article {
            source: source.to_string(),
            title,
            link,
            published,
            summary,
        });
    }
    out
}

fn normalize_link(candidate: &str, base: Option<&Url>) -> Option<String> {
    if candidate.trim().is_empty() {
        return None;
    }
    let resolved = match Url::parse(candidate) {
        Ok(u) => u,
        Err(_) => base?.join(candidate).ok()?,
    };
    match resolved.scheme() {
        "http" | "https" => Some(resolved.into()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Market Wire</title>
    <link>https://wire.example.com/</link>
    <description>test</description>
    <item>
      <title>Stocks rally on strong earnings</title>
      <link>https://wire.example.com/a</link>
      <description>&lt;p&gt;Shares &lt;b&gt;surge&lt;/b&gt; after results&lt;/p&gt;</description>
      <pubDate>Mon, 06 Oct 2025 10:00:00 GMT</pubDate>
    </item>
    <item>
      <link>/relative/b</link>
    </item>
    <item>
      <title>Duplicate link</title>
      <link>https://wire.example.com/a</link>
      <description>again</description>
    </item>
    <item>
      <title>Mail only</title>
      <link>mailto:desk@example.com</link>
    </item>
  </channel>
</rss>"#;

    fn local_feed(dir: &tempfile::TempDir, body: &str) -> Feed {
        let path = dir.path().join("wire.xml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        Feed {
            name: "Wire".into(),
            url: path.to_string_lossy().into_owned(),
        }
    }

    #[test]
    fn test_options_split_budget() {
        assert_eq!(FetchOptions::new(20, 3, 200).per_feed, 6);
        assert_eq!(FetchOptions::new(2, 5, 200).per_feed, 1);
        assert_eq!(FetchOptions::new(20, 0, 200).per_feed, 20);
    }

    #[tokio::test]
    async fn test_local_feed_to_articles() {
        let dir = tempfile::tempdir().unwrap();
        let feed = local_feed(&dir, RSS);
        let articles = collect_articles(&[feed], FetchOptions::new(20, 1, 200))
            .await
            .unwrap();

        assert_eq!(articles.len(), 2);
        let a = &articles[0];
        assert_eq!(a.source, "Wire");
        assert_eq!(a.title, "Stocks rally on strong earnings");
        assert_eq!(a.summary, "Shares surge after results");
        assert_eq!(a.published.to_string(), "2025-10-06 10:00 UTC");

        let b = &articles[1];
        assert_eq!(b.title, "No title");
        assert_eq!(b.link, "https://wire.example.com/relative/b");
        assert_eq!(b.summary, "No summary available");
        assert_eq!(b.published, Published::Missing);
    }

    #[tokio::test]
    async fn test_per_feed_cap_and_summary_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let feed = local_feed(&dir, RSS);
        let articles = collect_articles(&[feed], FetchOptions::new(1, 1, 6))
            .await
            .unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].summary, "Shares...");
    }

    #[tokio::test]
    async fn test_cdata_summary_entities_are_decoded() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Blog</title>
    <link>https://blog.example.com/</link>
    <description>test</description>
    <item>
      <title>Outlook isn&#8217;t good</title>
      <link>https://blog.example.com/outlook</link>
      <description><![CDATA[<p>The recovery isn&#8217;t good &#8211; analysts</p>]]></description>
    </item>
  </channel>
</rss>"#;
        let dir = tempfile::tempdir().unwrap();
        let feed = local_feed(&dir, body);
        let articles = collect_articles(&[feed], FetchOptions::new(20, 1, 200))
            .await
            .unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Outlook isn\u{2019}t good");
        assert_eq!(articles[0].summary, "The recovery isn\u{2019}t good \u{2013} analysts");
    }

    #[tokio::test]
    async fn test_broken_feeds_are_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let good = local_feed(&dir, RSS);
        let garbage = {
            let path = dir.path().join("garbage.xml");
            std::fs::write(&path, "this is not xml").unwrap();
            Feed {
                name: "Garbage".into(),
                url: path.to_string_lossy().into_owned(),
            }
        };
        let bad_url = Feed {
            name: "Nowhere".into(),
            url: "not a url".into(),
        };
        let articles = collect_articles(&[garbage, bad_url, good], FetchOptions::new(20, 1, 200))
            .await
            .unwrap();
        assert_eq!(articles.len(), 2);
        assert!(articles.iter().all(|a| a.source == "Wire"));
    }

    #[test]
    fn test_normalize_link() {
        let base = Url::parse("https://example.com/news/").unwrap();
        assert_eq!(
            normalize_link("story?id=1", Some(&base)).as_deref(),
            Some("https://example.com/news/story?id=1")
        );
        assert_eq!(normalize_link("story", None), None);
        assert_eq!(normalize_link("  ", Some(&base)), None);
        assert_eq!(normalize_link("ftp://example.com/x", None), None);
    }
}
