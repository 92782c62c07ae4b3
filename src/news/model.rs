use serde::{Serialize, Serializer};
use std::fmt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Publication time of an article.
///
/// feed-rs hands back dates it could parse and drops the rest, so fetched
/// articles carry `Timestamp` or `Missing`. `Raw` holds text that
/// [`Published::parse`] could not read as RFC 3339; it is shown and
/// serialized verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Published {
    Timestamp(OffsetDateTime),
    Raw(String),
    Missing,
}

impl Published {
    /// Parse an RFC 3339 date, keeping anything else verbatim.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Published::Missing;
        }
        match OffsetDateTime::parse(trimmed, &Rfc3339) {
            Ok(ts) => Published::Timestamp(ts),
            Err(_) => Published::Raw(trimmed.to_string()),
        }
    }
}

impl fmt::Display for Published {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Published::Timestamp(ts) => {
                let fmt =
                    time::macros::format_description!("[year]-[month]-[day] [hour]:[minute] UTC");
                match ts.to_offset(time::UtcOffset::UTC).format(fmt) {
                    Ok(s) => f.write_str(&s),
                    Err(_) => f.write_str("?"),
                }
            }
            Published::Raw(s) => f.write_str(s),
            Published::Missing => Ok(()),
        }
    }
}

// RFC 3339 string, raw text, or null.
impl Serialize for Published {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Published::Timestamp(ts) => match ts.format(&Rfc3339) {
                Ok(s) => serializer.serialize_str(&s),
                Err(e) => Err(serde::ser::Error::custom(e)),
            },
            Published::Raw(s) => serializer.serialize_str(s),
            Published::Missing => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub source: String,
    pub title: String,
    pub link: String,
    pub published: Published,
    pub summary: String,
}
