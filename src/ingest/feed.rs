// src/ingest/feed.rs
//! Feed payload parser: JSON Feed documents (what `feed2json`-style relays
//! return) and generic RSS / Atom XML.
//!
//! Parsing never fails; anything unusable degrades to fewer (or zero) items.

use chrono::{DateTime, NaiveDate, Utc};
use metrics::{counter, histogram};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;
use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

use crate::ingest::normalize_text;
use crate::ingest::types::FeedItem;

pub const MAX_ITEMS_PER_FEED: usize = 12;

/// Parse with the default per-feed cap.
pub fn parse_feed(text: &str, source: &str) -> Vec<FeedItem> {
    parse_feed_capped(text, source, MAX_ITEMS_PER_FEED)
}

pub fn parse_feed_capped(text: &str, source: &str, cap: usize) -> Vec<FeedItem> {
    let t0 = std::time::Instant::now();

    let raw = if text.trim_start().starts_with('{') {
        match parse_json_feed(text) {
            Some(items) => items,
            None => parse_xml_feed(text),
        }
    } else {
        parse_xml_feed(text)
    };

    let out: Vec<FeedItem> = raw
        .into_iter()
        .filter_map(|r| r.into_item(source))
        .take(cap)
        .collect();

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("news_parse_ms").record(ms);
    counter!("news_feed_items_total").increment(out.len() as u64);
    out
}

/// Item fields as found in the document, before normalization.
#[derive(Debug, Default)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    link_fallback: Option<String>,
    guid: Option<String>,
    pub_date: Option<String>,
    updated: Option<String>,
    published: Option<String>,
    description: Option<String>,
    summary: Option<String>,
    content_encoded: Option<String>,
    content: Option<String>,
}

impl RawItem {
    fn into_item(self, source: &str) -> Option<FeedItem> {
        let title = normalize_text(self.title.as_deref().unwrap_or_default());
        let link = self
            .link
            .or(self.link_fallback)
            .or(self.guid)
            .map(|l| l.trim().to_string())
            .unwrap_or_default();
        if title.is_empty() && link.is_empty() {
            return None;
        }
        let date = non_empty(self.pub_date)
            .or(non_empty(self.updated))
            .or(non_empty(self.published));
        let summary = non_empty(self.description)
            .or(non_empty(self.summary))
            .or(non_empty(self.content_encoded))
            .or(non_empty(self.content))
            .map(|s| normalize_text(&s))
            .unwrap_or_default();

        Some(FeedItem {
            title,
            link,
            published_at: date.as_deref().and_then(parse_date),
            summary,
            source: source.to_string(),
        })
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

// ------------------------------------------------------------
// JSON Feed
// ------------------------------------------------------------

fn parse_json_feed(text: &str) -> Option<Vec<RawItem>> {
    let v: Value = serde_json::from_str(text.trim()).ok()?;
    let items = v
        .get("items")
        .and_then(Value::as_array)
        .or_else(|| v.pointer("/feed/items").and_then(Value::as_array));

    let Some(items) = items else {
        return Some(Vec::new());
    };

    let str_of = |n: &Value, k: &str| n.get(k).and_then(Value::as_str).map(str::to_string);

    Some(
        items
            .iter()
            .map(|n| RawItem {
                title: str_of(n, "title").map(|t| t.trim().to_string()),
                link: non_empty(str_of(n, "url")).or_else(|| non_empty(str_of(n, "link"))),
                pub_date: str_of(n, "date_published"),
                updated: str_of(n, "date_modified"),
                summary: str_of(n, "summary"),
                content: non_empty(str_of(n, "content_html"))
                    .or_else(|| str_of(n, "content_text")),
                ..RawItem::default()
            })
            .collect(),
    )
}

// ------------------------------------------------------------
// RSS / Atom XML
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Guid,
    PubDate,
    Updated,
    Published,
    Description,
    Summary,
    ContentEncoded,
    Content,
}

impl Field {
    fn from_tag(qname: &str) -> Option<Self> {
        match qname {
            "content:encoded" => return Some(Field::ContentEncoded),
            "dc:date" => return Some(Field::PubDate),
            _ => {}
        }
        // Other namespaced children (media:title, itunes:summary…) are ignored.
        if qname.contains(':') {
            return None;
        }
        match qname {
            "title" => Some(Field::Title),
            "link" => Some(Field::Link),
            "guid" | "id" => Some(Field::Guid),
            "pubdate" => Some(Field::PubDate),
            "updated" => Some(Field::Updated),
            "published" => Some(Field::Published),
            "description" => Some(Field::Description),
            "summary" => Some(Field::Summary),
            "content" => Some(Field::Content),
            _ => None,
        }
    }

    fn slot<'a>(&self, it: &'a mut RawItem) -> &'a mut Option<String> {
        match self {
            Field::Title => &mut it.title,
            Field::Link => &mut it.link_fallback,
            Field::Guid => &mut it.guid,
            Field::PubDate => &mut it.pub_date,
            Field::Updated => &mut it.updated,
            Field::Published => &mut it.published,
            Field::Description => &mut it.description,
            Field::Summary => &mut it.summary,
            Field::ContentEncoded => &mut it.content_encoded,
            Field::Content => &mut it.content,
        }
    }
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase()
}

fn attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}

/// Atom-style `<link href=…>`: prefer `rel="alternate"` (or no rel).
fn take_link_attr(e: &BytesStart<'_>, it: &mut RawItem) {
    let Some(href) = attr(e, "href") else {
        return;
    };
    let rel = attr(e, "rel");
    let primary = matches!(rel.as_deref(), None | Some("alternate"));
    if primary && it.link.is_none() {
        it.link = Some(href);
    } else if it.link_fallback.is_none() {
        it.link_fallback = Some(href);
    }
}

fn parse_xml_feed(text: &str) -> Vec<RawItem> {
    let mut reader = Reader::from_str(text);
    {
        let cfg = reader.config_mut();
        cfg.trim_text(true);
        cfg.check_end_names = false;
    }

    let mut out = Vec::new();
    let mut current: Option<RawItem> = None;
    let mut item_depth = 0usize;
    let mut depth = 0usize;
    let mut field: Option<(Field, usize)> = None;
    let mut buf = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = tag_name(&e);
                if current.is_none() {
                    if name == "item" || name == "entry" {
                        current = Some(RawItem::default());
                        item_depth = depth;
                    }
                    continue;
                }
                if field.is_none() {
                    if let Some(f) = Field::from_tag(&name) {
                        if let (Field::Link, Some(it)) = (f, current.as_mut()) {
                            take_link_attr(&e, it);
                        }
                        field = Some((f, depth));
                        buf.clear();
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let (Some(it), None) = (current.as_mut(), field) {
                    if tag_name(&e) == "link" {
                        take_link_attr(&e, it);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if field.is_some() {
                    // Unknown HTML entities (&nbsp; …) make unescape fail; keep
                    // the raw text and let normalize_text decode it.
                    let s = match t.unescape() {
                        Ok(s) => s.into_owned(),
                        Err(_) => String::from_utf8_lossy(&t).into_owned(),
                    };
                    push_text(&mut buf, &s);
                }
            }
            Ok(Event::CData(c)) => {
                if field.is_some() {
                    let s = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    push_text(&mut buf, &s);
                }
            }
            Ok(Event::End(_)) => {
                if let Some((f, d)) = field {
                    if d == depth {
                        if let Some(it) = current.as_mut() {
                            let slot = f.slot(it);
                            if slot.is_none() && !buf.trim().is_empty() {
                                *slot = Some(buf.trim().to_string());
                            }
                        }
                        field = None;
                        buf.clear();
                    }
                } else if current.is_some() && depth == item_depth {
                    if let Some(done) = current.take() {
                        out.push(done);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!(error = %e, position = reader.buffer_position(), "feed xml parse stopped");
                break;
            }
            _ => {}
        }
    }
    out
}

fn push_text(buf: &mut String, s: &str) {
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(s);
}

// ------------------------------------------------------------
// Dates
// ------------------------------------------------------------

/// RFC 2822 (RSS) via `time`, RFC 3339 (Atom / JSON Feed) or a bare
/// `YYYY-MM-DD` via `chrono`.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc2822) {
        return DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>World</title>
    <item>
      <title>Alpha wins election</title>
      <link>https://news.example/alpha</link>
      <pubDate>Mon, 01 Jan 2024 10:00:00 +0000</pubDate>
      <description><![CDATA[<p>Polls <b>closed</b> early.</p>]]></description>
      <media:title>ignored</media:title>
    </item>
    <item>
      <title>Markets&nbsp;rally &amp; close higher</title>
      <guid>https://news.example/markets</guid>
      <content:encoded>Stocks up.</content:encoded>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Tech</title>
  <entry>
    <title>Chip shortage eases</title>
    <link rel="self" href="https://tech.example/self/1"/>
    <link rel="alternate" href="https://tech.example/1"/>
    <updated>2024-03-05T08:30:00Z</updated>
    <summary>Supply improves.</summary>
  </entry>
</feed>"#;

    #[test]
    fn json_feed_shape_is_parsed() {
        let out = parse_feed(
            r#"{"items":[{"title":"X","url":"http://a","date_published":"2024-01-01"}]}"#,
            "Relay",
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "X");
        assert_eq!(out[0].link, "http://a");
        assert_eq!(out[0].source, "Relay");
        assert_eq!(
            out[0].published_at.map(|d| d.to_rfc3339()),
            Some("2024-01-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn json_feed_nested_items_and_content_fallback() {
        let out = parse_feed(
            r#"{"feed":{"items":[{"title":"  Y ","link":"http://b","content_text":"body"}]}}"#,
            "S",
        );
        assert_eq!(out[0].title, "Y");
        assert_eq!(out[0].link, "http://b");
        assert_eq!(out[0].summary, "body");
    }

    #[test]
    fn rss_items_are_normalized() {
        let out = parse_feed(RSS, "BBC World");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Alpha wins election");
        assert_eq!(out[0].link, "https://news.example/alpha");
        assert_eq!(out[0].summary, "Polls closed early.");
        assert!(out[0].published_at.is_some());

        assert_eq!(out[1].title, "Markets rally & close higher");
        assert_eq!(out[1].link, "https://news.example/markets");
        assert_eq!(out[1].summary, "Stocks up.");
        assert!(out[1].published_at.is_none());
    }

    #[test]
    fn atom_entries_prefer_alternate_link() {
        let out = parse_feed(ATOM, "Wired");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].link, "https://tech.example/1");
        assert_eq!(out[0].summary, "Supply improves.");
        assert!(out[0].published_at.is_some());
    }

    #[test]
    fn result_is_capped() {
        let mut xml = String::from("<rss><channel>");
        for i in 0..20 {
            xml.push_str(&format!("<item><title>T{i}</title><link>https://x/{i}</link></item>"));
        }
        xml.push_str("</channel></rss>");
        let out = parse_feed(&xml, "S");
        assert_eq!(out.len(), MAX_ITEMS_PER_FEED);
        assert_eq!(out[0].title, "T0");
    }

    #[test]
    fn garbage_degrades_to_empty() {
        assert!(parse_feed("", "S").is_empty());
        assert!(parse_feed("not a feed at all", "S").is_empty());
        assert!(parse_feed("{\"broken\": ", "S").is_empty());
        assert!(parse_feed("{\"other\": 1}", "S").is_empty());
    }

    #[test]
    fn dates_in_common_shapes() {
        use chrono::TimeZone;
        assert_eq!(
            parse_date("Tue, 10 Jun 2003 04:00:00 GMT"),
            Some(Utc.with_ymd_and_hms(2003, 6, 10, 4, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date("Mon, 01 Jan 2024 10:00:00 +0200"),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date("2024-03-05T08:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 6, 30, 0).unwrap())
        );
        assert_eq!(
            parse_date(" 2024-03-05 "),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("").is_none());
    }
}
