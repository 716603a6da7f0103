//! Link watcher.
//!
//! A scanner picks up the http(s) URLs said in a channel (at most
//! [`MAX_URLS_PER_LINE`] per line), remembers who posted each first and
//! replies with the page titles. `!url <terms>` searches the remembered links.

use super::{ModuleContext, format_timestamp};
use crate::core::{Bot, Command, DeliveryPolicy, Handler, IncomingEvent, MessageScanner, Sink};
use crate::db::Database;
use crate::error::{HandlerResult, RegistrationError};
use async_trait::async_trait;
use futures_util::future::join_all;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use std::sync::LazyLock;
use tracing::debug;

/// Only the head of a page is read when looking for its title.
const MAX_BODY_BYTES: usize = 64 * 1024;
const MAX_TITLE_CHARS: usize = 300;
const SEARCH_LIMIT: i64 = 5;
const MAX_URLS_PER_LINE: usize = 3;

const HELP_URL: &str = "!url <search terms> => Search the links posted in the channel";

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"']+"#).expect("link regex is valid"));

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex is valid"));

pub fn register(bot: &mut Bot, ctx: &ModuleContext) -> Result<(), RegistrationError> {
    bot.add_scanner(
        MessageScanner::new(
            "webinfo",
            LinkWatcher {
                db: ctx.db.clone(),
                http: ctx.http.clone(),
            },
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )?;
    bot.add_command(
        Command::new(
            "webinfo",
            ["!url"],
            HELP_URL,
            SearchLinks {
                db: ctx.db.clone(),
            },
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )
}

/// Distinct URLs in a line, in order of appearance.
pub fn find_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for m in URL_RE.find_iter(text) {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
        if !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }
    urls
}

/// The `<title>` of an HTML document, whitespace-collapsed and entity-decoded.
pub fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let decoded = decode_entities(&collapsed);
    if decoded.is_empty() {
        return None;
    }
    Some(match decoded.char_indices().nth(MAX_TITLE_CHARS) {
        Some((idx, _)) => format!("{}...", &decoded[..idx]),
        None => decoded,
    })
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

async fn fetch_title(http: &reqwest::Client, url: &str) -> Result<Option<String>, reqwest::Error> {
    let mut response = http.get(url).send().await?.error_for_status()?;

    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_none_or(|ct| ct.contains("html"));
    if !is_html {
        return Ok(None);
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() >= MAX_BODY_BYTES {
            break;
        }
    }
    Ok(extract_title(&String::from_utf8_lossy(&body)))
}

struct LinkWatcher {
    db: Database,
    http: reqwest::Client,
}

#[async_trait]
impl Handler for LinkWatcher {
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult {
        let mut urls = find_urls(event.raw_message());
        if urls.is_empty() {
            return Ok(false);
        }
        urls.truncate(MAX_URLS_PER_LINE);

        // Links are stored before any page is fetched.
        let links = self.db.links();
        for url in &urls {
            if let Some(previous) = links.find(url).await?
                && !previous.nick.eq_ignore_ascii_case(event.sender())
            {
                sink.reply(format!(
                    "Link already posted by {} ({})",
                    previous.nick,
                    format_timestamp(previous.created_at)
                ));
            }
            links.remember(url, event.sender(), "").await?;
        }

        let titles = join_all(urls.iter().map(|url| fetch_title(&self.http, url))).await;
        for (url, title) in urls.iter().zip(titles) {
            // An unreachable page only costs the title.
            let title = match title {
                Ok(Some(title)) => title,
                Ok(None) => continue,
                Err(e) => {
                    debug!(url = %url, error = %e, "Title fetch failed");
                    continue;
                }
            };
            sink.reply(format!("Title: {}", title));
            links.set_title(url, &title).await?;
        }
        Ok(true)
    }
}

struct SearchLinks {
    db: Database,
}

#[async_trait]
impl Handler for SearchLinks {
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult {
        let args = event.args();
        if args.is_empty() {
            return Ok(false);
        }
        let terms = args.join(" ");

        let found = self.db.links().search(&terms, SEARCH_LIMIT).await?;
        if found.is_empty() {
            sink.reply(format!("No link found for {:?}", terms));
        }
        for link in found {
            if link.title.is_empty() {
                sink.reply(format!("{} (posted by {})", link.url, link.nick));
            } else {
                sink.reply(format!("{} - {} (posted by {})", link.url, link.title, link.nick));
            }
        }
        Ok(true)
    }
}
