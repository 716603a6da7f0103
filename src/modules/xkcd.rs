//! `!xkcd [number]`: title and link of the latest or a given comic.

use super::ModuleContext;
use crate::core::{Bot, Command, DeliveryPolicy, Handler, IncomingEvent, Sink};
use crate::error::{HandlerResult, RegistrationError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

pub const XKCD_BASE_URL: &str = "https://xkcd.com";

const HELP: &str = "!xkcd [number] => Show the latest xkcd comic, or comic <number>";

/// The part of the JSON API response we use.
#[derive(Debug, Clone, Deserialize)]
pub struct Comic {
    pub num: u32,
    pub safe_title: String,
}

pub fn register(bot: &mut Bot, ctx: &ModuleContext) -> Result<(), RegistrationError> {
    register_with_base(bot, ctx, XKCD_BASE_URL)
}

/// Register against another API host.
pub fn register_with_base(
    bot: &mut Bot,
    ctx: &ModuleContext,
    base_url: &str,
) -> Result<(), RegistrationError> {
    bot.add_command(
        Command::new(
            "xkcd",
            ["!xkcd"],
            HELP,
            Xkcd {
                http: ctx.http.clone(),
                base_url: base_url.trim_end_matches('/').to_string(),
            },
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )
}

struct Xkcd {
    http: reqwest::Client,
    base_url: String,
}

impl Xkcd {
    fn api_url(&self, number: Option<u32>) -> String {
        match number {
            Some(n) => format!("{}/{}/info.0.json", self.base_url, n),
            None => format!("{}/info.0.json", self.base_url),
        }
    }
}

#[async_trait]
impl Handler for Xkcd {
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult {
        let number = match event.args().as_slice() {
            [] => None,
            [n] => match n.parse::<u32>() {
                Ok(n) => Some(n),
                Err(_) => return Ok(false),
            },
            _ => return Ok(false),
        };

        let response = self.http.get(self.api_url(number)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            sink.reply(format!("No xkcd comic #{}", number.unwrap_or_default()));
            return Ok(true);
        }
        let comic: Comic = response.error_for_status()?.json().await?;
        sink.reply(format!(
            "xkcd #{}: {} - {}/{}/",
            comic.num, comic.safe_title, XKCD_BASE_URL, comic.num
        ));
        Ok(true)
    }
}
