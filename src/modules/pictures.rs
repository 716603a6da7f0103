//! Picture commands: `!p`/`!pic`, `!addpic`, `!rmpic`.
//!
//! Pictures are image URLs filed under a lower-cased tag. A tag holds at most
//! [`MAX_PICTURES_PER_TAG`] pictures and a URL can only be stored once.

use super::ModuleContext;
use crate::core::{Bot, Command, DeliveryPolicy, Handler, IncomingEvent, Sink};
use crate::db::Database;
use crate::error::{HandlerResult, RegistrationError};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::info;

pub const MAX_PICTURES_PER_TAG: i64 = 5;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
const NSFW_MARKER: &str = "#nsfw";

const HELP_SEARCH: &str = "!p/!pic <search terms> => Search the database for pictures matching <search terms>";
const HELP_ADD: &str = "!addpic <url> <tag> [#NSFW] => Add a picture for <tag> (<url> must have an image extension)";
const HELP_REMOVE: &str = "!rmpic <url> <tag> => Remove a picture for <tag> (admin only)";

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:https?://|www\d{0,3}\.|[a-z0-9.\-]+\.[a-z]{2,4}/)[^\s<>]+$")
        .expect("picture URL regex is valid")
});

pub fn register(bot: &mut Bot, ctx: &ModuleContext) -> Result<(), RegistrationError> {
    bot.add_command(
        Command::new(
            "pictures",
            ["!p", "!pic"],
            HELP_SEARCH,
            SearchPictures {
                db: ctx.db.clone(),
            },
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )?;
    bot.add_command(
        Command::new(
            "pictures",
            ["!addpic"],
            HELP_ADD,
            AddPicture {
                db: ctx.db.clone(),
            },
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )?;
    bot.add_command(
        Command::new(
            "pictures",
            ["!rmpic"],
            HELP_REMOVE,
            RemovePicture {
                db: ctx.db.clone(),
                admins: Arc::clone(&ctx.admins),
            },
        ),
        DeliveryPolicy::BroadcastToOrigin,
    )
}

/// Whether `url` looks like a link to an image.
pub fn is_image_url(url: &str) -> bool {
    if !URL_RE.is_match(url) {
        return false;
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

struct SearchPictures {
    db: Database,
}

#[async_trait]
impl Handler for SearchPictures {
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult {
        let args = event.args();
        if args.is_empty() {
            return Ok(false);
        }
        let terms = args.join(" ").to_lowercase();

        let pictures = self.db.pictures().search(&terms).await?;
        if pictures.is_empty() {
            sink.reply(format!("No picture found for tag {:?}", terms));
        }
        for picture in pictures {
            let marker = if picture.nsfw { " (#NSFW)" } else { "" };
            sink.reply(format!(
                "Picture for {:?}{} : {}",
                picture.tag, marker, picture.url
            ));
        }
        Ok(true)
    }
}

struct AddPicture {
    db: Database,
}

#[async_trait]
impl Handler for AddPicture {
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult {
        let args = event.args();
        let [url, tag_words @ ..] = args.as_slice() else {
            return Ok(false);
        };
        if tag_words.is_empty() {
            return Ok(false);
        }

        let (nsfw, tag_words) = match tag_words.split_last() {
            Some((last, rest)) if last.eq_ignore_ascii_case(NSFW_MARKER) => (true, rest),
            _ => (false, tag_words),
        };
        let tag = tag_words.join(" ").to_lowercase();

        if tag.is_empty() || !is_image_url(url) {
            sink.reply("Incorrect format for the \"Add Picture\" command (see !help)");
            return Ok(true);
        }

        let pictures = self.db.pictures();
        if pictures.count_for_tag(&tag).await? >= MAX_PICTURES_PER_TAG {
            sink.reply(format!("There are already too many pictures for the tag {:?}", tag));
            return Ok(true);
        }
        if let Some(existing) = pictures.tag_of(url).await? {
            sink.reply(format!("This picture is already present for the tag {:?}", existing));
            return Ok(true);
        }

        pictures.add(&tag, url, event.sender(), nsfw).await?;
        info!(tag = %tag, url = %url, nick = %event.sender(), nsfw, "Picture added");
        sink.reply(format!("Picture {:?} added for tag {:?}", url, tag));
        Ok(true)
    }
}

struct RemovePicture {
    db: Database,
    admins: Arc<[String]>,
}

#[async_trait]
impl Handler for RemovePicture {
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult {
        let args = event.args();
        let [url, tag_words @ ..] = args.as_slice() else {
            return Ok(false);
        };
        if tag_words.is_empty() {
            return Ok(false);
        }

        let is_admin = self
            .admins
            .iter()
            .any(|a| a.eq_ignore_ascii_case(event.sender()));
        if !is_admin {
            sink.reply(format!(
                "You need to be an administrator to run this command (Admins: {})",
                self.admins.join(", ")
            ));
            return Ok(true);
        }

        let tag = tag_words.join(" ").to_lowercase();
        if self.db.pictures().remove(&tag, url).await? {
            info!(tag = %tag, url = %url, nick = %event.sender(), "Picture removed");
            sink.reply(format!("Picture {:?} removed for tag {:?}", url, tag));
        } else {
            sink.reply(format!("No picture {:?} for tag {:?}", url, tag));
        }
        Ok(true)
    }
}
