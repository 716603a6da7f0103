//! Search shortcuts. Each command answers with a ready-to-click query URL.

use crate::core::{Bot, Command, DeliveryPolicy, Handler, IncomingEvent, Sink};
use crate::error::{HandlerError, HandlerResult, RegistrationError};
use async_trait::async_trait;
use reqwest::Url;

/// A search site and how to put terms in its URL.
#[derive(Debug, Clone, Copy)]
pub struct Engine {
    pub name: &'static str,
    pub base: &'static str,
    pub param: &'static str,
}

pub const DUCKDUCKGO: Engine = Engine {
    name: "DuckDuckGo",
    base: "https://duckduckgo.com/",
    param: "q",
};

pub const WIKIPEDIA_EN: Engine = Engine {
    name: "Wikipedia",
    base: "https://en.wikipedia.org/w/index.php",
    param: "search",
};

pub const WIKIPEDIA_FR: Engine = Engine {
    name: "Wikipedia FR",
    base: "https://fr.wikipedia.org/w/index.php",
    param: "search",
};

pub const URBAN_DICTIONARY: Engine = Engine {
    name: "Urban Dictionary",
    base: "https://www.urbandictionary.com/define.php",
    param: "term",
};

impl Engine {
    pub fn query_url(&self, terms: &str) -> Result<Url, HandlerError> {
        Url::parse_with_params(self.base, [(self.param, terms)])
            .map_err(|e| HandlerError::Internal(format!("bad {} url: {}", self.name, e)))
    }
}

pub fn register(bot: &mut Bot) -> Result<(), RegistrationError> {
    let commands: [(&[&str], &str, Engine); 4] = [
        (&["!d", "!dg"], "!d/!dg <terms> => Search DuckDuckGo", DUCKDUCKGO),
        (&["!w", "!wiki"], "!w/!wiki <terms> => Search the English Wikipedia", WIKIPEDIA_EN),
        (&["!wf", "!wikifr"], "!wf/!wikifr <terms> => Search the French Wikipedia", WIKIPEDIA_FR),
        (&["!u", "!ud"], "!u/!ud <terms> => Search Urban Dictionary", URBAN_DICTIONARY),
    ];
    for (triggers, help, engine) in commands {
        bot.add_command(
            Command::new("search", triggers.iter().copied(), help, Search(engine)),
            DeliveryPolicy::ContextSensitive,
        )?;
    }
    Ok(())
}

struct Search(Engine);

#[async_trait]
impl Handler for Search {
    async fn handle(&self, event: &IncomingEvent, sink: &Sink<'_>) -> HandlerResult {
        let args = event.args();
        if args.is_empty() {
            return Ok(false);
        }
        let terms = args.join(" ");
        let url = self.0.query_url(&terms)?;
        sink.reply(format!("{} search for {:?}: {}", self.0.name, terms, url));
        Ok(true)
    }
}
