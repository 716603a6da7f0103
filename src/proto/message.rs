//! Owned IRC messages.

use std::fmt;
use std::str::FromStr;

use super::MessageParseError;

/// Message prefix identifying where a line came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefix {
    /// Server name (e.g. `irc.libera.chat`).
    ServerName(String),
    /// User prefix: (nickname, username, hostname).
    Nickname(String, String, String),
}

impl Prefix {
    /// Parse a prefix leniently; components are not validated.
    pub fn new_from_str(s: &str) -> Self {
        match s.split_once('!') {
            Some((nick, rest)) => {
                let (user, host) = rest.split_once('@').unwrap_or((rest, ""));
                Prefix::Nickname(nick.to_string(), user.to_string(), host.to_string())
            }
            None => match s.split_once('@') {
                Some((nick, host)) => {
                    Prefix::Nickname(nick.to_string(), String::new(), host.to_string())
                }
                // A bare word with a dot is a server; without one it is a nick.
                None if s.contains('.') => Prefix::ServerName(s.to_string()),
                None => Prefix::Nickname(s.to_string(), String::new(), String::new()),
            },
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{}", user)?;
                }
                if !host.is_empty() {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}

/// The IRC commands the bot sends or reacts to.
///
/// Anything else is kept as [`Command::Raw`] so it can be logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Command {
    PASS(String),
    NICK(String),
    /// USER username mode realname
    USER(String, String, String),
    /// JOIN channel [key]
    JOIN(String, Option<String>),
    PRIVMSG(String, String),
    NOTICE(String, String),
    PING(String, Option<String>),
    PONG(String, Option<String>),
    QUIT(Option<String>),
    ERROR(String),
    /// Numeric reply with its arguments.
    Response(u16, Vec<String>),
    Raw(String, Vec<String>),
}

impl Command {
    /// Build a command from its name and arguments.
    pub fn new(name: &str, mut args: Vec<String>) -> Result<Self, MessageParseError> {
        if name.is_empty() {
            return Err(MessageParseError::MissingCommand);
        }

        if name.len() == 3 && name.bytes().all(|b| b.is_ascii_digit()) {
            let code = name
                .parse::<u16>()
                .map_err(|_| MessageParseError::InvalidNumeric(name.to_string()))?;
            return Ok(Command::Response(code, args));
        }

        let upper = name.to_ascii_uppercase();
        let cmd = match (upper.as_str(), args.len()) {
            ("PASS", 1) => Command::PASS(args.remove(0)),
            ("NICK", n) if n >= 1 => Command::NICK(args.remove(0)),
            ("JOIN", 1) => Command::JOIN(args.remove(0), None),
            ("JOIN", 2) => {
                let key = args.pop();
                Command::JOIN(args.remove(0), key)
            }
            ("PRIVMSG", 2) => {
                let text = args.pop().unwrap_or_default();
                Command::PRIVMSG(args.remove(0), text)
            }
            ("NOTICE", 2) => {
                let text = args.pop().unwrap_or_default();
                Command::NOTICE(args.remove(0), text)
            }
            ("PING", 1) => Command::PING(args.remove(0), None),
            ("PING", 2) => {
                let second = args.pop();
                Command::PING(args.remove(0), second)
            }
            ("PONG", 1) => Command::PONG(args.remove(0), None),
            ("PONG", 2) => {
                let second = args.pop();
                Command::PONG(args.remove(0), second)
            }
            ("QUIT", 0) => Command::QUIT(None),
            ("QUIT", 1) => Command::QUIT(args.pop()),
            ("ERROR", 1) => Command::ERROR(args.remove(0)),
            _ => Command::Raw(upper.clone(), args),
        };
        Ok(cmd)
    }

    /// Wire name and arguments, plus whether the last argument is free text.
    fn parts(&self) -> (&str, Vec<&str>, bool) {
        match self {
            Command::PASS(p) => ("PASS", vec![p.as_str()], false),
            Command::NICK(n) => ("NICK", vec![n.as_str()], false),
            Command::USER(u, m, r) => ("USER", vec![u.as_str(), m.as_str(), "*", r.as_str()], true),
            Command::JOIN(c, None) => ("JOIN", vec![c.as_str()], false),
            Command::JOIN(c, Some(k)) => ("JOIN", vec![c.as_str(), k.as_str()], false),
            Command::PRIVMSG(t, m) => ("PRIVMSG", vec![t.as_str(), m.as_str()], true),
            Command::NOTICE(t, m) => ("NOTICE", vec![t.as_str(), m.as_str()], true),
            Command::PING(a, None) => ("PING", vec![a.as_str()], false),
            Command::PING(a, Some(b)) => ("PING", vec![a.as_str(), b.as_str()], false),
            Command::PONG(a, None) => ("PONG", vec![a.as_str()], false),
            Command::PONG(a, Some(b)) => ("PONG", vec![a.as_str(), b.as_str()], false),
            Command::QUIT(None) => ("QUIT", vec![], false),
            Command::QUIT(Some(r)) => ("QUIT", vec![r.as_str()], true),
            Command::ERROR(m) => ("ERROR", vec![m.as_str()], true),
            Command::Response(_, args) => ("", args.iter().map(String::as_str).collect(), false),
            Command::Raw(name, args) => (name, args.iter().map(String::as_str).collect(), false),
        }
    }
}

/// An owned IRC message. IRCv3 tags are accepted on input and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<Prefix>,
    pub command: Command,
}

impl Message {
    #[must_use]
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Command::PRIVMSG(target.into(), text.into()).into()
    }

    #[must_use]
    pub fn join(channel: impl Into<String>, key: Option<String>) -> Self {
        Command::JOIN(channel.into(), key).into()
    }

    /// Nickname of the sender, if the prefix is a user prefix.
    pub fn source_nickname(&self) -> Option<&str> {
        match &self.prefix {
            Some(Prefix::Nickname(nick, _, _)) => Some(nick),
            _ => None,
        }
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message {
            prefix: None,
            command,
        }
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rest = s.trim_end_matches(['\r', '\n']).trim_start_matches(' ');
        if rest.is_empty() {
            return Err(MessageParseError::Empty);
        }

        if rest.starts_with('@') {
            rest = rest
                .split_once(' ')
                .map(|(_, r)| r.trim_start_matches(' '))
                .unwrap_or("");
        }

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (raw, r) = stripped.split_once(' ').unwrap_or((stripped, ""));
                rest = r.trim_start_matches(' ');
                Some(Prefix::new_from_str(raw))
            }
            None => None,
        };

        let (name, mut params) = rest.split_once(' ').unwrap_or((rest, ""));
        if name.is_empty() {
            return Err(MessageParseError::MissingCommand);
        }

        let mut args = Vec::new();
        loop {
            params = params.trim_start_matches(' ');
            if params.is_empty() {
                break;
            }
            if let Some(trailing) = params.strip_prefix(':') {
                args.push(trailing.to_string());
                break;
            }
            let (arg, r) = params.split_once(' ').unwrap_or((params, ""));
            args.push(arg.to_string());
            params = r;
        }

        Ok(Message {
            prefix,
            command: Command::new(name, args)?,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }

        if let Command::Response(code, _) = &self.command {
            write!(f, "{:03}", code)?;
        }

        let (name, args, text_last) = self.command.parts();
        f.write_str(name)?;

        let count = args.len();
        for (i, arg) in args.into_iter().enumerate() {
            let last = i + 1 == count;
            let needs_colon =
                last && (text_last || arg.is_empty() || arg.contains(' ') || arg.starts_with(':'));
            if needs_colon {
                write!(f, " :{}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Whether a target names a channel rather than a nick.
pub fn is_channel_name(target: &str) -> bool {
    matches!(target.chars().next(), Some('#' | '&' | '+' | '!')) && target.len() > 1
}
