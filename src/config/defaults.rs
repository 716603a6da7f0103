//! Default value functions for configuration.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

pub fn default_port() -> u16 {
    6697
}

pub fn default_realname() -> String {
    "slirc-bot".to_string()
}

pub fn default_connect_timeout() -> u64 {
    30
}

pub fn default_registration_timeout() -> u64 {
    60
}

pub fn default_modules() -> Vec<String> {
    ["memo", "webinfo", "search", "xkcd", "pictures", "quote"]
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn default_handler_timeout() -> u64 {
    15
}

pub fn default_database_path() -> String {
    "slirc-bot.db".to_string()
}

pub fn default_messages_per_second() -> u32 {
    2
}

pub fn default_burst() -> u32 {
    4
}

pub fn default_log_filter() -> String {
    "info".to_string()
}
