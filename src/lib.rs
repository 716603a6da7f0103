//! slirc-bot - Straylight IRC Bot
//!
//! A modular IRC bot. Feature modules register trigger-keyed commands and
//! unconditional message scanners on a [`core::Bot`]; the dispatch engine
//! routes each inbound line to them and delivers replies according to the
//! delivery policy each handler was registered with.

pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod modules;
pub mod network;
pub mod proto;
pub mod telemetry;
