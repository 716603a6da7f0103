//! Handler registry: trigger-keyed commands and ordered scanners.
//!
//! Populated during startup, then frozen behind an `Arc` and shared with the
//! dispatcher. No locking is needed because nothing registers after that.

use super::handler::{Command, MessageScanner};
use super::policy::DeliveryPolicy;
use crate::error::RegistrationError;
use std::collections::HashMap;
use tracing::debug;

/// A command together with its delivery policy.
#[derive(Debug, Clone)]
pub struct RegisteredCommand {
    pub command: Command,
    pub policy: DeliveryPolicy,
}

/// A scanner together with its delivery policy.
#[derive(Debug, Clone)]
pub struct RegisteredScanner {
    pub scanner: MessageScanner,
    pub policy: DeliveryPolicy,
}

/// Registry of commands and scanners.
#[derive(Debug, Default)]
pub struct Registry {
    commands: Vec<RegisteredCommand>,
    /// Trigger -> index into `commands`.
    triggers: HashMap<String, usize>,
    scanners: Vec<RegisteredScanner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under all of its triggers.
    ///
    /// Either every trigger is added or, on error, none is.
    pub fn register_command(
        &mut self,
        command: Command,
        policy: DeliveryPolicy,
    ) -> Result<(), RegistrationError> {
        if command.triggers().is_empty() {
            return Err(RegistrationError::NoTriggers(command.module().to_string()));
        }

        for (i, trigger) in command.triggers().iter().enumerate() {
            if trigger.is_empty() || trigger.chars().any(char::is_whitespace) {
                return Err(RegistrationError::InvalidTrigger(trigger.clone()));
            }
            if command.triggers()[..i].contains(trigger) {
                return Err(RegistrationError::DuplicateTrigger {
                    trigger: trigger.clone(),
                    module: command.module().to_string(),
                    existing: command.module().to_string(),
                });
            }
            if let Some(&idx) = self.triggers.get(trigger) {
                return Err(RegistrationError::DuplicateTrigger {
                    trigger: trigger.clone(),
                    module: command.module().to_string(),
                    existing: self.commands[idx].command.module().to_string(),
                });
            }
        }

        let idx = self.commands.len();
        for trigger in command.triggers() {
            self.triggers.insert(trigger.clone(), idx);
        }
        debug!(
            module = %command.module(),
            triggers = ?command.triggers(),
            policy = ?policy,
            "Command registered"
        );
        self.commands.push(RegisteredCommand { command, policy });
        Ok(())
    }

    /// Append a scanner; scanners run in registration order.
    pub fn register_scanner(&mut self, scanner: MessageScanner, policy: DeliveryPolicy) {
        debug!(module = %scanner.module(), policy = ?policy, "Scanner registered");
        self.scanners.push(RegisteredScanner { scanner, policy });
    }

    /// Exact, case-sensitive lookup of a first token.
    pub fn lookup_command(&self, token: &str) -> Option<&RegisteredCommand> {
        self.triggers.get(token).map(|&idx| &self.commands[idx])
    }

    /// Scanners in registration order.
    pub fn scanners(&self) -> &[RegisteredScanner] {
        &self.scanners
    }

    /// Commands in registration order.
    pub fn commands(&self) -> &[RegisteredCommand] {
        &self.commands
    }

    /// Help lines of every command, in registration order.
    pub fn help_lines(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|c| c.command.help().to_string())
            .filter(|h| !h.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.scanners.is_empty()
    }
}
