// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Asking the user to choose.
//!
//! Target resolution never talks to the terminal directly. It goes through a
//! [`Prompter`], which is either the [`TerminalPrompter`] used interactively or
//! the [`NonInteractivePrompter`] used in machine mode, where every question
//! that would need an answer is an error instead.

use crate::errors::{Result, SquashError};
use dialoguer::console::Term;
use dialoguer::{Confirm, Select};
use std::fmt;
use tracing::debug;

/// What a selection is choosing between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionKind {
    Namespace,
    Pod,
    Container,
    Debugger,
}

impl SelectionKind {
    /// Question shown above the list of candidates.
    #[must_use]
    pub fn question(self) -> &'static str {
        match self {
            SelectionKind::Namespace => "Select a namespace to debug",
            SelectionKind::Pod => "Select a pod",
            SelectionKind::Container => "Select a container",
            SelectionKind::Debugger => "Select a debugger",
        }
    }

    /// Command-line flag that sets this value explicitly.
    #[must_use]
    pub fn flag(self) -> &'static str {
        match self {
            SelectionKind::Namespace => "--namespace",
            SelectionKind::Pod => "--pod",
            SelectionKind::Container => "--container",
            SelectionKind::Debugger => "--debugger",
        }
    }
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionKind::Namespace => "namespace",
            SelectionKind::Pod => "pod",
            SelectionKind::Container => "container",
            SelectionKind::Debugger => "debugger",
        };
        f.write_str(name)
    }
}

/// Capability to ask the user for a choice or a confirmation.
pub trait Prompter: Send + Sync {
    /// Ask the user to pick exactly one of `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt cannot be shown or is cancelled.
    fn select(&self, kind: SelectionKind, options: &[String]) -> Result<String>;

    /// Ask the user a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt cannot be shown.
    fn confirm(&self, message: &str) -> Result<bool>;
}

/// Prompts on the terminal's stderr so stdout stays clean for machine output.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn select(&self, kind: SelectionKind, options: &[String]) -> Result<String> {
        debug!(kind = %kind, candidates = options.len(), "Prompting for selection");

        let choice = Select::new()
            .with_prompt(kind.question())
            .items(options)
            .default(0)
            .interact_on_opt(&Term::stderr())
            .map_err(|e| SquashError::Prompt(e.to_string()))?;

        match choice {
            Some(index) => options
                .get(index)
                .cloned()
                .ok_or_else(|| SquashError::Prompt(format!("invalid {kind} selection"))),
            None => Err(SquashError::Prompt(format!("no {kind} selected"))),
        }
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        let answer = Confirm::new()
            .with_prompt(message)
            .default(true)
            .interact_on_opt(&Term::stderr())
            .map_err(|e| SquashError::Prompt(e.to_string()))?;

        Ok(answer.unwrap_or(false))
    }
}

/// Machine-mode prompter: any question that needs an answer is an error.
#[derive(Debug, Default)]
pub struct NonInteractivePrompter;

impl Prompter for NonInteractivePrompter {
    fn select(&self, kind: SelectionKind, options: &[String]) -> Result<String> {
        Err(SquashError::AmbiguousSelection {
            kind,
            count: options.len(),
        })
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        Err(SquashError::Configuration(format!(
            "cannot ask \"{message}\" in machine mode"
        )))
    }
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod prompt_tests;
