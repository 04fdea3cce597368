// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Full-screen focus state
//!
//! At most one table is focused. Focus is only offered while nothing is
//! focused, and a focused table only offers exit, so moving from one table
//! to another always passes through `Unfocused`.

use crate::error::FocusError;
use diagnostics::*;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FocusState {
    #[default]
    Unfocused,
    FocusedOn(String),
}

impl FocusState {
    #[must_use]
    pub fn focused_table(&self) -> Option<&str> {
        match self {
            FocusState::Unfocused => None,
            FocusState::FocusedOn(id) => Some(id),
        }
    }

    #[must_use]
    pub fn is_focused(&self) -> bool {
        matches!(self, FocusState::FocusedOn(_))
    }
}

impl fmt::Display for FocusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FocusState::Unfocused => write!(f, "unfocused"),
            FocusState::FocusedOn(id) => write!(f, "focused on {id}"),
        }
    }
}

/// Discrete user actions that drive the focus state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// "Full Screen" on a table
    Focus(String),
    /// "Exit Full Screen"
    ExitFocus,
}

/// Focus state machine over a fixed set of table ids
#[derive(Debug, Clone)]
pub struct FocusController {
    state: FocusState,
    known: BTreeSet<String>,
}

impl FocusController {
    #[must_use]
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: FocusState::Unfocused,
            known: tables.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &FocusState {
        &self.state
    }

    /// Actions available to the user in the current state
    #[must_use]
    pub fn available_actions(&self) -> Vec<UserAction> {
        match &self.state {
            FocusState::Unfocused => self
                .known
                .iter()
                .map(|id| UserAction::Focus(id.clone()))
                .collect(),
            FocusState::FocusedOn(_) => vec![UserAction::ExitFocus],
        }
    }

    /// `Unfocused -> FocusedOn(table)`
    pub fn focus(&mut self, table: &str) -> Result<(), FocusError> {
        if !self.known.contains(table) {
            return Err(FocusError::UnknownTable(table.to_string()));
        }
        if let FocusState::FocusedOn(current) = &self.state {
            return Err(FocusError::AlreadyFocused {
                current: current.clone(),
                requested: table.to_string(),
            });
        }
        self.state = FocusState::FocusedOn(table.to_string());
        info!("Entered full screen on {table}", table: table);
        Ok(())
    }

    /// `FocusedOn(_) -> Unfocused`
    pub fn exit_focus(&mut self) -> Result<(), FocusError> {
        match std::mem::take(&mut self.state) {
            FocusState::Unfocused => Err(FocusError::NotFocused),
            FocusState::FocusedOn(table) => {
                info!("Exited full screen on {table}", table: table);
                Ok(())
            }
        }
    }

    /// Apply one action. Rejected actions leave the state unchanged.
    pub fn apply(&mut self, action: &UserAction) -> Result<(), FocusError> {
        let result = match action {
            UserAction::Focus(table) => self.focus(table),
            UserAction::ExitFocus => self.exit_focus(),
        };
        if let Err(e) = &result {
            let reason = e.to_string();
            error!("Rejected focus transition: {reason}", reason: reason);
        }
        result
    }
}
