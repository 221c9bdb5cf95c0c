/*
 * Copyright 2024 The netqasm-assembler contributors
 *
 * This file is part of netqasm-assembler.
 *
 * netqasm-assembler is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Lesser General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * netqasm-assembler is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Lesser General Public License for more details.
 *
 * You should have received a copy of the GNU Lesser General Public License
 * along with netqasm-assembler.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Module containing the branch label resolution passes
//!
//! Resolution is performed in 2 passes to allow forward references:
//!
//! 1. Labels are removed from the sequence, recording the index of the command following each of
//!    them in a [`Table`]
//! 2. Label operands are replaced with the index recorded for them

use std::collections::HashMap;

use super::{AssemblyError, ErrorKind, Tracked};
use crate::error_rendering::get_similar;
use crate::subroutine::{Command, Item, Operand};

/// Definition of a branch label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    /// Index of the command the label points to
    pub index: i64,
    /// Index of the item with the definition in the input sequence
    pub origin: usize,
}

/// Symbol table for branch labels
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table(HashMap<String, Label>);

impl Table {
    /// Inserts a new label in the table
    ///
    /// # Errors
    ///
    /// Errors if the label was already defined
    pub fn insert(&mut self, name: String, label: Label) -> Result<(), AssemblyError> {
        if let Some(previous) = self.0.get(&name) {
            return Err(ErrorKind::DuplicateLabel {
                name,
                previous: previous.origin,
            }
            .at(label.origin));
        }
        self.0.insert(name, label);
        Ok(())
    }

    /// Gets the definition of a label
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Label> {
        self.0.get(name)
    }

    /// Iterates over the names of the defined labels
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Removes the label definitions from a sequence, recording them in a table
///
/// # Errors
///
/// Errors if a label is defined multiple times
pub fn collect(items: Tracked<Item>) -> Result<(Table, Tracked<Command>), AssemblyError> {
    let mut table = Table::default();
    let mut commands = Vec::with_capacity(items.len());
    let mut index = 0;
    for (item, origin) in items {
        match item {
            Item::Command(cmd) => {
                commands.push((cmd, origin));
                index += 1;
            }
            Item::BranchLabel(name) => {
                log::trace!("label `{name}` points to command {index}");
                table.insert(name, Label { index, origin })?;
            }
        }
    }
    Ok((table, commands))
}

/// Replaces the label operands of a sequence with the index of the command they point to
///
/// # Errors
///
/// Errors if a label isn't defined in the table
pub fn substitute(
    commands: Tracked<Command>,
    table: &Table,
) -> Result<Tracked<Command>, AssemblyError> {
    commands
        .into_iter()
        .map(|(cmd, origin)| {
            let operands = cmd
                .operands
                .into_iter()
                .map(|operand| match operand {
                    Operand::Label(name) => match table.get(&name) {
                        Some(label) => Ok(Operand::Constant(label.index)),
                        None => Err(ErrorKind::UnknownLabel {
                            similar: get_similar(&name, table.names())
                                .into_iter()
                                .map(str::to_owned)
                                .collect(),
                            name,
                        }
                        .at(origin)),
                    },
                    operand => Ok(operand),
                })
                .collect::<Result<_, _>>()?;
            Ok((Command { operands, ..cmd }, origin))
        })
        .collect()
}

/// Resolves all the branch labels of a sequence
///
/// # Errors
///
/// Errors if a label is defined multiple times or used without being defined
pub fn resolve(items: Tracked<Item>) -> Result<Tracked<Command>, AssemblyError> {
    let (table, commands) = collect(items)?;
    log::debug!(
        "resolving {} labels over {} commands",
        table.len(),
        commands.len()
    );
    substitute(commands, &table)
}
