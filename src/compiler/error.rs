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

//! Module containing the definition of the errors produced while assembling subroutines

use thiserror::Error;

use crate::error_rendering::{Diagnostic, DisplayList};
use crate::parser::ParseError;
use crate::span::Span;
use crate::subroutine::REGISTERS_PER_BANK;
use crate::RenderError;

/// Type of an assembly error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Kind {
    #[error("branch label `{name}` is defined multiple times")]
    DuplicateLabel {
        name: String,
        /// Index of the item with the previous definition
        previous: usize,
    },
    #[error("branch label `{name}` isn't defined")]
    UnknownLabel {
        name: String,
        /// Names of the defined labels similar to the unknown one
        similar: Vec<String>,
    },
    #[error("not enough free registers to lower the constants of `{mnemonic}`")]
    RegistersExhausted { mnemonic: &'static str },
}

/// Error produced while assembling a subroutine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct Error {
    /// Type of the error
    pub kind: Kind,
    /// Index of the item of the input subroutine that caused the error
    pub item: usize,
}

impl Kind {
    /// Adds the index of the item that caused the error, promoting it to a full [`Error`]
    #[must_use]
    pub const fn at(self, item: usize) -> Error {
        Error { kind: self, item }
    }

    /// Gets the message attached to the location of the error
    const fn label(&self) -> &'static str {
        match self {
            Self::DuplicateLabel { .. } => "Duplicate label",
            Self::UnknownLabel { .. } => "Unknown label",
            Self::RegistersExhausted { .. } => "Too many constants",
        }
    }

    /// Gets a note with more information about the error
    fn note(&self, color: bool) -> Option<String> {
        match self {
            Self::DuplicateLabel { .. } => None,
            Self::UnknownLabel { similar, .. } => (!similar.is_empty()).then(|| {
                let names = similar.iter().map(String::as_str).collect();
                format!("Did you mean {}?", DisplayList::new(names, color))
            }),
            Self::RegistersExhausted { .. } => Some(format!(
                "Constants are lowered into the {REGISTERS_PER_BANK} `R` registers, excluding \
                 the ones used by the instruction or bound by `set` instructions"
            )),
        }
    }
}

/// Error produced while compiling a subroutine from its text representation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The code couldn't be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The parsed code couldn't be assembled
    #[error("{error}")]
    Assembly {
        error: Error,
        /// Location of the item that caused the error
        span: Span,
        /// Location of a previous definition related to the error
        previous: Option<Span>,
    },
}

impl RenderError for CompileError {
    fn format(&self, filename: &str, src: &str, buffer: &mut Vec<u8>, color: bool) {
        match self {
            Self::Parse(e) => e.format(filename, src, buffer, color),
            Self::Assembly {
                error,
                span,
                previous,
            } => Diagnostic {
                span: span.clone(),
                message: error.to_string(),
                label: error.kind.label().to_owned(),
                context: previous
                    .clone()
                    .map(|span| (span, "Previously defined here".to_owned())),
                note: error.kind.note(color),
            }
            .write(filename, src, buffer, color),
        }
    }
}
