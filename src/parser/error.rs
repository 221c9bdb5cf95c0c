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

//! Module containing the definition of the errors produced while parsing subroutines

use thiserror::Error;

use crate::error_rendering::{suggestion, ArgNum, Diagnostic};
use crate::instructions::{FieldType, REGISTRY};
use crate::span::Span;

/// Error caused by text that doesn't follow the grammar of the language
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("preamble directives must appear before any instruction")]
    HeaderAfterBody,
    #[error("closing bracket `{0}` doesn't have a matching opening bracket")]
    UnmatchedBracket(char),
    #[error("bracket `{0}` is never closed")]
    UnclosedBracket(char),
    #[error("directive `{directive}` expects {} but {found} were given", ArgNum(*.expected, None))]
    DirectiveArity {
        directive: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid version `{0}`, expected `<major>.<minor>`")]
    InvalidVersion(String),
    #[error("invalid program id `{0}`, expected an integer between 0 and 65535")]
    InvalidProgramId(String),
    #[error("invalid label name `{0}`")]
    InvalidLabel(String),
    #[error("malformed argument list in `{0}`")]
    MalformedArguments(String),
    #[error("invalid argument `{0}`, expected an integer")]
    InvalidArgument(String),
    #[error("invalid operand `{token}`: {reason}")]
    InvalidOperand { token: String, reason: String },
    #[error("instruction `{mnemonic}` expects {} but {found} were given", ArgNum(*.expected, None))]
    CommandArity {
        mnemonic: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("operand {position} of `{mnemonic}` must be {}", article(*.expected))]
    OperandKind {
        mnemonic: &'static str,
        position: usize,
        expected: FieldType,
    },
    #[error("value `{value}` is out of range for operand {position} of `{mnemonic}`")]
    OutOfRange {
        value: i64,
        mnemonic: &'static str,
        position: usize,
    },
    #[error("label `{label}` can't be used as operand {position} of `{mnemonic}`")]
    LabelNotAllowed {
        label: String,
        mnemonic: &'static str,
        position: usize,
    },
}

/// Formats a field type preceded by its indefinite article
fn article(field: FieldType) -> String {
    let name = field.to_string();
    let a = if name.starts_with(['a', 'e', 'i', 'o', 'u']) { "an" } else { "a" };
    format!("{a} {name}")
}

/// Error caused by references to unknown or repeated entities
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstructionError {
    #[error("unknown directive `{0}`")]
    UnknownDirective(String),
    #[error("missing required directive `{0}`")]
    MissingDirective(&'static str),
    #[error("directive `{name}` can only be used once")]
    DuplicateDirective { name: &'static str, previous: Span },
    #[error("invalid macro name `{0}`")]
    InvalidMacroKey(String),
    #[error("macro `{name}` is defined multiple times")]
    DuplicateMacro { name: String, previous: Span },
    #[error("unknown instruction `{0}`")]
    UnknownInstruction(String),
}

/// Type of a parsing error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Kind {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Instruction(#[from] InstructionError),
}

/// Error produced while parsing a subroutine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct Error {
    /// Type of the error
    pub kind: Kind,
    /// Location in the source code that caused the error
    pub span: Span,
}

impl SyntaxError {
    /// Adds a span to the error, promoting it to a full [`Error`]
    #[must_use]
    pub const fn add_span(self, span: Span) -> Error {
        Error {
            kind: Kind::Syntax(self),
            span,
        }
    }
}

impl InstructionError {
    /// Adds a span to the error, promoting it to a full [`Error`]
    #[must_use]
    pub const fn add_span(self, span: Span) -> Error {
        Error {
            kind: Kind::Instruction(self),
            span,
        }
    }
}

impl Kind {
    /// Gets the message attached to the location of the error
    const fn label(&self) -> &'static str {
        match self {
            Self::Syntax(SyntaxError::HeaderAfterBody) => "Directive found here",
            Self::Syntax(SyntaxError::UnmatchedBracket(_) | SyntaxError::UnclosedBracket(_)) => {
                "Unbalanced bracket"
            }
            Self::Syntax(SyntaxError::CommandArity { .. } | SyntaxError::DirectiveArity { .. }) => {
                "Wrong number of operands"
            }
            Self::Syntax(SyntaxError::OutOfRange { .. }) => "Value out of range",
            Self::Syntax(_) => "Invalid syntax",
            Self::Instruction(InstructionError::DuplicateDirective { .. })
            | Self::Instruction(InstructionError::DuplicateMacro { .. }) => "Duplicate definition",
            Self::Instruction(InstructionError::MissingDirective(_)) => "Expected in the preamble",
            Self::Instruction(_) => "Unknown name",
        }
    }

    /// Gets a note with possible corrections for the error
    fn note(&self, color: bool) -> Option<String> {
        match self {
            Self::Instruction(InstructionError::UnknownDirective(name)) => {
                suggestion(name, super::preamble::DIRECTIVES.iter().copied(), color)
            }
            Self::Instruction(InstructionError::UnknownInstruction(name)) => {
                suggestion(name, REGISTRY.mnemonics(), color)
            }
            Self::Syntax(SyntaxError::HeaderAfterBody) => {
                Some("Move the directive to the start of the subroutine".into())
            }
            _ => None,
        }
    }
}

impl crate::RenderError for Error {
    fn format(&self, filename: &str, src: &str, buffer: &mut Vec<u8>, color: bool) {
        let context = match &self.kind {
            Kind::Instruction(
                InstructionError::DuplicateDirective { previous, .. }
                | InstructionError::DuplicateMacro { previous, .. },
            ) => Some((previous.clone(), "Previously defined here".to_owned())),
            _ => None,
        };
        Diagnostic {
            span: self.span.clone(),
            message: self.kind.to_string(),
            label: self.kind.label().to_owned(),
            context,
            note: self.kind.note(color),
        }
        .write(filename, src, buffer, color);
    }
}
