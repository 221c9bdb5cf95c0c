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

//! Module containing the parser for the preamble directives
//!
//! The preamble is the block of lines starting with `#` at the beginning of a subroutine. It must
//! contain exactly one version directive and one program id directive, and can contain any amount
//! of macro definitions

use regex::Regex;

use std::collections::HashMap;
use std::sync::LazyLock;

use super::{split_words, InstructionError, Line, Locator, ParseError, SyntaxError};
use crate::span::{Span, Spanned};
use crate::subroutine::Version;

/// Names of the directives that can be used in the preamble
pub const DIRECTIVES: &[&str] = &["NETQASM", "VERSION", "APPID", "PROGRAM-ID", "DEFINE"];

/// Macro definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    /// Name used to reference the macro
    pub key: String,
    /// Text the references are replaced with
    pub value: String,
    /// Location of the definition in the source code
    pub span: Span,
}

/// Data extracted from the preamble
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    pub version: Version,
    pub program_id: u16,
    /// Macro definitions, in definition order
    pub macros: Vec<Macro>,
}

/// Checks that a directive has the expected amount of operands
fn check_arity(
    directive: &'static str,
    args: &[Spanned<&str>],
    expected: usize,
    span: &Span,
) -> Result<(), ParseError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(SyntaxError::DirectiveArity {
            directive,
            expected,
            found: args.len(),
        }
        .add_span(span.clone()))
    }
}

/// Parses a `major.minor` version number
fn parse_version((text, span): &Spanned<&str>) -> Result<Version, ParseError> {
    static VERSION: LazyLock<Regex> = crate::regex!(r"^(\d+)\.(\d+)$");
    VERSION
        .captures(text)
        .and_then(|caps| {
            Some(Version {
                major: caps[1].parse().ok()?,
                minor: caps[2].parse().ok()?,
            })
        })
        .ok_or_else(|| SyntaxError::InvalidVersion((*text).to_owned()).add_span(span.clone()))
}

/// Parses a program id
fn parse_program_id((text, span): &Spanned<&str>) -> Result<u16, ParseError> {
    static INTEGER: LazyLock<Regex> = crate::regex!(r"^\d+$");
    INTEGER
        .is_match(text)
        .then(|| text.parse::<u16>().ok())
        .flatten()
        .ok_or_else(|| SyntaxError::InvalidProgramId((*text).to_owned()).add_span(span.clone()))
}

/// Stores the value of a directive that can only appear once
fn set_once<T>(
    slot: &mut Option<(T, Span)>,
    name: &'static str,
    value: T,
    span: Span,
) -> Result<(), ParseError> {
    if let Some((_, previous)) = slot {
        return Err(InstructionError::DuplicateDirective {
            name,
            previous: previous.clone(),
        }
        .add_span(span));
    }
    *slot = Some((value, span));
    Ok(())
}

/// Parses the preamble of a subroutine
///
/// # Parameters
///
/// * `lines`: lines of the preamble, without the leading `#`
/// * `eof`: location to report missing directives at
///
/// # Errors
///
/// Errors if a directive is unknown, repeated when it can only be used once, missing, or has
/// invalid operands
pub fn parse(lines: &[Line], eof: Span) -> Result<Preamble, ParseError> {
    static IDENT: LazyLock<Regex> = crate::regex!(r"^[A-Za-z_][A-Za-z0-9_]*$");
    let mut version = None;
    let mut program_id = None;
    let mut macros: Vec<Macro> = Vec::new();
    let mut keys: HashMap<String, Span> = HashMap::new();

    for line in lines {
        let span = line.span();
        let words = split_words(line.text, ('{', '}'), &Locator::exact(line.start))?;
        let Some(((name, name_span), args)) = words.split_first() else {
            continue;
        };
        match *name {
            "NETQASM" | "VERSION" => {
                check_arity("NETQASM", args, 1, &span)?;
                let value = parse_version(&args[0])?;
                set_once(&mut version, "NETQASM", value, span)?;
            }
            "APPID" | "PROGRAM-ID" => {
                check_arity("APPID", args, 1, &span)?;
                let value = parse_program_id(&args[0])?;
                set_once(&mut program_id, "APPID", value, span)?;
            }
            "DEFINE" => {
                check_arity("DEFINE", args, 2, &span)?;
                let (key, key_span) = &args[0];
                if !IDENT.is_match(key) {
                    return Err(InstructionError::InvalidMacroKey((*key).to_owned())
                        .add_span(key_span.clone()));
                }
                if let Some(previous) = keys.insert((*key).to_owned(), key_span.clone()) {
                    return Err(InstructionError::DuplicateMacro {
                        name: (*key).to_owned(),
                        previous,
                    }
                    .add_span(key_span.clone()));
                }
                macros.push(Macro {
                    key: (*key).to_owned(),
                    value: args[1].0.to_owned(),
                    span,
                });
            }
            _ => {
                return Err(
                    InstructionError::UnknownDirective((*name).to_owned())
                        .add_span(name_span.clone()),
                )
            }
        }
    }

    let version = version.ok_or_else(|| {
        InstructionError::MissingDirective("NETQASM").add_span(eof.clone())
    })?;
    let program_id =
        program_id.ok_or_else(|| InstructionError::MissingDirective("APPID").add_span(eof))?;
    log::trace!(
        "preamble: version {}, program id {}, {} macros",
        version.0,
        program_id.0,
        macros.len()
    );
    Ok(Preamble {
        version: version.0,
        program_id: program_id.0,
        macros,
    })
}
