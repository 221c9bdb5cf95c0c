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

//! Module containing the definition of the subroutine parser
//!
//! The entry point for parsing code is the [`parse()`] function. Parsing is line based:
//!
//! 1. Comments (`//` until the end of the line) and surrounding whitespace are removed, and empty
//!    lines are ignored
//! 2. Lines starting with `#` before the first instruction form the preamble, which is processed
//!    by [`preamble::parse()`]
//! 3. Macro references in the remaining lines are expanded
//! 4. Each remaining line is either a branch label definition (`NAME:`) or a command
//!    (`mnemonic(args) operand*`)

use std::borrow::Cow;

use crate::instructions::{FieldType, Opcode};
use crate::span::{Span, Spanned};
use crate::subroutine::{Command, Item, Operand, RawSubroutine};

mod error;
pub use error::{Error as ParseError, InstructionError, Kind as ErrorKind, SyntaxError};

mod macros;
pub use macros::Expander;

pub mod operand;

mod preamble;
pub use preamble::{Macro, Preamble};

/// Location of each item of a [`RawSubroutine`] in the source code
pub type SourceMap = Vec<Span>;

/// Non-empty line of code, without comments and surrounding whitespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Line<'a> {
    /// Contents of the line
    text: &'a str,
    /// Byte offset of the contents in the source code
    start: usize,
}

impl Line<'_> {
    #[must_use]
    const fn span(&self) -> Span {
        self.start..self.start + self.text.len()
    }
}

/// Translator from locations in a (possibly expanded) line to locations in the source code
#[derive(Debug, Clone, PartialEq, Eq)]
struct Locator {
    /// Offset of the line in the source code
    start: usize,
    /// Span to use for all locations, used when the line was modified by macro expansion
    whole: Option<Span>,
}

impl Locator {
    /// Creates a locator for a line that appears unmodified in the source code
    #[must_use]
    const fn exact(start: usize) -> Self {
        Self { start, whole: None }
    }

    /// Creates a locator for a line that doesn't appear in the source code as is
    #[must_use]
    const fn whole(span: Span) -> Self {
        Self {
            start: span.start,
            whole: Some(span),
        }
    }

    /// Translates a span relative to the line to a span in the source code
    #[must_use]
    fn at(&self, span: Span) -> Span {
        self.whole
            .clone()
            .unwrap_or(self.start + span.start..self.start + span.end)
    }
}

/// Iterates over the non-empty lines of the source code
fn lines(src: &str) -> impl Iterator<Item = Line<'_>> {
    let mut offset = 0;
    src.split_inclusive('\n').filter_map(move |raw| {
        let start = offset;
        offset += raw.len();
        let code = raw.find("//").map_or(raw, |i| &raw[..i]);
        let text = code.trim();
        let indent = code.len() - code.trim_start().len();
        (!text.is_empty()).then_some(Line {
            text,
            start: start + indent,
        })
    })
}

/// Splits the lines of the source code into preamble lines (without their leading `#`) and body
/// lines
///
/// # Errors
///
/// Errors if a preamble line appears after the first body line
fn split_preamble(src: &str) -> Result<(Vec<Line<'_>>, Vec<Line<'_>>), ParseError> {
    let mut header = Vec::new();
    let mut body = Vec::new();
    for line in lines(src) {
        let Some(rest) = line.text.strip_prefix('#') else {
            body.push(line);
            continue;
        };
        if !body.is_empty() {
            return Err(SyntaxError::HeaderAfterBody.add_span(line.span()));
        }
        let text = rest.trim_start();
        if !text.is_empty() {
            header.push(Line {
                text,
                start: line.start + line.text.len() - text.len(),
            });
        }
    }
    Ok((header, body))
}

/// Splits a line into whitespace separated words, keeping bracketed groups together
///
/// # Parameters
///
/// * `text`: line to split
/// * `brackets`: opening and closing characters of the groups
/// * `loc`: locator used to report errors
///
/// # Errors
///
/// Errors if the brackets in the line aren't balanced
fn split_words<'a>(
    text: &'a str,
    (open, close): (char, char),
    loc: &Locator,
) -> Result<Vec<Spanned<&'a str>>, ParseError> {
    let mut words = Vec::new();
    let mut word_start = None;
    let mut depth = 0usize;
    let mut opened_at = 0;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() && depth == 0 {
            if let Some(start) = word_start.take() {
                words.push((&text[start..i], start..i));
            }
            continue;
        }
        word_start.get_or_insert(i);
        if c == open {
            if depth == 0 {
                opened_at = i;
            }
            depth += 1;
        } else if c == close {
            depth = depth.checked_sub(1).ok_or_else(|| {
                SyntaxError::UnmatchedBracket(close).add_span(loc.at(i..i + c.len_utf8()))
            })?;
        }
    }
    if depth != 0 {
        return Err(SyntaxError::UnclosedBracket(open).add_span(loc.at(opened_at..opened_at + 1)));
    }
    if let Some(start) = word_start {
        words.push((&text[start..], start..text.len()));
    }
    Ok(words)
}

/// Parses the bracketed arguments of a command
///
/// # Parameters
///
/// * `head`: first word of the command, containing the mnemonic and the arguments
/// * `span`: location of the first word
///
/// # Errors
///
/// Errors if the argument list isn't closed at the end of the word or contains something other
/// than integers
fn parse_head<'a>(head: &'a str, span: &Span) -> Result<(&'a str, Vec<i64>), ParseError> {
    let Some((mnemonic, rest)) = head.split_once('(') else {
        return Ok((head, Vec::new()));
    };
    let args = rest
        .strip_suffix(')')
        .ok_or_else(|| SyntaxError::MalformedArguments(head.to_owned()).add_span(span.clone()))?;
    if args.trim().is_empty() {
        return Ok((mnemonic, Vec::new()));
    }
    let args = args
        .split(',')
        .map(|arg| {
            let arg = arg.trim();
            operand::parse_integer(arg).map_err(|_| {
                SyntaxError::InvalidArgument(arg.to_owned()).add_span(span.clone())
            })
        })
        .collect::<Result<_, _>>()?;
    Ok((mnemonic, args))
}

/// Checks that the constants of an operand can be encoded after assembling the command
///
/// # Errors
///
/// Errors if a constant of the operand doesn't fit in the field that will hold it
fn check_range(
    opcode: Opcode,
    position: usize,
    field: FieldType,
    operand: &Operand,
    span: &Span,
) -> Result<(), ParseError> {
    match field.out_of_range(operand) {
        Some(value) => Err(SyntaxError::OutOfRange {
            value,
            mnemonic: opcode.mnemonic(),
            position,
        }
        .add_span(span.clone())),
        None => Ok(()),
    }
}

/// Parses a single command
///
/// # Parameters
///
/// * `text`: line with the command
/// * `loc`: locator used to report errors
///
/// # Errors
///
/// Errors if the command uses an unknown instruction, has a wrong amount of operands, or has
/// operands of the wrong type
fn parse_command(text: &str, loc: &Locator) -> Result<Command, ParseError> {
    let words = split_words(text, ('(', ')'), loc)?;
    let line_span = loc.at(0..text.len());
    let Some(((head, head_span), words)) = words.split_first() else {
        return Err(SyntaxError::MalformedArguments(text.to_owned()).add_span(line_span));
    };
    let head_span = loc.at(head_span.clone());
    let (mnemonic, args) = parse_head(head, &head_span)?;
    let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| {
        let span = head_span.start..head_span.start + mnemonic.len();
        let span = if loc.whole.is_some() { head_span.clone() } else { span };
        InstructionError::UnknownInstruction(mnemonic.to_owned()).add_span(span)
    })?;
    let fields = opcode.fields();
    if args.len() + words.len() != fields.len() {
        return Err(SyntaxError::CommandArity {
            mnemonic: opcode.mnemonic(),
            expected: fields.len(),
            found: args.len() + words.len(),
        }
        .add_span(line_span));
    }
    // Positions taken by the bracketed arguments
    for (position, (&arg, &field)) in args.iter().zip(fields).enumerate() {
        let arg = Operand::Constant(arg);
        if !field.accepts(&arg) {
            return Err(SyntaxError::OperandKind {
                mnemonic: opcode.mnemonic(),
                position,
                expected: field,
            }
            .add_span(head_span));
        }
        check_range(opcode, position, field, &arg, &head_span)?;
    }
    // Positions taken by the operands
    let mut operands = Vec::with_capacity(words.len());
    for (i, ((word, span), &field)) in words.iter().zip(&fields[args.len()..]).enumerate() {
        let position = args.len() + i;
        let span = loc.at(span.clone());
        let operand = operand::parse(word).map_err(|reason| {
            SyntaxError::InvalidOperand {
                token: (*word).to_owned(),
                reason,
            }
            .add_span(span.clone())
        })?;
        if let Operand::Label(label) = &operand {
            if field != FieldType::Target {
                return Err(SyntaxError::LabelNotAllowed {
                    label: label.clone(),
                    mnemonic: opcode.mnemonic(),
                    position,
                }
                .add_span(span));
            }
        }
        if !field.accepts(&operand) {
            return Err(SyntaxError::OperandKind {
                mnemonic: opcode.mnemonic(),
                position,
                expected: field,
            }
            .add_span(span));
        }
        check_range(opcode, position, field, &operand, &span)?;
        operands.push(operand);
    }
    Ok(Command {
        opcode,
        args,
        operands,
    })
}

/// Parses a single line of the body
///
/// # Errors
///
/// Errors if the line is neither a valid label definition nor a valid command
fn parse_item(text: &str, loc: &Locator) -> Result<Item, ParseError> {
    if let Some(name) = text.strip_suffix(':') {
        let name = name.trim_end();
        if !operand::is_label_name(name) {
            return Err(SyntaxError::InvalidLabel(name.to_owned()).add_span(loc.at(0..text.len())));
        }
        return Ok(Item::BranchLabel(name.to_owned()));
    }
    parse_command(text, loc).map(Item::Command)
}

/// Parses a subroutine from its text representation
///
/// Returns the parsed subroutine along with the location of each of its items in the source code
///
/// # Parameters
///
/// * `src`: code to parse
///
/// # Errors
///
/// Errors if the preamble is invalid or any line of the body can't be parsed
pub fn parse(src: &str) -> Result<(RawSubroutine, SourceMap), ParseError> {
    let (header, body) = split_preamble(src)?;
    let eof = src.len()..src.len();
    let preamble = preamble::parse(&header, header.first().map_or(eof, Line::span))?;
    let expander = Expander::new(
        preamble
            .macros
            .iter()
            .map(|m| (m.key.as_str(), m.value.as_str())),
    );

    let mut items = Vec::with_capacity(body.len());
    let mut spans = Vec::with_capacity(body.len());
    for line in body {
        let (text, loc) = match expander.expand(line.text) {
            Cow::Borrowed(text) => (Cow::Borrowed(text), Locator::exact(line.start)),
            Cow::Owned(text) => (Cow::Owned(text), Locator::whole(line.span())),
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        items.push(parse_item(text, &loc)?);
        spans.push(line.span());
    }
    log::debug!(
        "parsed {} items ({} macros defined)",
        items.len(),
        preamble.macros.len()
    );
    let subroutine = RawSubroutine {
        version: preamble.version,
        program_id: preamble.program_id,
        items,
    };
    Ok((subroutine, spans))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::subroutine::{Address, ArrayEntry, Register, RegisterBank, Value, Version};

    const PREAMBLE: &str = "# NETQASM 0.0\n# APPID 0\n";

    #[must_use]
    fn parse_body(body: &str) -> Result<Vec<Item>, ParseError> {
        parse(&format!("{PREAMBLE}{body}")).map(|(sub, _)| sub.items)
    }

    #[must_use]
    fn error(body: &str) -> ParseError {
        parse_body(body).unwrap_err()
    }

    #[must_use]
    const fn reg(bank: RegisterBank, index: u8) -> Operand {
        Operand::Register(Register::new(bank, index))
    }

    #[test]
    fn lines_and_comments() {
        let src = "  a // comment\n\n// only comment\n\tb c  \r\n";
        let lines: Vec<_> = lines(src).map(|l| (l.text, l.span())).collect();
        assert_eq!(lines, vec![("a", 2..3), ("b c", 33..36)]);
    }

    #[test]
    fn header() {
        let (sub, spans) = parse("// comment\n# NETQASM 1.2 // version\n# APPID 7\n").unwrap();
        assert_eq!(sub.version, Version { major: 1, minor: 2 });
        assert_eq!(sub.program_id, 7);
        assert!(sub.items.is_empty());
        assert!(spans.is_empty());
    }

    #[test]
    fn header_after_body() {
        let err = parse("# NETQASM 0.0\nqalloc Q0\n# APPID 0\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax(SyntaxError::HeaderAfterBody));
        assert_eq!(err.span, 24..33);
    }

    #[test]
    fn missing_header() {
        let err = parse("qalloc Q0\n").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::Instruction(InstructionError::MissingDirective("NETQASM"))
        );
    }

    #[test]
    fn commands() {
        let q0 = reg(RegisterBank::Q, 0);
        let items = parse_body("set Q0 0\nmeas Q0 M0\nbeq R0 10 EXIT\nEXIT:\nstore M0 @0[R0]\n")
            .unwrap();
        assert_eq!(
            items,
            vec![
                Item::Command(Command::new(Opcode::Set, vec![q0.clone(), Operand::Constant(0)])),
                Item::Command(Command::new(
                    Opcode::Meas,
                    vec![q0, reg(RegisterBank::M, 0)]
                )),
                Item::Command(Command::new(
                    Opcode::Beq,
                    vec![
                        reg(RegisterBank::R, 0),
                        Operand::Constant(10),
                        Operand::Label("EXIT".into())
                    ]
                )),
                Item::BranchLabel("EXIT".into()),
                Item::Command(Command::new(
                    Opcode::Store,
                    vec![
                        reg(RegisterBank::M, 0),
                        Operand::ArrayEntry(ArrayEntry {
                            address: Address::new(Value::Constant(0)),
                            index: Value::Register(Register::new(RegisterBank::R, 0)),
                        })
                    ]
                )),
            ]
        );
    }

    #[test]
    fn arguments() {
        let items = parse_body("create_epr(1, 0) R1 R2 R3\nrecv_epr() R1 R2 R3 R4\n").unwrap();
        let r = |i| reg(RegisterBank::R, i);
        assert_eq!(
            items,
            vec![
                Item::Command(Command {
                    opcode: Opcode::CreateEpr,
                    args: vec![1, 0],
                    operands: vec![r(1), r(2), r(3)],
                }),
                Item::Command(Command::new(Opcode::RecvEpr, vec![r(1), r(2), r(3), r(4)])),
            ]
        );
        assert_eq!(
            error("create_epr(1,x) R1 R2 R3\n").kind,
            ErrorKind::Syntax(SyntaxError::InvalidArgument("x".into()))
        );
        assert_eq!(
            error("create_epr(1,0 R1 R2 R3\n").kind,
            ErrorKind::Syntax(SyntaxError::UnclosedBracket('('))
        );
        assert_eq!(
            error("create_epr(1,0)x R1 R2 R3\n").kind,
            ErrorKind::Syntax(SyntaxError::MalformedArguments("create_epr(1,0)x".into()))
        );
        assert_eq!(
            error("qalloc) Q0\n").kind,
            ErrorKind::Syntax(SyntaxError::UnmatchedBracket(')'))
        );
    }

    #[test]
    fn macros() {
        let src = format!("{PREAMBLE}# DEFINE ms @0\n# DEFINE ent {{@0[R1]}}\narray 10 ms!\nload R0 ent!\n");
        let (sub, spans) = parse(&src).unwrap();
        let addr = Address::new(Value::Constant(0));
        assert_eq!(
            sub.items,
            vec![
                Item::Command(Command::new(
                    Opcode::Array,
                    vec![Operand::Constant(10), Operand::Address(addr)]
                )),
                Item::Command(Command::new(
                    Opcode::Load,
                    vec![
                        reg(RegisterBank::R, 0),
                        Operand::ArrayEntry(ArrayEntry {
                            address: addr,
                            index: Value::Register(Register::new(RegisterBank::R, 1)),
                        })
                    ]
                )),
            ]
        );
        assert_eq!(spans, vec![61..73, 74..86]);
    }

    #[test]
    fn labels() {
        let items = parse_body("LOOP:\nloop_2 :\njmp LOOP\n").unwrap();
        assert_eq!(
            items,
            vec![
                Item::BranchLabel("LOOP".into()),
                Item::BranchLabel("loop_2".into()),
                Item::Command(Command::new(Opcode::Jmp, vec![Operand::Label("LOOP".into())])),
            ]
        );
        assert_eq!(
            error("1abc:\n").kind,
            ErrorKind::Syntax(SyntaxError::InvalidLabel("1abc".into()))
        );
        assert_eq!(
            error("R3:\n").kind,
            ErrorKind::Syntax(SyntaxError::InvalidLabel("R3".into()))
        );
    }

    #[test]
    fn unknown_instruction() {
        let err = error("qaloc Q0\n");
        assert_eq!(
            err.kind,
            ErrorKind::Instruction(InstructionError::UnknownInstruction("qaloc".into()))
        );
        assert_eq!(err.span, 24..29);
        let err = error("foo(1) Q0\n");
        assert_eq!(err.span, 24..27);
    }

    #[test]
    fn arity() {
        let err = error("add R0 R1\n");
        assert_eq!(
            err.kind,
            ErrorKind::Syntax(SyntaxError::CommandArity {
                mnemonic: "add",
                expected: 3,
                found: 2,
            })
        );
        assert_eq!(err.span, 24..33);
        assert_eq!(
            error("qalloc\n").kind,
            ErrorKind::Syntax(SyntaxError::CommandArity {
                mnemonic: "qalloc",
                expected: 1,
                found: 0,
            })
        );
    }

    #[test]
    fn operand_kinds() {
        assert_eq!(
            error("store M0 @0\n").kind,
            ErrorKind::Syntax(SyntaxError::OperandKind {
                mnemonic: "store",
                position: 1,
                expected: FieldType::ArrayEntry,
            })
        );
        assert_eq!(
            error("set R0 R1\n").kind,
            ErrorKind::Syntax(SyntaxError::OperandKind {
                mnemonic: "set",
                position: 1,
                expected: FieldType::Immediate,
            })
        );
        let err = error("add R0 LOOP R1\n");
        assert_eq!(
            err.kind,
            ErrorKind::Syntax(SyntaxError::LabelNotAllowed {
                label: "LOOP".into(),
                mnemonic: "add",
                position: 1,
            })
        );
        assert_eq!(err.span, 31..35);
        assert!(matches!(
            error("qalloc Q16\n").kind,
            ErrorKind::Syntax(SyntaxError::InvalidOperand { .. })
        ));
    }

    #[test]
    fn constant_ranges() {
        let out_of_range = |body: &str, mnemonic, position, value| {
            let err = error(body);
            assert_eq!(
                err.kind,
                ErrorKind::Syntax(SyntaxError::OutOfRange {
                    value,
                    mnemonic,
                    position,
                }),
                "{body}"
            );
            err.span
        };
        assert_eq!(out_of_range("set R0 4294967296\n", "set", 1, 1 << 32), 31..41);
        assert_eq!(
            out_of_range("add R0 R0 5000000000\n", "add", 2, 5_000_000_000),
            34..44
        );
        assert_eq!(out_of_range("rot_x Q0 1 256\n", "rot_x", 2, 256), 35..38);
        assert_eq!(out_of_range("jmp -1\n", "jmp", 0, -1), 28..30);
        assert_eq!(
            out_of_range("array 10 @3000000000\n", "array", 1, 3_000_000_000),
            33..44
        );
        assert_eq!(
            out_of_range("store R0 @0[4294967296]\n", "store", 1, 1 << 32),
            33..47
        );
        assert_eq!(
            out_of_range("create_epr(99999999999, 0) R1 R2 R3\n", "create_epr", 0, 99_999_999_999),
            24..50
        );
        let limits = "set R0 -2147483648\nrot_x Q0 255 0\njmp 4294967295\narray 1 @2147483647\n";
        assert_eq!(parse_body(limits).map(|items| items.len()), Ok(4));
    }

    #[test]
    fn expanded_errors_point_to_line() {
        let src = format!("{PREAMBLE}# DEFINE bad R99\nqalloc bad!\n");
        let err = parse(&src).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Syntax(SyntaxError::InvalidOperand { .. })
        ));
        assert_eq!(err.span, 41..52);
    }
}
