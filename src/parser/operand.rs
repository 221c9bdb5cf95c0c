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

//! Module containing the definition of the operand parser
//!
//! Operands are parsed one token at a time. The first matching rule wins:
//!
//! 1. Tokens starting with `@` are addresses, optionally followed by an index (`@0[R1]`) or a
//!    slice (`@0[R1:R2]`) between brackets
//! 2. Integer literals are constants
//! 3. A bank prefix (`R`, `C`, `Q`, or `M`) followed by an index are registers
//! 4. Identifiers are references to branch labels

use chumsky::error::{RichPattern, RichReason};
use chumsky::prelude::*;

use crate::error_rendering::{Colored, DisplayList};
use crate::subroutine::{
    Address, ArrayEntry, ArraySlice, Operand, Register, RegisterBank, Value, REGISTERS_PER_BANK,
};

/// Generic parser type definition
macro_rules! Parser {
    ($ilt:lifetime, $o:ty) => { impl Parser<$ilt, &$ilt str, $o, extra::Err<Rich<$ilt, char>>> + Clone };
}

/// Creates a parser for integer literals
#[must_use]
fn integer<'src>() -> Parser!('src, i64) {
    just('-')
        .or_not()
        .then(text::digits(10))
        .to_slice()
        .try_map(|x: &str, span| {
            x.parse::<i64>()
                .map_err(|_| Rich::custom(span, format!("integer `{x}` is out of range")))
        })
        .labelled("integer")
}

/// Checks whether a name has the shape of a register
#[must_use]
fn is_register_like(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().and_then(RegisterBank::from_prefix).is_some()
        && !chars.as_str().is_empty()
        && chars.all(|c| c.is_ascii_digit())
}

/// Creates a parser for registers
#[must_use]
fn register<'src>() -> Parser!('src, Register) {
    one_of("RCQM")
        .then(text::digits(10).to_slice())
        .try_map(|(prefix, index): (char, &str), span| {
            let bank = RegisterBank::from_prefix(prefix);
            let index = index.parse::<u8>().ok().filter(|&i| i < REGISTERS_PER_BANK);
            bank.zip(index)
                .map(|(bank, index)| Register::new(bank, index))
                .ok_or_else(|| {
                    Rich::custom(
                        span,
                        format!("register index must be lower than {REGISTERS_PER_BANK}"),
                    )
                })
        })
        .labelled("register")
}

/// Creates a parser for values usable inside addresses
#[must_use]
fn value<'src>() -> Parser!('src, Value) {
    integer()
        .map(Value::Constant)
        .or(register().map(Value::Register))
}

/// Creates a parser for addresses, array entries, and array slices
#[must_use]
fn address<'src>() -> Parser!('src, Operand) {
    // `index -> [ ] | [ value ] | [ value : value ]`
    let index = value()
        .then(just(':').ignore_then(value()).or_not())
        .or_not()
        .delimited_by(just('['), just(']'));
    just('@')
        .ignore_then(value().map(Address::new))
        .then(index.or_not())
        .map(|(address, index)| match index.flatten() {
            None => Operand::Address(address),
            Some((index, None)) => Operand::ArrayEntry(ArrayEntry { address, index }),
            Some((start, Some(stop))) => Operand::ArraySlice(ArraySlice {
                address,
                start,
                stop,
            }),
        })
        .labelled("address")
}

/// Creates a parser for references to branch labels
#[must_use]
fn label<'src>() -> Parser!('src, String) {
    text::ident()
        .try_map(|name: &str, span| {
            if is_register_like(name) {
                Err(Rich::custom(
                    span,
                    format!("register index must be lower than {REGISTERS_PER_BANK}"),
                ))
            } else {
                Ok(name.to_owned())
            }
        })
        .labelled("label")
}

/// Creates a parser for a full operand token
#[must_use]
fn operand<'src>() -> Parser!('src, Operand) {
    choice((
        address().then_ignore(end()),
        integer().map(Operand::Constant).then_ignore(end()),
        register().map(Operand::Register).then_ignore(end()),
        label().map(Operand::Label).then_ignore(end()),
    ))
}

/// Converts the errors produced by a parser to a plain message
#[must_use]
fn describe(errors: &[Rich<'_, char>]) -> String {
    let Some(e) = errors.first() else {
        return "invalid input".into();
    };
    match e.reason() {
        RichReason::Custom(msg) => msg.clone(),
        RichReason::ExpectedFound { expected, found } => {
            let found = found
                .as_deref()
                .map_or_else(|| "end of input".into(), ToString::to_string);
            let disp = |e: &RichPattern<'_, char>| match e {
                RichPattern::Token(t) => t.to_string(),
                RichPattern::Identifier(i) => i.clone(),
                _ => e.to_string(),
            };
            format!(
                "found {} but expected {}",
                Colored(found, None),
                DisplayList::new(expected.iter().map(disp).collect(), false)
            )
        }
    }
}

/// Parses a single operand token
///
/// # Errors
///
/// Errors with a description of the problem if the token isn't a valid operand
pub fn parse(token: &str) -> Result<Operand, String> {
    operand()
        .parse(token)
        .into_result()
        .map_err(|e| describe(&e))
}

/// Parses an integer literal
///
/// # Errors
///
/// Errors with a description of the problem if the token isn't a valid integer
pub fn parse_integer(token: &str) -> Result<i64, String> {
    integer()
        .then_ignore(end())
        .parse(token)
        .into_result()
        .map_err(|e| describe(&e))
}

/// Checks whether a name can be used for a branch label
#[must_use]
pub fn is_label_name(name: &str) -> bool {
    label().then_ignore(end()).parse(name).into_result().is_ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[must_use]
    const fn reg(bank: RegisterBank, index: u8) -> Value {
        Value::Register(Register::new(bank, index))
    }

    #[test]
    fn constants() {
        assert_eq!(parse("0"), Ok(Operand::Constant(0)));
        assert_eq!(parse("10"), Ok(Operand::Constant(10)));
        assert_eq!(parse("-7"), Ok(Operand::Constant(-7)));
        assert_eq!(
            parse("9223372036854775807"),
            Ok(Operand::Constant(i64::MAX))
        );
        assert!(parse("9223372036854775808").is_err());
        assert!(parse("--1").is_err());
        assert!(parse("1x").is_err());
        assert!(parse("-").is_err());
    }

    #[test]
    fn registers() {
        for (src, bank) in [("R", RegisterBank::R), ("C", RegisterBank::C)]
            .into_iter()
            .chain([("Q", RegisterBank::Q), ("M", RegisterBank::M)])
        {
            for i in [0, 1, 15] {
                let token = format!("{src}{i}");
                assert_eq!(
                    parse(&token),
                    Ok(Operand::Register(Register::new(bank, i))),
                    "{token}"
                );
            }
        }
        assert!(parse("R16").is_err());
        assert!(parse("M300").is_err());
    }

    #[test]
    fn addresses() {
        let addr = Address::new(Value::Constant(0));
        assert_eq!(parse("@0"), Ok(Operand::Address(addr)));
        assert_eq!(parse("@0[]"), Ok(Operand::Address(addr)));
        assert_eq!(
            parse("@R3"),
            Ok(Operand::Address(Address::new(reg(RegisterBank::R, 3))))
        );
        assert_eq!(
            parse("@0[R0]"),
            Ok(Operand::ArrayEntry(ArrayEntry {
                address: addr,
                index: reg(RegisterBank::R, 0),
            }))
        );
        assert_eq!(
            parse("@0[5]"),
            Ok(Operand::ArrayEntry(ArrayEntry {
                address: addr,
                index: Value::Constant(5),
            }))
        );
        assert_eq!(
            parse("@1[R0:10]"),
            Ok(Operand::ArraySlice(ArraySlice {
                address: Address::new(Value::Constant(1)),
                start: reg(RegisterBank::R, 0),
                stop: Value::Constant(10),
            }))
        );
        assert!(parse("@").is_err());
        assert!(parse("@0[").is_err());
        assert!(parse("@0[R0:]").is_err());
        assert!(parse("@0[R0]x").is_err());
        assert!(parse("@LOOP").is_err());
    }

    #[test]
    fn labels() {
        assert_eq!(parse("LOOP"), Ok(Operand::Label("LOOP".into())));
        assert_eq!(parse("_exit2"), Ok(Operand::Label("_exit2".into())));
        assert_eq!(parse("R1x"), Ok(Operand::Label("R1x".into())));
        assert_eq!(parse("Rx"), Ok(Operand::Label("Rx".into())));
        assert!(parse("a-b").is_err());
        assert!(parse("ms!").is_err());
    }

    #[test]
    fn label_names() {
        assert!(is_label_name("EXIT"));
        assert!(is_label_name("loop_1"));
        assert!(!is_label_name("R2"));
        assert!(!is_label_name("1abc"));
        assert!(!is_label_name("a b"));
        assert!(!is_label_name(""));
    }

    #[test]
    fn integers() {
        assert_eq!(parse_integer("42"), Ok(42));
        assert_eq!(parse_integer("-1"), Ok(-1));
        assert!(parse_integer("R0").is_err());
        assert!(parse_integer(" 1").is_err());
    }

    #[test]
    fn error_messages() {
        let custom = Rich::custom(SimpleSpan::from(0..3), "register index too big");
        assert_eq!(describe(&[custom]), "register index too big");
        let err = parse_integer("x").unwrap_err();
        assert!(err.starts_with("found `x` but expected"), "{err}");
        let err = parse_integer("").unwrap_err();
        assert!(err.starts_with("found `end of input`"), "{err}");
    }
}
