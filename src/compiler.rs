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

//! Module containing the definition of the subroutine assembler
//!
//! The entry point for assembler code is the [`assemble()`] function, which transforms a
//! [`RawSubroutine`] into a fully resolved [`Subroutine`]. Users are expected to parse the code
//! first with [`crate::parser::parse()`], or to use [`compile()`] to do both steps at once

// # Assembler architecture
//
// Assembly is a sequence of passes, each of them consuming the sequence produced by the previous
// one and building a new one:
//
// 1. Argument folding: the bracketed arguments of each command (`create_epr(1,0) ...`) are moved
//    to the start of its operand list, so that the position of each operand matches the position
//    of its field in the instruction signature
// 2. Constant lowering ([`lowering`]): constants in positions where they can't be encoded inline
//    are moved to temporary registers with `set` instructions inserted before the command
// 3. Label resolution ([`label`]): branch labels are removed and references to them are replaced
//    by the index of the command they point to
//
// Lowering must happen before label resolution, since it inserts new commands that change the
// indexes of the commands after them. During the passes each element is tagged with the index of
// the item of the input sequence it originates from, which is used to report errors

use crate::parser::{self, SourceMap};
use crate::subroutine::{Command, Item, Operand, RawSubroutine, Subroutine};

pub mod label;
pub use label::Table as LabelTable;

mod lowering;

mod error;
pub use error::{CompileError, Error as AssemblyError, Kind as ErrorKind};

/// Sequence of elements tagged with the index of the input item they originate from
type Tracked<T> = Vec<(T, usize)>;

/// Selection of the assembler passes to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct AssembleOptions {
    /// Move the bracketed arguments of each command to its operand list
    pub fold_arguments: bool,
    /// Move constants that can't be encoded inline to registers
    pub lower_constants: bool,
    /// Replace branch labels with command indexes
    pub resolve_labels: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            fold_arguments: true,
            lower_constants: true,
            resolve_labels: true,
        }
    }
}

/// Tags each item with its index
#[must_use]
fn track(items: Vec<Item>) -> Tracked<Item> {
    items.into_iter().enumerate().map(|(i, x)| (x, i)).collect()
}

/// Moves the bracketed arguments of each command to the start of its operand list
#[must_use]
fn fold_arguments(items: Tracked<Item>) -> Tracked<Item> {
    let mut folded = 0;
    let items = items
        .into_iter()
        .map(|(item, origin)| match item {
            Item::Command(Command {
                opcode,
                args,
                operands,
            }) if !args.is_empty() => {
                folded += 1;
                let operands = args
                    .into_iter()
                    .map(Operand::Constant)
                    .chain(operands)
                    .collect();
                (Item::Command(Command::new(opcode, operands)), origin)
            }
            item => (item, origin),
        })
        .collect();
    log::debug!("folded the arguments of {folded} commands");
    items
}

/// Assembles a subroutine, performing only the selected passes
///
/// # Parameters
///
/// * `raw`: subroutine to assemble
/// * `options`: passes to perform
///
/// # Errors
///
/// Errors if there aren't enough registers to lower the constants of a command, or if a label is
/// defined multiple times or used without being defined
pub fn assemble_with(
    raw: RawSubroutine,
    options: AssembleOptions,
) -> Result<RawSubroutine, AssemblyError> {
    let mut items = track(raw.items);
    if options.fold_arguments {
        items = fold_arguments(items);
    }
    if options.lower_constants {
        items = lowering::lower(items)?;
    }
    if options.resolve_labels {
        items = label::resolve(items)?
            .into_iter()
            .map(|(cmd, origin)| (Item::Command(cmd), origin))
            .collect();
    }
    Ok(RawSubroutine {
        items: items.into_iter().map(|(item, _)| item).collect(),
        ..raw
    })
}

/// Assembles a subroutine, performing all the passes
///
/// # Parameters
///
/// * `raw`: subroutine to assemble
///
/// # Errors
///
/// Errors if there aren't enough registers to lower the constants of a command, or if a label is
/// defined multiple times or used without being defined
pub fn assemble(raw: RawSubroutine) -> Result<Subroutine, AssemblyError> {
    let items = lowering::lower(fold_arguments(track(raw.items)))?;
    let commands = label::resolve(items)?;
    log::debug!("assembled {} commands", commands.len());
    Ok(Subroutine {
        version: raw.version,
        program_id: raw.program_id,
        commands: commands.into_iter().map(|(cmd, _)| cmd).collect(),
    })
}

/// Adds the location in the source code to an assembly error
#[must_use]
fn locate(error: AssemblyError, spans: &SourceMap) -> CompileError {
    let span_of = |item: usize| spans.get(item).cloned();
    let previous = match &error.kind {
        ErrorKind::DuplicateLabel { previous, .. } => span_of(*previous),
        _ => None,
    };
    CompileError::Assembly {
        span: span_of(error.item).unwrap_or_default(),
        previous,
        error,
    }
}

/// Parses and assembles a subroutine from its text representation
///
/// # Parameters
///
/// * `src`: code to compile
///
/// # Errors
///
/// Errors if the code can't be parsed or assembled
pub fn compile(src: &str) -> Result<Subroutine, CompileError> {
    let (raw, spans) = parser::parse(src)?;
    assemble(raw).map_err(|e| locate(e, &spans))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instructions::Opcode;
    use crate::subroutine::{Register, RegisterBank, Version};

    #[must_use]
    const fn r(index: u8) -> Operand {
        Operand::Register(Register::new(RegisterBank::R, index))
    }

    #[must_use]
    fn raw(items: Vec<Item>) -> RawSubroutine {
        RawSubroutine {
            version: Version { major: 0, minor: 0 },
            program_id: 1,
            items,
        }
    }

    #[must_use]
    fn epr() -> Item {
        Item::Command(Command {
            opcode: Opcode::CreateEpr,
            args: vec![1, 0],
            operands: vec![r(1), r(2), r(3)],
        })
    }

    #[test]
    fn folding() {
        let folded = assemble_with(
            raw(vec![epr()]),
            AssembleOptions {
                lower_constants: false,
                resolve_labels: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(
            folded.items,
            vec![Item::Command(Command::new(
                Opcode::CreateEpr,
                vec![Operand::Constant(1), Operand::Constant(0), r(1), r(2), r(3)]
            ))]
        );
    }

    #[test]
    fn folded_arguments_are_lowered() {
        let sub = assemble(raw(vec![epr()])).unwrap();
        assert_eq!(
            sub.commands,
            vec![
                Command::new(Opcode::Set, vec![r(15), Operand::Constant(1)]),
                Command::new(Opcode::Set, vec![r(14), Operand::Constant(0)]),
                Command::new(Opcode::CreateEpr, vec![r(15), r(14), r(1), r(2), r(3)]),
            ]
        );
        assert_eq!(sub.program_id, 1);
    }

    #[test]
    fn partial_passes_keep_labels() {
        let items = vec![
            Item::BranchLabel("L".into()),
            Item::Command(Command::new(Opcode::Jmp, vec![Operand::Label("L".into())])),
        ];
        let out = assemble_with(
            raw(items.clone()),
            AssembleOptions {
                resolve_labels: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(out.items, items);
        let out = assemble_with(raw(items), AssembleOptions::default()).unwrap();
        assert_eq!(
            out.items,
            vec![Item::Command(Command::new(Opcode::Jmp, vec![Operand::Constant(0)]))]
        );
    }

    #[test]
    fn labels_after_lowering() {
        let items = vec![
            Item::BranchLabel("LOOP".into()),
            Item::Command(Command::new(
                Opcode::Beq,
                vec![r(0), Operand::Constant(10), Operand::Label("EXIT".into())],
            )),
            Item::Command(Command::new(Opcode::Jmp, vec![Operand::Label("LOOP".into())])),
            Item::BranchLabel("EXIT".into()),
        ];
        let sub = assemble(raw(items)).unwrap();
        assert_eq!(
            sub.commands,
            vec![
                Command::new(Opcode::Set, vec![r(15), Operand::Constant(10)]),
                Command::new(Opcode::Beq, vec![r(0), r(15), Operand::Constant(3)]),
                Command::new(Opcode::Jmp, vec![Operand::Constant(0)]),
            ]
        );
    }

    #[test]
    fn compile_errors_are_located() {
        let src = "# NETQASM 0.0\n# APPID 0\nA:\njmp A\nA:\n";
        let err = compile(src).unwrap_err();
        assert_eq!(
            err,
            CompileError::Assembly {
                error: ErrorKind::DuplicateLabel {
                    name: "A".into(),
                    previous: 0,
                }
                .at(2),
                span: 33..35,
                previous: Some(24..26),
            }
        );
        let err = compile("# NETQASM 0.0\n# APPID 0\njmp B\n").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Assembly {
                span,
                error: AssemblyError {
                    kind: ErrorKind::UnknownLabel { .. },
                    ..
                },
                ..
            } if span == (24..29)
        ));
        assert!(matches!(compile("jmp B\n"), Err(CompileError::Parse(_))));
    }

    #[test]
    fn render_errors() {
        use crate::RenderError;
        let src = "# NETQASM 0.0\n# APPID 0\nEXIT:\njmp EXT\n";
        let out = compile(src).unwrap_err().render("test.nqasm", src, false);
        assert!(out.contains("branch label `EXT` isn't defined"), "{out}");
        assert!(out.contains("Did you mean `EXIT`?"), "{out}");
    }
}
