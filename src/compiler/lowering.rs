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

//! Module containing the constant lowering pass
//!
//! Constants can only be encoded inline in the fields listed in
//! [`IMMEDIATE_SLOTS`](crate::instructions::IMMEDIATE_SLOTS). Any other constant, including the
//! indexes of array entries and the bounds of array slices, is replaced by a temporary `R`
//! register loaded with a `set` instruction inserted right before the command using it

use std::collections::HashSet;

use super::{AssemblyError, ErrorKind, Tracked};
use crate::instructions::{allows_immediate, Opcode};
use crate::subroutine::{
    ArrayEntry, ArraySlice, Command, Item, Operand, Register, RegisterBank, Value,
    REGISTERS_PER_BANK,
};

/// Bank of the registers used to hold lowered constants
const LOWERING_BANK: RegisterBank = RegisterBank::R;

/// Allocator of temporary registers for a single command
///
/// Registers are handed out from the highest index downwards, skipping the ones bound by explicit
/// `set` instructions and the ones already live in the command
#[derive(Debug)]
struct Allocator<'a> {
    /// Next index to try
    next: Option<u8>,
    /// Indexes bound by explicit `set` instructions in the subroutine
    bound: &'a HashSet<u8>,
    /// Indexes used by the command, including the ones already allocated
    live: HashSet<u8>,
}

impl<'a> Allocator<'a> {
    #[must_use]
    fn new(bound: &'a HashSet<u8>, live: HashSet<u8>) -> Self {
        Self {
            next: Some(REGISTERS_PER_BANK - 1),
            bound,
            live,
        }
    }

    /// Allocates a new register, returning [`None`] if all of them are in use
    fn allocate(&mut self) -> Option<Register> {
        while let Some(index) = self.next {
            self.next = index.checked_sub(1);
            if !self.bound.contains(&index) && self.live.insert(index) {
                return Some(Register::new(LOWERING_BANK, index));
            }
        }
        None
    }
}

/// Lowering state of a single command
struct Lowering<'a> {
    allocator: Allocator<'a>,
    /// `set` instructions to insert before the command
    sets: Vec<Command>,
}

impl Lowering<'_> {
    /// Moves a constant into a new register
    fn constant(&mut self, value: i64) -> Option<Register> {
        let reg = self.allocator.allocate()?;
        log::trace!("lowering constant {value} into {reg}");
        self.sets.push(Command::new(
            Opcode::Set,
            vec![reg.into(), Operand::Constant(value)],
        ));
        Some(reg)
    }

    /// Lowers a value nested in an array access
    fn value(&mut self, value: Value) -> Option<Value> {
        match value {
            Value::Constant(x) => self.constant(x).map(Value::Register),
            reg @ Value::Register(_) => Some(reg),
        }
    }

    /// Lowers the constants of an operand
    ///
    /// # Parameters
    ///
    /// * `opcode`: opcode of the command containing the operand
    /// * `position`: index of the field of the operand
    /// * `operand`: operand to lower
    fn operand(&mut self, opcode: Opcode, position: usize, operand: Operand) -> Option<Operand> {
        Some(match operand {
            Operand::Constant(x) if !allows_immediate(opcode, position) => {
                Operand::Register(self.constant(x)?)
            }
            Operand::ArrayEntry(entry) => Operand::ArrayEntry(ArrayEntry {
                index: self.value(entry.index)?,
                ..entry
            }),
            Operand::ArraySlice(slice) => Operand::ArraySlice(ArraySlice {
                start: self.value(slice.start)?,
                stop: self.value(slice.stop)?,
                ..slice
            }),
            operand => operand,
        })
    }
}

/// Lowers the constants of a single command
///
/// Returns the `set` instructions to insert before the command and the rewritten command, or
/// [`None`] if there aren't enough free registers
fn lower_command(cmd: Command, bound: &HashSet<u8>) -> Option<(Vec<Command>, Command)> {
    let live = cmd
        .operands
        .iter()
        .flat_map(Operand::registers)
        .filter(|reg| reg.bank == LOWERING_BANK)
        .map(|reg| reg.index)
        .collect();
    let mut lowering = Lowering {
        allocator: Allocator::new(bound, live),
        sets: Vec::new(),
    };
    // Bracketed arguments that haven't been folded take the first positions
    let offset = cmd.args.len();
    let operands = cmd
        .operands
        .into_iter()
        .enumerate()
        .map(|(i, operand)| lowering.operand(cmd.opcode, offset + i, operand))
        .collect::<Option<_>>()?;
    let cmd = Command { operands, ..cmd };
    Some((lowering.sets, cmd))
}

/// Lowers all the constants that can't be encoded inline
///
/// # Errors
///
/// Errors if a command needs more temporary registers than available
pub fn lower(items: Tracked<Item>) -> Result<Tracked<Item>, AssemblyError> {
    let bound: HashSet<u8> = items
        .iter()
        .filter_map(|(item, _)| match item {
            Item::Command(cmd) => cmd.set_target(),
            Item::BranchLabel(_) => None,
        })
        .filter(|reg| reg.bank == LOWERING_BANK)
        .map(|reg| reg.index)
        .collect();
    let mut lowered = Vec::with_capacity(items.len());
    let mut inserted = 0;
    for (item, origin) in items {
        match item {
            Item::Command(cmd) => {
                let mnemonic = cmd.opcode.mnemonic();
                let (sets, cmd) = lower_command(cmd, &bound)
                    .ok_or_else(|| ErrorKind::RegistersExhausted { mnemonic }.at(origin))?;
                inserted += sets.len();
                lowered.extend(sets.into_iter().map(|set| (Item::Command(set), origin)));
                lowered.push((Item::Command(cmd), origin));
            }
            label @ Item::BranchLabel(_) => lowered.push((label, origin)),
        }
    }
    log::debug!("lowered {inserted} constants into registers");
    Ok(lowered)
}
