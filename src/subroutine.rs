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

//! Module containing the definition of the data model of subroutines
//!
//! Subroutines exist in 2 forms:
//!
//! * [`RawSubroutine`]: sequence of commands and branch labels, as produced by the parser
//! * [`Subroutine`]: sequence of fully resolved commands, as produced by the assembler and
//!   consumed by the binary encoder
//!
//! All the types implement [`Display`](std::fmt::Display) producing their text representation,
//! which can be parsed back to the same value

use schemars::{schema_for, JsonSchema};
use serde::Serialize;

use std::fmt;

use crate::instructions::Opcode;

/// Amount of bits used to encode the index of a register
pub const REG_INDEX_BITS: u32 = 4;

/// Amount of registers available in each bank
pub const REGISTERS_PER_BANK: u8 = 1 << REG_INDEX_BITS;

/// Bank of registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema)]
pub enum RegisterBank {
    /// General purpose classical registers
    R,
    /// Constant registers
    C,
    /// Qubit addresses
    Q,
    /// Measurement outcomes
    M,
}

impl RegisterBank {
    /// All the register banks, in increasing code order
    pub const ALL: [Self; 4] = [Self::R, Self::C, Self::Q, Self::M];

    /// Gets the value used to identify the bank in the binary representation
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::R => 0,
            Self::C => 1,
            Self::Q => 2,
            Self::M => 3,
        }
    }

    /// Gets the bank identified by a value in the binary representation
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::R),
            1 => Some(Self::C),
            2 => Some(Self::Q),
            3 => Some(Self::M),
            _ => None,
        }
    }

    /// Gets the bank identified by its prefix in the text representation
    #[must_use]
    pub const fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            'R' => Some(Self::R),
            'C' => Some(Self::C),
            'Q' => Some(Self::Q),
            'M' => Some(Self::M),
            _ => None,
        }
    }
}

impl fmt::Display for RegisterBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::R => "R",
            Self::C => "C",
            Self::Q => "Q",
            Self::M => "M",
        })
    }
}

/// Register reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema)]
pub struct Register {
    /// Bank of the register
    pub bank: RegisterBank,
    /// Index of the register within its bank. Must be lower than [`REGISTERS_PER_BANK`]
    pub index: u8,
}

impl Register {
    #[must_use]
    pub const fn new(bank: RegisterBank, index: u8) -> Self {
        Self { bank, index }
    }

    /// Checks whether the index of the register is within the bounds of its bank
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.index < REGISTERS_PER_BANK
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.bank, self.index)
    }
}

/// Value that can either be inlined or read from a register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Constant(i64),
    Register(Register),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(x) => write!(f, "{x}"),
            Self::Register(reg) => write!(f, "{reg}"),
        }
    }
}

/// Address of an array in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub struct Address {
    pub base: Value,
}

impl Address {
    #[must_use]
    pub const fn new(base: Value) -> Self {
        Self { base }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.base)
    }
}

/// Single element of an array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub struct ArrayEntry {
    /// Address of the array
    pub address: Address,
    /// Index of the element
    pub index: Value,
}

impl fmt::Display for ArrayEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.address, self.index)
    }
}

/// Range of elements of an array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub struct ArraySlice {
    /// Address of the array
    pub address: Address,
    /// Index of the first element
    pub start: Value,
    /// Index of the element after the last one
    pub stop: Value,
}

impl fmt::Display for ArraySlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}:{}]", self.address, self.start, self.stop)
    }
}

/// Operand of a command
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Operand {
    Constant(i64),
    Register(Register),
    /// Reference to a branch label that hasn't been resolved yet
    Label(String),
    Address(Address),
    ArrayEntry(ArrayEntry),
    ArraySlice(ArraySlice),
}

impl Operand {
    /// Gets the registers referenced by the operand, including the ones nested in array accesses
    pub fn registers(&self) -> impl Iterator<Item = Register> {
        let values = match self {
            Self::Constant(_) | Self::Label(_) => [None, None, None],
            Self::Register(reg) => [Some(Value::Register(*reg)), None, None],
            Self::Address(addr) => [Some(addr.base), None, None],
            Self::ArrayEntry(entry) => [Some(entry.address.base), Some(entry.index), None],
            Self::ArraySlice(slice) => {
                [Some(slice.address.base), Some(slice.start), Some(slice.stop)]
            }
        };
        values.into_iter().flatten().filter_map(|value| match value {
            Value::Register(reg) => Some(reg),
            Value::Constant(_) => None,
        })
    }
}

impl From<Register> for Operand {
    fn from(value: Register) -> Self {
        Self::Register(value)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(x) => write!(f, "{x}"),
            Self::Register(reg) => write!(f, "{reg}"),
            Self::Label(name) => write!(f, "{name}"),
            Self::Address(addr) => write!(f, "{addr}"),
            Self::ArrayEntry(entry) => write!(f, "{entry}"),
            Self::ArraySlice(slice) => write!(f, "{slice}"),
        }
    }
}

/// Single instruction of a subroutine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub struct Command {
    pub opcode: Opcode,
    /// Constant arguments written in brackets after the mnemonic. Empty after assembly
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<i64>,
    pub operands: Vec<Operand>,
}

impl Command {
    /// Creates a new command without bracketed arguments
    #[must_use]
    pub const fn new(opcode: Opcode, operands: Vec<Operand>) -> Self {
        Self {
            opcode,
            args: Vec::new(),
            operands,
        }
    }

    /// Gets the register bound by the command if it's a `set` instruction
    #[must_use]
    pub fn set_target(&self) -> Option<Register> {
        match (self.opcode, self.args.is_empty(), self.operands.first()) {
            (Opcode::Set, true, Some(Operand::Register(reg))) => Some(*reg),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if !self.args.is_empty() {
            let args: Vec<_> = self.args.iter().map(ToString::to_string).collect();
            write!(f, "({})", args.join(","))?;
        }
        for operand in &self.operands {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

/// Element of a raw subroutine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Item {
    Command(Command),
    /// Definition of a branch label, pointing to the next command
    BranchLabel(String),
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(cmd) => write!(f, "{cmd}"),
            Self::BranchLabel(name) => write!(f, "{name}:"),
        }
    }
}

/// Version of the instruction set used by a subroutine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, JsonSchema)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Writes the preamble of a subroutine in its text form
fn write_preamble(f: &mut fmt::Formatter<'_>, version: Version, program_id: u16) -> fmt::Result {
    writeln!(f, "# NETQASM {version}")?;
    writeln!(f, "# APPID {program_id}")
}

/// Subroutine as produced by the parser, possibly containing branch labels and unresolved
/// operands
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, JsonSchema)]
pub struct RawSubroutine {
    pub version: Version,
    pub program_id: u16,
    pub items: Vec<Item>,
}

impl fmt::Display for RawSubroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_preamble(f, self.version, self.program_id)?;
        for item in &self.items {
            writeln!(f, "{item}")?;
        }
        Ok(())
    }
}

/// Fully resolved subroutine, ready to be encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, JsonSchema)]
pub struct Subroutine {
    pub version: Version,
    pub program_id: u16,
    pub commands: Vec<Command>,
}

impl Subroutine {
    /// Generate a `JSON` schema of the serialized form of subroutines
    #[must_use]
    #[allow(clippy::missing_panics_doc)] // This should never panic at runtime from user error
    pub fn schema() -> String {
        let schema = schema_for!(Subroutine);
        serde_json::to_string_pretty(&schema)
            .expect("Input is known and fixed, so it shouldn't error out")
    }
}

impl fmt::Display for Subroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_preamble(f, self.version, self.program_id)?;
        for cmd in &self.commands {
            writeln!(f, "{cmd}")?;
        }
        Ok(())
    }
}

impl From<Subroutine> for RawSubroutine {
    fn from(value: Subroutine) -> Self {
        Self {
            version: value.version,
            program_id: value.program_id,
            items: value.commands.into_iter().map(Item::Command).collect(),
        }
    }
}
