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

//! Module containing the definition of the instruction set
//!
//! Each instruction is identified by its [`Opcode`], which has an associated [`Definition`]
//! containing its mnemonic and the type of each of its fields. Definitions are stored in a static
//! table, and can be looked up either by mnemonic or by opcode value through the global
//! [`REGISTRY`]

use schemars::JsonSchema;
use serde::{Serialize, Serializer};

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::subroutine::{Address, Operand, Value};

/// Type of a field of an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Register of any bank
    Register,
    /// Signed 32-bit integer
    Immediate,
    /// Index of a command in the subroutine, used as a branch target
    Target,
    /// Unsigned 8-bit integer used to describe rotation angles
    Angle,
    /// Memory address of an array
    Address,
    /// Single element of an array
    ArrayEntry,
    /// Range of elements of an array
    ArraySlice,
}

impl FieldType {
    /// Amount of bytes used by the field in the binary representation
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Register | Self::Angle => 1,
            Self::Immediate | Self::Target | Self::Address => 4,
            Self::ArrayEntry => 5,
            Self::ArraySlice => 6,
        }
    }

    /// Checks whether the field holds an inline integer value
    #[must_use]
    pub const fn is_immediate(self) -> bool {
        matches!(self, Self::Immediate | Self::Target | Self::Angle)
    }

    /// Checks whether a parsed operand can be used for this field
    ///
    /// Constants are accepted for register fields, since they can be lowered to a register during
    /// assembly. Labels are only accepted for branch targets
    #[must_use]
    pub const fn accepts(self, operand: &Operand) -> bool {
        matches!(
            (self, operand),
            (Self::Register, Operand::Register(_) | Operand::Constant(_))
                | (Self::Immediate | Self::Angle, Operand::Constant(_))
                | (Self::Target, Operand::Constant(_) | Operand::Label(_))
                | (Self::Address, Operand::Address(_))
                | (Self::ArrayEntry, Operand::ArrayEntry(_))
                | (Self::ArraySlice, Operand::ArraySlice(_))
        )
    }

    /// Checks whether a constant used directly as this field can be encoded
    ///
    /// Constants in register fields are lowered to a `set` instruction, so they must fit its
    /// immediate. Addresses use the lower 31 bits of their word
    #[must_use]
    pub fn fits(self, value: i64) -> bool {
        match self {
            Self::Register | Self::Immediate => i32::try_from(value).is_ok(),
            Self::Target => u32::try_from(value).is_ok(),
            Self::Angle => u8::try_from(value).is_ok(),
            Self::Address | Self::ArrayEntry | Self::ArraySlice => (0..1 << 31).contains(&value),
        }
    }

    /// Finds a constant of an operand accepted by this field that can't be encoded once
    /// assembled
    ///
    /// Indexes and bounds of array accesses are lowered to registers, so they are checked as
    /// immediates
    #[must_use]
    pub fn out_of_range(self, operand: &Operand) -> Option<i64> {
        let base = |address: &Address| match address.base {
            Value::Constant(x) => (!self.fits(x)).then_some(x),
            Value::Register(_) => None,
        };
        let index = |value: &Value| match *value {
            Value::Constant(x) => (!FieldType::Immediate.fits(x)).then_some(x),
            Value::Register(_) => None,
        };
        match operand {
            &Operand::Constant(x) => (!self.fits(x)).then_some(x),
            Operand::Address(address) => base(address),
            Operand::ArrayEntry(entry) => base(&entry.address).or_else(|| index(&entry.index)),
            Operand::ArraySlice(slice) => base(&slice.address)
                .or_else(|| index(&slice.start))
                .or_else(|| index(&slice.stop)),
            Operand::Register(_) | Operand::Label(_) => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Register => "register",
            Self::Immediate => "immediate",
            Self::Target => "branch target",
            Self::Angle => "angle",
            Self::Address => "address",
            Self::ArrayEntry => "array entry",
            Self::ArraySlice => "array slice",
        })
    }
}

/// Definition of an instruction
#[derive(Debug, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Definition {
    /// Name used for the instruction in the text form
    pub mnemonic: &'static str,
    /// Value used for the instruction in the binary form
    #[serde(serialize_with = "serialize_code")]
    #[schemars(with = "u8")]
    pub opcode: Opcode,
    /// Types of the fields of the instruction, in order
    pub fields: &'static [FieldType],
}

/// Serializes an opcode as its numeric value
fn serialize_code<S: Serializer>(opcode: &Opcode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(opcode.code())
}

/// Generates the [`Opcode`] enum and the table of instruction definitions
macro_rules! instruction_set {
    ($($(#[$attr:meta])* $variant:ident = $code:literal => $mnemonic:literal [$($field:ident),*],)*) => {
        /// Operation code of an instruction
        ///
        /// Serialized as the mnemonic of the instruction
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema)]
        #[serde(rename_all = "snake_case")]
        #[repr(u8)]
        pub enum Opcode {
            $($(#[$attr])* $variant = $code,)*
        }

        impl Opcode {
            /// All the available opcodes, in increasing order
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];
        }

        /// Definitions of all the available instructions, in increasing opcode order
        pub static DEFINITIONS: &[Definition] = &[$(
            Definition {
                mnemonic: $mnemonic,
                opcode: Opcode::$variant,
                fields: &[$(FieldType::$field),*],
            },
        )*];
    };
}

instruction_set! {
    /// Allocate a qubit
    Qalloc = 1 => "qalloc" [Register],
    /// Initialize a qubit to |0>
    Init = 2 => "init" [Register],
    /// Allocate an array of the given length at an address
    Array = 3 => "array" [Register, Address],
    Set = 4 => "set" [Register, Immediate],
    Store = 5 => "store" [Register, ArrayEntry],
    Load = 6 => "load" [Register, ArrayEntry],
    Undef = 7 => "undef" [ArrayEntry],
    /// Load the address of an array into a register
    Lea = 8 => "lea" [Register, Address],
    Jmp = 9 => "jmp" [Target],
    /// Branch if equal to zero
    Bez = 10 => "bez" [Register, Target],
    /// Branch if not equal to zero
    Bnz = 11 => "bnz" [Register, Target],
    Beq = 12 => "beq" [Register, Register, Target],
    Bne = 13 => "bne" [Register, Register, Target],
    Blt = 14 => "blt" [Register, Register, Target],
    Bge = 15 => "bge" [Register, Register, Target],
    Add = 16 => "add" [Register, Register, Register],
    Sub = 17 => "sub" [Register, Register, Register],
    /// Modular addition
    Addm = 18 => "addm" [Register, Register, Register, Register],
    /// Modular subtraction
    Subm = 19 => "subm" [Register, Register, Register, Register],
    X = 20 => "x" [Register],
    Y = 21 => "y" [Register],
    Z = 22 => "z" [Register],
    H = 23 => "h" [Register],
    S = 24 => "s" [Register],
    K = 25 => "k" [Register],
    T = 26 => "t" [Register],
    /// Rotation around the X axis by `n * pi / d`
    RotX = 27 => "rot_x" [Register, Angle, Angle],
    /// Rotation around the Y axis by `n * pi / d`
    RotY = 28 => "rot_y" [Register, Angle, Angle],
    /// Rotation around the Z axis by `n * pi / d`
    RotZ = 29 => "rot_z" [Register, Angle, Angle],
    Cnot = 30 => "cnot" [Register, Register],
    Cphase = 31 => "cphase" [Register, Register],
    /// Measure a qubit, storing the outcome in a register
    Meas = 32 => "meas" [Register, Register],
    CreateEpr = 33 => "create_epr" [Register, Register, Register, Register, Register],
    RecvEpr = 34 => "recv_epr" [Register, Register, Register, Register],
    WaitAll = 35 => "wait_all" [ArraySlice],
    WaitAny = 36 => "wait_any" [ArraySlice],
    WaitSingle = 37 => "wait_single" [ArrayEntry],
    Qfree = 38 => "qfree" [Register],
    RetReg = 39 => "ret_reg" [Register],
    RetArr = 40 => "ret_arr" [Address],
}

impl Opcode {
    /// Gets the numeric value of the opcode
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Gets the definition of the instruction
    #[must_use]
    pub fn definition(self) -> &'static Definition {
        REGISTRY.get(self)
    }

    /// Gets the name of the instruction
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.definition().mnemonic
    }

    /// Gets the types of the fields of the instruction
    #[must_use]
    pub fn fields(self) -> &'static [FieldType] {
        self.definition().fields
    }

    /// Finds the opcode of an instruction from its mnemonic
    #[must_use]
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        REGISTRY.by_mnemonic(mnemonic).map(|def| def.opcode)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        REGISTRY.by_code(code).map(|def| def.opcode).ok_or(code)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Lookup table of instruction definitions
#[derive(Debug)]
pub struct Registry {
    /// Mapping from mnemonics to indexes in [`DEFINITIONS`]
    mnemonics: HashMap<&'static str, usize>,
    /// Mapping from opcode values to indexes in [`DEFINITIONS`]
    codes: HashMap<u8, usize>,
}

/// Global instruction registry, built on first use
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::build);

impl Registry {
    /// Builds the lookup tables from [`DEFINITIONS`]
    ///
    /// # Panics
    ///
    /// Panics if the table of definitions has repeated mnemonics or opcodes
    fn build() -> Self {
        let mut mnemonics = HashMap::with_capacity(DEFINITIONS.len());
        let mut codes = HashMap::with_capacity(DEFINITIONS.len());
        for (i, def) in DEFINITIONS.iter().enumerate() {
            let repeated_name = mnemonics.insert(def.mnemonic, i).is_some();
            let repeated_code = codes.insert(def.opcode.code(), i).is_some();
            assert!(
                !repeated_name && !repeated_code,
                "instruction `{}` is defined multiple times",
                def.mnemonic
            );
        }
        Self { mnemonics, codes }
    }

    /// Gets the definition of an opcode
    #[must_use]
    #[allow(clippy::missing_panics_doc)] // Every opcode has a definition
    pub fn get(&self, opcode: Opcode) -> &'static Definition {
        &DEFINITIONS[self.codes[&opcode.code()]]
    }

    /// Finds the definition of an instruction from its mnemonic
    #[must_use]
    pub fn by_mnemonic(&self, mnemonic: &str) -> Option<&'static Definition> {
        self.mnemonics.get(mnemonic).map(|&i| &DEFINITIONS[i])
    }

    /// Finds the definition of an instruction from its opcode value
    #[must_use]
    pub fn by_code(&self, code: u8) -> Option<&'static Definition> {
        self.codes.get(&code).map(|&i| &DEFINITIONS[i])
    }

    /// Gets the definitions of all the instructions, in increasing opcode order
    #[must_use]
    pub fn definitions(&self) -> &'static [Definition] {
        DEFINITIONS
    }

    /// Gets the names of all the instructions
    pub fn mnemonics(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.mnemonics.keys().copied()
    }
}

/// Positions of the fields allowed to keep an inline constant, for each opcode
///
/// Constants in any other position are lowered to a register during assembly
pub static IMMEDIATE_SLOTS: &[(Opcode, usize)] = &[
    (Opcode::Set, 1),
    (Opcode::Jmp, 0),
    (Opcode::Bez, 1),
    (Opcode::Bnz, 1),
    (Opcode::Beq, 2),
    (Opcode::Bne, 2),
    (Opcode::Blt, 2),
    (Opcode::Bge, 2),
    (Opcode::RotX, 1),
    (Opcode::RotX, 2),
    (Opcode::RotY, 1),
    (Opcode::RotY, 2),
    (Opcode::RotZ, 1),
    (Opcode::RotZ, 2),
];

/// Checks whether the field in the given position of an instruction can hold an inline constant
///
/// # Parameters
///
/// * `opcode`: opcode of the instruction
/// * `position`: index of the field in the instruction
#[must_use]
pub fn allows_immediate(opcode: Opcode, position: usize) -> bool {
    IMMEDIATE_SLOTS.contains(&(opcode, position))
}
