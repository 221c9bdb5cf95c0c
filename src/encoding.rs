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

//! Module containing the binary encoding of subroutines
//!
//! The binary form of a subroutine is a header followed by a fixed-size record per command, all
//! integers being little endian:
//!
//! * Header ([`HEADER_SIZE`] bytes): major version (`u8`), minor version (`u8`), and program ID
//!   (`u16`)
//! * Command ([`COMMAND_BYTES`] bytes): opcode (`u8`) followed by the fields of the instruction in
//!   order, padded with zeros
//!
//! Fields are encoded according to their [`FieldType`]:
//!
//! * Register: 1 byte with the bank code in bits 0-1 and the index in bits 2-5
//! * Immediate: `i32`. Branch target: `u32`. Angle: `u8`
//! * Address: `u32`. If [`ADDRESS_REGISTER_FLAG`] is clear, the rest of the bits contain a
//!   constant address. Otherwise, the lowest byte contains a register and the rest of the bits
//!   are zero
//! * Array entry: address followed by the register with the index
//! * Array slice: address followed by the registers with the start and stop indexes

use thiserror::Error;

use crate::instructions::{FieldType, Opcode};
use crate::subroutine::{
    Address, ArrayEntry, ArraySlice, Command, Operand, Register, RegisterBank, Subroutine, Value,
    Version, REG_INDEX_BITS,
};

/// Size in bytes of the header of a subroutine
pub const HEADER_SIZE: usize = 4;

/// Size in bytes of the record of each command
pub const COMMAND_BYTES: usize = 7;

/// Bit of an address word marking its base as a register
pub const ADDRESS_REGISTER_FLAG: u32 = 1 << 31;

/// Amount of bits used to encode the bank of a register
const BANK_BITS: u32 = 2;

/// Type of an encoding error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeErrorKind {
    #[error("bracketed arguments must be folded into the operands")]
    UnfoldedArguments,
    #[error("expected {expected} operands but found {found}")]
    Arity { expected: usize, found: usize },
    #[error("`{found}` can't be encoded as {field}")]
    Mismatch { field: FieldType, found: String },
    #[error("value `{value}` is out of range for {field}")]
    OutOfRange { field: FieldType, value: i64 },
    #[error("register `{0}` doesn't exist")]
    InvalidRegister(Register),
}

/// Error produced while encoding a subroutine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "can't encode command {command}{}: {kind}",
    .position.map(|i| format!(" (operand {i})")).unwrap_or_default()
)]
pub struct EncodeError {
    /// Index of the command that caused the error
    pub command: usize,
    /// Index of the operand that caused the error, if the error is specific to an operand
    pub position: Option<usize>,
    /// Type of the error
    pub kind: EncodeErrorKind,
}

/// Type of a decoding error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    #[error("expected a header of {HEADER_SIZE} bytes but found {found} bytes")]
    TruncatedHeader { found: usize },
    #[error("expected a command of {COMMAND_BYTES} bytes but found {found} bytes")]
    TruncatedCommand { found: usize },
    #[error("unknown opcode `{0}`")]
    UnknownOpcode(u8),
    #[error("invalid register byte `{0:#04x}`")]
    InvalidRegister(u8),
    #[error("invalid address word `{0:#010x}`")]
    InvalidAddress(u32),
    #[error("padding bytes must be zero")]
    NonZeroPadding,
}

/// Error produced while decoding a subroutine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid subroutine at byte {offset}: {kind}")]
pub struct DecodeError {
    /// Offset of the first invalid byte
    pub offset: usize,
    /// Type of the error
    pub kind: DecodeErrorKind,
}

/// Encodes a register as a single byte
fn register_byte(reg: Register) -> Result<u8, EncodeErrorKind> {
    if !reg.is_valid() {
        return Err(EncodeErrorKind::InvalidRegister(reg));
    }
    Ok(reg.bank.code() | reg.index << BANK_BITS)
}

/// Encodes a value that must have been lowered to a register
fn value_byte(value: Value) -> Result<u8, EncodeErrorKind> {
    match value {
        Value::Register(reg) => register_byte(reg),
        Value::Constant(x) => Err(EncodeErrorKind::Mismatch {
            field: FieldType::Register,
            found: x.to_string(),
        }),
    }
}

/// Encodes an address as a 32-bit word
fn address_word(address: Address) -> Result<u32, EncodeErrorKind> {
    match address.base {
        Value::Constant(x) => u32::try_from(x)
            .ok()
            .filter(|word| word & ADDRESS_REGISTER_FLAG == 0)
            .ok_or(EncodeErrorKind::OutOfRange {
                field: FieldType::Address,
                value: x,
            }),
        Value::Register(reg) => Ok(ADDRESS_REGISTER_FLAG | u32::from(register_byte(reg)?)),
    }
}

/// Encodes an operand as the given field type
///
/// # Parameters
///
/// * `field`: type of the field
/// * `operand`: operand to encode
/// * `out`: slice in which to write the field, with the size of the field
///
/// # Errors
///
/// Errors if the operand can't be encoded as the field type
fn encode_field(field: FieldType, operand: &Operand, out: &mut [u8]) -> Result<(), EncodeErrorKind> {
    let out_of_range = |value: i64| EncodeErrorKind::OutOfRange { field, value };
    match (field, operand) {
        (FieldType::Register, Operand::Register(reg)) => out[0] = register_byte(*reg)?,
        (FieldType::Immediate, &Operand::Constant(x)) => {
            let x = i32::try_from(x).map_err(|_| out_of_range(x))?;
            out.copy_from_slice(&x.to_le_bytes());
        }
        (FieldType::Target, &Operand::Constant(x)) => {
            let x = u32::try_from(x).map_err(|_| out_of_range(x))?;
            out.copy_from_slice(&x.to_le_bytes());
        }
        (FieldType::Angle, &Operand::Constant(x)) => {
            out[0] = u8::try_from(x).map_err(|_| out_of_range(x))?;
        }
        (FieldType::Address, Operand::Address(addr)) => {
            out.copy_from_slice(&address_word(*addr)?.to_le_bytes());
        }
        (FieldType::ArrayEntry, Operand::ArrayEntry(entry)) => {
            out[..4].copy_from_slice(&address_word(entry.address)?.to_le_bytes());
            out[4] = value_byte(entry.index)?;
        }
        (FieldType::ArraySlice, Operand::ArraySlice(slice)) => {
            out[..4].copy_from_slice(&address_word(slice.address)?.to_le_bytes());
            out[4] = value_byte(slice.start)?;
            out[5] = value_byte(slice.stop)?;
        }
        (field, operand) => {
            return Err(EncodeErrorKind::Mismatch {
                field,
                found: operand.to_string(),
            })
        }
    }
    Ok(())
}

/// Encodes a single command
///
/// # Errors
///
/// Errors with the position of the operand that caused the error, if any, and the type of the
/// error
fn encode_command(
    command: &Command,
) -> Result<[u8; COMMAND_BYTES], (Option<usize>, EncodeErrorKind)> {
    if !command.args.is_empty() {
        return Err((None, EncodeErrorKind::UnfoldedArguments));
    }
    let fields = command.opcode.fields();
    if fields.len() != command.operands.len() {
        return Err((
            None,
            EncodeErrorKind::Arity {
                expected: fields.len(),
                found: command.operands.len(),
            },
        ));
    }
    let mut record = [0; COMMAND_BYTES];
    record[0] = command.opcode.code();
    let mut offset = 1;
    for (i, (&field, operand)) in fields.iter().zip(&command.operands).enumerate() {
        let size = field.size();
        encode_field(field, operand, &mut record[offset..offset + size])
            .map_err(|kind| (Some(i), kind))?;
        offset += size;
    }
    Ok(record)
}

/// Encodes a subroutine to its binary form
///
/// # Parameters
///
/// * `subroutine`: assembled subroutine to encode
///
/// # Errors
///
/// Errors if a command has the wrong amount of operands, an operand of the wrong type for its
/// field, or a value that doesn't fit in its field
pub fn encode(subroutine: &Subroutine) -> Result<Vec<u8>, EncodeError> {
    let commands = &subroutine.commands;
    let mut out = Vec::with_capacity(HEADER_SIZE + COMMAND_BYTES * commands.len());
    out.push(subroutine.version.major);
    out.push(subroutine.version.minor);
    out.extend(subroutine.program_id.to_le_bytes());
    for (i, command) in commands.iter().enumerate() {
        let record = encode_command(command).map_err(|(position, kind)| EncodeError {
            command: i,
            position,
            kind,
        })?;
        out.extend(record);
    }
    log::debug!("encoded {} commands into {} bytes", commands.len(), out.len());
    Ok(out)
}

/// Decodes a register from its byte
fn decode_register(byte: u8) -> Result<Register, DecodeErrorKind> {
    if byte >> (BANK_BITS + REG_INDEX_BITS) != 0 {
        return Err(DecodeErrorKind::InvalidRegister(byte));
    }
    let bank = RegisterBank::from_code(byte & ((1 << BANK_BITS) - 1))
        .ok_or(DecodeErrorKind::InvalidRegister(byte))?;
    Ok(Register::new(bank, byte >> BANK_BITS))
}

/// Decodes an address from its word
fn decode_address(word: u32) -> Result<Address, DecodeErrorKind> {
    if word & ADDRESS_REGISTER_FLAG == 0 {
        return Ok(Address::new(Value::Constant(word.into())));
    }
    let [low, rest @ ..] = word.to_le_bytes();
    if rest != [0, 0, 0x80] {
        return Err(DecodeErrorKind::InvalidAddress(word));
    }
    Ok(Address::new(Value::Register(decode_register(low)?)))
}

/// Reads a 32-bit word from the start of a slice
fn word(bytes: &[u8]) -> [u8; 4] {
    let mut word = [0; 4];
    word.copy_from_slice(&bytes[..4]);
    word
}

/// Decodes a field from its bytes
///
/// # Errors
///
/// Errors with the offset of the invalid byte relative to the start of the field, and the type
/// of the error
fn decode_field(field: FieldType, bytes: &[u8]) -> Result<Operand, (usize, DecodeErrorKind)> {
    let register = |at: usize| decode_register(bytes[at]).map_err(|kind| (at, kind));
    let address = || decode_address(u32::from_le_bytes(word(bytes))).map_err(|kind| (0, kind));
    Ok(match field {
        FieldType::Register => Operand::Register(register(0)?),
        FieldType::Immediate => Operand::Constant(i32::from_le_bytes(word(bytes)).into()),
        FieldType::Target => Operand::Constant(u32::from_le_bytes(word(bytes)).into()),
        FieldType::Angle => Operand::Constant(bytes[0].into()),
        FieldType::Address => Operand::Address(address()?),
        FieldType::ArrayEntry => Operand::ArrayEntry(ArrayEntry {
            address: address()?,
            index: Value::Register(register(4)?),
        }),
        FieldType::ArraySlice => Operand::ArraySlice(ArraySlice {
            address: address()?,
            start: Value::Register(register(4)?),
            stop: Value::Register(register(5)?),
        }),
    })
}

/// Decodes a single command from its record
///
/// # Parameters
///
/// * `record`: bytes of the command
/// * `start`: offset of the record in the whole buffer
///
/// # Errors
///
/// Errors if the record contains an unknown opcode, an invalid field, or non-zero padding
fn decode_command(record: &[u8], start: usize) -> Result<Command, DecodeError> {
    let error = |at: usize, kind: DecodeErrorKind| DecodeError {
        offset: start + at,
        kind,
    };
    let opcode = Opcode::try_from(record[0]).map_err(|x| error(0, DecodeErrorKind::UnknownOpcode(x)))?;
    let fields = opcode.fields();
    let mut operands = Vec::with_capacity(fields.len());
    let mut at = 1;
    for &field in fields {
        let size = field.size();
        let operand = decode_field(field, &record[at..at + size])
            .map_err(|(offset, kind)| error(at + offset, kind))?;
        operands.push(operand);
        at += size;
    }
    if let Some(i) = record[at..].iter().position(|&x| x != 0) {
        return Err(error(at + i, DecodeErrorKind::NonZeroPadding));
    }
    Ok(Command::new(opcode, operands))
}

/// Decodes a subroutine from its binary form
///
/// # Parameters
///
/// * `bytes`: binary form of the subroutine
///
/// # Errors
///
/// Errors if the buffer is truncated or contains an invalid command. Decoding is strict: any
/// accepted buffer is re-encoded to the exact same bytes
pub fn decode(bytes: &[u8]) -> Result<Subroutine, DecodeError> {
    let (header, body) = bytes
        .split_first_chunk::<HEADER_SIZE>()
        .ok_or(DecodeError {
            offset: 0,
            kind: DecodeErrorKind::TruncatedHeader { found: bytes.len() },
        })?;
    let [major, minor, id @ ..] = *header;
    let records = body.chunks_exact(COMMAND_BYTES);
    let remainder = records.remainder();
    let commands = records
        .enumerate()
        .map(|(i, record)| decode_command(record, HEADER_SIZE + i * COMMAND_BYTES))
        .collect::<Result<Vec<_>, _>>()?;
    if !remainder.is_empty() {
        return Err(DecodeError {
            offset: bytes.len() - remainder.len(),
            kind: DecodeErrorKind::TruncatedCommand {
                found: remainder.len(),
            },
        });
    }
    log::debug!("decoded {} commands from {} bytes", commands.len(), bytes.len());
    Ok(Subroutine {
        version: Version { major, minor },
        program_id: u16::from_le_bytes(id),
        commands,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[must_use]
    const fn reg(bank: RegisterBank, index: u8) -> Register {
        Register::new(bank, index)
    }

    #[must_use]
    const fn r(index: u8) -> Value {
        Value::Register(reg(RegisterBank::R, index))
    }

    #[must_use]
    const fn r15_operand() -> Operand {
        Operand::Register(reg(RegisterBank::R, 15))
    }

    #[must_use]
    fn subroutine(commands: Vec<Command>) -> Subroutine {
        Subroutine {
            version: Version { major: 0, minor: 10 },
            program_id: 0x0102,
            commands,
        }
    }

    #[must_use]
    fn records(commands: Vec<Command>) -> Vec<u8> {
        let bytes = encode(&subroutine(commands)).unwrap();
        assert_eq!(&bytes[..HEADER_SIZE], &[0, 10, 2, 1]);
        bytes[HEADER_SIZE..].to_vec()
    }

    #[test]
    fn register_bytes() {
        assert_eq!(register_byte(reg(RegisterBank::R, 0)), Ok(0x00));
        assert_eq!(register_byte(reg(RegisterBank::C, 1)), Ok(0x05));
        assert_eq!(register_byte(reg(RegisterBank::Q, 2)), Ok(0x0A));
        assert_eq!(register_byte(reg(RegisterBank::M, 15)), Ok(0x3F));
        let invalid = reg(RegisterBank::R, 16);
        assert_eq!(
            register_byte(invalid),
            Err(EncodeErrorKind::InvalidRegister(invalid))
        );
        for byte in 0..0x40 {
            assert_eq!(register_byte(decode_register(byte).unwrap()), Ok(byte));
        }
        assert_eq!(
            decode_register(0x40),
            Err(DecodeErrorKind::InvalidRegister(0x40))
        );
    }

    #[test]
    fn address_words() {
        assert_eq!(address_word(Address::new(Value::Constant(5))), Ok(5));
        assert_eq!(address_word(Address::new(r(2))), Ok(0x8000_0008));
        assert_eq!(
            address_word(Address::new(Value::Constant(1 << 31))),
            Err(EncodeErrorKind::OutOfRange {
                field: FieldType::Address,
                value: 1 << 31
            })
        );
        assert_eq!(
            address_word(Address::new(Value::Constant(-1))),
            Err(EncodeErrorKind::OutOfRange {
                field: FieldType::Address,
                value: -1
            })
        );
        assert_eq!(decode_address(0x8000_0008), Ok(Address::new(r(2))));
        assert_eq!(
            decode_address(0x8000_0108),
            Err(DecodeErrorKind::InvalidAddress(0x8000_0108))
        );
        assert_eq!(
            decode_address(0x8000_0040),
            Err(DecodeErrorKind::InvalidRegister(0x40))
        );
    }

    #[test]
    fn command_records() {
        let r15 = r15_operand();
        assert_eq!(
            records(vec![
                Command::new(Opcode::Set, vec![r15.clone(), Operand::Constant(10)]),
                Command::new(
                    Opcode::Array,
                    vec![r15, Operand::Address(Address::new(Value::Constant(0)))]
                ),
                Command::new(Opcode::Jmp, vec![Operand::Constant(4)]),
            ]),
            vec![
                4, 0x3C, 10, 0, 0, 0, 0, //
                3, 0x3C, 0, 0, 0, 0, 0, //
                9, 4, 0, 0, 0, 0, 0,
            ]
        );
        assert_eq!(
            records(vec![
                Command::new(
                    Opcode::Load,
                    vec![
                        Operand::Register(reg(RegisterBank::M, 3)),
                        Operand::ArrayEntry(ArrayEntry {
                            address: Address::new(r(2)),
                            index: r(1),
                        })
                    ]
                ),
                Command::new(
                    Opcode::WaitAll,
                    vec![Operand::ArraySlice(ArraySlice {
                        address: Address::new(Value::Constant(5)),
                        start: r(1),
                        stop: r(2),
                    })]
                ),
                Command::new(
                    Opcode::RotX,
                    vec![
                        Operand::Register(reg(RegisterBank::Q, 0)),
                        Operand::Constant(1),
                        Operand::Constant(2),
                    ]
                ),
                Command::new(Opcode::Set, vec![r15_operand(), Operand::Constant(-1)]),
            ]),
            vec![
                6, 0x0F, 8, 0, 0, 0x80, 4, //
                35, 5, 0, 0, 0, 4, 8, //
                27, 0x02, 1, 2, 0, 0, 0, //
                4, 0x3C, 0xFF, 0xFF, 0xFF, 0xFF, 0,
            ]
        );
    }

    #[test]
    fn encode_errors() {
        let err = |commands| encode(&subroutine(commands)).unwrap_err();
        assert_eq!(
            err(vec![Command::new(Opcode::Jmp, vec![])]),
            EncodeError {
                command: 0,
                position: None,
                kind: EncodeErrorKind::Arity {
                    expected: 1,
                    found: 0
                },
            }
        );
        let jmp = Command::new(Opcode::Jmp, vec![Operand::Constant(0)]);
        let mut unfolded = Command::new(Opcode::CreateEpr, vec![r15_operand(); 3]);
        unfolded.args = vec![1, 0];
        assert_eq!(
            err(vec![jmp.clone(), unfolded]),
            EncodeError {
                command: 1,
                position: None,
                kind: EncodeErrorKind::UnfoldedArguments,
            }
        );
        assert_eq!(
            err(vec![Command::new(Opcode::Jmp, vec![Operand::Label("L".into())])]),
            EncodeError {
                command: 0,
                position: Some(0),
                kind: EncodeErrorKind::Mismatch {
                    field: FieldType::Target,
                    found: "L".into()
                },
            }
        );
        assert_eq!(
            err(vec![Command::new(
                Opcode::Set,
                vec![Operand::Constant(0), Operand::Constant(0)]
            )]),
            EncodeError {
                command: 0,
                position: Some(0),
                kind: EncodeErrorKind::Mismatch {
                    field: FieldType::Register,
                    found: "0".into()
                },
            }
        );
        assert_eq!(
            err(vec![
                jmp,
                Command::new(
                    Opcode::RotZ,
                    vec![
                        Operand::Register(reg(RegisterBank::Q, 0)),
                        Operand::Constant(1),
                        Operand::Constant(256),
                    ]
                )
            ]),
            EncodeError {
                command: 1,
                position: Some(2),
                kind: EncodeErrorKind::OutOfRange {
                    field: FieldType::Angle,
                    value: 256
                },
            }
        );
        let entry = ArrayEntry {
            address: Address::new(Value::Constant(0)),
            index: Value::Constant(3),
        };
        assert_eq!(
            err(vec![Command::new(
                Opcode::Undef,
                vec![Operand::ArrayEntry(entry)]
            )])
            .kind,
            EncodeErrorKind::Mismatch {
                field: FieldType::Register,
                found: "3".into()
            }
        );
    }

    #[test]
    fn error_messages() {
        let err = EncodeError {
            command: 3,
            position: Some(1),
            kind: EncodeErrorKind::OutOfRange {
                field: FieldType::Immediate,
                value: 1 << 40,
            },
        };
        assert_eq!(
            err.to_string(),
            "can't encode command 3 (operand 1): value `1099511627776` is out of range for immediate"
        );
        let err = EncodeError {
            position: None,
            kind: EncodeErrorKind::UnfoldedArguments,
            ..err
        };
        assert_eq!(
            err.to_string(),
            "can't encode command 3: bracketed arguments must be folded into the operands"
        );
        let err = DecodeError {
            offset: 9,
            kind: DecodeErrorKind::UnknownOpcode(0),
        };
        assert_eq!(err.to_string(), "invalid subroutine at byte 9: unknown opcode `0`");
    }

    #[test]
    fn decode_single_command() {
        let sub = decode(&[0, 0, 0, 0, 0x1F, 0, 0, 0, 0, 0, 0]).unwrap();
        let r0 = Operand::Register(reg(RegisterBank::R, 0));
        assert_eq!(sub.version, Version { major: 0, minor: 0 });
        assert_eq!(sub.program_id, 0);
        assert_eq!(sub.commands, vec![Command::new(Opcode::Cphase, vec![r0.clone(), r0])]);
    }

    #[test]
    fn decode_values() {
        let sub = decode(&[
            1, 2, 0x34, 0x12, //
            4, 0x3C, 0xFE, 0xFF, 0xFF, 0xFF, 0, //
            9, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0,
        ])
        .unwrap();
        assert_eq!(sub.version, Version { major: 1, minor: 2 });
        assert_eq!(sub.program_id, 0x1234);
        assert_eq!(
            sub.commands,
            vec![
                Command::new(Opcode::Set, vec![r15_operand(), Operand::Constant(-2)]),
                Command::new(Opcode::Jmp, vec![Operand::Constant(u32::MAX.into())]),
            ]
        );
    }

    #[test]
    fn decode_errors() {
        let err = |bytes: &[u8]| decode(bytes).unwrap_err();
        let at = |offset, kind| DecodeError { offset, kind };
        assert_eq!(
            err(&[]),
            at(0, DecodeErrorKind::TruncatedHeader { found: 0 })
        );
        assert_eq!(
            err(&[0, 0, 0]),
            at(0, DecodeErrorKind::TruncatedHeader { found: 3 })
        );
        assert_eq!(
            err(&[0, 0, 0, 0, 0x1F, 0, 0]),
            at(4, DecodeErrorKind::TruncatedCommand { found: 3 })
        );
        assert_eq!(
            err(&[0, 0, 0, 0, 0x1F, 0, 0, 0, 0, 0, 0, 0x1F]),
            at(11, DecodeErrorKind::TruncatedCommand { found: 1 })
        );
        assert_eq!(
            err(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
            at(4, DecodeErrorKind::UnknownOpcode(0))
        );
        assert_eq!(
            err(&[0, 0, 0, 0, 41, 0, 0, 0, 0, 0, 0]),
            at(4, DecodeErrorKind::UnknownOpcode(41))
        );
        assert_eq!(
            err(&[0, 0, 0, 0, 0x1F, 0, 0x40, 0, 0, 0, 0]),
            at(6, DecodeErrorKind::InvalidRegister(0x40))
        );
        assert_eq!(
            err(&[0, 0, 0, 0, 0x1F, 0, 0, 0, 0, 1, 0]),
            at(9, DecodeErrorKind::NonZeroPadding)
        );
        assert_eq!(
            err(&[0, 0, 0, 0, 40, 0, 1, 0, 0x80, 0, 0]),
            at(5, DecodeErrorKind::InvalidAddress(0x8000_0100))
        );
        assert_eq!(
            err(&[0, 0, 0, 0, 37, 0, 0, 0, 0, 0x80, 0]),
            at(9, DecodeErrorKind::InvalidRegister(0x80))
        );
    }

    #[test]
    fn round_trip() {
        let sub = subroutine(vec![
            Command::new(Opcode::Qalloc, vec![Operand::Register(reg(RegisterBank::Q, 0))]),
            Command::new(
                Opcode::Beq,
                vec![
                    Operand::Register(reg(RegisterBank::R, 0)),
                    Operand::Register(reg(RegisterBank::C, 1)),
                    Operand::Constant(7),
                ],
            ),
            Command::new(
                Opcode::RetArr,
                vec![Operand::Address(Address::new(Value::Constant(0x7FFF_FFFF)))],
            ),
            Command::new(
                Opcode::Addm,
                vec![
                    Operand::Register(reg(RegisterBank::R, 0)),
                    Operand::Register(reg(RegisterBank::R, 1)),
                    Operand::Register(reg(RegisterBank::R, 2)),
                    Operand::Register(reg(RegisterBank::M, 3)),
                ],
            ),
        ]);
        let bytes = encode(&sub).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 4 * COMMAND_BYTES);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, sub);
        assert_eq!(encode(&decoded).unwrap(), bytes);
    }
}
