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

#![doc = include_str!("../README.md")]
//! # Example
//!
//! Example usage of the assembler from Rust:
//!
//! ```
//! use netqasm_assembler::prelude::*;
//!
//! let code = "
//! ## NETQASM 1.0
//! ## APPID 0
//! ## DEFINE ms @0
//! array 10 ms!
//! LOOP:
//! beq R0 10 EXIT
//! store R0 ms![R0]
//! add R0 R0 1
//! jmp LOOP
//! EXIT:
//! ret_arr ms!
//! ";
//!
//! // Parse and assemble the code
//! let subroutine = compiler::compile(code)
//!     .map_err(|e| eprintln!("{}", e.render("file.nqasm", code, true)))
//!     .expect("The code should be valid");
//! // Encode it to its binary form and back
//! let bytes = encoding::encode(&subroutine).expect("The subroutine should be encodable");
//! assert_eq!(encoding::decode(&bytes), Ok(subroutine));
//! ```

pub mod compiler;
pub mod encoding;
mod error_rendering;
pub mod instructions;
#[cfg(feature = "js")]
mod js;
pub mod parser;
pub mod span;
pub mod subroutine;

/// Module containing the default exports
pub mod prelude {
    pub use crate::compiler;
    pub use crate::encoding;
    pub use crate::error_rendering::RenderError;
    pub use crate::instructions::{Opcode, REGISTRY};
    pub use crate::parser;
    pub use crate::subroutine::{RawSubroutine, Subroutine};
}

use error_rendering::RenderError;

/// Builds a new lazily-initialized regex with a given literal string
///
/// # Panics
///
/// Panics if the literal string isn't a valid regex
macro_rules! build_regex {
    ($re:expr) => {
        LazyLock::new(|| Regex::new($re).expect("All regexes should compile"))
    };
}
use build_regex as regex;
