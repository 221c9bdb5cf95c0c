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

//! Module containing the definition of wrappers for the assembler and generation of `JS`
//! bindings for interoperability

use wasm_bindgen::prelude::*;

use crate::RenderError;

// Creates a hook for panics to improve error messages
pub fn set_panic_hook() {
    // When the `console_error_panic_hook` feature is enabled, we can call the
    // `set_panic_hook` function at least once during initialization, and then
    // we will get better error messages if our code ever panics.
    //
    // For more details see
    // https://github.com/rustwasm/console_error_panic_hook#readme
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Converts a given string with ANSI escape codes to HTML
///
/// # Panics
///
/// Panics if the string contains invalid ANSI escape codes
#[must_use]
fn to_html(str: &str) -> String {
    let converter = ansi_to_html::Converter::default().four_bit_var_prefix(Some("err-".into()));
    converter
        .convert(str)
        .expect("We should only generate valid ANSI escapes")
}

/// Method used to render colors in error messages
#[wasm_bindgen]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color {
    /// Use HTML tags, intended for display in browsers
    Html,
    /// Use ANSI escape codes, intended for display in terminals
    Ansi,
    /// Disable all formatting, using only plain text
    Off,
}

impl Color {
    /// Renders an error with this color method
    fn render(self, error: &dyn RenderError, src: &str) -> String {
        const FILENAME: &str = "subroutine";
        let rendered = error.render(FILENAME, src, self != Self::Off);
        if self == Self::Html {
            to_html(&rendered)
        } else {
            rendered
        }
    }
}

/// Assembled subroutine
#[wasm_bindgen(getter_with_clone)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubroutineJS {
    /// Text representation of the fully resolved subroutine
    #[wasm_bindgen(readonly)]
    pub text: String,
    /// Binary representation of the subroutine
    #[wasm_bindgen(readonly)]
    pub binary: Vec<u8>,
}

#[wasm_bindgen]
impl SubroutineJS {
    /// Converts the subroutine to its text representation
    #[wasm_bindgen(js_name = toString)]
    #[must_use]
    pub fn to_text(&self) -> String {
        self.text.clone()
    }
}

/// Compiles a subroutine from its text representation
///
/// # Parameters
///
/// * `src`: code of the subroutine
/// * `color`: method used to render colors in error messages
///
/// # Errors
///
/// Errors if the code has a syntactical or semantical error, or if the resulting subroutine
/// can't be encoded
#[wasm_bindgen]
pub fn compile(src: &str, color: Color) -> Result<SubroutineJS, String> {
    set_panic_hook();
    let subroutine = crate::compiler::compile(src).map_err(|e| color.render(&e, src))?;
    let binary = crate::encoding::encode(&subroutine).map_err(|e| e.to_string())?;
    Ok(SubroutineJS {
        text: subroutine.to_string(),
        binary,
    })
}

/// Decodes a subroutine from its binary representation, returning its text representation
///
/// # Errors
///
/// Errors if the binary data isn't a valid subroutine
#[wasm_bindgen]
pub fn decode(binary: &[u8]) -> Result<String, String> {
    set_panic_hook();
    crate::encoding::decode(binary)
        .map(|subroutine| subroutine.to_string())
        .map_err(|e| e.to_string())
}

/// Gets the instruction set as `JSON`
#[wasm_bindgen]
#[must_use]
#[allow(clippy::missing_panics_doc)]
pub fn instructions() -> String {
    serde_json::to_string_pretty(crate::instructions::REGISTRY.definitions())
        .expect("Input is known and fixed, so it shouldn't error out")
}
