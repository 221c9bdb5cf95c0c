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

//! Module containing the macro expander
//!
//! Macros are defined in the preamble with `# DEFINE key value`, and referenced in the body as
//! `key!`. Expansion is a flat textual substitution applied once per macro, in declaration order.
//! The text produced by a macro can therefore reference macros declared after it, but never
//! itself or the ones declared before it

use std::borrow::Cow;

/// Textual macro expander
#[derive(Debug, Clone, Default)]
pub struct Expander {
    /// `(reference, value)` pairs, in declaration order
    macros: Vec<(String, String)>,
}

impl Expander {
    /// Creates a new expander from a list of `(key, value)` definitions
    ///
    /// Braces (`{` and `}`) surrounding a value are removed from it
    #[must_use]
    pub fn new<'a>(macros: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let macros = macros
            .into_iter()
            .map(|(key, value)| (format!("{key}!"), value.trim_matches(['{', '}']).to_owned()))
            .collect();
        Self { macros }
    }

    /// Expands all the macro references in a line
    ///
    /// Returns the input unchanged (borrowed) if it doesn't reference any macro
    #[must_use]
    pub fn expand<'a>(&self, line: &'a str) -> Cow<'a, str> {
        self.macros
            .iter()
            .fold(Cow::Borrowed(line), |text, (reference, value)| {
                if text.contains(reference.as_str()) {
                    Cow::Owned(text.replace(reference.as_str(), value))
                } else {
                    text
                }
            })
    }
}
