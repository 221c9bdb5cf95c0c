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

//! Module containing utilities for rendering errors

use ariadne::{Color, Config, Fmt, IndexType, Label, Report, ReportKind, Source};

use std::fmt;

use crate::span::Span;

/// Wrapper to display elements with an optional color
#[derive(Debug, PartialEq, Eq)]
pub struct Colored<T>(pub T, pub Option<Color>);

impl<T: fmt::Display> fmt::Display for Colored<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(color) = self.1 {
            write!(f, "{}", (&self.0).fg(color))
        } else {
            write!(f, "`{}`", self.0)
        }
    }
}

/// Wrapper for a vector to display it as a list of alternatives
#[derive(Debug, PartialEq, Eq)]
pub struct DisplayList<T> {
    /// Sorted list of values to display
    pub values: Vec<T>,
    /// Whether to display the values with colors or not
    pub color: bool,
}

impl<T: Ord> DisplayList<T> {
    #[must_use]
    pub fn new(mut values: Vec<T>, color: bool) -> Self {
        values.sort_unstable();
        Self { values, color }
    }
}

impl<T: fmt::Display> fmt::Display for DisplayList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let color = self.color.then_some(Color::Green);
        let n = self.values.len();
        for (i, x) in self.values.iter().enumerate() {
            // Separator between the previous value and this one
            match (i, n) {
                (0, _) => {}
                (_, 2) => write!(f, " or ")?,
                _ if i + 1 == n => write!(f, ", or ")?,
                _ => write!(f, ", ")?,
            }
            write!(f, "{}", Colored(x, color))?;
        }
        Ok(())
    }
}

/// Wrapper to display an amount of operands
#[derive(Debug, PartialEq, Eq)]
pub struct ArgNum(pub usize, pub Option<Color>);

impl fmt::Display for ArgNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = if self.0 == 1 { "" } else { "s" };
        write!(f, "{} operand{s}", Colored(self.0, self.1))
    }
}

// NOTE: adapted from rustc
// https://github.com/rust-lang/rust/blob/master/compiler/rustc_span/src/edit_distance.rs
/// Finds the [edit distance] between two strings, counting insertions, deletions, substitutions,
/// and transpositions of adjacent characters
///
/// Returns `None` if the distance exceeds the limit
///
/// [edit distance]: https://en.wikipedia.org/wiki/Edit_distance
#[must_use]
fn edit_distance(a: &str, b: &str, limit: usize) -> Option<usize> {
    use std::{cmp, mem};
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (mut a, mut b) = (&a[..], &b[..]);

    // `b` is the shorter string
    if a.len() < b.len() {
        mem::swap(&mut a, &mut b);
    }
    let min_dist = a.len() - b.len();
    if min_dist > limit {
        return None;
    }

    // Strip common prefix and suffix
    while let Some(((b_char, b_rest), (a_char, a_rest))) = b.split_first().zip(a.split_first()) {
        if a_char != b_char {
            break;
        }
        a = a_rest;
        b = b_rest;
    }
    while let Some(((b_char, b_rest), (a_char, a_rest))) = b.split_last().zip(a.split_last()) {
        if a_char != b_char {
            break;
        }
        a = a_rest;
        b = b_rest;
    }
    if b.is_empty() {
        return Some(min_dist);
    }

    let mut prev_prev = vec![usize::MAX; b.len() + 1];
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        current[0] = i;
        for j in 1..=b.len() {
            let substitution = prev[j - 1] + usize::from(a[i - 1] != b[j - 1]);
            current[j] = cmp::min(cmp::min(prev[j] + 1, current[j - 1] + 1), substitution);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                current[j] = cmp::min(current[j], prev_prev[j - 2] + 1);
            }
        }
        [prev_prev, prev, current] = [prev, current, prev_prev];
    }

    // `prev` because the buffers were already rotated
    let distance = prev[b.len()];
    (distance <= limit).then_some(distance)
}

/// Gets the names from a list that are the most similar to the given name
///
/// Names further away than a third of the length of the target aren't considered
///
/// # Parameters
///
/// * `target`: target name to match against
/// * `names`: iterator of possible names
#[must_use]
pub fn get_similar<'a>(target: &str, names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let limit = std::cmp::max(target.chars().count() / 3, 1);
    let mut best = limit;
    let mut similar = Vec::new();
    for name in names {
        let Some(distance) = edit_distance(target, name, best) else {
            continue;
        };
        if distance < best || similar.is_empty() {
            best = distance;
            similar.clear();
        }
        if !similar.contains(&name) {
            similar.push(name);
        }
    }
    similar.sort_unstable();
    similar
}

/// Error description ready to be rendered as a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Location of the error in the source code
    pub span: Span,
    /// Main message of the error
    pub message: String,
    /// Message attached to the location of the error
    pub label: String,
    /// Additional location related to the error, with its message
    pub context: Option<(Span, String)>,
    /// Additional help message
    pub note: Option<String>,
}

impl Diagnostic {
    /// Write the diagnostic to a buffer as an `ariadne` report
    ///
    /// # Parameters
    ///
    /// * `filename`: name of the file with the code
    /// * `src`: original source code parsed
    /// * `buffer`: writer in which to write the report
    /// * `color`: whether to enable colors or not
    pub fn write(self, filename: &str, src: &str, mut buffer: &mut Vec<u8>, color: bool) {
        let config = Config::default()
            .with_color(color)
            .with_index_type(IndexType::Byte);
        let mut report = Report::build(ReportKind::Error, (filename, self.span.clone()))
            .with_config(config)
            .with_message(self.message)
            .with_label(
                Label::new((filename, self.span))
                    .with_message(self.label)
                    .with_color(Color::Red),
            );
        if let Some((span, msg)) = self.context {
            report = report.with_label(
                Label::new((filename, span))
                    .with_message(msg)
                    .with_color(Color::Blue),
            );
        }
        if let Some(note) = self.note {
            report = report.with_note(note);
        }
        report
            .finish()
            .write((filename, Source::from(src)), &mut buffer)
            .expect("Writing to an in-memory vector can't fail");
    }
}

/// Trait representing an error that can be rendered for display
pub trait RenderError {
    /// Write the formatted error to a buffer. The written bytes should correspond to valid UTF-8
    ///
    /// # Parameters
    ///
    /// * `filename`: name of the file with the code
    /// * `src`: original source code parsed
    /// * `buffer`: writer in which to write the formatted error
    /// * `color`: whether to enable colors or not
    fn format(&self, filename: &str, src: &str, buffer: &mut Vec<u8>, color: bool);

    /// Render the error to a string
    ///
    /// # Parameters
    ///
    /// * `filename`: name of the file with the code
    /// * `src`: original source code parsed
    /// * `color`: whether to enable colors or not
    #[must_use]
    fn render(&self, filename: &str, src: &str, color: bool) -> String {
        let mut buffer = Vec::new();
        self.format(filename, src, &mut buffer, color);
        String::from_utf8(buffer).expect("the rendered error should be valid UTF-8")
    }
}

/// Builds the note suggesting similar names to a misspelled one
///
/// # Parameters
///
/// * `target`: misspelled name
/// * `names`: iterator of valid names
/// * `color`: whether to enable colors or not
#[must_use]
pub fn suggestion<'a>(
    target: &str,
    names: impl IntoIterator<Item = &'a str>,
    color: bool,
) -> Option<String> {
    let similar = get_similar(target, names);
    (!similar.is_empty()).then(|| format!("Did you mean {}?", DisplayList::new(similar, color)))
}
