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

#![cfg(feature = "cli")]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use env_logger::Env;

use netqasm_assembler::encoding::{DecodeError, EncodeError};
use netqasm_assembler::prelude::*;

/// Command-line arguments parser
#[derive(Parser)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Available CLI commands
#[derive(Subcommand, PartialEq, Eq, Clone)]
enum Command {
    /// Print the schema of the `JSON` output of subroutines to `stdout` and exit
    Schema,
    /// Print the instruction set to `stdout` as `JSON` and exit
    ///
    /// Includes the mnemonic, opcode, and type of each field of every instruction
    Instructions,
    /// Compile a given subroutine and print the result to `stdout`
    ///
    /// Prints the fully resolved subroutine, with bracketed arguments folded into the operands,
    /// constants that can't be encoded inline lowered to registers, and branch labels replaced
    /// with command indexes
    Compile {
        /// Path to the subroutine file
        code: String,
        /// Print the result as `JSON` instead of text
        #[arg(short, long)]
        json: bool,
        /// Enable verbose output. Prints the parsed subroutine as well
        #[arg(short, long)]
        verbose: bool,
    },
    /// Compile a given subroutine and write its binary form to a file
    Encode {
        /// Path to the subroutine file
        code: String,
        /// Path to the output file
        output: String,
    },
    /// Decode a subroutine in binary form and print it to `stdout`
    Decode {
        /// Path to the binary file
        binary: String,
        /// Print the result as `JSON` instead of text
        #[arg(short, long)]
        json: bool,
    },
}

/// Execution error
#[derive(Debug)]
enum Error {
    /// Error reading a file
    ReadFile(String, std::io::Error),
    /// Error writing a file
    WriteFile(String, std::io::Error),
    /// Error parsing/compiling the subroutine, already rendered
    Compilation(String),
    /// Error encoding the compiled subroutine
    Encode(EncodeError),
    /// Error decoding a binary subroutine
    Decode(String, DecodeError),
}

/// Reads a file to a string
fn read_file(filename: &str) -> Result<String, Error> {
    std::fs::read_to_string(filename).map_err(|e| Error::ReadFile(filename.to_owned(), e))
}

/// Compiles the subroutine in a file
fn compile_file(filename: &str, verbose: bool) -> Result<Subroutine, Error> {
    let src = read_file(filename)?;
    let render = |e: &dyn RenderError| Error::Compilation(e.render(filename, &src, true));
    if verbose {
        let (raw, _) = parser::parse(&src).map_err(|e| render(&e))?;
        println!("\n\x1B[1;32m========================= Parsed Code ==========================\x1B[0m\n");
        print!("{raw}");
        println!("\n\x1B[1;32m======================== Compiled Code =========================\x1B[0m\n");
    }
    compiler::compile(&src).map_err(|e| render(&e))
}

/// Prints a value as pretty printed `JSON`
fn print_json<T: serde::Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("Our types should always be serializable")
    );
}

/// Runs the application
fn run() -> Result<(), Error> {
    let args = Cli::parse(); // Parse command-line arguments
    match args.command {
        Command::Schema => println!("{}", Subroutine::schema()),
        Command::Instructions => print_json(&REGISTRY.definitions()),
        Command::Compile {
            code,
            json,
            verbose,
        } => {
            let subroutine = compile_file(&code, verbose)?;
            if json {
                print_json(&subroutine);
            } else {
                print!("{subroutine}");
            }
        }
        Command::Encode { code, output } => {
            let subroutine = compile_file(&code, false)?;
            let bytes = encoding::encode(&subroutine).map_err(Error::Encode)?;
            std::fs::write(&output, bytes).map_err(|e| Error::WriteFile(output, e))?;
        }
        Command::Decode { binary, json } => {
            let bytes = std::fs::read(&binary).map_err(|e| Error::ReadFile(binary.clone(), e))?;
            let subroutine = encoding::decode(&bytes).map_err(|e| Error::Decode(binary, e))?;
            if json {
                print_json(&subroutine);
            } else {
                print!("{subroutine}");
            }
        }
    }
    Ok(())
}

/// Main entry point
fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let (x, msg) = match run() {
        Err(Error::ReadFile(file, e)) => {
            (1, format!("Can't read file `\x1B[33m{file}\x1B[0m`: {e}"))
        }
        Err(Error::WriteFile(file, e)) => {
            (1, format!("Can't write file `\x1B[33m{file}\x1B[0m`: {e}"))
        }
        Err(Error::Compilation(e)) => {
            eprintln!("{e}");
            return 2.into();
        }
        Err(Error::Encode(e)) => (3, format!("Can't encode subroutine: {e}")),
        Err(Error::Decode(file, e)) => (
            3,
            format!("Can't decode file `\x1B[33m{file}\x1B[0m`: {e}"),
        ),
        Ok(()) => return ExitCode::SUCCESS,
    };
    eprintln!("\x1B[1;31m[Error]\x1B[0m {msg}");
    x.into()
}
