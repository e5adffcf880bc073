//! Command-line contracts: argument parsing and command output

mod parse_contracts;
mod support;
