//! CLI Module
//!
//! Command-line interface for inspecting, listing, copying and
//! synthesizing sound files.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::format::{FormatCode, FormatKind};

/// Wavefile - read and write audio files as sample buffers
#[derive(Parser, Debug)]
#[command(name = "wavefile")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show stream parameters and tags of a file
    #[command(name = "info")]
    Info {
        /// File to inspect
        path: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the formats the engine knows
    #[command(name = "formats")]
    Formats {
        /// Catalogue: common, major, subtype or all
        #[arg(short, long, default_value = "common")]
        kind: FormatKind,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy a file block by block, scaling samples and tagging the copy
    #[command(name = "copy")]
    Copy {
        /// Source file
        input: PathBuf,

        /// Destination file
        #[arg(default_value = "output.wav")]
        output: PathBuf,

        /// Linear gain applied to every sample
        #[arg(short, long, default_value_t = 0.8)]
        gain: f32,

        /// Frames per block
        #[arg(short, long, default_value_t = 512)]
        block: usize,
    },

    /// Write a stereo test signal: a saw sweep and a modulated square
    #[command(name = "synth")]
    Synth {
        /// Destination file
        #[arg(default_value = "synth.wav")]
        output: PathBuf,

        /// Number of blocks to write
        #[arg(short = 'n', long, default_value_t = 256)]
        blocks: usize,

        /// Frames per block
        #[arg(short, long, default_value_t = 512)]
        block: usize,

        /// Sample rate in Hz
        #[arg(short, long, default_value_t = 44100)]
        rate: u32,

        /// Format code, decimal or 0x-prefixed hex
        #[arg(short, long, default_value = "0x00010006", value_parser = parse_format_code)]
        format: FormatCode,
    },
}

/// Parse `0x00010002` or `65538` as a format code
pub fn parse_format_code(s: &str) -> Result<FormatCode, String> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    value
        .map(FormatCode::new)
        .map_err(|err| format!("invalid format code '{}': {}", s, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format_code() {
        assert_eq!(
            parse_format_code("0x00010002").unwrap(),
            FormatCode::WAV | FormatCode::PCM_16
        );
        assert_eq!(parse_format_code("65542").unwrap(), FormatCode::WAV | FormatCode::FLOAT);
        assert!(parse_format_code("wav").is_err());
    }

    #[test]
    fn test_cli_parses_formats() {
        let cli = Cli::try_parse_from(["wavefile", "formats", "--kind", "major", "--json"]).unwrap();
        match cli.command {
            Some(Commands::Formats { kind, json }) => {
                assert_eq!(kind, FormatKind::Major);
                assert!(json);
            }
            other => panic!("Expected formats command, got: {:?}", other),
        }
    }

    #[test]
    fn test_cli_copy_defaults() {
        let cli = Cli::try_parse_from(["wavefile", "copy", "in.wav"]).unwrap();
        match cli.command {
            Some(Commands::Copy {
                output,
                gain,
                block,
                ..
            }) => {
                assert_eq!(output, PathBuf::from("output.wav"));
                assert_eq!(gain, 0.8);
                assert_eq!(block, 512);
            }
            other => panic!("Expected copy command, got: {:?}", other),
        }
    }
}
