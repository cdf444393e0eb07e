//! CLI commands and interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "contact-search")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Display information about a beam mesh file
    Info {
        /// Path to the JSON mesh file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Search candidate element pairs between slave and master elements
    Search {
        /// Path to the JSON mesh file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Slave element ids (format: "0-9,12")
        #[arg(long)]
        slave: String,

        /// Master element ids (format: "10-19")
        #[arg(long)]
        master: String,

        /// Enlargement factor relative to the smallest element length
        #[arg(long, default_value = "0.1")]
        eps: f64,

        /// Tree update strategy (top-down or bottom-up)
        #[arg(long, default_value = "top-down")]
        update_type: String,

        /// Bounding volume type (aabb, dop8 or dop18)
        #[arg(long, default_value = "dop18")]
        dop: String,

        /// Output JSON file path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Search, evaluate and assemble beam contact
    Evaluate {
        /// Path to the JSON mesh file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
    },
}
