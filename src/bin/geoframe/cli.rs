//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "Normalize extents and reproject map documents")]
pub struct Cli {
    /// Config file to use instead of the per-user one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Wrap an extent into [-180, 180] and report whether it crosses the dateline
    Normalize {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        width: f64,
        height: f64,
    },

    /// Reproject every layer of a map document
    Reproject {
        /// Map document (RON)
        input: PathBuf,

        /// Target projection (EPSG code, proj4 string or WKT)
        #[arg(long)]
        to: Option<String>,

        /// Where to write the reprojected document (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the per-layer report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a projection descriptor and print its canonical forms
    Describe { descriptor: String },
}
