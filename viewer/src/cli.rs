use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum Format {
    /// Indented tree
    #[default]
    Tree,
    /// Graphviz source
    Dot,
    /// Node and edge elements as JSON, for browser graph widgets
    Elements,
    /// Every record with its attributes, parent and children as JSON
    Json,
}

#[derive(Parser)]
#[clap(version, about)]
pub struct Cli {
    #[clap(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Log more (repeatable); RUST_LOG takes precedence"
    )]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the RoleClass libraries of a CAEX (AutomationML) file
    Roleclass(RoleClassArgs),
    /// Show the concept taxonomy used by the samples
    Concepts {
        #[clap(long, value_enum, default_value_t)]
        format: Format,
    },
    /// Split a dataset into the records that match a predicate and those that don't
    Filter(FilterArgs),
    /// Compare a rule with the reference rule of a sample entry
    Check(CheckArgs),
}

#[derive(Args)]
pub struct RoleClassArgs {
    #[clap(value_parser, help = "The CAEX file")]
    pub input: PathBuf,

    #[clap(long, help = "The library to show; defaults to the first one")]
    pub library: Option<String>,

    #[clap(long, help = "Show the details of a single role class")]
    pub node: Option<String>,

    #[clap(long, value_enum, default_value_t)]
    pub format: Format,

    #[clap(long, help = "Allow a XML Document Type Definition (DTD) to occur")]
    pub allow_dtd: bool,
}

#[derive(Args)]
pub struct FilterArgs {
    #[clap(long, conflicts_with = "dataset", required_unless_present = "dataset")]
    pub sample: Option<u32>,

    #[clap(long, value_parser, help = "A JSON file holding an array of objects")]
    pub dataset: Option<PathBuf>,

    pub predicate: String,
}

#[derive(Args)]
pub struct CheckArgs {
    #[clap(long)]
    pub sample: u32,

    #[clap(
        long,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "The entry whose rule to compare with, counting from 1"
    )]
    pub entry: u32,

    pub predicate: String,
}
