use std::path::PathBuf;

use anyhow::{bail, Error};
use clap::{ArgAction, Parser};
use log::info;

use rate_shift::io::{derived_output_path, read_newick_from_file, write_newick_to_file};
use rate_shift::logging::init_logging;
use rate_shift::tree::NewickFormat;

type Result<T> = std::result::Result<T, Error>;

/// Replaces leaf names with short numbered names. The names are assigned in the order
/// of the leaves of the first tree and the same renaming is applied to every tree.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Newick file with one or more trees
    #[arg(value_name = "TREES_FILE")]
    trees_file: PathBuf,

    /// Prefix of the new leaf names
    #[arg(short, long, default_value = "T_")]
    prefix: String,

    /// Number of decimals of the written branch lengths
    #[arg(long, default_value_t = 6)]
    precision: usize,

    /// Output file, defaults to <TREES_FILE up to the first '.'>_renamed.dnd
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<PathBuf>,

    /// Print more log messages, can be repeated
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            if !error.use_stderr() {
                error.exit();
            }
            bail!("Unable to parse command line arguments: \n {}", error)
        }
    };
    init_logging(cli.verbose)?;

    let out = cli
        .output
        .unwrap_or_else(|| derived_output_path(&cli.trees_file, "_renamed.dnd"));
    let mut trees = read_newick_from_file(&cli.trees_file)?;
    let names = trees[0].leaf_renaming(&cli.prefix);
    info!(
        "Renaming {} leaves in {} trees with prefix {}",
        names.len(),
        trees.len(),
        cli.prefix
    );
    for tree in trees.iter_mut() {
        tree.rename_leaves(&names)?;
    }

    let format = NewickFormat::default().with_precision(cli.precision);
    write_newick_to_file(&trees, out, &format)?;
    Ok(())
}
