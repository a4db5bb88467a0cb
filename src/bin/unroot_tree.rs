use std::path::PathBuf;

use anyhow::{bail, Error};
use clap::{ArgAction, Parser};
use log::info;

use rate_shift::io::{derived_output_path, read_first_newick_from_file, write_newick_to_file};
use rate_shift::logging::init_logging;
use rate_shift::tree::NewickFormat;

type Result<T> = std::result::Result<T, Error>;

/// Removes the root of a rooted tree by turning its bifurcating root into a
/// trifurcation. Distances between leaves stay the same.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Tree in newick format, only the first tree of the file is used
    #[arg(value_name = "TREE_FILE")]
    tree_file: PathBuf,

    /// Output file, defaults to <TREE_FILE up to the first '.'>_unrooted.dnd
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
        .unwrap_or_else(|| derived_output_path(&cli.tree_file, "_unrooted.dnd"));
    let mut tree = read_first_newick_from_file(&cli.tree_file)?;
    tree.unroot()?;
    info!("Unrooted tree has {} nodes", tree.len());

    write_newick_to_file(&[tree], out, &NewickFormat::default())?;
    Ok(())
}
