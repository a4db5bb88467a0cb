use std::result::Result::Ok;

use anyhow::{bail, Error};
use clap::Parser;
use log::{debug, info};

use rate_shift::io::{read_first_newick_from_file, write_newick_to_file};
use rate_shift::logging::init_logging;
use rate_shift::rate_evolution::alter_branch_lengths;
use rate_shift::tree::NewickFormat;

mod cli;
use crate::cli::{Cli, ConfigBuilder};

type Result<T> = std::result::Result<T, Error>;

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
    info!("Successfully parsed the command line parameters");

    let cfg_build: ConfigBuilder = cli.into();
    let cfg = cfg_build.setup()?;
    debug!("Logging at verbosity {}", cfg.verbosity);

    info!("Rate simulation started.");
    info!("{}", cfg);

    let mut tree = read_first_newick_from_file(&cfg.tree_file)?;
    let mut rng = cfg.rng();
    let report = alter_branch_lengths(&mut tree, &cfg.params, &mut rng)?;

    for branch in &report.branches {
        print!("{}", branch);
    }
    println!("{}", report.summary);

    info!("Putting resulting tree in {}", cfg.out_tree.display());
    write_newick_to_file(&[tree], cfg.out_tree, &NewickFormat::lengths_only())?;
    Ok(())
}
