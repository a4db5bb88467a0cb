use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use anyhow::bail;
use cfg_if::cfg_if;
use clap::{ArgAction, Parser};
use rand::rngs::StdRng;
use rand::SeedableRng;

use rate_shift::io::DataError;
use rate_shift::rate_evolution::{EventParams, RateParams, TimeNormalisation};

use crate::Result;

/// Rescales the branch lengths of a tree by evolving a substitution rate along it.
/// Small and big rate changes happen after exponential waiting times and multiply
/// the rate by a lognormal factor.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, allow_negative_numbers = true)]
pub(super) struct Cli {
    /// Ultrametric tree in newick format, only the first tree of the file is used
    #[arg(value_name = "TREE_FILE")]
    pub(super) tree_file: PathBuf,

    /// Mean waiting time between small rate changes
    #[arg(value_name = "SMALL_SCALE")]
    pub(super) small_scale: f64,

    /// Log-scale spread of small rate multipliers
    #[arg(value_name = "SMALL_SIGMA")]
    pub(super) small_sigma: f64,

    /// Mean waiting time between big rate changes
    #[arg(value_name = "BIG_SCALE")]
    pub(super) big_scale: f64,

    /// Log-scale spread of big rate multipliers
    #[arg(value_name = "BIG_SIGMA")]
    pub(super) big_sigma: f64,

    /// Minimum allowed branch length of the output tree
    #[arg(value_name = "MIN_LENGTH")]
    pub(super) min_length: f64,

    /// Output tree file, must not exist yet
    #[arg(value_name = "OUTPUT_FILE")]
    pub(super) output_file: PathBuf,

    /// "n" draws rate changes along the mean branch length of the tree instead of
    /// each branch's own length
    #[arg(value_name = "USE_BL")]
    pub(super) use_bl: Option<String>,

    /// Seed for the random number generator
    #[arg(long, value_name = "SEED")]
    pub(super) seed: Option<u64>,

    /// Print more log messages, can be repeated
    #[arg(short, long, action = ArgAction::Count)]
    pub(super) verbose: u8,
}

#[derive(Debug, Clone)]
pub(super) struct ConfigBuilder {
    tree_file: PathBuf,
    out_tree: PathBuf,
    small: EventParams,
    big: EventParams,
    min_blen: f64,
    use_bl: Option<String>,
    seed: Option<u64>,
    verbosity: u8,
}

impl From<Cli> for ConfigBuilder {
    fn from(cli: Cli) -> Self {
        ConfigBuilder {
            tree_file: cli.tree_file,
            out_tree: cli.output_file,
            small: EventParams::new(cli.small_scale, cli.small_sigma),
            big: EventParams::new(cli.big_scale, cli.big_sigma),
            min_blen: cli.min_length,
            use_bl: cli.use_bl,
            seed: cli.seed,
            verbosity: cli.verbose,
        }
    }
}

impl ConfigBuilder {
    pub(super) fn setup(self) -> Result<Config> {
        if !self.tree_file.is_file() {
            bail!(DataError {
                message: format!("Unknown file: {}", self.tree_file.display())
            });
        }
        if self.out_tree.exists() {
            bail!(DataError {
                message: format!("File already exists: {}", self.out_tree.display())
            });
        }
        let time_normalisation = match self.use_bl.as_deref() {
            Some("n") => TimeNormalisation::ByTreeMeanDuration,
            _ => TimeNormalisation::ByBranchLength,
        };
        let params = RateParams::new(self.small, self.big, self.min_blen, time_normalisation)?;
        Ok(Config {
            tree_file: self.tree_file,
            out_tree: self.out_tree,
            params,
            seed: self.seed,
            verbosity: self.verbosity,
        })
    }
}

#[derive(Debug, Clone)]
pub(super) struct Config {
    pub(super) tree_file: PathBuf,
    pub(super) out_tree: PathBuf,
    pub(super) params: RateParams,
    pub(super) seed: Option<u64>,
    pub(super) verbosity: u8,
}

impl Config {
    pub(super) fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => {
                cfg_if! {
                    if #[cfg(feature = "deterministic")] {
                        StdRng::seed_from_u64(0)
                    } else {
                        StdRng::from_entropy()
                    }
                }
            }
        }
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Tree file: {}", self.tree_file.display())?;
        writeln!(f, "Output tree file: {}", self.out_tree.display())?;
        writeln!(f, "Rate changes: {}", self.params)?;
        match self.seed {
            Some(seed) => write!(f, "Seed: {}", seed),
            None => write!(f, "Seed: none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::path::PathBuf;

    use assert_matches::assert_matches;
    use clap::Parser;
    use rand::Rng;
    use rstest::*;
    use tempfile::tempdir;

    use rate_shift::io::DataError;
    use rate_shift::rate_evolution::{ParamError, TimeNormalisation};

    use super::{Cli, ConfigBuilder};

    const TREE: &str = "data/ultrametric.newick";

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("alter_branch_lengths").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn positional_arguments() {
        let cli = parse(&[TREE, "0.5", "0.1", "2.0", "0.8", "0.01", "out.newick"]);
        assert_eq!(cli.tree_file, PathBuf::from(TREE));
        assert_eq!(cli.small_scale, 0.5);
        assert_eq!(cli.small_sigma, 0.1);
        assert_eq!(cli.big_scale, 2.0);
        assert_eq!(cli.big_sigma, 0.8);
        assert_eq!(cli.min_length, 0.01);
        assert_eq!(cli.output_file, PathBuf::from("out.newick"));
        assert!(cli.use_bl.is_none());
        assert!(cli.seed.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn optional_flags() {
        let cli = parse(&[
            "-vv", "--seed", "7", TREE, "0.5", "0.1", "2.0", "0.8", "0.01", "out.newick", "n",
        ]);
        assert_eq!(cli.use_bl.as_deref(), Some("n"));
        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn too_few_arguments() {
        let res = Cli::try_parse_from(["alter_branch_lengths", TREE, "0.5", "0.1", "2.0"]);
        assert!(res.is_err());
    }

    #[test]
    fn non_numeric_parameter() {
        let res = Cli::try_parse_from([
            "alter_branch_lengths",
            TREE,
            "fast",
            "0.1",
            "2.0",
            "0.8",
            "0.01",
            "out.newick",
        ]);
        assert!(res.is_err());
    }

    #[rstest]
    #[case::default(None, TimeNormalisation::ByBranchLength)]
    #[case::yes(Some("y"), TimeNormalisation::ByBranchLength)]
    #[case::no(Some("n"), TimeNormalisation::ByTreeMeanDuration)]
    #[case::anything_else(Some("no"), TimeNormalisation::ByBranchLength)]
    fn use_bl_choice(#[case] use_bl: Option<&str>, #[case] expected: TimeNormalisation) {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.newick");
        let out = out.to_str().unwrap();
        let mut args = vec![TREE, "0.5", "0.1", "2.0", "0.8", "0.01", out];
        args.extend(use_bl);
        let cfg = ConfigBuilder::from(parse(&args)).setup().unwrap();
        assert_eq!(cfg.params.time_normalisation, expected);
        assert_eq!(cfg.params.small.scale, 0.5);
        assert_eq!(cfg.params.big.sigma, 0.8);
        assert_eq!(cfg.params.min_blen, 0.01);
    }

    #[test]
    fn missing_tree_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.newick");
        let out = dir.path().join("out.newick");
        let cli = parse(&[
            missing.to_str().unwrap(),
            "0.5",
            "0.1",
            "2.0",
            "0.8",
            "0.01",
            out.to_str().unwrap(),
        ]);
        let err = ConfigBuilder::from(cli).setup().unwrap_err();
        assert_matches!(err.downcast_ref::<DataError>(), Some(_));
        assert!(err.to_string().contains("missing.newick"));
    }

    #[test]
    fn existing_output_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.newick");
        File::create(&out).unwrap();
        let cli = parse(&[TREE, "0.5", "0.1", "2.0", "0.8", "0.01", out.to_str().unwrap()]);
        let err = ConfigBuilder::from(cli).setup().unwrap_err();
        assert!(err.to_string().contains("File already exists"));
    }

    #[rstest]
    #[case::zero_scale(["0.0", "0.1", "2.0", "0.8", "0.01"])]
    #[case::negative_sigma(["0.5", "-0.1", "2.0", "0.8", "0.01"])]
    #[case::negative_min_length(["0.5", "0.1", "2.0", "0.8", "-1"])]
    fn invalid_parameters(#[case] params: [&str; 5]) {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.newick");
        let mut args = vec![TREE];
        args.extend(params);
        args.push(out.to_str().unwrap());
        let err = ConfigBuilder::from(parse(&args)).setup().unwrap_err();
        assert_matches!(err.downcast_ref::<ParamError>(), Some(_));
    }

    #[test]
    fn seeded_rng_repeats() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.newick");
        let cli = parse(&[
            "--seed",
            "3",
            TREE,
            "0.5",
            "0.1",
            "2.0",
            "0.8",
            "0.01",
            out.to_str().unwrap(),
        ]);
        let cfg = ConfigBuilder::from(cli).setup().unwrap();
        let first: Vec<f64> = cfg.rng().sample_iter(rand::distributions::Standard).take(5).collect();
        let second: Vec<f64> = cfg.rng().sample_iter(rand::distributions::Standard).take(5).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn config_display() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.newick");
        let cli = parse(&[TREE, "0.5", "0.1", "2.0", "0.8", "0.01", out.to_str().unwrap()]);
        let cfg = ConfigBuilder::from(cli).setup().unwrap();
        let display = cfg.to_string();
        assert!(display.contains("Tree file: data/ultrametric.newick"));
        assert!(display.contains("small changes: scale 0.5, sigma 0.1"));
        assert!(display.ends_with("Seed: none"));
    }
}
