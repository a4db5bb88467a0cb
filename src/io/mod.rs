use std::error::Error;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use log::info;

use crate::tree::{tree_parser, NewickFormat, Tree};
use crate::Result;

pub struct DataError {
    pub message: String,
}
impl fmt::Debug for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
impl Error for DataError {}

/// Reads newick trees from a file, returning a vector of trees.
///
/// Trees are kept exactly as written: rooted trees stay rooted and multifurcations are
/// not resolved.
///
/// # Arguments
/// * `path` - Path to the newick file.
///
/// # Example
/// ```
/// use rate_shift::io::read_newick_from_file;
/// use std::path::PathBuf;
/// let trees = read_newick_from_file(&PathBuf::from("./data/ultrametric.newick")).unwrap();
/// # assert_eq!(trees.len(), 1);
/// # assert_eq!(trees[0].leaves().len(), 6);
/// ```
pub fn read_newick_from_file(path: &Path) -> Result<Vec<Tree>> {
    info!("Reading newick trees from file {}", path.display());
    let newick = fs::read_to_string(path)
        .with_context(|| format!("Unknown file: {}", path.display()))?;
    info!("Read file successfully");
    let trees = tree_parser::from_newick(&newick)?;
    if trees.is_empty() {
        bail!(DataError {
            message: format!("No trees found in file {}", path.display())
        });
    }
    Ok(trees)
}

/// Reads the first tree from a newick file, further trees in the file are ignored.
pub fn read_first_newick_from_file(path: &Path) -> Result<Tree> {
    let mut trees = read_newick_from_file(path)?;
    if trees.len() > 1 {
        info!(
            "Found {} trees in {}, using the first one.",
            trees.len(),
            path.display()
        );
    }
    Ok(trees.swap_remove(0))
}

/// Writes newick trees to the given file path, one tree per line.
/// Will return an error if the file already exists.
///
/// # Arguments
/// * `trees` - Vector of newick trees.
/// * `path` - Path to the newick file.
/// * `format` - Which labels to write and how to print branch lengths.
///
/// # Example
/// ```
/// # use std::fs::remove_file;
/// use std::path::PathBuf;
///
/// use rate_shift::tree::tree_parser::from_newick;
/// use rate_shift::tree::NewickFormat;
/// use rate_shift::io::write_newick_to_file;
///
/// let output_path = PathBuf::from("./data/doctest_tmp_output.newick");
/// let trees = from_newick("((A:1.0,B:2.0)E:1,(D:1.0,F:2.0)G:1)R;").unwrap();
/// write_newick_to_file(&trees, output_path.clone(), &NewickFormat::lengths_only()).unwrap();
/// # let file_content = std::fs::read_to_string(&output_path).unwrap();
/// # assert_eq!(file_content.trim(), "((A:1,B:2):1,(D:1,F:2):1);");
/// # assert!(remove_file(output_path).is_ok());
/// ```
pub fn write_newick_to_file(trees: &[Tree], path: PathBuf, format: &NewickFormat) -> Result<()> {
    info!("Writing newick trees to file {}", path.display());
    if path.exists() {
        bail!(DataError {
            message: format!("File already exists: {}", path.display())
        });
    }
    let mut writer = File::create(path)?;
    for tree in trees {
        writer.write_all(tree.to_newick_with(format).as_bytes())?;
        writer.write_all(b"\n")?;
    }
    info!("Finished writing successfully");
    Ok(())
}

/// Output path next to the input: everything before the first `.` of the file name,
/// followed by `suffix`. `trees/primates.v2.newick` with `_unrooted.dnd` gives
/// `trees/primates_unrooted.dnd`.
pub fn derived_output_path(input: &Path, suffix: &str) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name.split('.').next().unwrap_or_default();
    input.with_file_name(format!("{}{}", stem, suffix))
}
