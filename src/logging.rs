use anyhow::anyhow;
use ftail::Ftail;
use log::LevelFilter;

use crate::Result;

/// Console log level for the number of `-v` flags given on the command line.
pub fn level_filter(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Sends log records to the console. Results of the tools are printed separately,
/// so by default only warnings and errors show up.
pub fn init_logging(verbosity: u8) -> Result<()> {
    Ftail::new()
        .console(level_filter(verbosity))
        .init()
        .map_err(|e| anyhow!("Unable to set up logging: {:?}", e))
}

#[cfg(test)]
mod tests {
    use log::LevelFilter;
    use rstest::*;

    use super::level_filter;

    #[rstest]
    #[case::quiet(0, LevelFilter::Warn)]
    #[case::verbose(1, LevelFilter::Info)]
    #[case::very_verbose(2, LevelFilter::Debug)]
    #[case::saturates(7, LevelFilter::Debug)]
    fn verbosity_to_level(#[case] verbosity: u8, #[case] expected: LevelFilter) {
        assert_eq!(level_filter(verbosity), expected);
    }
}
