use std::error::Error;
use std::fmt::{self, Display};

use anyhow::bail;
use log::{debug, info, warn};
use rand::Rng;

use crate::stats::BlenSummary;
use crate::tree::{NodeIdx, Tree, TreeError};
use crate::Result;

mod rate_path;
mod rate_sampler;

pub use rate_path::RatePath;
pub use rate_sampler::{RateChangeEvent, RateChangeSampler};

pub struct ParamError {
    pub(crate) message: String,
}

impl fmt::Debug for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ParamError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateChange {
    Small,
    Big,
}

/// How the time axis of a branch is chosen for drawing rate change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeNormalisation {
    /// Events are drawn along the branch's own length, longer branches collect more events.
    #[default]
    ByBranchLength,
    /// Events are drawn along the mean branch length of the tree and the resulting
    /// rate path is stretched to the branch's real length afterwards.
    ByTreeMeanDuration,
}

impl Display for TimeNormalisation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeNormalisation::ByBranchLength => write!(f, "by branch length"),
            TimeNormalisation::ByTreeMeanDuration => write!(f, "by tree mean duration"),
        }
    }
}

/// Waiting time scale (mean of the exponential) and log-scale spread of the lognormal
/// rate multiplier of one kind of rate change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventParams {
    pub scale: f64,
    pub sigma: f64,
}

impl EventParams {
    pub fn new(scale: f64, sigma: f64) -> Self {
        Self { scale, sigma }
    }

    fn validate(&self, kind: RateChange) -> Result<()> {
        // the sampler draws with rate 1/scale, which overflows for subnormal scales
        if !(self.scale.is_finite() && self.scale > 0.0 && (1.0 / self.scale).is_finite()) {
            bail!(ParamError {
                message: format!(
                    "Time scale of {:?} rate changes must be positive and finite, got {}",
                    kind, self.scale
                ),
            });
        }
        if !(self.sigma.is_finite() && self.sigma >= 0.0) {
            bail!(ParamError {
                message: format!(
                    "Multiplier spread of {:?} rate changes must be non-negative and finite, got {}",
                    kind, self.sigma
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateParams {
    pub small: EventParams,
    pub big: EventParams,
    pub min_blen: f64,
    pub time_normalisation: TimeNormalisation,
}

impl RateParams {
    pub fn new(
        small: EventParams,
        big: EventParams,
        min_blen: f64,
        time_normalisation: TimeNormalisation,
    ) -> Result<Self> {
        small.validate(RateChange::Small)?;
        big.validate(RateChange::Big)?;
        if !(min_blen.is_finite() && min_blen >= 0.0) {
            bail!(ParamError {
                message: format!(
                    "Minimum branch length must be non-negative and finite, got {}",
                    min_blen
                ),
            });
        }
        Ok(Self {
            small,
            big,
            min_blen,
            time_normalisation,
        })
    }
}

impl Display for RateParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "small changes: scale {}, sigma {}; big changes: scale {}, sigma {}; \
             minimum branch length {}; time normalisation {}",
            self.small.scale,
            self.small.sigma,
            self.big.scale,
            self.big.sigma,
            self.min_blen,
            self.time_normalisation
        )
    }
}

/// Simulated rate path of one branch with the number of accepted events of each kind.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchPath {
    pub path: RatePath,
    pub small_events: usize,
    pub big_events: usize,
}

/// Draws rate change events along one branch.
///
/// Events arrive on a virtual time axis of length `duration`, the recorded breakpoint
/// times are scaled by `normalising_factor`. The first event that falls past the end
/// of the branch stops the process and is not recorded.
pub fn simulate_branch<R: Rng + ?Sized>(
    rng: &mut R,
    sampler: &RateChangeSampler,
    start_rate: f64,
    duration: f64,
    normalising_factor: f64,
) -> BranchPath {
    let mut path = RatePath::new(start_rate);
    let mut small_events = 0;
    let mut big_events = 0;
    let mut event_time = 0.0;
    while event_time < duration {
        let event = sampler.sample(rng);
        event_time += event.waiting_time;
        if event_time < duration {
            path.push(event_time * normalising_factor, path.end_rate() * event.multiplier);
            match event.kind {
                RateChange::Small => small_events += 1,
                RateChange::Big => big_events += 1,
            }
        }
    }
    path.close(duration * normalising_factor);
    BranchPath {
        path,
        small_events,
        big_events,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchReport {
    pub node: NodeIdx,
    pub old_blen: f64,
    pub new_blen: f64,
    pub start_rate: f64,
    pub end_rate: f64,
    pub small_events: usize,
    pub big_events: usize,
}

impl Display for BranchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Number of small changes on branch of length {} : {}",
            self.old_blen, self.small_events
        )?;
        writeln!(
            f,
            "Number of big changes on branch of length {} : {}",
            self.old_blen, self.big_events
        )?;
        writeln!(
            f,
            "\t\tOld vs new distance: {} <-> {}",
            self.old_blen, self.new_blen
        )?;
        writeln!(f)
    }
}

/// Replaces every branch length by the integral of a simulated rate path.
///
/// Branches are visited in pre-order so the rate at the end of the parent branch is known
/// before its children are simulated. The root starts with rate 1.0, the rates only live
/// for the duration of this call.
pub fn evolve_rates<R: Rng + ?Sized>(
    tree: &mut Tree,
    params: &RateParams,
    rng: &mut R,
) -> Result<Vec<BranchReport>> {
    let sampler = RateChangeSampler::new(params)?;
    let mean_blen = tree.mean_branch_length()?;
    if params.time_normalisation == TimeNormalisation::ByTreeMeanDuration && mean_blen <= 0.0 {
        bail!(ParamError {
            message: format!(
                "Mean branch length must be positive to normalise by it, got {}",
                mean_blen
            ),
        });
    }
    info!(
        "Simulating rates on {} branches, mean branch length {}.",
        tree.len() - 1,
        mean_blen
    );

    let mut rates = vec![0.0; tree.len()];
    rates[usize::from(&tree.root)] = 1.0;

    let branches: Vec<NodeIdx> = tree.branches().copied().collect();
    let mut reports = Vec::with_capacity(branches.len());
    for node_idx in branches {
        let Some(&parent_idx) = tree.parent(&node_idx) else {
            bail!(TreeError {
                message: format!("{} is not the root but has no parent", node_idx),
            });
        };
        let old_blen = tree.blen(&node_idx);
        if old_blen < 0.0 {
            warn!("Negative branch length {} for {}.", old_blen, node_idx);
        }
        let (duration, normalising_factor) = match params.time_normalisation {
            TimeNormalisation::ByBranchLength => (old_blen, 1.0),
            TimeNormalisation::ByTreeMeanDuration => (mean_blen, old_blen / mean_blen),
        };

        let branch = simulate_branch(
            rng,
            &sampler,
            rates[usize::from(&parent_idx)],
            duration,
            normalising_factor,
        );
        let new_blen = branch.path.integrate();
        rates[usize::from(&node_idx)] = branch.path.end_rate();
        tree.set_blen(&node_idx, new_blen);

        debug!(
            "{}: {} small and {} big changes, end rate {}.",
            node_idx,
            branch.small_events,
            branch.big_events,
            branch.path.end_rate()
        );
        reports.push(BranchReport {
            node: node_idx,
            old_blen,
            new_blen,
            start_rate: branch.path.start_rate(),
            end_rate: branch.path.end_rate(),
            small_events: branch.small_events,
            big_events: branch.big_events,
        });
    }
    Ok(reports)
}

/// Raises every branch length below `min_blen` to exactly `min_blen` and returns the final
/// lengths of all branches in pre-order. The root is left alone.
pub fn clamp_branch_lengths(tree: &mut Tree, min_blen: f64) -> Vec<f64> {
    let branches: Vec<NodeIdx> = tree.branches().copied().collect();
    let mut clamped = 0;
    let lengths: Vec<f64> = branches
        .iter()
        .map(|node_idx| {
            if tree.blen(node_idx) < min_blen {
                tree.set_blen(node_idx, min_blen);
                clamped += 1;
            }
            tree.blen(node_idx)
        })
        .collect();
    info!("Raised {} branch lengths to {}.", clamped, min_blen);
    lengths
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub branches: Vec<BranchReport>,
    pub final_lengths: Vec<f64>,
    pub summary: BlenSummary,
}

impl SimulationReport {
    pub fn small_events(&self) -> usize {
        self.branches.iter().map(|b| b.small_events).sum()
    }

    pub fn big_events(&self) -> usize {
        self.branches.iter().map(|b| b.big_events).sum()
    }
}

/// Runs the rate simulation on `tree`, clamps the new lengths to the minimum and
/// summarises the result.
pub fn alter_branch_lengths<R: Rng + ?Sized>(
    tree: &mut Tree,
    params: &RateParams,
    rng: &mut R,
) -> Result<SimulationReport> {
    let branches = evolve_rates(tree, params, rng)?;
    let final_lengths = clamp_branch_lengths(tree, params.min_blen);
    let summary = BlenSummary::from_lengths(&final_lengths)?;
    let report = SimulationReport {
        branches,
        final_lengths,
        summary,
    };
    info!(
        "Finished simulation with {} small and {} big rate changes.",
        report.small_events(),
        report.big_events()
    );
    Ok(report)
}
