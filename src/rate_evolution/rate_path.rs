use std::iter::once;

use itertools::Itertools;

/// Piecewise constant rate along one branch.
///
/// Each breakpoint `(time, rate)` holds its rate until the next breakpoint, the last one
/// holds it until `end_time`. The first breakpoint is always at time 0.
#[derive(Debug, Clone, PartialEq)]
pub struct RatePath {
    breakpoints: Vec<(f64, f64)>,
    end_time: f64,
}

impl RatePath {
    pub fn new(start_rate: f64) -> Self {
        Self {
            breakpoints: vec![(0.0, start_rate)],
            end_time: 0.0,
        }
    }

    pub fn from_breakpoints(breakpoints: Vec<(f64, f64)>, end_time: f64) -> Self {
        debug_assert!(!breakpoints.is_empty());
        Self {
            breakpoints,
            end_time,
        }
    }

    pub fn push(&mut self, time: f64, rate: f64) {
        debug_assert!(rate > 0.0);
        self.breakpoints.push((time, rate));
    }

    pub fn close(&mut self, end_time: f64) {
        self.end_time = end_time;
    }

    pub fn breakpoints(&self) -> &[(f64, f64)] {
        &self.breakpoints
    }

    /// Breakpoint times followed by the end time.
    pub fn times(&self) -> Vec<f64> {
        self.breakpoints
            .iter()
            .map(|&(time, _)| time)
            .chain(once(self.end_time))
            .collect()
    }

    pub fn start_rate(&self) -> f64 {
        self.breakpoints[0].1
    }

    pub fn end_rate(&self) -> f64 {
        self.breakpoints[self.breakpoints.len() - 1].1
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Number of rate changes on the path.
    pub fn changes(&self) -> usize {
        self.breakpoints.len() - 1
    }

    /// Time integral of the rate, i.e. the branch length the path produces.
    pub fn integrate(&self) -> f64 {
        self.times()
            .into_iter()
            .tuple_windows()
            .zip(self.breakpoints.iter())
            .map(|((start, end), &(_, rate))| rate * (end - start))
            .sum()
    }
}
