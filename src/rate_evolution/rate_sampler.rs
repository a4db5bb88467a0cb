use anyhow::bail;
use rand::Rng;
use rand_distr::{Distribution, Exp, LogNormal};

use crate::rate_evolution::{EventParams, ParamError, RateChange, RateParams};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateChangeEvent {
    pub kind: RateChange,
    pub waiting_time: f64,
    pub multiplier: f64,
}

#[derive(Debug, Clone)]
struct EventSampler {
    waiting_time: Exp<f64>,
    multiplier: LogNormal<f64>,
}

impl EventSampler {
    fn new(params: &EventParams) -> Result<Self> {
        let waiting_time = match Exp::new(1.0 / params.scale) {
            Ok(exp) => exp,
            Err(e) => bail!(ParamError {
                message: format!("Invalid time scale {}: {}", params.scale, e),
            }),
        };
        let multiplier = match LogNormal::new(0.0, params.sigma) {
            Ok(lognormal) => lognormal,
            Err(e) => bail!(ParamError {
                message: format!("Invalid multiplier spread {}: {}", params.sigma, e),
            }),
        };
        Ok(Self {
            waiting_time,
            multiplier,
        })
    }
}

/// Competing small and big rate changes.
///
/// Both kinds draw an exponential waiting time, the earlier one happens and brings a
/// lognormal rate multiplier of its own kind.
#[derive(Debug, Clone)]
pub struct RateChangeSampler {
    small: EventSampler,
    big: EventSampler,
}

impl RateChangeSampler {
    pub fn new(params: &RateParams) -> Result<Self> {
        Ok(Self {
            small: EventSampler::new(&params.small)?,
            big: EventSampler::new(&params.big)?,
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> RateChangeEvent {
        let t_small = self.small.waiting_time.sample(rng);
        let t_big = self.big.waiting_time.sample(rng);
        if t_small < t_big {
            RateChangeEvent {
                kind: RateChange::Small,
                waiting_time: t_small,
                multiplier: self.small.multiplier.sample(rng),
            }
        } else {
            RateChangeEvent {
                kind: RateChange::Big,
                waiting_time: t_big,
                multiplier: self.big.multiplier.sample(rng),
            }
        }
    }
}
