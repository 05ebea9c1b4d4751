/*! Quality-of-service functions

A QoS function maps the probability of meeting a deadline to a scalar
score, so that different scheduling parameters can be compared by the
quality they deliver. This module provides the trait [QosFunction] and
two standard shapes, a saturating linear ramp ([LinearQosFunction]) and
a saturating quadratic ramp ([QuadraticQosFunction]).

QoS functions can also be built by name from configuration through a
[QosRegistry], which maps names such as `"linear"` to [QosBuilder]s.
*/

use auto_impl::auto_impl;

use crate::error::{Error, Result};

mod config;
mod factory;

pub use config::ConfigNode;
pub use factory::{
    LinearBuilder, LinearParameters, QosBuilder, QosParameters, QosRegistry, QuadraticBuilder,
    QuadraticParameters,
};

/// A scalar utility over the probability of meeting a deadline.
#[auto_impl(&, Box, Rc)]
pub trait QosFunction {
    fn eval(&self, probability: f64) -> f64;
}

fn check_shape(scale: f64, pmin: f64, pmax: f64) -> Result<()> {
    let finite = scale.is_finite() && pmin.is_finite() && pmax.is_finite();
    if !finite || pmax < pmin || scale < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "wrong QoS function parameters: scale {}, pmin {}, pmax {}",
            scale, pmin, pmax
        )));
    }
    Ok(())
}

/// Grows linearly with slope `scale` from `offset` at `pmin` and
/// saturates at `pmax`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearQosFunction {
    scale: f64,
    pmin: f64,
    pmax: f64,
    offset: f64,
}

impl LinearQosFunction {
    /// Fails if `pmax < pmin`, `scale < 0`, or any parameter is not
    /// finite.
    pub fn new(scale: f64, pmin: f64, pmax: f64, offset: f64) -> Result<Self> {
        check_shape(scale, pmin, pmax)?;
        if !offset.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "wrong QoS function offset {}",
                offset
            )));
        }
        Ok(LinearQosFunction {
            scale,
            pmin,
            pmax,
            offset,
        })
    }
}

impl QosFunction for LinearQosFunction {
    fn eval(&self, probability: f64) -> f64 {
        if probability <= self.pmin {
            self.offset
        } else if probability > self.pmax {
            self.offset + self.scale * (self.pmax - self.pmin)
        } else {
            self.offset + self.scale * (probability - self.pmin)
        }
    }
}

/// Grows quadratically from zero at `pmin` and saturates at `pmax`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticQosFunction {
    scale: f64,
    pmin: f64,
    pmax: f64,
}

impl QuadraticQosFunction {
    /// Fails if `pmax < pmin`, `scale < 0`, or any parameter is not
    /// finite.
    pub fn new(scale: f64, pmin: f64, pmax: f64) -> Result<Self> {
        check_shape(scale, pmin, pmax)?;
        Ok(QuadraticQosFunction { scale, pmin, pmax })
    }
}

impl QosFunction for QuadraticQosFunction {
    fn eval(&self, probability: f64) -> f64 {
        if probability <= self.pmin {
            return 0.0;
        }
        let excess = if probability > self.pmax {
            self.pmax - self.pmin
        } else {
            probability - self.pmin
        };
        self.scale * excess * excess
    }
}
