use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use auto_impl::auto_impl;
use derive_more::From;
use tracing::{debug, info};

use super::{ConfigNode, LinearQosFunction, QosFunction, QuadraticQosFunction};
use crate::error::{Error, Result};

/// Parameters of a [LinearQosFunction].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearParameters {
    pub scale: f64,
    pub pmin: f64,
    pub pmax: f64,
    pub offset: f64,
}

/// Parameters of a [QuadraticQosFunction].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticParameters {
    pub scale: f64,
    pub pmin: f64,
    pub pmax: f64,
}

/// Parameters of any of the known QoS function kinds.
#[derive(Debug, Clone, Copy, PartialEq, From)]
pub enum QosParameters {
    Linear(LinearParameters),
    Quadratic(QuadraticParameters),
}

impl QosParameters {
    /// The name of the kind of function these parameters describe.
    pub fn kind(&self) -> &'static str {
        match self {
            QosParameters::Linear(_) => "linear",
            QosParameters::Quadratic(_) => "quadratic",
        }
    }
}

/// Knows how to read the parameters of one kind of QoS function from
/// configuration and how to instantiate it.
#[auto_impl(&, Box, Rc)]
pub trait QosBuilder {
    /// The kind of function built.
    fn kind(&self) -> &'static str;

    /// Extract this kind's parameters from a configuration node.
    fn parse_parameters(&self, node: &dyn ConfigNode) -> Result<QosParameters>;

    /// Build a function from parameters of this builder's kind.
    fn create_instance(&self, parameters: &QosParameters) -> Result<Box<dyn QosFunction>>;
}

fn required(node: &dyn ConfigNode, field: &'static str) -> Result<f64> {
    let child = node.child(field).ok_or(Error::MissingField(field))?;
    child.scalar().ok_or_else(|| {
        Error::InvalidArgument(format!("parameter {} of QoS function is not a number", field))
    })
}

fn optional(node: &dyn ConfigNode, field: &'static str, default: f64) -> Result<f64> {
    match node.child(field) {
        Some(_) => required(node, field),
        None => Ok(default),
    }
}

fn check_limits(pmin: f64, pmax: f64) -> Result<()> {
    let valid = |p: f64| (0.0..=1.0).contains(&p);
    if !valid(pmin) || !valid(pmax) || pmin > pmax {
        return Err(Error::InvalidArgument(format!(
            "wrong probability limits [{}, {}]",
            pmin, pmax
        )));
    }
    Ok(())
}

/// Builds [LinearQosFunction]s from the fields `scale`, `pmin`, `pmax`
/// and, optionally, `offset` (zero if absent).
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearBuilder;

impl QosBuilder for LinearBuilder {
    fn kind(&self) -> &'static str {
        "linear"
    }

    fn parse_parameters(&self, node: &dyn ConfigNode) -> Result<QosParameters> {
        Ok(QosParameters::Linear(LinearParameters {
            scale: required(node, "scale")?,
            pmin: required(node, "pmin")?,
            pmax: required(node, "pmax")?,
            offset: optional(node, "offset", 0.0)?,
        }))
    }

    fn create_instance(&self, parameters: &QosParameters) -> Result<Box<dyn QosFunction>> {
        match parameters {
            QosParameters::Linear(p) => {
                check_limits(p.pmin, p.pmax)?;
                Ok(Box::new(LinearQosFunction::new(
                    p.scale, p.pmin, p.pmax, p.offset,
                )?))
            }
            other => Err(Error::TypeMismatch {
                builder: self.kind(),
                found: other.kind(),
            }),
        }
    }
}

/// Builds [QuadraticQosFunction]s from the fields `scale`, `pmin` and
/// `pmax`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadraticBuilder;

impl QosBuilder for QuadraticBuilder {
    fn kind(&self) -> &'static str {
        "quadratic"
    }

    fn parse_parameters(&self, node: &dyn ConfigNode) -> Result<QosParameters> {
        Ok(QosParameters::Quadratic(QuadraticParameters {
            scale: required(node, "scale")?,
            pmin: required(node, "pmin")?,
            pmax: required(node, "pmax")?,
        }))
    }

    fn create_instance(&self, parameters: &QosParameters) -> Result<Box<dyn QosFunction>> {
        match parameters {
            QosParameters::Quadratic(p) => {
                check_limits(p.pmin, p.pmax)?;
                Ok(Box::new(QuadraticQosFunction::new(p.scale, p.pmin, p.pmax)?))
            }
            other => Err(Error::TypeMismatch {
                builder: self.kind(),
                found: other.kind(),
            }),
        }
    }
}

/// Maps names to [QosBuilder]s.
///
/// The registry is an ordinary value: create it once, typically with
/// [QosRegistry::with_standard_functions], and pass it to whatever
/// needs to build QoS functions by name.
#[derive(Default)]
pub struct QosRegistry {
    builders: BTreeMap<String, Box<dyn QosBuilder>>,
}

impl QosRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry knowing the `"linear"` and `"quadratic"` functions.
    pub fn with_standard_functions() -> Self {
        let mut registry = Self::new();
        registry.register_standard_functions();
        registry
    }

    /// Register the standard functions. Repeated calls leave the
    /// registry unchanged.
    pub fn register_standard_functions(&mut self) {
        self.register("linear", LinearBuilder);
        self.register("quadratic", QuadraticBuilder);
    }

    /// Register `builder` under `name`. The first registration of a
    /// name wins; later ones are ignored and return `false`.
    pub fn register(&mut self, name: impl Into<String>, builder: impl QosBuilder + 'static) -> bool {
        match self.builders.entry(name.into()) {
            Entry::Vacant(slot) => {
                info!(name = %slot.key(), kind = builder.kind(), "QoS builder registered");
                slot.insert(Box::new(builder));
                true
            }
            Entry::Occupied(slot) => {
                debug!(name = %slot.key(), "QoS builder already registered");
                false
            }
        }
    }

    /// The builder registered under `name`.
    pub fn builder(&self, name: &str) -> Result<&dyn QosBuilder> {
        self.builders
            .get(name)
            .map(|b| &**b)
            .ok_or_else(|| Error::UnknownQosFunction(name.to_string()))
    }

    /// The registered names in alphabetical order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.builders.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Parse the parameters of the function registered as `name`.
    pub fn parse_parameters(&self, name: &str, node: &dyn ConfigNode) -> Result<QosParameters> {
        self.builder(name)?.parse_parameters(node)
    }

    /// Build the function registered as `name` from a configuration
    /// node.
    pub fn create(&self, name: &str, node: &dyn ConfigNode) -> Result<Box<dyn QosFunction>> {
        let builder = self.builder(name)?;
        let parameters = builder.parse_parameters(node)?;
        debug!(name, ?parameters, "building QoS function");
        builder.create_instance(&parameters)
    }
}
