//! The injected parameter resolution policy.
//!
//! How parameter sets are chosen (noise budget, security level) is a
//! separate concern from specialization correctness; the pass only
//! consumes a total, deterministic mapping for the references present
//! in one module.

use indexmap::IndexMap;

use fhec_ir::{ParamRef, ParameterSet};

/// Maps symbolic parameter references to concrete parameter sets.
///
/// Implementations must be deterministic and pure with respect to
/// module content, and safe for concurrent read-only queries: distinct
/// modules may be specialized in parallel against one resolver.
pub trait ParameterResolver: Sync {
    /// The parameter set to substitute for `reference`, or `None` when
    /// the reference is outside this resolver's domain.
    fn resolve(&self, reference: ParamRef) -> Option<ParameterSet>;
}

/// A resolver backed by an explicit assignment table.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    assignment: IndexMap<ParamRef, ParameterSet>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one assignment, builder style.
    pub fn with(mut self, reference: ParamRef, set: ParameterSet) -> Self {
        self.assignment.insert(reference, set);
        self
    }
}

impl ParameterResolver for MapResolver {
    fn resolve(&self, reference: ParamRef) -> Option<ParameterSet> {
        self.assignment.get(&reference).copied()
    }
}
