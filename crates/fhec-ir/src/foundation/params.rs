//! Cryptographic parameter model.
//!
//! A [`ParamRef`] is a placeholder that groups every IR site required to
//! share one concrete parameter assignment. Specialization replaces each
//! reference with a [`ParameterSet`]; a [`SizeDescriptor`] is the
//! symbolic-or-concrete sizing slot carried by ciphertext and key types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::{KeyId, ParamRef};

/// Concrete cryptographic sizing substituted for a symbolic reference.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ParameterSet {
    /// Polynomial degree N.
    pub degree: u32,
    /// Ciphertext modulus.
    pub modulus: u64,
    /// Key material this sizing is tied to.
    pub key: KeyId,
    /// Bootstrap/keyswitch precision in bits.
    pub precision: u32,
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{degree = {}, modulus = {}, key = {}, precision = {}}}",
            self.degree, self.modulus, self.key, self.precision
        )
    }
}

/// Symbolic-or-concrete sizing carried by ciphertext and key types.
///
/// A descriptor is "symbolic" while it still names a [`ParamRef`] and
/// "concrete" once specialization has substituted the resolved
/// [`ParameterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeDescriptor {
    /// Placeholder awaiting specialization.
    Symbolic(ParamRef),
    /// Fully resolved sizing.
    Concrete(ParameterSet),
}

impl SizeDescriptor {
    /// Whether this descriptor still awaits specialization.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, SizeDescriptor::Symbolic(_))
    }

    /// The symbolic reference, if any.
    pub fn param_ref(&self) -> Option<ParamRef> {
        match self {
            SizeDescriptor::Symbolic(reference) => Some(*reference),
            SizeDescriptor::Concrete(_) => None,
        }
    }

    /// The resolved parameter set, if any.
    pub fn parameter_set(&self) -> Option<ParameterSet> {
        match self {
            SizeDescriptor::Symbolic(_) => None,
            SizeDescriptor::Concrete(set) => Some(*set),
        }
    }
}

impl fmt::Display for SizeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeDescriptor::Symbolic(reference) => write!(f, "{reference}"),
            SizeDescriptor::Concrete(set) => write!(f, "{set}"),
        }
    }
}
