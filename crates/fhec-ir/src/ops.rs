//! LowLFHE operation set.
//!
//! The dialect is a closed set of operation kinds over the encrypted
//! domain. An [`Operation`] is pure data: a kind, ordered operand and
//! result value references, and a named-attribute map holding the
//! compile-time constants (symbolic parameter references, cleartext
//! payloads, key indices). Structural rules per kind live in
//! [`crate::verify`].

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::foundation::{KeyId, ParamRef, ParameterSet, ValueId};

/// Well-known attribute names.
pub mod attr {
    /// Parameter sizing of the produced ciphertext (`Encode`,
    /// `ZeroCiphertext`). Symbolic before specialization, concrete after.
    pub const PARAM: &str = "param";
    /// Cleartext multiplier payload of `MulCleartext`.
    pub const CLEARTEXT: &str = "cleartext";
    /// Declared key referenced by `KeySwitch`/`Bootstrap` key operands.
    pub const KEY: &str = "key";
}

/// Operation kinds of the LowLFHE dialect.
///
/// Closed set: every consumer matches exhaustively, so extending the
/// dialect forces all consuming code through the type checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    /// Lift a plaintext into a ciphertext placeholder.
    Encode,
    /// Produce the trivial encryption of zero.
    ZeroCiphertext,
    /// Homomorphic addition of two ciphertexts.
    Add,
    /// Add a plaintext to a ciphertext.
    AddPlain,
    /// Multiply a ciphertext by a cleartext constant.
    MulCleartext,
    /// Homomorphic negation.
    Negate,
    /// Switch a ciphertext to different key material.
    KeySwitch,
    /// Refresh a ciphertext's noise budget under a bootstrap key.
    Bootstrap,
}

impl OpKind {
    /// Mnemonic used by the printer and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Encode => "encode",
            OpKind::ZeroCiphertext => "zero_ciphertext",
            OpKind::Add => "add",
            OpKind::AddPlain => "add_plain",
            OpKind::MulCleartext => "mul_cleartext",
            OpKind::Negate => "negate",
            OpKind::KeySwitch => "keyswitch",
            OpKind::Bootstrap => "bootstrap",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable compile-time constant attached to an operation by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    /// Symbolic parameter reference, erased by specialization.
    Param(ParamRef),
    /// Concrete parameter set, produced by specialization.
    Params(ParameterSet),
    /// Integer payload (cleartext constants).
    Int(i64),
    /// Declared-key index.
    Key(KeyId),
}

impl Attribute {
    pub fn as_param(&self) -> Option<ParamRef> {
        match self {
            Attribute::Param(reference) => Some(*reference),
            _ => None,
        }
    }

    pub fn as_params(&self) -> Option<ParameterSet> {
        match self {
            Attribute::Params(set) => Some(*set),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Attribute::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<KeyId> {
        match self {
            Attribute::Key(key) => Some(*key),
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Param(reference) => write!(f, "{reference}"),
            Attribute::Params(set) => write!(f, "{set}"),
            Attribute::Int(value) => write!(f, "{value}"),
            Attribute::Key(key) => write!(f, "{key}"),
        }
    }
}

/// A node in the module's operation graph.
///
/// Operand references are non-owning def-use edges; the module arena
/// owns the operation and guarantees the references resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Which dialect operation this is. Never changes after construction.
    pub kind: OpKind,
    /// Ordered operand value references.
    pub operands: Vec<ValueId>,
    /// Ordered result values this operation defines.
    pub results: Vec<ValueId>,
    /// Named compile-time constants, in insertion order.
    pub attrs: IndexMap<String, Attribute>,
}

impl Operation {
    /// Attribute lookup by name.
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.get(name)
    }

    /// The `param` attribute's symbolic reference, if still symbolic.
    pub fn param_attr(&self) -> Option<ParamRef> {
        self.attr(attr::PARAM).and_then(Attribute::as_param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_accessors() {
        let a = Attribute::Param(ParamRef::new(4));
        assert_eq!(a.as_param(), Some(ParamRef::new(4)));
        assert_eq!(a.as_int(), None);

        let a = Attribute::Int(-3);
        assert_eq!(a.as_int(), Some(-3));
        assert_eq!(a.as_key(), None);
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(OpKind::Bootstrap.name(), "bootstrap");
        assert_eq!(OpKind::MulCleartext.to_string(), "mul_cleartext");
    }
}
