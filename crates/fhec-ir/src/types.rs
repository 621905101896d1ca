//! LowLFHE type system.
//!
//! Three type families cover the encrypted-computation domain: plaintext
//! values entering the encrypted domain, ciphertexts, and key material.
//! Ciphertext and key types carry a [`SizeDescriptor`], so a type is
//! symbolic exactly when its descriptor still names a parameter
//! reference.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::{ParamRef, SizeDescriptor};

/// A LowLFHE value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Unencrypted message, consumed by `Encode`.
    Plaintext,
    /// Ciphertext with symbolic or concrete sizing.
    Ciphertext(SizeDescriptor),
    /// Key material with symbolic or concrete sizing.
    Key(SizeDescriptor),
}

impl Type {
    /// Whether this type still carries a symbolic descriptor.
    pub fn is_symbolic(&self) -> bool {
        self.descriptor().is_some_and(|d| d.is_symbolic())
    }

    /// The sizing descriptor, for ciphertext and key types.
    pub fn descriptor(&self) -> Option<SizeDescriptor> {
        match self {
            Type::Plaintext => None,
            Type::Ciphertext(descriptor) | Type::Key(descriptor) => Some(*descriptor),
        }
    }

    /// The symbolic parameter reference, if this type carries one.
    pub fn param_ref(&self) -> Option<ParamRef> {
        self.descriptor().and_then(|d| d.param_ref())
    }

    /// Returns a copy of this type with its descriptor replaced.
    ///
    /// Plaintext types have no descriptor and are returned unchanged.
    pub fn with_descriptor(&self, descriptor: SizeDescriptor) -> Type {
        match self {
            Type::Plaintext => Type::Plaintext,
            Type::Ciphertext(_) => Type::Ciphertext(descriptor),
            Type::Key(_) => Type::Key(descriptor),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Plaintext => write!(f, "plaintext"),
            Type::Ciphertext(descriptor) => write!(f, "ciphertext<{descriptor}>"),
            Type::Key(descriptor) => write!(f, "key<{descriptor}>"),
        }
    }
}
