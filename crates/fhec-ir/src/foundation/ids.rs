//! Stable identifier wrappers for arena-addressed IR entities.
//!
//! All graph structures address operations, values, keys and tasks by
//! index into an arena rather than by owning reference. The newtypes
//! keep the index spaces apart at the type level.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            /// Creates an identifier from a raw arena index.
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Returns the arena index this identifier addresses.
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Returns the raw identifier value.
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(ValueId, "%", "Identifier of a single-definition IR value.");
define_id!(OpId, "op", "Identifier of an operation in a module's arena.");
define_id!(KeyId, "key", "Identifier of declared key material.");
define_id!(
    ParamRef,
    "p",
    "Symbolic parameter reference: groups all IR sites that must resolve \
     to the same concrete parameter set."
);
define_id!(TaskId, "task", "Identifier of a task-graph node.");
