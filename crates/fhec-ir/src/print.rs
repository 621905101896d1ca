//! Deterministic textual form of a module.
//!
//! One operation per line, values as `%n`, attributes in insertion
//! order. Two structurally identical modules always print identically,
//! which is what the determinism tests lean on.

use std::fmt;

use crate::module::Module;

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module @{} {{", self.name())?;
        for (id, info) in self.keys() {
            writeln!(f, "  {id} : {}", info.ty)?;
        }
        for &input in self.inputs() {
            if let Some(ty) = self.value_type(input) {
                writeln!(f, "  input {input} : {ty}")?;
            }
        }
        for (_, operation) in self.ops_in_order() {
            write!(f, "  ")?;
            for (index, &result) in operation.results.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{result}")?;
            }
            if !operation.results.is_empty() {
                write!(f, " = ")?;
            }
            write!(f, "{}(", operation.kind)?;
            for (index, &operand) in operation.operands.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{operand}")?;
            }
            write!(f, ")")?;
            if !operation.attrs.is_empty() {
                write!(f, " {{")?;
                for (index, (name, attribute)) in operation.attrs.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name} = {attribute}")?;
                }
                write!(f, "}}")?;
            }
            for &result in &operation.results {
                if let Some(ty) = self.value_type(result) {
                    write!(f, " : {ty}")?;
                }
            }
            writeln!(f)?;
        }
        for &output in self.outputs() {
            writeln!(f, "  output {output}")?;
        }
        write!(f, "}}")
    }
}
