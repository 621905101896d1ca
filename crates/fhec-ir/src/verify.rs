//! Dialect verifier.
//!
//! Structural SSA checks plus the per-kind operand/result/attribute
//! rules of the LowLFHE operation set. The one non-trivial rule is
//! cross-operand consistency on `KeySwitch` and `Bootstrap`: the key
//! operand's sizing must name the same parameter reference (symbolic
//! form) or the same parameter set (concrete form) as the ciphertext
//! operand. It is enforced both before and after specialization.

use std::collections::HashSet;

use thiserror::Error;

use crate::foundation::{KeyId, OpId, SizeDescriptor, ValueId};
use crate::module::Module;
use crate::ops::{attr, Attribute, OpKind, Operation};
use crate::types::Type;

/// A single verifier finding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("{op}: operand {value} is not defined in this module")]
    UnknownValue { op: OpId, value: ValueId },

    #[error("{op}: operand {value} is used before its definition")]
    UseBeforeDef { op: OpId, value: ValueId },

    #[error("{op} ({kind}): expected {expected} operands, found {found}")]
    OperandCount {
        op: OpId,
        kind: OpKind,
        expected: usize,
        found: usize,
    },

    #[error("{op} ({kind}): expected {expected} results, found {found}")]
    ResultCount {
        op: OpId,
        kind: OpKind,
        expected: usize,
        found: usize,
    },

    #[error("{op} ({kind}): operand {index} must be {expected}, found {found}")]
    OperandType {
        op: OpId,
        kind: OpKind,
        index: usize,
        expected: &'static str,
        found: Type,
    },

    #[error("{op} ({kind}): result must be {expected}, found {found}")]
    ResultType {
        op: OpId,
        kind: OpKind,
        expected: &'static str,
        found: Type,
    },

    #[error("{op} ({kind}): missing required attribute `{name}`")]
    MissingAttr {
        op: OpId,
        kind: OpKind,
        name: &'static str,
    },

    #[error("{op} ({kind}): attribute `{name}` has the wrong payload")]
    BadAttr {
        op: OpId,
        kind: OpKind,
        name: &'static str,
    },

    #[error("{op} ({kind}): `{name}` attribute disagrees with the result type sizing")]
    AttrSizingMismatch {
        op: OpId,
        kind: OpKind,
        name: &'static str,
    },

    #[error("{op} ({kind}): mixes symbolic and concrete sizings")]
    MixedSpecialization { op: OpId, kind: OpKind },

    #[error("{op} ({kind}): ciphertext and result sizings disagree ({left} vs {right})")]
    SizingMismatch {
        op: OpId,
        kind: OpKind,
        left: SizeDescriptor,
        right: SizeDescriptor,
    },

    #[error(
        "{op} ({kind}): key operand sizing {key} does not match ciphertext operand sizing \
         {ciphertext}"
    )]
    KeyMismatch {
        op: OpId,
        kind: OpKind,
        ciphertext: SizeDescriptor,
        key: SizeDescriptor,
    },

    #[error("{op} ({kind}): `key` attribute names {key}, which is not declared by the module")]
    UnknownKey {
        op: OpId,
        kind: OpKind,
        key: KeyId,
    },
}

/// Verifies a whole module, collecting every finding.
pub fn verify(module: &Module) -> Result<(), Vec<VerifyError>> {
    let mut errors = Vec::new();
    let mut defined: HashSet<ValueId> = module.inputs().iter().copied().collect();

    for (id, operation) in module.ops_in_order() {
        for &operand in &operation.operands {
            if module.value_info(operand).is_none() {
                errors.push(VerifyError::UnknownValue { op: id, value: operand });
            } else if !defined.contains(&operand) {
                errors.push(VerifyError::UseBeforeDef { op: id, value: operand });
            }
        }
        defined.extend(operation.results.iter().copied());
        check_operation(module, id, operation, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Per-kind structural rules, matched exhaustively.
fn check_operation(
    module: &Module,
    id: OpId,
    operation: &Operation,
    errors: &mut Vec<VerifyError>,
) {
    let kind = operation.kind;
    let before = errors.len();

    match kind {
        OpKind::Encode => {
            check_arity(id, operation, 1, 1, errors);
            check_operand_plaintext(module, id, operation, 0, errors);
            check_result_ciphertext(module, id, operation, errors);
        }
        OpKind::ZeroCiphertext => {
            check_arity(id, operation, 0, 1, errors);
            check_result_ciphertext(module, id, operation, errors);
        }
        OpKind::Add => {
            check_arity(id, operation, 2, 1, errors);
            check_operand_ciphertext(module, id, operation, 0, errors);
            check_operand_ciphertext(module, id, operation, 1, errors);
            check_result_ciphertext(module, id, operation, errors);
        }
        OpKind::AddPlain => {
            check_arity(id, operation, 2, 1, errors);
            check_operand_ciphertext(module, id, operation, 0, errors);
            check_operand_plaintext(module, id, operation, 1, errors);
            check_result_ciphertext(module, id, operation, errors);
        }
        OpKind::MulCleartext => {
            check_arity(id, operation, 1, 1, errors);
            check_operand_ciphertext(module, id, operation, 0, errors);
            check_result_ciphertext(module, id, operation, errors);
            match operation.attr(attr::CLEARTEXT) {
                Some(Attribute::Int(_)) => {}
                Some(_) => errors.push(VerifyError::BadAttr {
                    op: id,
                    kind,
                    name: attr::CLEARTEXT,
                }),
                None => errors.push(VerifyError::MissingAttr {
                    op: id,
                    kind,
                    name: attr::CLEARTEXT,
                }),
            }
        }
        OpKind::Negate => {
            check_arity(id, operation, 1, 1, errors);
            check_operand_ciphertext(module, id, operation, 0, errors);
            check_result_ciphertext(module, id, operation, errors);
        }
        OpKind::KeySwitch | OpKind::Bootstrap => {
            check_arity(id, operation, 2, 1, errors);
            check_operand_ciphertext(module, id, operation, 0, errors);
            check_operand_key(module, id, operation, 1, errors);
            check_result_ciphertext(module, id, operation, errors);
            match operation.attr(attr::KEY) {
                Some(Attribute::Key(key)) if module.key(*key).is_none() => {
                    errors.push(VerifyError::UnknownKey { op: id, kind, key: *key });
                }
                Some(Attribute::Key(_)) | None => {}
                Some(_) => errors.push(VerifyError::BadAttr {
                    op: id,
                    kind,
                    name: attr::KEY,
                }),
            }
        }
    }

    // Shape errors make the remaining checks meaningless for this op.
    if errors.len() > before {
        return;
    }

    check_attr_sizing(module, id, operation, errors);

    if check_mixed(module, id, operation, errors) {
        return;
    }

    match kind {
        OpKind::Encode | OpKind::ZeroCiphertext | OpKind::KeySwitch | OpKind::Bootstrap => {}
        OpKind::Add => {
            let left = operand_descriptor(module, operation, 0);
            let right = operand_descriptor(module, operation, 1);
            let result = result_descriptor(module, operation);
            check_same_sizing(id, kind, left, right, errors);
            check_same_sizing(id, kind, left, result, errors);
        }
        OpKind::AddPlain | OpKind::MulCleartext | OpKind::Negate => {
            let operand = operand_descriptor(module, operation, 0);
            let result = result_descriptor(module, operation);
            check_same_sizing(id, kind, operand, result, errors);
        }
    }

    // The cross-operand consistency rule.
    if matches!(kind, OpKind::KeySwitch | OpKind::Bootstrap) {
        let ciphertext = operand_descriptor(module, operation, 0);
        let key = operand_descriptor(module, operation, 1);
        if let (Some(ciphertext), Some(key)) = (ciphertext, key) {
            if ciphertext != key {
                errors.push(VerifyError::KeyMismatch {
                    op: id,
                    kind,
                    ciphertext,
                    key,
                });
            }
        }
    }
}

fn check_arity(
    id: OpId,
    operation: &Operation,
    operands: usize,
    results: usize,
    errors: &mut Vec<VerifyError>,
) {
    if operation.operands.len() != operands {
        errors.push(VerifyError::OperandCount {
            op: id,
            kind: operation.kind,
            expected: operands,
            found: operation.operands.len(),
        });
    }
    if operation.results.len() != results {
        errors.push(VerifyError::ResultCount {
            op: id,
            kind: operation.kind,
            expected: results,
            found: operation.results.len(),
        });
    }
}

fn operand_type(module: &Module, operation: &Operation, index: usize) -> Option<Type> {
    operation
        .operands
        .get(index)
        .and_then(|&value| module.value_type(value))
}

fn operand_descriptor(
    module: &Module,
    operation: &Operation,
    index: usize,
) -> Option<SizeDescriptor> {
    operand_type(module, operation, index).and_then(|ty| ty.descriptor())
}

fn result_descriptor(module: &Module, operation: &Operation) -> Option<SizeDescriptor> {
    operation
        .results
        .first()
        .and_then(|&value| module.value_type(value))
        .and_then(|ty| ty.descriptor())
}

fn check_operand_plaintext(
    module: &Module,
    id: OpId,
    operation: &Operation,
    index: usize,
    errors: &mut Vec<VerifyError>,
) {
    if let Some(ty) = operand_type(module, operation, index) {
        if !matches!(ty, Type::Plaintext) {
            errors.push(VerifyError::OperandType {
                op: id,
                kind: operation.kind,
                index,
                expected: "plaintext",
                found: ty,
            });
        }
    }
}

fn check_operand_ciphertext(
    module: &Module,
    id: OpId,
    operation: &Operation,
    index: usize,
    errors: &mut Vec<VerifyError>,
) {
    if let Some(ty) = operand_type(module, operation, index) {
        if !matches!(ty, Type::Ciphertext(_)) {
            errors.push(VerifyError::OperandType {
                op: id,
                kind: operation.kind,
                index,
                expected: "ciphertext",
                found: ty,
            });
        }
    }
}

fn check_operand_key(
    module: &Module,
    id: OpId,
    operation: &Operation,
    index: usize,
    errors: &mut Vec<VerifyError>,
) {
    if let Some(ty) = operand_type(module, operation, index) {
        if !matches!(ty, Type::Key(_)) {
            errors.push(VerifyError::OperandType {
                op: id,
                kind: operation.kind,
                index,
                expected: "key",
                found: ty,
            });
        }
    }
}

fn check_result_ciphertext(
    module: &Module,
    id: OpId,
    operation: &Operation,
    errors: &mut Vec<VerifyError>,
) {
    if let Some(ty) = operation
        .results
        .first()
        .and_then(|&value| module.value_type(value))
    {
        if !matches!(ty, Type::Ciphertext(_)) {
            errors.push(VerifyError::ResultType {
                op: id,
                kind: operation.kind,
                expected: "ciphertext",
                found: ty,
            });
        }
    }
}

/// The `param` attribute, where present, must carry the same sizing as
/// the result type: a symbolic reference next to a symbolic result, the
/// resolved set next to a concrete one.
fn check_attr_sizing(
    module: &Module,
    id: OpId,
    operation: &Operation,
    errors: &mut Vec<VerifyError>,
) {
    let required = matches!(operation.kind, OpKind::Encode);
    let attribute = operation.attr(attr::PARAM);
    let (attribute, result) = match (attribute, result_descriptor(module, operation)) {
        (Some(attribute), Some(result)) => (attribute, result),
        (None, _) if required => {
            errors.push(VerifyError::MissingAttr {
                op: id,
                kind: operation.kind,
                name: attr::PARAM,
            });
            return;
        }
        _ => return,
    };

    let agrees = match (attribute, result) {
        (Attribute::Param(reference), SizeDescriptor::Symbolic(expected)) => {
            *reference == expected
        }
        (Attribute::Params(set), SizeDescriptor::Concrete(expected)) => *set == expected,
        _ => false,
    };
    if !agrees {
        errors.push(VerifyError::AttrSizingMismatch {
            op: id,
            kind: operation.kind,
            name: attr::PARAM,
        });
    }
}

/// Mixed symbolic/concrete sizings on one operation violate the data
/// model; returns true when flagged so sizing comparisons are skipped.
fn check_mixed(
    module: &Module,
    id: OpId,
    operation: &Operation,
    errors: &mut Vec<VerifyError>,
) -> bool {
    let mut symbolic = false;
    let mut concrete = false;
    for &value in operation.operands.iter().chain(&operation.results) {
        if let Some(descriptor) = module.value_type(value).and_then(|ty| ty.descriptor()) {
            match descriptor {
                SizeDescriptor::Symbolic(_) => symbolic = true,
                SizeDescriptor::Concrete(_) => concrete = true,
            }
        }
    }
    if symbolic && concrete {
        errors.push(VerifyError::MixedSpecialization {
            op: id,
            kind: operation.kind,
        });
        true
    } else {
        false
    }
}

fn check_same_sizing(
    id: OpId,
    kind: OpKind,
    left: Option<SizeDescriptor>,
    right: Option<SizeDescriptor>,
    errors: &mut Vec<VerifyError>,
) {
    if let (Some(left), Some(right)) = (left, right) {
        if left != right {
            errors.push(VerifyError::SizingMismatch {
                op: id,
                kind,
                left,
                right,
            });
        }
    }
}
