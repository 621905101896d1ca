//! The unparametrize pass.
//!
//! Single pass over one module in program order: collect the symbolic
//! references, resolve all of them up front, rewrite a clone of the
//! module to concrete form, then re-check the dialect's cross-operand
//! consistency rule on the rewritten operations. Failure at any step
//! aborts the whole invocation; the input module is never touched.

use indexmap::IndexMap;
use tracing::{debug, instrument, trace};

use fhec_ir::{
    Attribute, Module, OpId, OpKind, ParamRef, ParameterSet, SizeDescriptor, ValueId,
};

use crate::error::SpecializeError;
use crate::resolver::ParameterResolver;

/// Specializes `module` against `resolver`.
///
/// Idempotent on an already-concrete module: the reference set is empty
/// and the result is a structural clone of the input.
#[instrument(skip_all, fields(module = module.name()))]
pub fn run(
    module: &Module,
    resolver: &dyn ParameterResolver,
) -> Result<Module, SpecializeError> {
    let refs = module.symbolic_refs();
    if refs.is_empty() {
        debug!("module is already concrete, nothing to rewrite");
        return Ok(module.clone());
    }

    // Resolve every reference before committing any rewrite, so a
    // resolver gap can never leave a half-specialized module behind.
    let mut assignment: IndexMap<ParamRef, ParameterSet> = IndexMap::new();
    for reference in refs {
        let set = resolver
            .resolve(reference)
            .ok_or(SpecializeError::UnresolvedParameter { reference })?;
        trace!(%reference, %set, "resolved");
        assignment.insert(reference, set);
    }
    debug!(references = assignment.len(), "assignment is total, rewriting");

    let mut rewritten = module.clone();
    rewrite(&mut rewritten, &assignment)?;
    check_key_consistency(&rewritten)?;

    // Defensive: a dialect extension that forgot to declare one of its
    // symbolic sites would surface here, not in a user-facing error.
    if let Some(&reference) = rewritten.symbolic_refs().first() {
        return Err(SpecializeError::InternalInvariantViolation { reference });
    }

    debug!(ops = rewritten.op_count(), "specialized");
    Ok(rewritten)
}

/// Concretizes every type and attribute in place. Operation kinds are
/// never changed.
fn rewrite(
    module: &mut Module,
    assignment: &IndexMap<ParamRef, ParameterSet>,
) -> Result<(), SpecializeError> {
    let inputs: Vec<ValueId> = module.inputs().to_vec();
    for value in inputs {
        concretize_value(module, value, assignment)?;
    }

    let keys: Vec<_> = module.keys().map(|(id, _)| id).collect();
    for id in keys {
        let Some(ty) = module.key(id).map(|info| info.ty) else {
            continue;
        };
        if let Some(reference) = ty.param_ref() {
            let set = lookup(assignment, reference)?;
            if let Some(info) = module.key_mut(id) {
                info.ty = ty.with_descriptor(SizeDescriptor::Concrete(set));
            }
        }
    }

    let op_ids: Vec<OpId> = module.ops_in_order().map(|(id, _)| id).collect();
    for id in op_ids {
        let results = match module.op_mut(id) {
            Some(operation) => {
                for attribute in operation.attrs.values_mut() {
                    if let Attribute::Param(reference) = *attribute {
                        *attribute = Attribute::Params(lookup(assignment, reference)?);
                    }
                }
                operation.results.clone()
            }
            None => continue,
        };
        for value in results {
            concretize_value(module, value, assignment)?;
        }
    }
    Ok(())
}

fn concretize_value(
    module: &mut Module,
    value: ValueId,
    assignment: &IndexMap<ParamRef, ParameterSet>,
) -> Result<(), SpecializeError> {
    let Some(ty) = module.value_type(value) else {
        return Ok(());
    };
    let Some(reference) = ty.param_ref() else {
        return Ok(());
    };
    let set = lookup(assignment, reference)?;
    if let Some(info) = module.value_info_mut(value) {
        info.ty = ty.with_descriptor(SizeDescriptor::Concrete(set));
    }
    Ok(())
}

/// Every reference reachable from the module was collected up front, so
/// a miss here is a collection bug, not a resolver gap.
fn lookup(
    assignment: &IndexMap<ParamRef, ParameterSet>,
    reference: ParamRef,
) -> Result<ParameterSet, SpecializeError> {
    assignment
        .get(&reference)
        .copied()
        .ok_or(SpecializeError::InternalInvariantViolation { reference })
}

/// Re-validates the cross-operand rule on the rewritten module: the key
/// operand of `KeySwitch`/`Bootstrap` must have resolved to the same
/// parameter set as its ciphertext operand. This is the only place that
/// catches cross-reference assignment bugs made by an external
/// resolver.
fn check_key_consistency(module: &Module) -> Result<(), SpecializeError> {
    for (id, operation) in module.ops_in_order() {
        if !matches!(operation.kind, OpKind::KeySwitch | OpKind::Bootstrap) {
            continue;
        }
        let ciphertext = operand_set(module, operation.operands.first());
        let key = operand_set(module, operation.operands.get(1));
        if let (Some(ciphertext), Some(key)) = (ciphertext, key) {
            if ciphertext != key {
                return Err(SpecializeError::ParameterInconsistency {
                    op: id,
                    ciphertext,
                    key,
                });
            }
        }
    }
    Ok(())
}

fn operand_set(module: &Module, operand: Option<&ValueId>) -> Option<ParameterSet> {
    operand
        .and_then(|&value| module.value_type(value))
        .and_then(|ty| ty.descriptor())
        .and_then(|descriptor| descriptor.parameter_set())
}
