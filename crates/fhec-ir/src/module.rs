//! Module: ownership root of the operation graph.
//!
//! Operations live in an arena addressed by stable [`OpId`]; values are
//! single-definition and addressed by [`ValueId`]. Def-use edges are
//! kept as per-value index sets so erasure checks are O(1) and no
//! owning cycles exist. Program order is an explicit list maintained in
//! def-before-use discipline by the construction API; mutations that
//! would leave a dangling reference are rejected, everything else is
//! the caller's responsibility.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::IrError;
use crate::foundation::{KeyId, OpId, ParamRef, ValueId};
use crate::ops::{Attribute, OpKind, Operation};
use crate::types::Type;

/// Where a value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueOrigin {
    /// Result `index` of operation `op`.
    Result { op: OpId, index: u32 },
    /// Module input at position `index`.
    Input { index: u32 },
}

/// Type and provenance of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueInfo {
    pub ty: Type,
    pub origin: ValueOrigin,
}

/// A declared piece of key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Always a `Type::Key`.
    pub ty: Type,
}

/// Insertion point for new operations.
enum InsertAt {
    End,
    Before(OpId),
    After(OpId),
}

/// Ownership root holding one program's full operation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    name: String,
    /// Operation arena; `None` marks an erased slot. Ids stay stable.
    ops: Vec<Option<Operation>>,
    values: Vec<ValueInfo>,
    /// Use-lists per value: which live operations reference it.
    uses: Vec<BTreeSet<OpId>>,
    /// Program order, def-before-use.
    order: Vec<OpId>,
    inputs: Vec<ValueId>,
    outputs: Vec<ValueId>,
    keys: IndexMap<KeyId, KeyInfo>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ops: Vec::new(),
            values: Vec::new(),
            uses: Vec::new(),
            order: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            keys: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares a module input of the given type.
    pub fn add_input(&mut self, ty: Type) -> ValueId {
        let index = self.inputs.len() as u32;
        let value = self.new_value(ty, ValueOrigin::Input { index });
        self.inputs.push(value);
        value
    }

    /// Declares key material. The type must be a key type.
    pub fn declare_key(&mut self, ty: Type) -> Result<KeyId, IrError> {
        if !matches!(ty, Type::Key(_)) {
            return Err(IrError::TypeMismatch {
                expected: "key type".to_string(),
                found: ty.to_string(),
            });
        }
        let id = KeyId::new(self.keys.len() as u32);
        self.keys.insert(id, KeyInfo { ty });
        Ok(id)
    }

    /// Appends an operation at the end of the program.
    ///
    /// Operand references must resolve to live values; result values are
    /// created from `result_types` and returned through the operation.
    pub fn push_op(
        &mut self,
        kind: OpKind,
        operands: Vec<ValueId>,
        attrs: IndexMap<String, Attribute>,
        result_types: Vec<Type>,
    ) -> Result<OpId, IrError> {
        self.build_op(kind, operands, attrs, result_types, InsertAt::End)
    }

    /// Inserts an operation immediately before `anchor` in program order.
    pub fn insert_op_before(
        &mut self,
        anchor: OpId,
        kind: OpKind,
        operands: Vec<ValueId>,
        attrs: IndexMap<String, Attribute>,
        result_types: Vec<Type>,
    ) -> Result<OpId, IrError> {
        self.build_op(kind, operands, attrs, result_types, InsertAt::Before(anchor))
    }

    /// Inserts an operation immediately after `anchor` in program order.
    pub fn insert_op_after(
        &mut self,
        anchor: OpId,
        kind: OpKind,
        operands: Vec<ValueId>,
        attrs: IndexMap<String, Attribute>,
        result_types: Vec<Type>,
    ) -> Result<OpId, IrError> {
        self.build_op(kind, operands, attrs, result_types, InsertAt::After(anchor))
    }

    fn build_op(
        &mut self,
        kind: OpKind,
        operands: Vec<ValueId>,
        attrs: IndexMap<String, Attribute>,
        result_types: Vec<Type>,
        at: InsertAt,
    ) -> Result<OpId, IrError> {
        for &operand in &operands {
            self.check_live_value(operand)?;
        }
        let position = match at {
            InsertAt::End => self.order.len(),
            InsertAt::Before(anchor) => self.order_position(anchor)?,
            InsertAt::After(anchor) => self.order_position(anchor)? + 1,
        };

        let id = OpId::new(self.ops.len() as u32);
        let results: Vec<ValueId> = result_types
            .into_iter()
            .enumerate()
            .map(|(index, ty)| {
                self.new_value(
                    ty,
                    ValueOrigin::Result {
                        op: id,
                        index: index as u32,
                    },
                )
            })
            .collect();
        for &operand in &operands {
            self.uses[operand.index()].insert(id);
        }
        self.ops.push(Some(Operation {
            kind,
            operands,
            results,
            attrs,
        }));
        self.order.insert(position, id);
        Ok(id)
    }

    /// The operation behind `id`, if not erased.
    pub fn op(&self, id: OpId) -> Option<&Operation> {
        self.ops.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable access to an operation. Structural fields (operands,
    /// results) must keep resolving; the verifier is the safety net.
    pub fn op_mut(&mut self, id: OpId) -> Option<&mut Operation> {
        self.ops.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Live operations in program order.
    pub fn ops_in_order(&self) -> impl Iterator<Item = (OpId, &Operation)> {
        self.order.iter().filter_map(|&id| {
            self.ops[id.index()].as_ref().map(|operation| (id, operation))
        })
    }

    /// Number of live operations.
    pub fn op_count(&self) -> usize {
        self.order.len()
    }

    pub fn value_info(&self, value: ValueId) -> Option<&ValueInfo> {
        self.values.get(value.index())
    }

    /// Mutable access to a value's type; used by rewriting passes.
    pub fn value_info_mut(&mut self, value: ValueId) -> Option<&mut ValueInfo> {
        self.values.get_mut(value.index())
    }

    pub fn value_type(&self, value: ValueId) -> Option<Type> {
        self.value_info(value).map(|info| info.ty)
    }

    /// The operation defining `value`, or `None` for module inputs.
    pub fn defining_op(&self, value: ValueId) -> Option<OpId> {
        match self.value_info(value)?.origin {
            ValueOrigin::Result { op, .. } => Some(op),
            ValueOrigin::Input { .. } => None,
        }
    }

    /// Live operations using `value`, in id order.
    pub fn users(&self, value: ValueId) -> Option<&BTreeSet<OpId>> {
        self.uses.get(value.index())
    }

    pub fn has_users(&self, value: ValueId) -> bool {
        self.users(value).is_some_and(|users| !users.is_empty())
    }

    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ValueId] {
        &self.outputs
    }

    /// Marks which values leave the module.
    pub fn set_outputs(&mut self, outputs: Vec<ValueId>) -> Result<(), IrError> {
        for &value in &outputs {
            self.check_live_value(value)?;
        }
        self.outputs = outputs;
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = (KeyId, &KeyInfo)> {
        self.keys.iter().map(|(&id, info)| (id, info))
    }

    pub fn key(&self, id: KeyId) -> Option<&KeyInfo> {
        self.keys.get(&id)
    }

    /// Mutable access to a key declaration's type.
    pub fn key_mut(&mut self, id: KeyId) -> Option<&mut KeyInfo> {
        self.keys.get_mut(&id)
    }

    /// Replaces every use of `from` (operand slots and module outputs)
    /// with `to`. The two values must have identical types.
    pub fn replace_all_uses(&mut self, from: ValueId, to: ValueId) -> Result<(), IrError> {
        self.check_live_value(from)?;
        self.check_live_value(to)?;
        // a self-replacement must not clear the use-list below
        if from == to {
            return Ok(());
        }
        let from_ty = self.value_type(from).ok_or(IrError::DanglingValue(from))?;
        let to_ty = self.value_type(to).ok_or(IrError::DanglingValue(to))?;
        if from_ty != to_ty {
            return Err(IrError::TypeMismatch {
                expected: from_ty.to_string(),
                found: to_ty.to_string(),
            });
        }

        let user_ops: Vec<OpId> = self.uses[from.index()].iter().copied().collect();
        for user in user_ops {
            if let Some(operation) = self.ops[user.index()].as_mut() {
                for operand in &mut operation.operands {
                    if *operand == from {
                        *operand = to;
                    }
                }
            }
            self.uses[to.index()].insert(user);
        }
        self.uses[from.index()].clear();
        for output in &mut self.outputs {
            if *output == from {
                *output = to;
            }
        }
        Ok(())
    }

    /// Erases an operation. Fails if any of its results is still used by
    /// another operation or exported as a module output.
    pub fn erase_op(&mut self, id: OpId) -> Result<(), IrError> {
        let operation = self.op(id).ok_or(IrError::DanglingOp(id))?;
        for &result in &operation.results {
            if self.has_users(result) || self.outputs.contains(&result) {
                return Err(IrError::OperationInUse { op: id, value: result });
            }
        }

        let operands = operation.operands.clone();
        for operand in operands {
            self.uses[operand.index()].remove(&id);
        }
        self.ops[id.index()] = None;
        self.order.retain(|&other| other != id);
        Ok(())
    }

    /// All symbolic parameter references reachable from the module, in
    /// deterministic order: input types, key declarations, then each
    /// operation's attributes, operand types and result types in program
    /// order.
    pub fn symbolic_refs(&self) -> IndexSet<ParamRef> {
        let mut refs = IndexSet::new();
        for &input in &self.inputs {
            if let Some(reference) = self.value_type(input).and_then(|ty| ty.param_ref()) {
                refs.insert(reference);
            }
        }
        for (_, info) in self.keys() {
            if let Some(reference) = info.ty.param_ref() {
                refs.insert(reference);
            }
        }
        for (_, operation) in self.ops_in_order() {
            for attribute in operation.attrs.values() {
                if let Attribute::Param(reference) = attribute {
                    refs.insert(*reference);
                }
            }
            for &value in operation.operands.iter().chain(&operation.results) {
                if let Some(reference) = self.value_type(value).and_then(|ty| ty.param_ref()) {
                    refs.insert(reference);
                }
            }
        }
        refs
    }

    /// A module is specialized once no symbolic reference remains.
    pub fn is_specialized(&self) -> bool {
        self.symbolic_refs().is_empty()
    }

    fn new_value(&mut self, ty: Type, origin: ValueOrigin) -> ValueId {
        let value = ValueId::new(self.values.len() as u32);
        self.values.push(ValueInfo { ty, origin });
        self.uses.push(BTreeSet::new());
        value
    }

    fn check_live_value(&self, value: ValueId) -> Result<(), IrError> {
        let info = self
            .value_info(value)
            .ok_or(IrError::DanglingValue(value))?;
        if let ValueOrigin::Result { op, .. } = info.origin {
            if self.op(op).is_none() {
                return Err(IrError::DanglingOp(op));
            }
        }
        Ok(())
    }

    fn order_position(&self, anchor: OpId) -> Result<usize, IrError> {
        self.order
            .iter()
            .position(|&id| id == anchor)
            .ok_or(IrError::DanglingOp(anchor))
    }
}
