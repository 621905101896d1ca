//! Integration test harness for the fhec middle-end.
//!
//! Builders for the small modules the end-to-end tests keep reaching
//! for: Specialize → Verify → Lower, driven through the facade crate.

use indexmap::IndexMap;

use fhec_ir::{
    attr, Attribute, KeyId, Module, OpKind, ParamRef, ParameterSet, SizeDescriptor, Type,
};
use fhec_specialize::MapResolver;

/// The parameter set most tests resolve against.
pub fn parameter_set(degree: u32) -> ParameterSet {
    ParameterSet {
        degree,
        modulus: 1 << 32,
        key: KeyId::new(0),
        precision: 4,
    }
}

/// A resolver mapping a single reference.
pub fn single_resolver(reference: u32, set: ParameterSet) -> MapResolver {
    MapResolver::new().with(ParamRef::new(reference), set)
}

fn symbolic_ct(reference: u32) -> Type {
    Type::Ciphertext(SizeDescriptor::Symbolic(ParamRef::new(reference)))
}

/// `Encode(plaintext) -> Bootstrap(ciphertext, key)`, all sites carrying
/// one symbolic reference.
pub fn bootstrap_chain(reference: u32) -> Module {
    let mut module = Module::new("bootstrap_chain");
    let p = module.add_input(Type::Plaintext);
    let key = module.add_input(Type::Key(SizeDescriptor::Symbolic(ParamRef::new(reference))));

    let mut attrs = IndexMap::new();
    attrs.insert(
        attr::PARAM.to_string(),
        Attribute::Param(ParamRef::new(reference)),
    );
    let encode = module
        .push_op(OpKind::Encode, vec![p], attrs, vec![symbolic_ct(reference)])
        .expect("encode is well-formed");
    let ct = module.op(encode).expect("encode exists").results[0];
    let bootstrap = module
        .push_op(
            OpKind::Bootstrap,
            vec![ct, key],
            IndexMap::new(),
            vec![symbolic_ct(reference)],
        )
        .expect("bootstrap is well-formed");
    let out = module.op(bootstrap).expect("bootstrap exists").results[0];
    module.set_outputs(vec![out]).expect("output resolves");
    module
}

/// A wider module exercising every operation kind across two parameter
/// groups: two encode/arithmetic chains, keyswitched and bootstrapped.
pub fn mixed_workload(first: u32, second: u32) -> Module {
    let mut module = Module::new("mixed_workload");
    let switch_key_id = module
        .declare_key(Type::Key(SizeDescriptor::Symbolic(ParamRef::new(first))))
        .expect("key declaration");
    let bootstrap_key_id = module
        .declare_key(Type::Key(SizeDescriptor::Symbolic(ParamRef::new(second))))
        .expect("key declaration");
    let p = module.add_input(Type::Plaintext);
    let switch_key = module.add_input(Type::Key(SizeDescriptor::Symbolic(ParamRef::new(first))));
    let bootstrap_key =
        module.add_input(Type::Key(SizeDescriptor::Symbolic(ParamRef::new(second))));

    let mut attrs = IndexMap::new();
    attrs.insert(
        attr::PARAM.to_string(),
        Attribute::Param(ParamRef::new(first)),
    );
    let encode = module
        .push_op(OpKind::Encode, vec![p], attrs, vec![symbolic_ct(first)])
        .expect("encode");
    let ct = module.op(encode).expect("encode").results[0];

    let mut zero_attrs = IndexMap::new();
    zero_attrs.insert(
        attr::PARAM.to_string(),
        Attribute::Param(ParamRef::new(first)),
    );
    let zero = module
        .push_op(
            OpKind::ZeroCiphertext,
            vec![],
            zero_attrs,
            vec![symbolic_ct(first)],
        )
        .expect("zero");
    let zero_ct = module.op(zero).expect("zero").results[0];

    let add = module
        .push_op(
            OpKind::Add,
            vec![ct, zero_ct],
            IndexMap::new(),
            vec![symbolic_ct(first)],
        )
        .expect("add");
    let sum = module.op(add).expect("add").results[0];

    let mut mul_attrs = IndexMap::new();
    mul_attrs.insert(attr::CLEARTEXT.to_string(), Attribute::Int(3));
    let mul = module
        .push_op(
            OpKind::MulCleartext,
            vec![sum],
            mul_attrs,
            vec![symbolic_ct(first)],
        )
        .expect("mul");
    let scaled = module.op(mul).expect("mul").results[0];

    let negate = module
        .push_op(
            OpKind::Negate,
            vec![scaled],
            IndexMap::new(),
            vec![symbolic_ct(first)],
        )
        .expect("negate");
    let negated = module.op(negate).expect("negate").results[0];

    let add_plain = module
        .push_op(
            OpKind::AddPlain,
            vec![negated, p],
            IndexMap::new(),
            vec![symbolic_ct(first)],
        )
        .expect("add_plain");
    let shifted = module.op(add_plain).expect("add_plain").results[0];

    let mut switch_attrs = IndexMap::new();
    switch_attrs.insert(attr::KEY.to_string(), Attribute::Key(switch_key_id));
    let keyswitch = module
        .push_op(
            OpKind::KeySwitch,
            vec![shifted, switch_key],
            switch_attrs,
            vec![symbolic_ct(second)],
        )
        .expect("keyswitch");
    let switched = module.op(keyswitch).expect("keyswitch").results[0];

    let mut bootstrap_attrs = IndexMap::new();
    bootstrap_attrs.insert(attr::KEY.to_string(), Attribute::Key(bootstrap_key_id));
    let bootstrap = module
        .push_op(
            OpKind::Bootstrap,
            vec![switched, bootstrap_key],
            bootstrap_attrs,
            vec![symbolic_ct(second)],
        )
        .expect("bootstrap");
    let out = module.op(bootstrap).expect("bootstrap").results[0];
    module.set_outputs(vec![out]).expect("output resolves");
    module
}
