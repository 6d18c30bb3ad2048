use orbis_ir::spv::{self, Op, StorageClass};
use orbis_ir::{Builder, Context, Location, Operand};
use pretty_assertions::assert_eq;

const GENERATOR: u32 = 0x000E_0001;

/// Builds a minimal-but-complete module: one private global, one `void main`
/// that stores a constant and returns.
fn build_module(ctx: &mut Context) {
    let loc = Location::Unknown;

    let caps = ctx.section(spv::Section::Capabilities);
    Builder::append(ctx, caps).emit(
        loc,
        orbis_ir::Kind::Spv,
        Op::Capability as u32,
        vec![Operand::Int32(spv::CAPABILITY_SHADER)],
    );

    let memory_model = ctx.section(spv::Section::MemoryModel);
    Builder::append(ctx, memory_model).emit(
        loc,
        orbis_ir::Kind::Spv,
        Op::MemoryModel as u32,
        vec![
            Operand::Int32(spv::ADDRESSING_MODEL_LOGICAL),
            Operand::Int32(spv::MEMORY_MODEL_GLSL450),
        ],
    );

    let u32_type = ctx.type_uint32();
    let ptr_type = ctx.type_pointer(StorageClass::Private, u32_type);
    let void_type = ctx.type_void();
    let fn_type = ctx.type_function(void_type, &[]);
    let forty_two = ctx.const_u32(42);

    let globals = ctx.section(spv::Section::Globals);
    let variable = Builder::append(ctx, globals).variable(loc, ptr_type, StorageClass::Private);

    let debugs = ctx.section(spv::Section::Debugs);
    Builder::append(ctx, debugs).name(loc, variable, "counter");

    let functions = ctx.section(spv::Section::Functions);
    let mut builder = Builder::append(ctx, functions);
    let main = builder.emit_value(
        loc,
        orbis_ir::Kind::Spv,
        Op::Function as u32,
        vec![
            void_type.into(),
            Operand::Int32(spv::FUNCTION_CONTROL_NONE),
            fn_type.into(),
        ],
    );
    builder.label(loc);
    builder.store(loc, variable, forty_two);
    builder.ret(loc);
    builder.emit(loc, orbis_ir::Kind::Spv, Op::FunctionEnd as u32, vec![]);

    let entry_points = ctx.section(spv::Section::EntryPoints);
    Builder::append(ctx, entry_points).emit(
        loc,
        orbis_ir::Kind::Spv,
        Op::EntryPoint as u32,
        vec![
            Operand::Int32(spv::ExecutionModel::GlCompute as i32),
            main.into(),
            "main".into(),
            variable.into(),
        ],
    );
}

#[test]
fn serializes_header_and_dense_ids() {
    let mut ctx = Context::new();
    build_module(&mut ctx);
    let words = spv::serialize(&ctx, GENERATOR);

    assert_eq!(words[0], 0x0723_0203);
    assert_eq!(words[1], spv::VERSION);
    assert_eq!(words[2], GENERATOR);
    assert_eq!(words[4], 0);

    // Every id in the stream is inside [1, bound).
    let bound = words[3];
    assert!(bound > 1);

    let mut offset = 5;
    let mut seen_ids = std::collections::HashSet::new();
    while offset < words.len() {
        let word_count = (words[offset] >> 16) as usize;
        assert!(word_count > 0, "zero-length instruction");
        let opcode = words[offset] & 0xFFFF;
        let op = Op::from_u32(opcode).expect("known opcode");
        let schema = spv::operand_schema(op);
        if schema.has_result {
            let id_index = offset + 1 + usize::from(schema.has_result_type);
            let id = words[id_index];
            assert!(id >= 1 && id < bound, "id {id} out of [1, {bound})");
            assert!(seen_ids.insert(id), "id {id} defined twice");
        }
        offset += word_count;
    }
    assert_eq!(offset, words.len());
}

#[test]
fn deserialize_then_serialize_is_stable() {
    let mut ctx = Context::new();
    build_module(&mut ctx);
    let first = spv::serialize(&ctx, GENERATOR);

    let mut round_ctx = Context::new();
    spv::deserialize(&mut round_ctx, &first).expect("deserialize");
    let second = spv::serialize(&round_ctx, GENERATOR);

    assert_eq!(first, second);
}

#[test]
fn deserializer_interns_types_into_the_context()  {
    let mut ctx = Context::new();
    build_module(&mut ctx);
    let words = spv::serialize(&ctx, GENERATOR);

    // Pre-intern a structurally identical type; the module's own declaration
    // must collapse onto it.
    let mut target = Context::new();
    let existing = target.type_uint32();
    let module = spv::deserialize(&mut target, &words).expect("deserialize");

    let reinterned = target.type_uint32();
    assert_eq!(existing, reinterned);
    assert!(
        module.values.values().all(|&node| {
            target.spv_op(node) != Some(Op::TypeInt)
                || node == existing
                || target.operand(node, 0).as_i32() != Some(32)
        }),
        "duplicate 32-bit integer type survived deserialization"
    );
}

#[test]
fn strings_pad_to_word_boundaries() {
    // Lengths straddling the 4-byte boundary, including an exact multiple
    // (which still gets a full NUL word).
    for name in ["a", "abc", "abcd", "abcde", "abcdefgh"] {
        let mut ctx = Context::new();
        let loc = Location::Unknown;
        let u32_type = ctx.type_uint32();
        let globals = ctx.section(spv::Section::Globals);
        let ptr = ctx.type_pointer(StorageClass::Private, u32_type);
        let variable = Builder::append(&mut ctx, globals).variable(loc, ptr, StorageClass::Private);
        let debugs = ctx.section(spv::Section::Debugs);
        Builder::append(&mut ctx, debugs).name(loc, variable, name);

        let words = spv::serialize(&ctx, GENERATOR);
        let mut target = Context::new();
        let module = spv::deserialize(&mut target, &words).expect("deserialize");

        let name_inst = target
            .section_if_present(spv::Section::Debugs)
            .map(|region| target.children_vec(region))
            .unwrap_or_default()
            .into_iter()
            .find(|&node| target.is_spv(node, Op::Name))
            .expect("OpName survives the round trip");
        assert_eq!(target.operand(name_inst, 1).as_str(), Some(name));
        assert!(module.bound >= 2);
    }
}

#[test]
fn rejects_bad_magic_and_truncation() {
    let mut ctx = Context::new();
    assert_eq!(
        spv::deserialize(&mut ctx, &[0xDEAD_BEEF, 0, 0, 10, 0]),
        Err(spv::DeserializeError::BadHeader)
    );

    let mut ctx = Context::new();
    build_module(&mut ctx);
    let mut words = spv::serialize(&ctx, GENERATOR);
    words.pop();
    let mut target = Context::new();
    assert!(matches!(
        spv::deserialize(&mut target, &words),
        Err(spv::DeserializeError::Truncated { .. })
    ));
}
