use orbis_gcn::ops::{sop1, sop2, sopp, smrd, vop1, vop2, vop3, vopc};
use orbis_gcn::{decode, Access, DecodeError, Family, Operand, OperandKind, Slot};
use pretty_assertions::assert_eq;

fn decode_stream(words: &[u32]) -> (orbis_gcn::GcnInstruction, u64) {
    let mut address = 0u64;
    let mut read_word = |addr: u64| {
        let index = usize::try_from(addr / 4).expect("address fits");
        words[index]
    };
    let inst = decode(&mut address, &mut read_word).expect("decode");
    (inst, address)
}

fn sopp_word(op: u32, simm: i16) -> u32 {
    (0b1_0111_1111 << 23) | (op << 16) | (simm as u16 as u32)
}

fn sop1_word(op: u32, sdst: u32, ssrc0: u32) -> u32 {
    (0b1_0111_1101 << 23) | (sdst << 16) | (op << 8) | ssrc0
}

fn sop2_word(op: u32, sdst: u32, ssrc0: u32, ssrc1: u32) -> u32 {
    (0b10 << 30) | (op << 23) | (sdst << 16) | (ssrc1 << 8) | ssrc0
}

fn vop2_word(op: u32, vdst: u32, vsrc1: u32, src0: u32) -> u32 {
    (op << 25) | (vdst << 17) | (vsrc1 << 9) | src0
}

fn vop1_word(op: u32, vdst: u32, src0: u32) -> u32 {
    (0b0111111 << 25) | (vdst << 17) | (op << 9) | src0
}

fn vopc_word(op: u32, vsrc1: u32, src0: u32) -> u32 {
    (0b0111110 << 25) | (op << 17) | (vsrc1 << 9) | src0
}

fn smrd_word(op: u32, sdst: u32, sbase_pair: u32, imm: bool, offset: u32) -> u32 {
    (0b11000 << 27) | (op << 22) | (sdst << 15) | ((sbase_pair >> 1) << 9) | (u32::from(imm) << 8) | offset
}

#[test]
fn decodes_endpgm() {
    let (inst, next) = decode_stream(&[0xBF81_0000]);
    assert!(inst.is(Family::Sopp, sopp::ENDPGM));
    assert_eq!(next, 4);
}

#[test]
fn decodes_s_branch_with_word_scaled_target() {
    // s_branch -2 (branches are simm16 words; the decoder reports bytes).
    let (inst, _) = decode_stream(&[sopp_word(sopp::BRANCH, -2)]);
    assert!(inst.is(Family::Sopp, sopp::BRANCH));
    assert_eq!(inst.operand(0).constant_value(), Some((-8i32) as u32));
}

#[test]
fn decodes_s_mov_b32_with_inline_constant() {
    // s_mov_b32 s0, 42
    let (inst, next) = decode_stream(&[sop1_word(sop1::MOV_B32, 0, 128 + 42)]);
    assert!(inst.is(Family::Sop1, sop1::MOV_B32));
    assert_eq!(next, 4);
    assert_eq!(
        inst.operands(),
        &[
            Operand::sgpr(0).with_write(),
            Operand::constant(42).with_read(),
        ]
    );
}

#[test]
fn decodes_negative_inline_constants() {
    // s_mov_b32 s7, -16
    let (inst, _) = decode_stream(&[sop1_word(sop1::MOV_B32, 7, 208)]);
    assert_eq!(inst.operand(1).constant_value(), Some((-16i32) as u32));
}

#[test]
fn movrels_carries_an_explicit_m0_read() {
    let (inst, _) = decode_stream(&[sop1_word(sop1::MOVRELS_B32, 4, 8)]);
    assert_eq!(inst.operands().len(), 3);
    assert_eq!(inst.operand(2).slot(), Some(Slot::M0));
    assert!(inst.operand(2).access.reads());
}

#[test]
fn decodes_trailing_literal_and_advances_past_it() {
    // s_mov_b32 s1, 0xDEADBEEF
    let (inst, next) = decode_stream(&[sop1_word(sop1::MOV_B32, 1, 255), 0xDEAD_BEEF]);
    assert_eq!(next, 8);
    assert_eq!(inst.operand(1).slot(), Some(Slot::Literal { address: 4 }));
}

#[test]
fn decodes_s_add_u32_operand_order() {
    // s_add_u32 s2, s0, s1
    let (inst, _) = decode_stream(&[sop2_word(sop2::ADD_U32, 2, 0, 1)]);
    assert!(inst.is(Family::Sop2, sop2::ADD_U32));
    assert_eq!(
        inst.operands(),
        &[
            Operand::sgpr(2).with_write(),
            Operand::sgpr(0).with_read(),
            Operand::sgpr(1).with_read(),
        ]
    );
}

#[test]
fn vop2_carry_ops_touch_vcc() {
    // v_add_i32 v0, vcc, s0, v1 (carry-out is implicit)
    let (inst, _) = decode_stream(&[vop2_word(vop2::ADD_I32, 0, 1, 0)]);
    assert_eq!(
        inst.operands(),
        &[
            Operand::vgpr(0).with_write(),
            Operand::scalar(Slot::VccLo).with_write(),
            Operand::sgpr(0).with_read(),
            Operand::vgpr(1).with_read(),
        ]
    );

    // v_addc_u32 additionally reads the carry back in.
    let (inst, _) = decode_stream(&[vop2_word(vop2::ADDC_U32, 0, 1, 0)]);
    let last = inst.operands().last().expect("operands");
    assert_eq!(last.slot(), Some(Slot::VccLo));
    assert_eq!(last.access, Access::R);
}

#[test]
fn vop2_madmk_consumes_inline_literal() {
    let (inst, next) = decode_stream(&[vop2_word(vop2::MADMK_F32, 3, 2, 256), 0x3F80_0000]);
    assert_eq!(next, 8);
    assert_eq!(
        inst.operands().last().expect("operands").slot(),
        Some(Slot::Literal { address: 4 })
    );
}

#[test]
fn decodes_float_inline_constants_as_bit_patterns() {
    // v_mul_f32 v0, -2.0, v1
    let (inst, _) = decode_stream(&[vop2_word(vop2::MUL_F32, 0, 1, 245)]);
    assert_eq!(
        inst.operand(1).constant_value(),
        Some((-2.0f32).to_bits())
    );
}

#[test]
fn decodes_vop1_and_vopc() {
    let (inst, _) = decode_stream(&[vop1_word(vop1::MOV_B32, 5, 256 + 7)]);
    assert!(inst.is(Family::Vop1, vop1::MOV_B32));
    assert_eq!(
        inst.operands(),
        &[
            Operand::vgpr(5).with_write(),
            Operand::vgpr(7).with_read(),
        ]
    );

    let (inst, _) = decode_stream(&[vopc_word(vopc::CMP_EQ_U32, 1, 0)]);
    assert!(inst.is(Family::Vopc, vopc::CMP_EQ_U32));
    assert_eq!(inst.operand(0).slot(), Some(Slot::VccLo));
    assert_eq!(inst.operand(0).access, Access::RW);
}

#[test]
fn decodes_smrd_load_as_pointer_composite() {
    // s_load_dwordx2 s[0:1], s[2:3], 0x10 (imm offset, in dwords)
    let (inst, _) = decode_stream(&[smrd_word(smrd::LOAD_DWORDX2, 0, 2, true, 4)]);
    assert!(inst.is(Family::Smrd, smrd::LOAD_DWORDX2));

    assert_eq!(inst.operand(0), &Operand::sgpr(0).with_write());
    match inst.operand(1).kind {
        OperandKind::Pointer {
            base,
            offset,
            pointee_size,
        } => {
            assert_eq!(base, Slot::Sgpr(2));
            assert_eq!(offset, Slot::Constant(16));
            assert_eq!(pointee_size, 8);
        }
        ref other => panic!("expected pointer operand, got {other:?}"),
    }
}

#[test]
fn decodes_smrd_buffer_load_as_buffer_composite() {
    let (inst, _) = decode_stream(&[smrd_word(smrd::BUFFER_LOAD_DWORD, 4, 8, false, 9)]);
    match inst.operand(1).kind {
        OperandKind::Buffer { base } => assert_eq!(base, Slot::Sgpr(8)),
        ref other => panic!("expected buffer operand, got {other:?}"),
    }
    // Non-immediate offsets come from a scalar slot.
    assert_eq!(inst.operand(3).slot(), Some(Slot::Sgpr(9)));
}

#[test]
fn dcache_inv_vol_still_decodes_its_operands() {
    // s_dcache_inv decodes nothing; s_dcache_inv_vol keeps the normal SMRD
    // operand set (sdst + pointer + base + offset).
    let (inst, _) = decode_stream(&[smrd_word(smrd::DCACHE_INV, 0, 0, true, 0)]);
    assert!(inst.is(Family::Smrd, smrd::DCACHE_INV));
    assert!(inst.operands().is_empty());

    let (inst, _) = decode_stream(&[smrd_word(smrd::DCACHE_INV_VOL, 2, 4, true, 0)]);
    assert!(inst.is(Family::Smrd, smrd::DCACHE_INV_VOL));
    assert_eq!(inst.operand(0), &Operand::sgpr(2).with_write());
    assert!(matches!(inst.operand(1).kind, OperandKind::Pointer { .. }));
}

#[test]
fn mad_u64_u32_decodes_without_src2() {
    // The 64-bit mads touch VCC but take only two sources in this encoding.
    let word0 = (0b110100 << 26) | (vop3::MAD_U64_U32 << 17) | 4;
    let word1 = ((256 + 1) << 9) | 256;
    let (inst, _) = decode_stream(&[word0, word1]);
    assert!(inst.is(Family::Vop3, vop3::MAD_U64_U32));
    assert_eq!(
        inst.operands(),
        &[
            Operand::vgpr(4).with_rw(),
            Operand::scalar(Slot::VccLo).with_rw(),
            Operand::vgpr(0).with_read(),
            Operand::vgpr(1).with_read(),
        ]
    );
}

#[test]
fn decodes_vop3_with_modifiers() {
    // v_mad_f32 v0, -|s0|, v1, v2
    let word0 = (0b110100 << 26) | (vop3::MAD_F32 << 17) | (0b001 << 8);
    let word1 = (0b001 << 29) | ((256 + 2) << 18) | ((256 + 1) << 9) | 0;
    let (inst, next) = decode_stream(&[word0, word1]);
    assert!(inst.is(Family::Vop3, vop3::MAD_F32));
    assert_eq!(next, 8);

    let src0 = inst.operand(1);
    assert!(src0.abs && src0.neg);
    assert_eq!(src0.slot(), Some(Slot::Sgpr(0)));

    let src2 = inst.operand(3);
    assert!(!src2.abs && !src2.neg);
    assert_eq!(src2.slot(), Some(Slot::Vgpr(2)));
}

#[test]
fn vop3b_routes_carry_to_scalar_destination() {
    // v_add_i32 v1, s[4:5], v2, v3 (VOP3b)
    let word0 = (0b110100 << 26) | (vop3::ADD_I32 << 17) | (4 << 8) | 1;
    let word1 = ((256 + 3) << 18) | ((256 + 2) << 9) | (256 + 1);
    let (inst, _) = decode_stream(&[word0, word1]);

    assert_eq!(inst.operand(0).slot(), Some(Slot::Vgpr(1)));
    assert_eq!(inst.operand(1).slot(), Some(Slot::Sgpr(4)));
    assert_eq!(inst.operand(1).access, Access::RW);
    // abs/clamp bits are the sdst field in VOP3b; no modifiers may leak.
    assert!(!inst.operand(2).abs);
}

#[test]
fn rejects_unknown_encoding() {
    let mut address = 0u64;
    // Top bits 0b111111 match no family.
    let mut read_word = |_| 0xFDFF_FFFFu32;
    let err = decode(&mut address, &mut read_word).expect_err("must not decode");
    assert_eq!(
        err,
        DecodeError::UnknownEncoding {
            address: 0,
            word: 0xFDFF_FFFF
        }
    );
}

#[test]
fn mnemonic_tables_cover_composed_names() {
    assert_eq!(
        Family::Vopc.mnemonic(vopc::CMP_EQ_U32).as_deref(),
        Some("cmp_eq_u32")
    );
    assert_eq!(
        Family::Vop3.mnemonic(vop3::VOP2_BASE + vop2::ADD_F32).as_deref(),
        Some("add_f32")
    );
    assert_eq!(
        Family::Vop3.mnemonic(vop3::MAD_F32).as_deref(),
        Some("mad_f32")
    );
    assert_eq!(
        Family::Vop3.mnemonic(vop3::VOP1_BASE + vop1::RCP_F32).as_deref(),
        Some("rcp_f32")
    );
    assert_eq!(Family::Sopp.mnemonic(sopp::ENDPGM).as_deref(), Some("endpgm"));
    assert_eq!(Family::Sopp.mnemonic(3), None);
}
