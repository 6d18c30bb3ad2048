//! Bit-exact GCN instruction decoder.
//!
//! Instructions are classified by progressively narrowing top-bit masks
//! (9, 7, 6, 5, 4, 2, 1 bits wide), then each family's fixed field layout is
//! extracted. The decoder reads through a caller-supplied word fetch and
//! advances `address` past everything it consumed, including trailing
//! literal words.

use crate::insn::{Family, GcnInstruction};
use crate::operand::{Access, Operand, Slot};
use crate::ops::{mimg, mubuf, mtbuf, sop1, sopk, smrd, vop2, vop3, vopc, ds};
use crate::DecodeError;

const WORD: u64 = 4;

fn bits(word: u32, lo: u32, len: u32) -> u32 {
    (word >> lo) & ((1u32 << len) - 1)
}

/// Resolves a 9-bit (or 8-bit) scalar source index to its slot, consuming a
/// trailing literal word for index 255.
///
/// The table follows the standard GCN scalar-source layout: SGPRs at 0..104,
/// VCC/M0/EXEC specials, integer inline constants 128..208, float inline
/// constants 240..247, status bits 251..254, `imm32` at 255, and VGPRs at
/// 256..512.
fn scalar_source(id: u32, address: &mut u64) -> Result<Operand, DecodeError> {
    let slot = match id {
        0..=103 => Slot::Sgpr(id),
        106 => Slot::VccLo,
        107 => Slot::VccHi,
        124 => Slot::M0,
        126 => Slot::ExecLo,
        127 => Slot::ExecHi,
        128..=192 => Slot::Constant(id - 128),
        193..=208 => Slot::Constant((-((id - 192) as i32)) as u32),
        240 => Slot::Constant(0.5f32.to_bits()),
        241 => Slot::Constant((-0.5f32).to_bits()),
        242 => Slot::Constant(1.0f32.to_bits()),
        243 => Slot::Constant((-1.0f32).to_bits()),
        244 => Slot::Constant(2.0f32.to_bits()),
        245 => Slot::Constant((-2.0f32).to_bits()),
        246 => Slot::Constant(4.0f32.to_bits()),
        247 => Slot::Constant((-4.0f32).to_bits()),
        251 => Slot::VccZ,
        252 => Slot::ExecZ,
        253 => Slot::Scc,
        254 => Slot::LdsDirect,
        255 => {
            let literal = Slot::Literal { address: *address };
            *address += WORD;
            return Ok(Operand::scalar(literal));
        }
        256..=511 => Slot::Vgpr(id - 256),
        _ => {
            return Err(DecodeError::InvalidScalarSource {
                id,
                address: *address,
            })
        }
    };

    Ok(Operand::scalar(slot))
}

fn literal_operand(address: &mut u64) -> Operand {
    let operand = Operand::literal(*address);
    *address += WORD;
    operand
}

fn decode_sop1<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word = read_word(*address);
    *address += WORD;

    let ssrc0 = bits(word, 0, 8);
    let op = bits(word, 8, 8);
    let sdst = bits(word, 16, 7);

    inst.op = op;

    let reads_m0 = matches!(
        op,
        sop1::MOVRELS_B32 | sop1::MOVRELS_B64 | sop1::MOVRELD_B32 | sop1::MOVRELD_B64
    );

    inst.push(scalar_source(sdst, address)?.with_write());
    inst.push(scalar_source(ssrc0, address)?.with_read());

    if reads_m0 {
        inst.push(Operand::scalar(Slot::M0).with_read());
    }
    Ok(())
}

fn decode_sop2<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word = read_word(*address);
    *address += WORD;

    let ssrc0 = bits(word, 0, 8);
    let ssrc1 = bits(word, 8, 8);
    let sdst = bits(word, 16, 7);
    let op = bits(word, 23, 7);

    inst.op = op;
    inst.push(scalar_source(sdst, address)?.with_write());
    inst.push(scalar_source(ssrc0, address)?.with_read());
    inst.push(scalar_source(ssrc1, address)?.with_read());
    Ok(())
}

fn decode_sopk<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word = read_word(*address);
    *address += WORD;

    let simm = bits(word, 0, 16) as u16 as i16;
    let sdst = bits(word, 16, 7);
    let op = bits(word, 23, 5);

    inst.op = op;
    inst.push(scalar_source(sdst, address)?.with_write());
    inst.push(Operand::constant(simm as i32 as u32));

    if op == sopk::SETREG_IMM {
        inst.push(literal_operand(address));
    }
    Ok(())
}

fn decode_sopc<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word = read_word(*address);
    *address += WORD;

    let ssrc0 = bits(word, 0, 8);
    let ssrc1 = bits(word, 8, 8);
    inst.op = bits(word, 16, 7);
    inst.push(scalar_source(ssrc0, address)?.with_read());
    inst.push(scalar_source(ssrc1, address)?.with_read());
    Ok(())
}

fn decode_sopp<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word = read_word(*address);
    *address += WORD;

    let simm = bits(word, 0, 16) as u16 as i16;
    inst.op = bits(word, 16, 7);

    // Branch displacements are in words; scale to bytes here so consumers
    // deal in addresses only.
    inst.push(Operand::constant(((simm as i32) << 2) as u32));
    Ok(())
}

fn decode_smrd<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word = read_word(*address);
    *address += WORD;

    let offset = bits(word, 0, 8);
    let imm = bits(word, 8, 1) != 0;
    let sbase = bits(word, 9, 6) << 1;
    let sdst = bits(word, 15, 7);
    let op = bits(word, 22, 5);

    inst.op = op;

    let (load_size, is_buffer) = match op {
        smrd::LOAD_DWORD..=smrd::LOAD_DWORDX16 => (4u16 << (op - smrd::LOAD_DWORD), false),
        smrd::BUFFER_LOAD_DWORD..=smrd::BUFFER_LOAD_DWORDX16 => {
            (4u16 << (op - smrd::BUFFER_LOAD_DWORD), true)
        }
        _ => (0, false),
    };

    if op == smrd::DCACHE_INV {
        return Ok(());
    }

    inst.push(scalar_source(sdst, address)?.with_write());

    if op == smrd::MEMTIME {
        return Ok(());
    }

    let base = scalar_source(sbase, address)?;
    let offset = if imm {
        // The immediate offset field is in dwords.
        Operand::constant(((offset as i8 as i32) << 2) as u32)
    } else {
        scalar_source(offset, address)?.with_read()
    };

    let base_slot = base.slot().ok_or(DecodeError::InvalidScalarSource {
        id: sbase,
        address: *address,
    })?;
    let offset_slot = offset.slot().ok_or(DecodeError::InvalidScalarSource {
        id: 255,
        address: *address,
    })?;

    if is_buffer {
        inst.push(Operand::buffer(base_slot).with_read());
    } else {
        inst.push(Operand::pointer(base_slot, load_size, offset_slot).with_read());
    }

    inst.push(base);
    inst.push(offset);
    Ok(())
}

fn decode_vop1<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word = read_word(*address);
    *address += WORD;

    let src0 = bits(word, 0, 9);
    let op = bits(word, 9, 8);
    let vdst = bits(word, 17, 8);

    inst.op = op;
    inst.push(Operand::vgpr(vdst).with_write());
    inst.push(scalar_source(src0, address)?.with_read());
    Ok(())
}

fn decode_vop2<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word = read_word(*address);
    *address += WORD;

    let src0 = bits(word, 0, 9);
    let vsrc1 = bits(word, 9, 8);
    let vdst = bits(word, 17, 8);
    let op = bits(word, 25, 6);

    inst.op = op;

    let writes_vcc = matches!(
        op,
        vop2::ADD_I32
            | vop2::ADDC_U32
            | vop2::SUB_I32
            | vop2::SUBB_U32
            | vop2::SUBBREV_U32
            | vop2::SUBREV_I32
    );
    let reads_vcc = matches!(
        op,
        vop2::ADDC_U32 | vop2::SUBB_U32 | vop2::SUBBREV_U32 | vop2::CNDMASK_B32
    );

    inst.push(Operand::vgpr(vdst).with_write());
    if writes_vcc {
        inst.push(Operand::scalar(Slot::VccLo).with_write());
    }
    inst.push(scalar_source(src0, address)?.with_read());
    inst.push(Operand::vgpr(vsrc1).with_read());
    if reads_vcc {
        inst.push(Operand::scalar(Slot::VccLo).with_read());
    }
    if op == vop2::MADMK_F32 || op == vop2::MADAK_F32 {
        inst.push(literal_operand(address));
    }
    Ok(())
}

fn decode_vopc<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word = read_word(*address);
    *address += WORD;

    let src0 = bits(word, 0, 9);
    let vsrc1 = bits(word, 9, 8);
    inst.op = bits(word, 17, 8);

    inst.push(Operand::scalar(Slot::VccLo).with_rw());
    inst.push(scalar_source(src0, address)?.with_read());
    inst.push(Operand::vgpr(vsrc1).with_read());
    Ok(())
}

fn decode_vop3<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word0 = read_word(*address);
    *address += WORD;
    let word1 = read_word(*address);
    *address += WORD;

    let vdst = bits(word0, 0, 8);
    let mut abs = bits(word0, 8, 3);
    let mut clamp = bits(word0, 11, 1) != 0;
    let sdst = bits(word0, 8, 7);
    let op = bits(word0, 17, 9);

    let src0 = bits(word1, 0, 9);
    let src1 = bits(word1, 9, 9);
    let src2 = bits(word1, 18, 9);
    let omod = bits(word1, 27, 2) as u8;
    let neg = bits(word1, 29, 3);

    inst.op = op;
    let vop3b = vop3::is_vop3b(op);
    if vop3b {
        // The VOP3b encoding spends the abs/clamp bits on the scalar carry
        // destination field.
        abs = 0;
        clamp = false;
    }

    if op < vopc::OP_SPACE {
        inst.push(
            scalar_source(vdst, address)?
                .with_rw()
                .with_omod(omod)
                .with_clamp(clamp),
        );
    } else {
        inst.push(
            Operand::vgpr(vdst)
                .with_rw()
                .with_omod(omod)
                .with_clamp(clamp),
        );
    }

    if vop3b {
        inst.push(scalar_source(sdst, address)?.with_rw());
    }

    let writes_vcc = matches!(
        op,
        vop3::MAD_I64_I32
            | vop3::MAD_U64_U32
            | vop3::MQSAD_U32_U8
            | vop3::DIV_SCALE_F32
            | vop3::DIV_SCALE_F64
    );
    let reads_vcc = matches!(op, vop3::DIV_FMAS_F32 | vop3::DIV_FMAS_F64);

    if writes_vcc {
        inst.push(Operand::scalar(Slot::VccLo).with_rw());
    }

    inst.push(
        scalar_source(src0, address)?
            .with_read()
            .with_abs(abs & 1 != 0)
            .with_neg(neg & 1 != 0),
    );

    let src1_operand = |address: &mut u64| -> Result<Operand, DecodeError> {
        Ok(scalar_source(src1, address)?
            .with_read()
            .with_abs(abs & 2 != 0)
            .with_neg(neg & 2 != 0))
    };
    let src2_operand = |address: &mut u64| -> Result<Operand, DecodeError> {
        Ok(scalar_source(src2, address)?
            .with_read()
            .with_abs(abs & 4 != 0)
            .with_neg(neg & 4 != 0))
    };

    if op < vopc::OP_SPACE {
        inst.push(src1_operand(address)?);
    } else if op < vop3::MAD_LEGACY_F32 {
        // VOP2 mirror.
        inst.push(src1_operand(address)?);

        if matches!(
            op,
            vop3::ADDC_U32 | vop3::SUBB_U32 | vop3::SUBBREV_U32 | vop3::CNDMASK_B32
        ) {
            inst.push(src2_operand(address)?);
        } else if op == vop3::MADMK_F32 || op == vop3::MADAK_F32 {
            inst.push(literal_operand(address));
        }
    } else if op >= vop3::VOP1_BASE {
        // VOP1 mirror: single source only.
    } else {
        inst.push(src1_operand(address)?);
        if vop3::THREE_SRC.contains(&op) {
            inst.push(src2_operand(address)?);
        }
    }

    if reads_vcc {
        inst.push(Operand::scalar(Slot::VccLo).with_read());
    }
    Ok(())
}

fn decode_mubuf<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word0 = read_word(*address);
    *address += WORD;
    let word1 = read_word(*address);
    *address += WORD;

    let offset = bits(word0, 0, 12);
    let offen = bits(word0, 12, 1) != 0;
    let idxen = bits(word0, 13, 1) != 0;
    let glc = bits(word0, 14, 1) != 0;
    let lds = bits(word0, 16, 1) != 0;
    let op = bits(word0, 18, 7);

    let vaddr = bits(word1, 0, 8);
    let vdata = bits(word1, 8, 8);
    let srsrc = bits(word1, 16, 5) << 2;
    let slc = bits(word1, 22, 1) != 0;
    let tfe = bits(word1, 23, 1) != 0;
    let soffset = bits(word1, 24, 8);

    inst.op = op;

    let is_load = matches!(
        op,
        mubuf::LOAD_FORMAT_X..=mubuf::LOAD_FORMAT_XYZW
            | mubuf::LOAD_UBYTE..=mubuf::LOAD_DWORDX3
    );
    let supports_lds = matches!(
        op,
        mubuf::LOAD_FORMAT_X
            | mubuf::LOAD_UBYTE
            | mubuf::LOAD_SBYTE
            | mubuf::LOAD_USHORT
            | mubuf::LOAD_SSHORT
            | mubuf::LOAD_DWORD
    );

    let mut data_access = Access::empty();
    if !supports_lds || !lds {
        data_access = if is_load { Access::W } else { Access::R };
    }

    let buffer_access = if is_load {
        Access::R
    } else if matches!(
        op,
        mubuf::STORE_FORMAT_X..=mubuf::STORE_FORMAT_XYZW | mubuf::STORE_BYTE..=mubuf::STORE_DWORDX3
    ) {
        Access::W
    } else {
        Access::RW
    };

    inst.push(Operand::vgpr(vdata).with_access(data_access));

    if offen {
        inst.push(Operand::vgpr(vaddr + u32::from(idxen)).with_read());
    } else {
        inst.push(Operand::constant(0));
    }
    if idxen {
        inst.push(Operand::vgpr(vaddr).with_read());
    } else {
        inst.push(Operand::constant(0));
    }

    let srsrc = scalar_source(srsrc, address)?.with_read();
    let srsrc_slot = srsrc.slot().expect("srsrc resolves to a register slot");
    inst.push(Operand::buffer(srsrc_slot).with_access(buffer_access));
    inst.push(srsrc);
    inst.push(scalar_source(soffset, address)?.with_read());

    inst.push(Operand::constant(offset));
    inst.push(Operand::constant_bool(idxen));
    inst.push(Operand::constant_bool(glc));
    inst.push(Operand::constant_bool(lds));
    inst.push(Operand::constant_bool(slc));
    inst.push(Operand::constant_bool(tfe));
    Ok(())
}

fn decode_mtbuf<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word0 = read_word(*address);
    *address += WORD;
    let word1 = read_word(*address);
    *address += WORD;

    let offset = bits(word0, 0, 12);
    let offen = bits(word0, 12, 1) != 0;
    let idxen = bits(word0, 13, 1) != 0;
    let glc = bits(word0, 14, 1) != 0;
    let op = bits(word0, 16, 3);
    let dfmt = bits(word0, 19, 4);
    let nfmt = bits(word0, 23, 4);

    let vaddr = bits(word1, 0, 8);
    let vdata = bits(word1, 8, 8);
    let srsrc = bits(word1, 16, 5) << 2;
    let slc = bits(word1, 22, 1) != 0;
    let tfe = bits(word1, 23, 1) != 0;
    let soffset = bits(word1, 24, 8);

    inst.op = op;

    let is_load = matches!(op, mtbuf::LOAD_FORMAT_X..=mtbuf::LOAD_FORMAT_XYZW);
    let (data_access, buffer_access) = if is_load {
        (Access::W, Access::R)
    } else {
        (Access::R, Access::W)
    };

    inst.push(Operand::vgpr(vdata).with_access(data_access));

    if offen {
        inst.push(Operand::vgpr(vaddr + u32::from(idxen)).with_read());
    } else {
        inst.push(Operand::constant(0));
    }
    if idxen {
        inst.push(Operand::vgpr(vaddr).with_read());
    } else {
        inst.push(Operand::constant(0));
    }

    inst.push(Operand::constant(dfmt));
    inst.push(Operand::constant(nfmt));

    let srsrc = scalar_source(srsrc, address)?.with_read();
    let srsrc_slot = srsrc.slot().expect("srsrc resolves to a register slot");
    inst.push(Operand::buffer(srsrc_slot).with_access(buffer_access));
    inst.push(srsrc);
    inst.push(scalar_source(soffset, address)?.with_read());

    inst.push(Operand::constant(offset));
    inst.push(Operand::constant_bool(idxen));
    inst.push(Operand::constant_bool(glc));
    inst.push(Operand::constant_bool(slc));
    inst.push(Operand::constant_bool(tfe));
    Ok(())
}

fn decode_mimg<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word0 = read_word(*address);
    *address += WORD;
    let word1 = read_word(*address);
    *address += WORD;

    let dmask = bits(word0, 8, 4);
    let unrm = bits(word0, 12, 1) != 0;
    let r128 = bits(word0, 15, 1) != 0;
    let op = bits(word0, 18, 7);

    let vaddr = bits(word1, 0, 8);
    let vdata = bits(word1, 8, 8);
    let srsrc = bits(word1, 16, 5) << 2;
    let ssamp = bits(word1, 21, 5) << 2;

    inst.op = op;

    let mut texture_access = Access::empty();
    let mut has_sampler = true;

    match op {
        mimg::LOAD..=mimg::LOAD_MIP_PCK_SGN => {
            texture_access = Access::R;
            has_sampler = false;
        }
        mimg::STORE..=mimg::STORE_MIP_PCK => {
            texture_access = Access::W;
            has_sampler = false;
        }
        mimg::ATOMIC_SWAP..=mimg::ATOMIC_FMAX => {
            texture_access = Access::RW;
            has_sampler = false;
        }
        mimg::SAMPLE..=mimg::GATHER4_C_LZ_O => texture_access = Access::R,
        mimg::SAMPLE_CD..=mimg::SAMPLE_C_CD_CL_O => texture_access = Access::R,
        mimg::GET_RESINFO => has_sampler = false,
        _ => {}
    }

    inst.push(Operand::vgpr(vdata).with_rw());
    inst.push(Operand::vgpr(vaddr).with_read());

    let texture_base = scalar_source(srsrc, address)?;
    let texture_slot = texture_base.slot().expect("srsrc resolves to a register slot");
    // r128 selects the 128-bit descriptor layout; the full T# is 256 bits.
    inst.push(Operand::texture(texture_slot, !r128).with_access(texture_access));
    inst.push(texture_base);

    if has_sampler {
        let sampler_base = scalar_source(ssamp, address)?;
        let sampler_slot = sampler_base.slot().expect("ssamp resolves to a register slot");
        inst.push(Operand::sampler(sampler_slot, unrm).with_read());
        inst.push(sampler_base);
    }

    inst.push(Operand::constant(dmask));
    Ok(())
}

fn decode_ds<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word0 = read_word(*address);
    *address += WORD;
    let word1 = read_word(*address);
    *address += WORD;

    let offset0 = bits(word0, 0, 8);
    let offset1 = bits(word0, 8, 8);
    let gds = bits(word0, 17, 1) != 0;
    let op = bits(word0, 18, 8);

    let addr = bits(word1, 0, 8);
    let data0 = bits(word1, 8, 8);
    let data1 = bits(word1, 16, 8);
    let vdst = bits(word1, 24, 8);

    inst.op = op;

    let has_offset1 = matches!(
        op,
        ds::READ2_B32
            | ds::READ2_B64
            | ds::READ2ST64_B32
            | ds::READ2ST64_B64
            | ds::WRITE2_B32
            | ds::WRITE2_B64
            | ds::WRITE2ST64_B32
            | ds::WRITE2ST64_B64
            | ds::WRXCHG2_RTN_B32
            | ds::WRXCHG2_RTN_B64
            | ds::WRXCHG2ST64_RTN_B32
            | ds::WRXCHG2ST64_RTN_B64
            | ds::ORDERED_COUNT
    );
    let has_dst = matches!(
        op,
        ds::READ_B32
            | ds::READ2_B32
            | ds::READ2ST64_B32
            | ds::READ_I8
            | ds::READ_U8
            | ds::READ_I16
            | ds::READ_U16
            | ds::READ_B64
            | ds::READ2_B64
            | ds::READ2ST64_B64
            | ds::READ_B96
            | ds::READ_B128
            | ds::AND_RTN_B64
            | ds::OR_RTN_B64
            | ds::XOR_RTN_B64
            | ds::MSKOR_RTN_B64
            | ds::APPEND
            | ds::CONSUME
            | ds::SWIZZLE_B32
            | ds::ORDERED_COUNT
    );
    let has_lo_offset = matches!(
        op,
        ds::GWS_BARRIER | ds::GWS_INIT | ds::GWS_SEMA_BR | ds::GWS_SEMA_P | ds::GWS_SEMA_RELEASE_ALL
    );

    if op != ds::NOP {
        if has_dst {
            inst.push(Operand::vgpr(vdst).with_write());
        }
        inst.push(Operand::vgpr(addr).with_read());
        inst.push(Operand::vgpr(data0).with_rw());
        inst.push(Operand::vgpr(data1).with_rw());

        if has_offset1 {
            inst.push(Operand::constant(offset0));
            inst.push(Operand::constant(offset1));
        } else if has_lo_offset {
            inst.push(Operand::constant(offset0));
        } else {
            inst.push(Operand::constant(offset0 | (offset1 << 8)));
        }
    }
    inst.push(Operand::constant_bool(gds));
    Ok(())
}

fn decode_vintrp<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word = read_word(*address);
    *address += WORD;

    let vsrc = bits(word, 0, 8);
    let attr_chan = bits(word, 8, 2);
    let attr = bits(word, 10, 6);
    let op = bits(word, 16, 2);
    let vdst = bits(word, 18, 8);

    inst.op = op;

    let dst_access = if op == crate::ops::vintrp::P2_F32 {
        Access::RW
    } else {
        Access::W
    };

    inst.push(Operand::vgpr(vdst).with_access(dst_access));
    inst.push(Operand::vgpr(vsrc).with_read());
    inst.push(Operand::attr(attr as u16, attr_chan as u16));
    Ok(())
}

fn decode_exp<R: FnMut(u64) -> u32>(
    inst: &mut GcnInstruction,
    address: &mut u64,
    read_word: &mut R,
) -> Result<(), DecodeError> {
    let word0 = read_word(*address);
    *address += WORD;
    let word1 = read_word(*address);
    *address += WORD;

    let en = bits(word0, 0, 4);
    let target = bits(word0, 4, 6);
    let compr = bits(word0, 10, 1) != 0;
    let done = bits(word0, 11, 1) != 0;
    let vm = bits(word0, 12, 1) != 0;

    let vsrc = [
        bits(word1, 0, 8),
        bits(word1, 8, 8),
        bits(word1, 16, 8),
        bits(word1, 24, 8),
    ];

    inst.op = 0;
    inst.push(Operand::constant(target));
    inst.push(Operand::constant(en));
    inst.push(Operand::constant_bool(compr));
    inst.push(Operand::constant_bool(done));
    inst.push(Operand::constant_bool(vm));

    for (index, &reg) in vsrc.iter().enumerate() {
        if compr && index >= 2 {
            break;
        }
        if en & (1 << index) != 0 {
            inst.push(Operand::vgpr(reg).with_read());
        }
    }
    Ok(())
}

/// Decodes one instruction at `address`, advancing it past every word the
/// instruction occupies.
pub fn decode<R: FnMut(u64) -> u32>(
    address: &mut u64,
    read_word: &mut R,
) -> Result<GcnInstruction, DecodeError> {
    let word = read_word(*address);

    let family = match word >> 23 {
        0b1_0111_1101 => Some(Family::Sop1),
        0b1_0111_1110 => Some(Family::Sopc),
        0b1_0111_1111 => Some(Family::Sopp),
        _ => None,
    }
    .or_else(|| match word >> 25 {
        0b0111111 => Some(Family::Vop1),
        0b0111110 => Some(Family::Vopc),
        _ => None,
    })
    .or_else(|| match word >> 26 {
        0b110100 => Some(Family::Vop3),
        0b111000 => Some(Family::Mubuf),
        0b111010 => Some(Family::Mtbuf),
        0b111100 => Some(Family::Mimg),
        0b110110 => Some(Family::Ds),
        0b110010 => Some(Family::Vintrp),
        0b111110 => Some(Family::Exp),
        _ => None,
    })
    .or_else(|| (word >> 27 == 0b11000).then_some(Family::Smrd))
    .or_else(|| (word >> 28 == 0b1011).then_some(Family::Sopk))
    .or_else(|| (word >> 30 == 0b10).then_some(Family::Sop2))
    .or_else(|| (word >> 31 == 0b0).then_some(Family::Vop2))
    .ok_or(DecodeError::UnknownEncoding {
        address: *address,
        word,
    })?;

    let mut inst = GcnInstruction::new(family, 0);
    match family {
        Family::Sop1 => decode_sop1(&mut inst, address, read_word)?,
        Family::Sop2 => decode_sop2(&mut inst, address, read_word)?,
        Family::Sopk => decode_sopk(&mut inst, address, read_word)?,
        Family::Sopc => decode_sopc(&mut inst, address, read_word)?,
        Family::Sopp => decode_sopp(&mut inst, address, read_word)?,
        Family::Smrd => decode_smrd(&mut inst, address, read_word)?,
        Family::Vop1 => decode_vop1(&mut inst, address, read_word)?,
        Family::Vop2 => decode_vop2(&mut inst, address, read_word)?,
        Family::Vop3 => decode_vop3(&mut inst, address, read_word)?,
        Family::Vopc => decode_vopc(&mut inst, address, read_word)?,
        Family::Mubuf => decode_mubuf(&mut inst, address, read_word)?,
        Family::Mtbuf => decode_mtbuf(&mut inst, address, read_word)?,
        Family::Mimg => decode_mimg(&mut inst, address, read_word)?,
        Family::Ds => decode_ds(&mut inst, address, read_word)?,
        Family::Vintrp => decode_vintrp(&mut inst, address, read_word)?,
        Family::Exp => decode_exp(&mut inst, address, read_word)?,
    }
    Ok(inst)
}
