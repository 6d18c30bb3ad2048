//! Per-family opcode tables.
//!
//! Each family module exposes `pub const` opcode values (the raw field the
//! decoder extracts) plus a `NAMES` table mapping opcodes to mnemonics. The
//! mnemonic strings intentionally omit the ISA `s_`/`v_` prefixes; consumers
//! that match semantic-function names combine them with the family name
//! (e.g. `vop3_add_f32`).

macro_rules! ops {
    ($($name:ident = $value:expr => $mnemonic:literal;)*) => {
        $(pub const $name: u32 = $value;)*

        pub const NAMES: &[(u32, &str)] = &[$(($value, $mnemonic),)*];
    };
}

/// Looks up a mnemonic in a family `NAMES` table.
pub(crate) fn lookup(names: &[(u32, &'static str)], op: u32) -> Option<&'static str> {
    names
        .binary_search_by_key(&op, |&(value, _)| value)
        .ok()
        .map(|index| names[index].1)
}

pub mod sop1 {
    ops! {
        MOV_B32 = 3 => "mov_b32";
        MOV_B64 = 4 => "mov_b64";
        CMOV_B32 = 5 => "cmov_b32";
        CMOV_B64 = 6 => "cmov_b64";
        NOT_B32 = 7 => "not_b32";
        NOT_B64 = 8 => "not_b64";
        WQM_B32 = 9 => "wqm_b32";
        WQM_B64 = 10 => "wqm_b64";
        BREV_B32 = 11 => "brev_b32";
        BREV_B64 = 12 => "brev_b64";
        BCNT0_I32_B32 = 13 => "bcnt0_i32_b32";
        BCNT0_I32_B64 = 14 => "bcnt0_i32_b64";
        BCNT1_I32_B32 = 15 => "bcnt1_i32_b32";
        BCNT1_I32_B64 = 16 => "bcnt1_i32_b64";
        FF0_I32_B32 = 17 => "ff0_i32_b32";
        FF0_I32_B64 = 18 => "ff0_i32_b64";
        FF1_I32_B32 = 19 => "ff1_i32_b32";
        FF1_I32_B64 = 20 => "ff1_i32_b64";
        FLBIT_I32_B32 = 21 => "flbit_i32_b32";
        FLBIT_I32_B64 = 22 => "flbit_i32_b64";
        FLBIT_I32 = 23 => "flbit_i32";
        FLBIT_I32_I64 = 24 => "flbit_i32_i64";
        SEXT_I32_I8 = 25 => "sext_i32_i8";
        SEXT_I32_I16 = 26 => "sext_i32_i16";
        BITSET0_B32 = 27 => "bitset0_b32";
        BITSET0_B64 = 28 => "bitset0_b64";
        BITSET1_B32 = 29 => "bitset1_b32";
        BITSET1_B64 = 30 => "bitset1_b64";
        GETPC_B64 = 31 => "getpc_b64";
        SETPC_B64 = 32 => "setpc_b64";
        SWAPPC_B64 = 33 => "swappc_b64";
        AND_SAVEEXEC_B64 = 36 => "and_saveexec_b64";
        OR_SAVEEXEC_B64 = 37 => "or_saveexec_b64";
        XOR_SAVEEXEC_B64 = 38 => "xor_saveexec_b64";
        ANDN2_SAVEEXEC_B64 = 39 => "andn2_saveexec_b64";
        ORN2_SAVEEXEC_B64 = 40 => "orn2_saveexec_b64";
        NAND_SAVEEXEC_B64 = 41 => "nand_saveexec_b64";
        NOR_SAVEEXEC_B64 = 42 => "nor_saveexec_b64";
        XNOR_SAVEEXEC_B64 = 43 => "xnor_saveexec_b64";
        QUADMASK_B32 = 44 => "quadmask_b32";
        QUADMASK_B64 = 45 => "quadmask_b64";
        MOVRELS_B32 = 46 => "movrels_b32";
        MOVRELS_B64 = 47 => "movrels_b64";
        MOVRELD_B32 = 48 => "movreld_b32";
        MOVRELD_B64 = 49 => "movreld_b64";
        CBRANCH_JOIN = 50 => "cbranch_join";
        ABS_I32 = 52 => "abs_i32";
        MOV_FED_B32 = 53 => "mov_fed_b32";
    }
}

pub mod sop2 {
    ops! {
        ADD_U32 = 0 => "add_u32";
        SUB_U32 = 1 => "sub_u32";
        ADD_I32 = 2 => "add_i32";
        SUB_I32 = 3 => "sub_i32";
        ADDC_U32 = 4 => "addc_u32";
        SUBB_U32 = 5 => "subb_u32";
        MIN_I32 = 6 => "min_i32";
        MIN_U32 = 7 => "min_u32";
        MAX_I32 = 8 => "max_i32";
        MAX_U32 = 9 => "max_u32";
        CSELECT_B32 = 10 => "cselect_b32";
        CSELECT_B64 = 11 => "cselect_b64";
        AND_B32 = 14 => "and_b32";
        AND_B64 = 15 => "and_b64";
        OR_B32 = 16 => "or_b32";
        OR_B64 = 17 => "or_b64";
        XOR_B32 = 18 => "xor_b32";
        XOR_B64 = 19 => "xor_b64";
        ANDN2_B32 = 20 => "andn2_b32";
        ANDN2_B64 = 21 => "andn2_b64";
        ORN2_B32 = 22 => "orn2_b32";
        ORN2_B64 = 23 => "orn2_b64";
        NAND_B32 = 24 => "nand_b32";
        NAND_B64 = 25 => "nand_b64";
        NOR_B32 = 26 => "nor_b32";
        NOR_B64 = 27 => "nor_b64";
        XNOR_B32 = 28 => "xnor_b32";
        XNOR_B64 = 29 => "xnor_b64";
        LSHL_B32 = 30 => "lshl_b32";
        LSHL_B64 = 31 => "lshl_b64";
        LSHR_B32 = 32 => "lshr_b32";
        LSHR_B64 = 33 => "lshr_b64";
        ASHR_I32 = 34 => "ashr_i32";
        ASHR_I64 = 35 => "ashr_i64";
        BFM_B32 = 36 => "bfm_b32";
        BFM_B64 = 37 => "bfm_b64";
        MUL_I32 = 38 => "mul_i32";
        BFE_U32 = 39 => "bfe_u32";
        BFE_I32 = 40 => "bfe_i32";
        BFE_U64 = 41 => "bfe_u64";
        BFE_I64 = 42 => "bfe_i64";
        CBRANCH_G_FORK = 43 => "cbranch_g_fork";
        ABSDIFF_I32 = 44 => "absdiff_i32";
    }
}

pub mod sopk {
    ops! {
        MOVK_I32 = 0 => "movk_i32";
        CMOVK_I32 = 2 => "cmovk_i32";
        CMPK_EQ_I32 = 3 => "cmpk_eq_i32";
        CMPK_LG_I32 = 4 => "cmpk_lg_i32";
        CMPK_GT_I32 = 5 => "cmpk_gt_i32";
        CMPK_GE_I32 = 6 => "cmpk_ge_i32";
        CMPK_LT_I32 = 7 => "cmpk_lt_i32";
        CMPK_LE_I32 = 8 => "cmpk_le_i32";
        CMPK_EQ_U32 = 9 => "cmpk_eq_u32";
        CMPK_LG_U32 = 10 => "cmpk_lg_u32";
        CMPK_GT_U32 = 11 => "cmpk_gt_u32";
        CMPK_GE_U32 = 12 => "cmpk_ge_u32";
        CMPK_LT_U32 = 13 => "cmpk_lt_u32";
        CMPK_LE_U32 = 14 => "cmpk_le_u32";
        ADDK_I32 = 15 => "addk_i32";
        MULK_I32 = 16 => "mulk_i32";
        CBRANCH_I_FORK = 17 => "cbranch_i_fork";
        GETREG_B32 = 18 => "getreg_b32";
        SETREG_B32 = 19 => "setreg_b32";
        SETREG_IMM = 20 => "setreg_imm";
    }
}

pub mod sopc {
    ops! {
        CMP_EQ_I32 = 0 => "cmp_eq_i32";
        CMP_LG_I32 = 1 => "cmp_lg_i32";
        CMP_GT_I32 = 2 => "cmp_gt_i32";
        CMP_GE_I32 = 3 => "cmp_ge_i32";
        CMP_LT_I32 = 4 => "cmp_lt_i32";
        CMP_LE_I32 = 5 => "cmp_le_i32";
        CMP_EQ_U32 = 6 => "cmp_eq_u32";
        CMP_LG_U32 = 7 => "cmp_lg_u32";
        CMP_GT_U32 = 8 => "cmp_gt_u32";
        CMP_GE_U32 = 9 => "cmp_ge_u32";
        CMP_LT_U32 = 10 => "cmp_lt_u32";
        CMP_LE_U32 = 11 => "cmp_le_u32";
        BITCMP0_B32 = 12 => "bitcmp0_b32";
        BITCMP1_B32 = 13 => "bitcmp1_b32";
        BITCMP0_B64 = 14 => "bitcmp0_b64";
        BITCMP1_B64 = 15 => "bitcmp1_b64";
        SETVSKIP = 16 => "setvskip";
    }
}

pub mod sopp {
    ops! {
        NOP = 0 => "nop";
        ENDPGM = 1 => "endpgm";
        BRANCH = 2 => "branch";
        CBRANCH_SCC0 = 4 => "cbranch_scc0";
        CBRANCH_SCC1 = 5 => "cbranch_scc1";
        CBRANCH_VCCZ = 6 => "cbranch_vccz";
        CBRANCH_VCCNZ = 7 => "cbranch_vccnz";
        CBRANCH_EXECZ = 8 => "cbranch_execz";
        CBRANCH_EXECNZ = 9 => "cbranch_execnz";
        BARRIER = 10 => "barrier";
        WAITCNT = 12 => "waitcnt";
        SETHALT = 13 => "sethalt";
        SLEEP = 14 => "sleep";
        SETPRIO = 15 => "setprio";
        SENDMSG = 16 => "sendmsg";
        SENDMSGHALT = 17 => "sendmsghalt";
        TRAP = 18 => "trap";
        ICACHE_INV = 19 => "icache_inv";
        INCPERFLEVEL = 20 => "incperflevel";
        DECPERFLEVEL = 21 => "decperflevel";
        TTRACEDATA = 22 => "ttracedata";
    }
}

pub mod smrd {
    ops! {
        LOAD_DWORD = 0 => "load_dword";
        LOAD_DWORDX2 = 1 => "load_dwordx2";
        LOAD_DWORDX4 = 2 => "load_dwordx4";
        LOAD_DWORDX8 = 3 => "load_dwordx8";
        LOAD_DWORDX16 = 4 => "load_dwordx16";
        BUFFER_LOAD_DWORD = 8 => "buffer_load_dword";
        BUFFER_LOAD_DWORDX2 = 9 => "buffer_load_dwordx2";
        BUFFER_LOAD_DWORDX4 = 10 => "buffer_load_dwordx4";
        BUFFER_LOAD_DWORDX8 = 11 => "buffer_load_dwordx8";
        BUFFER_LOAD_DWORDX16 = 12 => "buffer_load_dwordx16";
        DCACHE_INV_VOL = 29 => "dcache_inv_vol";
        MEMTIME = 30 => "memtime";
        DCACHE_INV = 31 => "dcache_inv";
    }
}

pub mod vop1 {
    ops! {
        NOP = 0 => "nop";
        MOV_B32 = 1 => "mov_b32";
        READFIRSTLANE_B32 = 2 => "readfirstlane_b32";
        CVT_I32_F64 = 3 => "cvt_i32_f64";
        CVT_F64_I32 = 4 => "cvt_f64_i32";
        CVT_F32_I32 = 5 => "cvt_f32_i32";
        CVT_F32_U32 = 6 => "cvt_f32_u32";
        CVT_U32_F32 = 7 => "cvt_u32_f32";
        CVT_I32_F32 = 8 => "cvt_i32_f32";
        MOV_FED_B32 = 9 => "mov_fed_b32";
        CVT_F16_F32 = 10 => "cvt_f16_f32";
        CVT_F32_F16 = 11 => "cvt_f32_f16";
        CVT_RPI_I32_F32 = 12 => "cvt_rpi_i32_f32";
        CVT_FLR_I32_F32 = 13 => "cvt_flr_i32_f32";
        CVT_OFF_F32_I4 = 14 => "cvt_off_f32_i4";
        CVT_F32_F64 = 15 => "cvt_f32_f64";
        CVT_F64_F32 = 16 => "cvt_f64_f32";
        CVT_F32_UBYTE0 = 17 => "cvt_f32_ubyte0";
        CVT_F32_UBYTE1 = 18 => "cvt_f32_ubyte1";
        CVT_F32_UBYTE2 = 19 => "cvt_f32_ubyte2";
        CVT_F32_UBYTE3 = 20 => "cvt_f32_ubyte3";
        CVT_U32_F64 = 21 => "cvt_u32_f64";
        CVT_F64_U32 = 22 => "cvt_f64_u32";
        FRACT_F32 = 32 => "fract_f32";
        TRUNC_F32 = 33 => "trunc_f32";
        CEIL_F32 = 34 => "ceil_f32";
        RNDNE_F32 = 35 => "rndne_f32";
        FLOOR_F32 = 36 => "floor_f32";
        EXP_F32 = 37 => "exp_f32";
        LOG_CLAMP_F32 = 38 => "log_clamp_f32";
        LOG_F32 = 39 => "log_f32";
        RCP_CLAMP_F32 = 40 => "rcp_clamp_f32";
        RCP_LEGACY_F32 = 41 => "rcp_legacy_f32";
        RCP_F32 = 42 => "rcp_f32";
        RCP_IFLAG_F32 = 43 => "rcp_iflag_f32";
        RSQ_CLAMP_F32 = 44 => "rsq_clamp_f32";
        RSQ_LEGACY_F32 = 45 => "rsq_legacy_f32";
        RSQ_F32 = 46 => "rsq_f32";
        RCP_F64 = 47 => "rcp_f64";
        RCP_CLAMP_F64 = 48 => "rcp_clamp_f64";
        RSQ_F64 = 49 => "rsq_f64";
        RSQ_CLAMP_F64 = 50 => "rsq_clamp_f64";
        SQRT_F32 = 51 => "sqrt_f32";
        SQRT_F64 = 52 => "sqrt_f64";
        SIN_F32 = 53 => "sin_f32";
        COS_F32 = 54 => "cos_f32";
        NOT_B32 = 55 => "not_b32";
        BFREV_B32 = 56 => "bfrev_b32";
        FFBH_U32 = 57 => "ffbh_u32";
        FFBL_B32 = 58 => "ffbl_b32";
        FFBH_I32 = 59 => "ffbh_i32";
        FREXP_EXP_I32_F64 = 60 => "frexp_exp_i32_f64";
        FREXP_MANT_F64 = 61 => "frexp_mant_f64";
        FRACT_F64 = 62 => "fract_f64";
        FREXP_EXP_I32_F32 = 63 => "frexp_exp_i32_f32";
        FREXP_MANT_F32 = 64 => "frexp_mant_f32";
        CLREXCP = 65 => "clrexcp";
        MOVRELD_B32 = 66 => "movreld_b32";
        MOVRELS_B32 = 67 => "movrels_b32";
        MOVRELSD_B32 = 68 => "movrelsd_b32";
    }
}

pub mod vop2 {
    ops! {
        CNDMASK_B32 = 0 => "cndmask_b32";
        READLANE_B32 = 1 => "readlane_b32";
        WRITELANE_B32 = 2 => "writelane_b32";
        ADD_F32 = 3 => "add_f32";
        SUB_F32 = 4 => "sub_f32";
        SUBREV_F32 = 5 => "subrev_f32";
        MAC_LEGACY_F32 = 6 => "mac_legacy_f32";
        MUL_LEGACY_F32 = 7 => "mul_legacy_f32";
        MUL_F32 = 8 => "mul_f32";
        MUL_I32_I24 = 9 => "mul_i32_i24";
        MUL_HI_I32_I24 = 10 => "mul_hi_i32_i24";
        MUL_U32_U24 = 11 => "mul_u32_u24";
        MUL_HI_U32_U24 = 12 => "mul_hi_u32_u24";
        MIN_LEGACY_F32 = 13 => "min_legacy_f32";
        MAX_LEGACY_F32 = 14 => "max_legacy_f32";
        MIN_F32 = 15 => "min_f32";
        MAX_F32 = 16 => "max_f32";
        MIN_I32 = 17 => "min_i32";
        MAX_I32 = 18 => "max_i32";
        MIN_U32 = 19 => "min_u32";
        MAX_U32 = 20 => "max_u32";
        LSHR_B32 = 21 => "lshr_b32";
        LSHRREV_B32 = 22 => "lshrrev_b32";
        ASHR_I32 = 23 => "ashr_i32";
        ASHRREV_I32 = 24 => "ashrrev_i32";
        LSHL_B32 = 25 => "lshl_b32";
        LSHLREV_B32 = 26 => "lshlrev_b32";
        AND_B32 = 27 => "and_b32";
        OR_B32 = 28 => "or_b32";
        XOR_B32 = 29 => "xor_b32";
        BFM_B32 = 30 => "bfm_b32";
        MAC_F32 = 31 => "mac_f32";
        MADMK_F32 = 32 => "madmk_f32";
        MADAK_F32 = 33 => "madak_f32";
        BCNT_U32_B32 = 34 => "bcnt_u32_b32";
        MBCNT_LO_U32_B32 = 35 => "mbcnt_lo_u32_b32";
        MBCNT_HI_U32_B32 = 36 => "mbcnt_hi_u32_b32";
        ADD_I32 = 37 => "add_i32";
        SUB_I32 = 38 => "sub_i32";
        SUBREV_I32 = 39 => "subrev_i32";
        ADDC_U32 = 40 => "addc_u32";
        SUBB_U32 = 41 => "subb_u32";
        SUBBREV_U32 = 42 => "subbrev_u32";
        LDEXP_F32 = 43 => "ldexp_f32";
        CVT_PKACCUM_U8_F32 = 44 => "cvt_pkaccum_u8_f32";
        CVT_PKNORM_I16_F32 = 45 => "cvt_pknorm_i16_f32";
        CVT_PKNORM_U16_F32 = 46 => "cvt_pknorm_u16_f32";
        CVT_PKRTZ_F16_F32 = 47 => "cvt_pkrtz_f16_f32";
        CVT_PK_U16_U32 = 48 => "cvt_pk_u16_u32";
        CVT_PK_I16_I32 = 49 => "cvt_pk_i16_i32";
    }
}

pub mod vopc {
    /// Number of opcodes reserved for the VOPC space (also the offset of the
    /// VOP2 mirror inside VOP3).
    pub const OP_SPACE: u32 = 256;

    const FLOAT_PREDICATES: [&str; 16] = [
        "f", "lt", "eq", "le", "gt", "lg", "ge", "o", "u", "nge", "nlg", "ngt", "nle", "neq",
        "nlt", "tru",
    ];
    const INT_PREDICATES: [&str; 8] = ["f", "lt", "eq", "le", "gt", "ne", "ge", "t"];

    // Family base opcodes. Each float family spans 16 predicates, each integer
    // family 8; the `x` variants additionally write EXEC.
    pub const CMP_F32: u32 = 0x00;
    pub const CMPX_F32: u32 = 0x10;
    pub const CMP_F64: u32 = 0x20;
    pub const CMPX_F64: u32 = 0x30;
    pub const CMPS_F32: u32 = 0x40;
    pub const CMPSX_F32: u32 = 0x50;
    pub const CMPS_F64: u32 = 0x60;
    pub const CMPSX_F64: u32 = 0x70;
    pub const CMP_I32: u32 = 0x80;
    pub const CMP_CLASS_F32: u32 = 0x88;
    pub const CMPX_I32: u32 = 0x90;
    pub const CMPX_CLASS_F32: u32 = 0x98;
    pub const CMP_I64: u32 = 0xA0;
    pub const CMP_CLASS_F64: u32 = 0xA8;
    pub const CMPX_I64: u32 = 0xB0;
    pub const CMPX_CLASS_F64: u32 = 0xB8;
    pub const CMP_U32: u32 = 0xC0;
    pub const CMPX_U32: u32 = 0xD0;
    pub const CMP_U64: u32 = 0xE0;
    pub const CMPX_U64: u32 = 0xF0;

    pub const CMP_EQ_F32: u32 = CMP_F32 + 2;
    pub const CMP_LT_I32: u32 = CMP_I32 + 1;
    pub const CMP_EQ_I32: u32 = CMP_I32 + 2;
    pub const CMP_EQ_U32: u32 = CMP_U32 + 2;
    pub const CMP_NE_U32: u32 = CMP_U32 + 5;

    /// Mnemonic for a VOPC opcode. Composed rather than tabulated: the VOPC
    /// space is a regular predicate x type grid.
    pub fn name(op: u32) -> Option<String> {
        let (base, exec, signal, suffix, predicates): (u32, bool, bool, &str, &[&str]) = match op {
            0x00..=0x0F => (CMP_F32, false, false, "f32", &FLOAT_PREDICATES),
            0x10..=0x1F => (CMPX_F32, true, false, "f32", &FLOAT_PREDICATES),
            0x20..=0x2F => (CMP_F64, false, false, "f64", &FLOAT_PREDICATES),
            0x30..=0x3F => (CMPX_F64, true, false, "f64", &FLOAT_PREDICATES),
            0x40..=0x4F => (CMPS_F32, false, true, "f32", &FLOAT_PREDICATES),
            0x50..=0x5F => (CMPSX_F32, true, true, "f32", &FLOAT_PREDICATES),
            0x60..=0x6F => (CMPS_F64, false, true, "f64", &FLOAT_PREDICATES),
            0x70..=0x7F => (CMPSX_F64, true, true, "f64", &FLOAT_PREDICATES),
            0x80..=0x87 => (CMP_I32, false, false, "i32", &INT_PREDICATES),
            0x88 => return Some("cmp_class_f32".to_owned()),
            0x90..=0x97 => (CMPX_I32, true, false, "i32", &INT_PREDICATES),
            0x98 => return Some("cmpx_class_f32".to_owned()),
            0xA0..=0xA7 => (CMP_I64, false, false, "i64", &INT_PREDICATES),
            0xA8 => return Some("cmp_class_f64".to_owned()),
            0xB0..=0xB7 => (CMPX_I64, true, false, "i64", &INT_PREDICATES),
            0xB8 => return Some("cmpx_class_f64".to_owned()),
            0xC0..=0xC7 => (CMP_U32, false, false, "u32", &INT_PREDICATES),
            0xD0..=0xD7 => (CMPX_U32, true, false, "u32", &INT_PREDICATES),
            0xE0..=0xE7 => (CMP_U64, false, false, "u64", &INT_PREDICATES),
            0xF0..=0xF7 => (CMPX_U64, true, false, "u64", &INT_PREDICATES),
            _ => return None,
        };

        let predicate = predicates[(op - base) as usize];
        let family = match (signal, exec) {
            (false, false) => "cmp",
            (false, true) => "cmpx",
            (true, false) => "cmps",
            (true, true) => "cmpsx",
        };
        Some(format!("{family}_{predicate}_{suffix}"))
    }
}

pub mod vop3 {
    /// VOP3 opcode space: `0..256` mirrors VOPC, `256..` mirrors VOP2,
    /// `384..` mirrors VOP1. Opcodes in `320..=375` are the VOP3-only
    /// encodings; of those, only [`THREE_SRC`] consume `src2`.
    pub const VOP2_BASE: u32 = 256;
    pub const VOP1_BASE: u32 = 384;

    pub const CNDMASK_B32: u32 = VOP2_BASE + super::vop2::CNDMASK_B32;
    pub const READLANE_B32: u32 = VOP2_BASE + super::vop2::READLANE_B32;
    pub const WRITELANE_B32: u32 = VOP2_BASE + super::vop2::WRITELANE_B32;
    pub const MADMK_F32: u32 = VOP2_BASE + super::vop2::MADMK_F32;
    pub const MADAK_F32: u32 = VOP2_BASE + super::vop2::MADAK_F32;
    pub const ADD_I32: u32 = VOP2_BASE + super::vop2::ADD_I32;
    pub const SUB_I32: u32 = VOP2_BASE + super::vop2::SUB_I32;
    pub const SUBREV_I32: u32 = VOP2_BASE + super::vop2::SUBREV_I32;
    pub const ADDC_U32: u32 = VOP2_BASE + super::vop2::ADDC_U32;
    pub const SUBB_U32: u32 = VOP2_BASE + super::vop2::SUBB_U32;
    pub const SUBBREV_U32: u32 = VOP2_BASE + super::vop2::SUBBREV_U32;
    pub const MOV_B32: u32 = VOP1_BASE + super::vop1::MOV_B32;
    pub const READFIRSTLANE_B32: u32 = VOP1_BASE + super::vop1::READFIRSTLANE_B32;
    pub const MOVRELD_B32: u32 = VOP1_BASE + super::vop1::MOVRELD_B32;
    pub const MOVRELS_B32: u32 = VOP1_BASE + super::vop1::MOVRELS_B32;
    pub const MOVRELSD_B32: u32 = VOP1_BASE + super::vop1::MOVRELSD_B32;

    ops! {
        MAD_LEGACY_F32 = 320 => "mad_legacy_f32";
        MAD_F32 = 321 => "mad_f32";
        MAD_I32_I24 = 322 => "mad_i32_i24";
        MAD_U32_U24 = 323 => "mad_u32_u24";
        CUBEID_F32 = 324 => "cubeid_f32";
        CUBESC_F32 = 325 => "cubesc_f32";
        CUBETC_F32 = 326 => "cubetc_f32";
        CUBEMA_F32 = 327 => "cubema_f32";
        BFE_U32 = 328 => "bfe_u32";
        BFE_I32 = 329 => "bfe_i32";
        BFI_B32 = 330 => "bfi_b32";
        FMA_F32 = 331 => "fma_f32";
        FMA_F64 = 332 => "fma_f64";
        LERP_U8 = 333 => "lerp_u8";
        ALIGNBIT_B32 = 334 => "alignbit_b32";
        ALIGNBYTE_B32 = 335 => "alignbyte_b32";
        MULLIT_F32 = 336 => "mullit_f32";
        MIN3_F32 = 337 => "min3_f32";
        MIN3_I32 = 338 => "min3_i32";
        MIN3_U32 = 339 => "min3_u32";
        MAX3_F32 = 340 => "max3_f32";
        MAX3_I32 = 341 => "max3_i32";
        MAX3_U32 = 342 => "max3_u32";
        MED3_F32 = 343 => "med3_f32";
        MED3_I32 = 344 => "med3_i32";
        MED3_U32 = 345 => "med3_u32";
        SAD_U8 = 346 => "sad_u8";
        SAD_HI_U8 = 347 => "sad_hi_u8";
        SAD_U16 = 348 => "sad_u16";
        SAD_U32 = 349 => "sad_u32";
        CVT_PK_U8_F32 = 350 => "cvt_pk_u8_f32";
        DIV_FIXUP_F32 = 351 => "div_fixup_f32";
        DIV_FIXUP_F64 = 352 => "div_fixup_f64";
        LSHL_B64 = 353 => "lshl_b64";
        LSHR_B64 = 354 => "lshr_b64";
        ASHR_I64 = 355 => "ashr_i64";
        ADD_F64 = 356 => "add_f64";
        MUL_F64 = 357 => "mul_f64";
        MIN_F64 = 358 => "min_f64";
        MAX_F64 = 359 => "max_f64";
        LDEXP_F64 = 360 => "ldexp_f64";
        MUL_LO_U32 = 361 => "mul_lo_u32";
        MUL_HI_U32 = 362 => "mul_hi_u32";
        MUL_LO_I32 = 363 => "mul_lo_i32";
        MUL_HI_I32 = 364 => "mul_hi_i32";
        DIV_SCALE_F32 = 365 => "div_scale_f32";
        DIV_SCALE_F64 = 366 => "div_scale_f64";
        DIV_FMAS_F32 = 367 => "div_fmas_f32";
        DIV_FMAS_F64 = 368 => "div_fmas_f64";
        MSAD_U8 = 369 => "msad_u8";
        QSAD_U8 = 370 => "qsad_u8";
        MQSAD_U8 = 371 => "mqsad_u8";
        TRIG_PREOP_F64 = 372 => "trig_preop_f64";
        MQSAD_U32_U8 = 373 => "mqsad_u32_u8";
        MAD_U64_U32 = 374 => "mad_u64_u32";
        MAD_I64_I32 = 375 => "mad_i64_i32";
    }

    /// Inclusive range of three-source opcodes that consume `src2`.
    pub const THREE_SRC: std::ops::RangeInclusive<u32> = MAD_LEGACY_F32..=DIV_FIXUP_F64;

    /// Opcodes that use the VOP3b encoding (scalar carry destination in place
    /// of the abs/clamp fields).
    pub fn is_vop3b(op: u32) -> bool {
        matches!(
            op,
            ADD_I32
                | ADDC_U32
                | SUB_I32
                | SUBB_U32
                | SUBBREV_U32
                | SUBREV_I32
                | DIV_SCALE_F32
                | DIV_SCALE_F64
        )
    }

    pub fn name(op: u32) -> Option<String> {
        if op < VOP2_BASE {
            return super::vopc::name(op);
        }
        if op >= VOP1_BASE {
            return super::lookup(super::vop1::NAMES, op - VOP1_BASE).map(str::to_owned);
        }
        if let Some(name) = super::lookup(NAMES, op) {
            return Some(name.to_owned());
        }
        super::lookup(super::vop2::NAMES, op - VOP2_BASE).map(str::to_owned)
    }
}

pub mod mubuf {
    ops! {
        LOAD_FORMAT_X = 0 => "load_format_x";
        LOAD_FORMAT_XY = 1 => "load_format_xy";
        LOAD_FORMAT_XYZ = 2 => "load_format_xyz";
        LOAD_FORMAT_XYZW = 3 => "load_format_xyzw";
        STORE_FORMAT_X = 4 => "store_format_x";
        STORE_FORMAT_XY = 5 => "store_format_xy";
        STORE_FORMAT_XYZ = 6 => "store_format_xyz";
        STORE_FORMAT_XYZW = 7 => "store_format_xyzw";
        LOAD_UBYTE = 8 => "load_ubyte";
        LOAD_SBYTE = 9 => "load_sbyte";
        LOAD_USHORT = 10 => "load_ushort";
        LOAD_SSHORT = 11 => "load_sshort";
        LOAD_DWORD = 12 => "load_dword";
        LOAD_DWORDX2 = 13 => "load_dwordx2";
        LOAD_DWORDX4 = 14 => "load_dwordx4";
        LOAD_DWORDX3 = 15 => "load_dwordx3";
        STORE_BYTE = 24 => "store_byte";
        STORE_SHORT = 26 => "store_short";
        STORE_DWORD = 28 => "store_dword";
        STORE_DWORDX2 = 29 => "store_dwordx2";
        STORE_DWORDX4 = 30 => "store_dwordx4";
        STORE_DWORDX3 = 31 => "store_dwordx3";
        ATOMIC_SWAP = 48 => "atomic_swap";
        ATOMIC_CMPSWAP = 49 => "atomic_cmpswap";
        ATOMIC_ADD = 50 => "atomic_add";
        ATOMIC_SUB = 51 => "atomic_sub";
        ATOMIC_RSUB = 52 => "atomic_rsub";
        ATOMIC_SMIN = 53 => "atomic_smin";
        ATOMIC_UMIN = 54 => "atomic_umin";
        ATOMIC_SMAX = 55 => "atomic_smax";
        ATOMIC_UMAX = 56 => "atomic_umax";
        ATOMIC_AND = 57 => "atomic_and";
        ATOMIC_OR = 58 => "atomic_or";
        ATOMIC_XOR = 59 => "atomic_xor";
        ATOMIC_INC = 60 => "atomic_inc";
        ATOMIC_DEC = 61 => "atomic_dec";
        ATOMIC_FCMPSWAP = 62 => "atomic_fcmpswap";
        ATOMIC_FMIN = 63 => "atomic_fmin";
        ATOMIC_FMAX = 64 => "atomic_fmax";
        WBINVL1_SC = 112 => "wbinvl1_sc";
        WBINVL1 = 113 => "wbinvl1";
    }
}

pub mod mtbuf {
    ops! {
        LOAD_FORMAT_X = 0 => "load_format_x";
        LOAD_FORMAT_XY = 1 => "load_format_xy";
        LOAD_FORMAT_XYZ = 2 => "load_format_xyz";
        LOAD_FORMAT_XYZW = 3 => "load_format_xyzw";
        STORE_FORMAT_X = 4 => "store_format_x";
        STORE_FORMAT_XY = 5 => "store_format_xy";
        STORE_FORMAT_XYZ = 6 => "store_format_xyz";
        STORE_FORMAT_XYZW = 7 => "store_format_xyzw";
    }
}

pub mod mimg {
    ops! {
        LOAD = 0 => "load";
        LOAD_MIP = 1 => "load_mip";
        LOAD_PCK = 2 => "load_pck";
        LOAD_PCK_SGN = 3 => "load_pck_sgn";
        LOAD_MIP_PCK = 4 => "load_mip_pck";
        LOAD_MIP_PCK_SGN = 5 => "load_mip_pck_sgn";
        STORE = 8 => "store";
        STORE_MIP = 9 => "store_mip";
        STORE_PCK = 10 => "store_pck";
        STORE_MIP_PCK = 11 => "store_mip_pck";
        GET_RESINFO = 14 => "get_resinfo";
        ATOMIC_SWAP = 15 => "atomic_swap";
        ATOMIC_CMPSWAP = 16 => "atomic_cmpswap";
        ATOMIC_ADD = 17 => "atomic_add";
        ATOMIC_SUB = 18 => "atomic_sub";
        ATOMIC_RSUB = 19 => "atomic_rsub";
        ATOMIC_SMIN = 20 => "atomic_smin";
        ATOMIC_UMIN = 21 => "atomic_umin";
        ATOMIC_SMAX = 22 => "atomic_smax";
        ATOMIC_UMAX = 23 => "atomic_umax";
        ATOMIC_AND = 24 => "atomic_and";
        ATOMIC_OR = 25 => "atomic_or";
        ATOMIC_XOR = 26 => "atomic_xor";
        ATOMIC_INC = 27 => "atomic_inc";
        ATOMIC_DEC = 28 => "atomic_dec";
        ATOMIC_FCMPSWAP = 29 => "atomic_fcmpswap";
        ATOMIC_FMIN = 30 => "atomic_fmin";
        ATOMIC_FMAX = 31 => "atomic_fmax";
        SAMPLE = 32 => "sample";
        SAMPLE_CL = 33 => "sample_cl";
        SAMPLE_D = 34 => "sample_d";
        SAMPLE_D_CL = 35 => "sample_d_cl";
        SAMPLE_L = 36 => "sample_l";
        SAMPLE_B = 37 => "sample_b";
        SAMPLE_B_CL = 38 => "sample_b_cl";
        SAMPLE_LZ = 39 => "sample_lz";
        SAMPLE_C = 40 => "sample_c";
        SAMPLE_C_CL = 41 => "sample_c_cl";
        SAMPLE_C_D = 42 => "sample_c_d";
        SAMPLE_C_D_CL = 43 => "sample_c_d_cl";
        SAMPLE_C_L = 44 => "sample_c_l";
        SAMPLE_C_B = 45 => "sample_c_b";
        SAMPLE_C_B_CL = 46 => "sample_c_b_cl";
        SAMPLE_C_LZ = 47 => "sample_c_lz";
        SAMPLE_O = 48 => "sample_o";
        SAMPLE_CL_O = 49 => "sample_cl_o";
        SAMPLE_D_O = 50 => "sample_d_o";
        SAMPLE_D_CL_O = 51 => "sample_d_cl_o";
        SAMPLE_L_O = 52 => "sample_l_o";
        SAMPLE_B_O = 53 => "sample_b_o";
        SAMPLE_B_CL_O = 54 => "sample_b_cl_o";
        SAMPLE_LZ_O = 55 => "sample_lz_o";
        SAMPLE_C_O = 56 => "sample_c_o";
        SAMPLE_C_CL_O = 57 => "sample_c_cl_o";
        SAMPLE_C_D_O = 58 => "sample_c_d_o";
        SAMPLE_C_D_CL_O = 59 => "sample_c_d_cl_o";
        SAMPLE_C_L_O = 60 => "sample_c_l_o";
        SAMPLE_C_B_O = 61 => "sample_c_b_o";
        SAMPLE_C_B_CL_O = 62 => "sample_c_b_cl_o";
        SAMPLE_C_LZ_O = 63 => "sample_c_lz_o";
        GATHER4 = 64 => "gather4";
        GATHER4_CL = 65 => "gather4_cl";
        GATHER4_L = 68 => "gather4_l";
        GATHER4_B = 69 => "gather4_b";
        GATHER4_B_CL = 70 => "gather4_b_cl";
        GATHER4_LZ = 71 => "gather4_lz";
        GATHER4_C = 72 => "gather4_c";
        GATHER4_C_CL = 73 => "gather4_c_cl";
        GATHER4_C_L = 76 => "gather4_c_l";
        GATHER4_C_B = 77 => "gather4_c_b";
        GATHER4_C_B_CL = 78 => "gather4_c_b_cl";
        GATHER4_C_LZ = 79 => "gather4_c_lz";
        GATHER4_O = 80 => "gather4_o";
        GATHER4_CL_O = 81 => "gather4_cl_o";
        GATHER4_L_O = 84 => "gather4_l_o";
        GATHER4_B_O = 85 => "gather4_b_o";
        GATHER4_B_CL_O = 86 => "gather4_b_cl_o";
        GATHER4_LZ_O = 87 => "gather4_lz_o";
        GATHER4_C_O = 88 => "gather4_c_o";
        GATHER4_C_CL_O = 89 => "gather4_c_cl_o";
        GATHER4_C_L_O = 92 => "gather4_c_l_o";
        GATHER4_C_B_O = 93 => "gather4_c_b_o";
        GATHER4_C_B_CL_O = 94 => "gather4_c_b_cl_o";
        GATHER4_C_LZ_O = 95 => "gather4_c_lz_o";
        GET_LOD = 96 => "get_lod";
        SAMPLE_CD = 104 => "sample_cd";
        SAMPLE_CD_CL = 105 => "sample_cd_cl";
        SAMPLE_C_CD = 106 => "sample_c_cd";
        SAMPLE_C_CD_CL = 107 => "sample_c_cd_cl";
        SAMPLE_CD_O = 108 => "sample_cd_o";
        SAMPLE_CD_CL_O = 109 => "sample_cd_cl_o";
        SAMPLE_C_CD_O = 110 => "sample_c_cd_o";
        SAMPLE_C_CD_CL_O = 111 => "sample_c_cd_cl_o";
    }
}

pub mod ds {
    ops! {
        ADD_U32 = 0 => "add_u32";
        SUB_U32 = 1 => "sub_u32";
        RSUB_U32 = 2 => "rsub_u32";
        INC_U32 = 3 => "inc_u32";
        DEC_U32 = 4 => "dec_u32";
        MIN_I32 = 5 => "min_i32";
        MAX_I32 = 6 => "max_i32";
        MIN_U32 = 7 => "min_u32";
        MAX_U32 = 8 => "max_u32";
        AND_B32 = 9 => "and_b32";
        OR_B32 = 10 => "or_b32";
        XOR_B32 = 11 => "xor_b32";
        MSKOR_B32 = 12 => "mskor_b32";
        WRITE_B32 = 13 => "write_b32";
        WRITE2_B32 = 14 => "write2_b32";
        WRITE2ST64_B32 = 15 => "write2st64_b32";
        CMPST_B32 = 16 => "cmpst_b32";
        CMPST_F32 = 17 => "cmpst_f32";
        MIN_F32 = 18 => "min_f32";
        MAX_F32 = 19 => "max_f32";
        NOP = 20 => "nop";
        GWS_SEMA_RELEASE_ALL = 24 => "gws_sema_release_all";
        GWS_INIT = 25 => "gws_init";
        GWS_SEMA_V = 26 => "gws_sema_v";
        GWS_SEMA_BR = 27 => "gws_sema_br";
        GWS_SEMA_P = 28 => "gws_sema_p";
        GWS_BARRIER = 29 => "gws_barrier";
        WRITE_B8 = 30 => "write_b8";
        WRITE_B16 = 31 => "write_b16";
        ADD_RTN_U32 = 32 => "add_rtn_u32";
        SUB_RTN_U32 = 33 => "sub_rtn_u32";
        RSUB_RTN_U32 = 34 => "rsub_rtn_u32";
        INC_RTN_U32 = 35 => "inc_rtn_u32";
        DEC_RTN_U32 = 36 => "dec_rtn_u32";
        MIN_RTN_I32 = 37 => "min_rtn_i32";
        MAX_RTN_I32 = 38 => "max_rtn_i32";
        MIN_RTN_U32 = 39 => "min_rtn_u32";
        MAX_RTN_U32 = 40 => "max_rtn_u32";
        AND_RTN_B32 = 41 => "and_rtn_b32";
        OR_RTN_B32 = 42 => "or_rtn_b32";
        XOR_RTN_B32 = 43 => "xor_rtn_b32";
        MSKOR_RTN_B32 = 44 => "mskor_rtn_b32";
        WRXCHG_RTN_B32 = 45 => "wrxchg_rtn_b32";
        WRXCHG2_RTN_B32 = 46 => "wrxchg2_rtn_b32";
        WRXCHG2ST64_RTN_B32 = 47 => "wrxchg2st64_rtn_b32";
        CMPST_RTN_B32 = 48 => "cmpst_rtn_b32";
        CMPST_RTN_F32 = 49 => "cmpst_rtn_f32";
        MIN_RTN_F32 = 50 => "min_rtn_f32";
        MAX_RTN_F32 = 51 => "max_rtn_f32";
        SWIZZLE_B32 = 53 => "swizzle_b32";
        READ_B32 = 54 => "read_b32";
        READ2_B32 = 55 => "read2_b32";
        READ2ST64_B32 = 56 => "read2st64_b32";
        READ_I8 = 57 => "read_i8";
        READ_U8 = 58 => "read_u8";
        READ_I16 = 59 => "read_i16";
        READ_U16 = 60 => "read_u16";
        CONSUME = 61 => "consume";
        APPEND = 62 => "append";
        ORDERED_COUNT = 63 => "ordered_count";
        ADD_U64 = 64 => "add_u64";
        SUB_U64 = 65 => "sub_u64";
        RSUB_U64 = 66 => "rsub_u64";
        INC_U64 = 67 => "inc_u64";
        DEC_U64 = 68 => "dec_u64";
        MIN_I64 = 69 => "min_i64";
        MAX_I64 = 70 => "max_i64";
        MIN_U64 = 71 => "min_u64";
        MAX_U64 = 72 => "max_u64";
        AND_B64 = 73 => "and_b64";
        OR_B64 = 74 => "or_b64";
        XOR_B64 = 75 => "xor_b64";
        MSKOR_B64 = 76 => "mskor_b64";
        WRITE_B64 = 77 => "write_b64";
        WRITE2_B64 = 78 => "write2_b64";
        WRITE2ST64_B64 = 79 => "write2st64_b64";
        CMPST_B64 = 80 => "cmpst_b64";
        CMPST_F64 = 81 => "cmpst_f64";
        MIN_F64 = 82 => "min_f64";
        MAX_F64 = 83 => "max_f64";
        AND_RTN_B64 = 105 => "and_rtn_b64";
        OR_RTN_B64 = 106 => "or_rtn_b64";
        XOR_RTN_B64 = 107 => "xor_rtn_b64";
        MSKOR_RTN_B64 = 108 => "mskor_rtn_b64";
        WRXCHG_RTN_B64 = 109 => "wrxchg_rtn_b64";
        WRXCHG2_RTN_B64 = 110 => "wrxchg2_rtn_b64";
        WRXCHG2ST64_RTN_B64 = 111 => "wrxchg2st64_rtn_b64";
        READ_B64 = 118 => "read_b64";
        READ2_B64 = 119 => "read2_b64";
        READ2ST64_B64 = 120 => "read2st64_b64";
        READ_B96 = 254 => "read_b96";
        READ_B128 = 255 => "read_b128";
    }
}

pub mod vintrp {
    ops! {
        P1_F32 = 0 => "p1_f32";
        P2_F32 = 1 => "p2_f32";
        MOV_F32 = 2 => "mov_f32";
    }
}

pub mod exp {
    ops! {
        EXP = 0 => "exp";
    }
}
