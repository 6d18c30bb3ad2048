use crate::operand::Operand;
use crate::ops;
use std::fmt;

/// The 16 GCN encoding families (plus EXP, which has a single opcode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    Sop1,
    Sop2,
    Sopk,
    Sopc,
    Sopp,
    Smrd,
    Vop1,
    Vop2,
    Vop3,
    Vopc,
    Mubuf,
    Mtbuf,
    Mimg,
    Ds,
    Vintrp,
    Exp,
}

impl Family {
    pub const ALL: [Family; 16] = [
        Family::Sop1,
        Family::Sop2,
        Family::Sopk,
        Family::Sopc,
        Family::Sopp,
        Family::Smrd,
        Family::Vop1,
        Family::Vop2,
        Family::Vop3,
        Family::Vopc,
        Family::Mubuf,
        Family::Mtbuf,
        Family::Mimg,
        Family::Ds,
        Family::Vintrp,
        Family::Exp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Family::Sop1 => "sop1",
            Family::Sop2 => "sop2",
            Family::Sopk => "sopk",
            Family::Sopc => "sopc",
            Family::Sopp => "sopp",
            Family::Smrd => "smrd",
            Family::Vop1 => "vop1",
            Family::Vop2 => "vop2",
            Family::Vop3 => "vop3",
            Family::Vopc => "vopc",
            Family::Mubuf => "mubuf",
            Family::Mtbuf => "mtbuf",
            Family::Mimg => "mimg",
            Family::Ds => "ds",
            Family::Vintrp => "vintrp",
            Family::Exp => "exp",
        }
    }

    /// Mnemonic of `op` within this family (without the `s_`/`v_` prefix).
    pub fn mnemonic(self, op: u32) -> Option<String> {
        let table = match self {
            Family::Sop1 => ops::sop1::NAMES,
            Family::Sop2 => ops::sop2::NAMES,
            Family::Sopk => ops::sopk::NAMES,
            Family::Sopc => ops::sopc::NAMES,
            Family::Sopp => ops::sopp::NAMES,
            Family::Smrd => ops::smrd::NAMES,
            Family::Vop1 => ops::vop1::NAMES,
            Family::Vop2 => ops::vop2::NAMES,
            Family::Mubuf => ops::mubuf::NAMES,
            Family::Mtbuf => ops::mtbuf::NAMES,
            Family::Mimg => ops::mimg::NAMES,
            Family::Ds => ops::ds::NAMES,
            Family::Vintrp => ops::vintrp::NAMES,
            Family::Exp => ops::exp::NAMES,
            Family::Vop3 => return ops::vop3::name(op),
            Family::Vopc => return ops::vopc::name(op),
        };

        crate::ops::lookup(table, op).map(str::to_owned)
    }

    /// Every `(op, mnemonic)` pair of the family, for name-table consumers.
    pub fn mnemonics(self) -> Vec<(u32, String)> {
        match self {
            Family::Vopc => (0..ops::vopc::OP_SPACE)
                .filter_map(|op| ops::vopc::name(op).map(|name| (op, name)))
                .collect(),
            Family::Vop3 => (0..512)
                .filter_map(|op| ops::vop3::name(op).map(|name| (op, name)))
                .collect(),
            _ => {
                let table = match self {
                    Family::Sop1 => ops::sop1::NAMES,
                    Family::Sop2 => ops::sop2::NAMES,
                    Family::Sopk => ops::sopk::NAMES,
                    Family::Sopc => ops::sopc::NAMES,
                    Family::Sopp => ops::sopp::NAMES,
                    Family::Smrd => ops::smrd::NAMES,
                    Family::Vop1 => ops::vop1::NAMES,
                    Family::Vop2 => ops::vop2::NAMES,
                    Family::Mubuf => ops::mubuf::NAMES,
                    Family::Mtbuf => ops::mtbuf::NAMES,
                    Family::Mimg => ops::mimg::NAMES,
                    Family::Ds => ops::ds::NAMES,
                    Family::Vintrp => ops::vintrp::NAMES,
                    Family::Exp => ops::exp::NAMES,
                    Family::Vop3 | Family::Vopc => unreachable!(),
                };
                table
                    .iter()
                    .map(|&(op, name)| (op, name.to_owned()))
                    .collect()
            }
        }
    }
}

/// One decoded instruction: family, raw opcode, and semantic operands in the
/// canonical order (destinations first, then sources, then modifier fields).
#[derive(Debug, Clone, PartialEq)]
pub struct GcnInstruction {
    pub family: Family,
    pub op: u32,
    operands: Vec<Operand>,
}

impl GcnInstruction {
    pub fn new(family: Family, op: u32) -> GcnInstruction {
        GcnInstruction {
            family,
            op,
            operands: Vec::new(),
        }
    }

    pub fn is(&self, family: Family, op: u32) -> bool {
        self.family == family && self.op == op
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn operand(&self, index: usize) -> &Operand {
        &self.operands[index]
    }

    pub fn push(&mut self, operand: Operand) {
        self.operands.push(operand);
    }

    pub fn display_name(&self) -> String {
        match self.family.mnemonic(self.op) {
            Some(mnemonic) => format!("{}.{}", self.family.name(), mnemonic),
            None => format!("{}.<invalid {}>", self.family.name(), self.op),
        }
    }
}

impl fmt::Display for GcnInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())?;
        for (index, operand) in self.operands.iter().enumerate() {
            if index == 0 {
                write!(f, " {operand}")?;
            } else {
                write!(f, ", {operand}")?;
            }
        }
        Ok(())
    }
}
