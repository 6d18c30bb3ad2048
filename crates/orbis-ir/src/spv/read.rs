use crate::context::Context;
use crate::dialect::Kind;
use crate::node::{Location, Node, Operand};
use crate::spv::{operand_schema, Op, Pat, Section, StorageClass, MAGIC};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeserializeError {
    #[error("bad module header")]
    BadHeader,
    #[error("truncated instruction at word {offset}")]
    Truncated { offset: usize },
    #[error("unknown opcode {opcode} at word {offset}")]
    UnknownOpcode { opcode: u32, offset: usize },
    #[error("result id {id} defined twice")]
    DuplicateId { id: u32 },
    #[error("reference to undefined id {id}")]
    UndefinedId { id: u32 },
    #[error("malformed string operand at word {offset}")]
    BadString { offset: usize },
    #[error("unsupported constant width at word {offset}")]
    BadConstant { offset: usize },
}

/// Outcome of deserializing a module into a context.
#[derive(Debug, PartialEq, Eq)]
pub struct DeserializedModule {
    pub bound: u32,
    /// Result id to node, for every id the module defines.
    pub values: HashMap<u32, Node>,
}

struct Cursor<'a> {
    words: &'a [u32],
    offset: usize,
    end: usize,
}

impl Cursor<'_> {
    fn word(&mut self) -> Result<u32, DeserializeError> {
        if self.offset >= self.end {
            return Err(DeserializeError::Truncated {
                offset: self.offset,
            });
        }
        let word = self.words[self.offset];
        self.offset += 1;
        Ok(word)
    }

    fn string(&mut self) -> Result<String, DeserializeError> {
        let start = self.offset;
        let mut bytes = Vec::new();
        loop {
            let word = self.word()?;
            for shift in [0, 8, 16, 24] {
                let byte = (word >> shift) as u8;
                if byte == 0 {
                    return String::from_utf8(bytes)
                        .map_err(|_| DeserializeError::BadString { offset: start });
                }
                bytes.push(byte);
            }
        }
    }

    fn remaining(&self) -> usize {
        self.end - self.offset
    }
}

fn skip_op(op: Op) -> bool {
    matches!(
        op,
        Op::Nop | Op::Source | Op::SourceContinued | Op::SourceExtension | Op::Line | Op::String
    )
}

/// Scalar literal width of a type node, for context-dependent constants.
fn constant_width(ctx: &Context, type_node: Node) -> Option<(u32, bool)> {
    match ctx.spv_op(type_node)? {
        Op::TypeInt => Some((ctx.operand(type_node, 0).as_i32()? as u32, false)),
        Op::TypeFloat => Some((ctx.operand(type_node, 0).as_i32()? as u32, true)),
        _ => None,
    }
}

/// Deserializes a SPIR-V word stream into the context's layout sections.
///
/// Types and constants are routed through the interner, so a module that
/// redeclares a structurally-known type resolves to the existing node.
pub fn deserialize(
    ctx: &mut Context,
    words: &[u32],
) -> Result<DeserializedModule, DeserializeError> {
    if words.len() < 5 || words[0] != MAGIC {
        return Err(DeserializeError::BadHeader);
    }
    let bound = words[3];
    let stream = &words[5..];

    // First pass: create one value node per result id so forward references
    // (phis, branch targets) resolve.
    let mut values: HashMap<u32, Node> = HashMap::new();
    let mut offset = 0usize;
    while offset < stream.len() {
        let header = stream[offset];
        let word_count = (header >> 16) as usize;
        let opcode = header & 0xFFFF;
        if word_count == 0 || offset + word_count > stream.len() {
            return Err(DeserializeError::Truncated { offset });
        }
        let op = Op::from_u32(opcode).ok_or(DeserializeError::UnknownOpcode { opcode, offset })?;
        let schema = operand_schema(op);
        if schema.has_result && !skip_op(op) {
            let id_index = offset + 1 + usize::from(schema.has_result_type);
            if id_index >= offset + word_count {
                return Err(DeserializeError::Truncated { offset });
            }
            let id = stream[id_index];
            let node = ctx.create(Location::Unknown, Kind::Spv, opcode, true, vec![]);
            if values.insert(id, node).is_some() {
                return Err(DeserializeError::DuplicateId { id });
            }
        }
        offset += word_count;
    }

    let lookup = |values: &HashMap<u32, Node>, id: u32| -> Result<Node, DeserializeError> {
        values
            .get(&id)
            .copied()
            .ok_or(DeserializeError::UndefinedId { id })
    };

    // Second pass: fill operands and link nodes into layout sections in
    // stream order.
    let mut offset = 0usize;
    while offset < stream.len() {
        let header = stream[offset];
        let word_count = (header >> 16) as usize;
        let opcode = header & 0xFFFF;
        let op = Op::from_u32(opcode).expect("validated in first pass");
        let mut cursor = Cursor {
            words: stream,
            offset: offset + 1,
            end: offset + word_count,
        };
        offset += word_count;

        if skip_op(op) {
            continue;
        }

        let schema = operand_schema(op);
        let result_type = if schema.has_result_type {
            Some(lookup(&values, cursor.word()?)?)
        } else {
            None
        };
        let node = if schema.has_result {
            lookup(&values, cursor.word()?)?
        } else {
            ctx.create(Location::Unknown, Kind::Spv, opcode, false, vec![])
        };

        if let Some(result_type) = result_type {
            ctx.add_operand(node, Operand::Value(result_type));
        }

        for &pat in schema.operands {
            match pat {
                Pat::Id => {
                    let id = cursor.word()?;
                    let value = lookup(&values, id)?;
                    ctx.add_operand(node, Operand::Value(value));
                }
                Pat::Lit => {
                    let word = cursor.word()?;
                    ctx.add_operand(node, Operand::Int32(word as i32));
                }
                Pat::Str => {
                    let value = cursor.string()?;
                    ctx.add_operand(node, Operand::String(value));
                }
                Pat::ConstLit => {
                    let type_node = result_type.expect("constants carry a result type");
                    let (width, is_float) = constant_width(ctx, type_node)
                        .ok_or(DeserializeError::BadConstant {
                            offset: cursor.offset,
                        })?;
                    let operand = match (width, is_float) {
                        (1..=32, false) => Operand::Int32(cursor.word()? as i32),
                        (1..=32, true) => Operand::Float32(f32::from_bits(cursor.word()?)),
                        (64, is_float) => {
                            let lo = u64::from(cursor.word()?);
                            let hi = u64::from(cursor.word()?);
                            let bits = lo | (hi << 32);
                            if is_float {
                                Operand::Float64(f64::from_bits(bits))
                            } else {
                                Operand::Int64(bits as i64)
                            }
                        }
                        _ => {
                            return Err(DeserializeError::BadConstant {
                                offset: cursor.offset,
                            })
                        }
                    };
                    ctx.add_operand(node, operand);
                }
                Pat::IdRest => {
                    while cursor.remaining() > 0 {
                        let value = lookup(&values, cursor.word()?)?;
                        ctx.add_operand(node, Operand::Value(value));
                    }
                }
                Pat::LitRest => {
                    while cursor.remaining() > 0 {
                        let word = cursor.word()?;
                        ctx.add_operand(node, Operand::Int32(word as i32));
                    }
                }
                Pat::StrThenIdRest => {
                    let value = cursor.string()?;
                    ctx.add_operand(node, Operand::String(value));
                    while cursor.remaining() > 0 {
                        let value = lookup(&values, cursor.word()?)?;
                        ctx.add_operand(node, Operand::Value(value));
                    }
                }
                Pat::PairLitIdRest => {
                    while cursor.remaining() > 0 {
                        let literal = cursor.word()?;
                        ctx.add_operand(node, Operand::Int32(literal as i32));
                        let value = lookup(&values, cursor.word()?)?;
                        ctx.add_operand(node, Operand::Value(value));
                    }
                }
            }
        }

        // Route into the layout. Variables split on storage class; types and
        // constants go through the interner so structural duplicates
        // collapse onto the existing node.
        let section = if op == Op::Variable {
            let storage = ctx.operand(node, 1).as_i32().unwrap_or_default();
            if storage == StorageClass::Function as i32 {
                Section::Functions
            } else {
                Section::Globals
            }
        } else {
            Section::of(op)
        };

        let interned = op.is_type()
            || matches!(
                op,
                Op::Constant | Op::ConstantTrue | Op::ConstantFalse | Op::ConstantComposite
            );
        if interned {
            if let Some(existing) = ctx.adopt_interned(node) {
                // A structurally-equal node already exists; re-point this id.
                ctx.replace_all_uses_with(node, existing);
                ctx.remove(node);
                if let Some(id) = values
                    .iter()
                    .find_map(|(&id, &candidate)| (candidate == node).then_some(id))
                {
                    values.insert(id, existing);
                }
                continue;
            }
        }

        let region = ctx.section(section);
        ctx.append(region, node);
    }

    Ok(DeserializedModule { bound, values })
}
