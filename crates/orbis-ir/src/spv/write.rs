use crate::context::Context;
use crate::dialect::Kind;
use crate::node::{Node, Operand};
use crate::spv::{operand_schema, Op, Section, MAGIC, VERSION};
use std::collections::HashMap;

struct Ids {
    map: HashMap<Node, u32>,
    next: u32,
}

impl Ids {
    fn get(&mut self, node: Node) -> u32 {
        *self.map.entry(node).or_insert_with(|| {
            let id = self.next;
            self.next += 1;
            id
        })
    }
}

fn push_string(words: &mut Vec<u32>, value: &str) {
    let bytes = value.as_bytes();
    // Zero-terminated UTF-8 padded to a word boundary (at least one NUL).
    let word_count = bytes.len() / 4 + 1;
    let offset = words.len();
    words.resize(offset + word_count, 0);
    for (index, &byte) in bytes.iter().enumerate() {
        words[offset + index / 4] |= u32::from(byte) << ((index % 4) * 8);
    }
}

/// Serializes the module layout into a SPIR-V word stream.
///
/// Ids are allocated densely on first sight, yielding `[1, bound)`. Exactly
/// one result id is emitted per value; non-SPIR-V instructions reaching the
/// serializer are a programmer error and panic.
pub fn serialize(ctx: &Context, generator: u32) -> Vec<u32> {
    let mut ids = Ids {
        map: HashMap::new(),
        next: 1,
    };
    let mut body = Vec::new();

    for section in Section::ALL {
        let Some(region) = ctx.section_if_present(section) else {
            continue;
        };

        for node in ctx.children_vec(region) {
            let (kind, raw_op) = ctx.op_of(node);
            if kind != Kind::Spv {
                panic!(
                    "serializer invariant: non-SPIR-V instruction {}",
                    ctx.display(node)
                );
            }
            let op = Op::from_u32(raw_op)
                .unwrap_or_else(|| panic!("serializer invariant: unknown SPIR-V opcode {raw_op}"));

            let header_index = body.len();
            body.push(raw_op);

            let mut operands: &[Operand] = ctx.operands(node);

            if ctx.is_value(node) {
                if op.is_type() {
                    let id = ids.get(node);
                    body.push(id);
                } else {
                    // Most values lead with their result type; a few
                    // (labels, strings, imports) carry a bare result id.
                    if operand_schema(op).has_result_type {
                        let type_node = operands
                            .first()
                            .and_then(Operand::as_value)
                            .unwrap_or_else(|| {
                                panic!(
                                    "serializer invariant: value {} has no result type",
                                    ctx.display(node)
                                )
                            });
                        let type_id = ids.get(type_node);
                        body.push(type_id);
                        operands = &operands[1..];
                    }
                    let id = ids.get(node);
                    body.push(id);
                }
            }

            for operand in operands {
                match operand {
                    Operand::Value(value) => {
                        let id = ids.get(*value);
                        body.push(id);
                    }
                    Operand::Int32(value) => body.push(*value as u32),
                    Operand::Bool(value) => body.push(u32::from(*value)),
                    Operand::Float32(value) => body.push(value.to_bits()),
                    Operand::Int64(value) => {
                        body.push(*value as u32);
                        body.push((*value as u64 >> 32) as u32);
                    }
                    Operand::Float64(value) => {
                        let bits = value.to_bits();
                        body.push(bits as u32);
                        body.push((bits >> 32) as u32);
                    }
                    Operand::String(value) => push_string(&mut body, value),
                }
            }

            let word_count = u32::try_from(body.len() - header_index)
                .expect("instruction word count fits in u16");
            assert!(
                word_count < 1 << 16,
                "serializer invariant: instruction too long"
            );
            body[header_index] |= word_count << 16;
        }
    }

    let mut result = Vec::with_capacity(body.len() + 5);
    result.push(MAGIC);
    result.push(VERSION);
    result.push(generator);
    result.push(ids.next);
    result.push(0);
    result.extend_from_slice(&body);
    result
}
