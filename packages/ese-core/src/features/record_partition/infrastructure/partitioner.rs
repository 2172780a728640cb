//! Record partitioner
//!
//! A record ends:
//! - after every call, so the call's effects are isolated from its continuation
//! - at every PHI → non-PHI transition
//! - at the block terminator
//!
//! Consecutive records of a block are linked; the last record of a block is
//! linked to the first record of every successor block.

use crate::errors::{EseError, EseResult};
use crate::features::record_partition::domain::{RecordKind, RecordSet};
use crate::shared::models::{BlockId, Function, Instruction, Program, RecordId};
use tracing::debug;

pub struct RecordPartitioner<'a> {
    program: &'a Program,
}

impl<'a> RecordPartitioner<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self { program }
    }

    pub fn partition(&self) -> EseResult<RecordSet> {
        let mut records = RecordSet::new();

        for function in self.program.defined_functions() {
            self.partition_function(function, &mut records)?;
        }

        debug!(
            functions = self.program.defined_functions().count(),
            records = records.len(),
            "Partitioned program into records"
        );
        Ok(records)
    }

    fn partition_function(&self, function: &Function, records: &mut RecordSet) -> EseResult<()> {
        // First record of each block, filled while splitting
        let mut heads: Vec<RecordId> = Vec::with_capacity(function.blocks.len());
        let mut tails: Vec<RecordId> = Vec::with_capacity(function.blocks.len());

        for (b, block) in function.blocks.iter().enumerate() {
            let block_id = BlockId::from_index(b);
            let Some(last) = block.instructions.last() else {
                return Err(EseError::malformed(
                    &function.name,
                    format!("{block_id} has no instructions"),
                ));
            };
            if !last.is_terminator() {
                return Err(EseError::malformed(
                    &function.name,
                    format!("{block_id} does not end with a terminator"),
                ));
            }

            let mut prev: Option<RecordId> = None;
            let mut start = 0usize;
            for (i, inst) in block.instructions.iter().enumerate() {
                let is_last = i + 1 == block.instructions.len();
                if inst.is_terminator() && !is_last {
                    return Err(EseError::malformed(
                        &function.name,
                        format!("{block_id} has a terminator at index {i} before its end"),
                    ));
                }

                let next = block.instructions.get(i + 1);
                let phi_boundary = inst.is_phi() && next.is_some_and(|n| !n.is_phi());
                if !(is_last || inst.is_call() || phi_boundary) {
                    continue;
                }
                if let Some(n) = next {
                    if n.is_phi() && !inst.is_phi() {
                        return Err(EseError::malformed(
                            &function.name,
                            format!("{block_id} has a PHI after a non-PHI instruction"),
                        ));
                    }
                }

                let kind = classify(&block.instructions[start], inst);
                let id = records.push(function.id, block_id, start as u32, i as u32 + 1, kind);
                match prev {
                    Some(p) => records.link(p, id),
                    None => heads.push(id),
                }
                prev = Some(id);
                start = i + 1;
            }

            // Every block ends with a terminator, so at least one record exists
            if let Some(tail) = prev {
                tails.push(tail);
            }
        }

        for (b, block) in function.blocks.iter().enumerate() {
            for succ in &block.successors {
                let Some(&head) = heads.get(succ.index()) else {
                    return Err(EseError::malformed(
                        &function.name,
                        format!("bb{b} has out-of-range successor {succ}"),
                    ));
                };
                records.link(tails[b], head);
            }
        }

        if let Some(&entry) = heads.first() {
            records.set_entry(function.id, entry);
        }
        Ok(())
    }
}

fn classify(first: &Instruction, last: &Instruction) -> RecordKind {
    if first.is_phi() {
        return RecordKind::Phi;
    }
    match last {
        Instruction::Call { .. } => RecordKind::Call,
        Instruction::Return => RecordKind::Return,
        Instruction::Unreachable => RecordKind::Unreachable,
        i if i.is_predicate() => RecordKind::Predicate,
        _ => RecordKind::Straight,
    }
}
