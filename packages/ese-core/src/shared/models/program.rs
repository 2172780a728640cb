//! Executor-neutral program IR
//!
//! ESE never interprets instructions. It only needs the block structure, the
//! position of calls, PHIs and terminators, and what a call site may do to
//! control flow.

use super::ids::{BlockId, FunctionId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a call site may do to the caller's control flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Halting {
    /// Always returns to the caller
    #[default]
    Returns,
    /// May transfer control away permanently (e.g. calls a function that can exit)
    MayHalt,
    /// Never returns (e.g. `exit`, `abort`)
    MustHalt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    Phi,
    Call {
        callees: Vec<FunctionId>,
        halting: Halting,
    },
    Branch {
        conditional: bool,
    },
    Switch,
    Return,
    Unreachable,
    Other,
}

impl Instruction {
    pub fn call(callees: Vec<FunctionId>) -> Self {
        Instruction::Call {
            callees,
            halting: Halting::Returns,
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Branch { .. }
                | Instruction::Switch
                | Instruction::Return
                | Instruction::Unreachable
        )
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, Instruction::Phi)
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Instruction::Call { .. })
    }

    /// Conditional branch or switch: its condition read is the record's branch read
    pub fn is_predicate(&self) -> bool {
        matches!(
            self,
            Instruction::Branch { conditional: true } | Instruction::Switch
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub instructions: Vec<Instruction>,
    pub successors: Vec<BlockId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    /// Block 0 is the entry block. Empty for declarations.
    pub blocks: Vec<BasicBlock>,
    /// Functions without coverage tracking are treated as covered up front
    pub track_coverage: bool,
}

impl Function {
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }
}

/// Program counter: one instruction of one block of one function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstLocation {
    pub function: FunctionId,
    pub block: BlockId,
    pub index: u32,
}

impl InstLocation {
    pub fn new(function: FunctionId, block: BlockId, index: u32) -> Self {
        Self {
            function,
            block,
            index,
        }
    }
}

impl fmt::Display for InstLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.function, self.block, self.index)
    }
}

/// Program counter plus the call instructions of every enclosing frame
///
/// Two execution records can only be equivalent at the same program point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgramPoint {
    pub inst: InstLocation,
    /// Outermost frame first
    pub callers: Vec<InstLocation>,
}

impl ProgramPoint {
    pub fn new(inst: InstLocation, callers: Vec<InstLocation>) -> Self {
        Self { inst, callers }
    }

    pub fn depth(&self) -> usize {
        self.callers.len()
    }
}

impl fmt::Display for ProgramPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.callers {
            write!(f, "{c} > ")?;
        }
        write!(f, "{}", self.inst)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub functions: Vec<Function>,
}

impl Program {
    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.index())
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn instruction(&self, loc: InstLocation) -> Option<&Instruction> {
        self.function(loc.function)?
            .block(loc.block)?
            .instructions
            .get(loc.index as usize)
    }

    pub fn defined_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| !f.is_declaration())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Builders
// ═══════════════════════════════════════════════════════════════════════════

/// Builds one function block by block
///
/// ```
/// use ese_core::shared::models::{FunctionBuilder, Instruction};
///
/// let f = FunctionBuilder::new("main")
///     .block(vec![Instruction::Other, Instruction::Branch { conditional: true }], &[1, 2])
///     .block(vec![Instruction::Branch { conditional: false }], &[2])
///     .block(vec![Instruction::Return], &[])
///     .build();
/// assert_eq!(f.blocks.len(), 3);
/// ```
#[derive(Debug)]
pub struct FunctionBuilder {
    name: String,
    blocks: Vec<BasicBlock>,
    track_coverage: bool,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
            track_coverage: true,
        }
    }

    pub fn block(mut self, instructions: Vec<Instruction>, successors: &[u32]) -> Self {
        self.blocks.push(BasicBlock {
            instructions,
            successors: successors.iter().map(|&s| BlockId(s)).collect(),
        });
        self
    }

    pub fn untracked(mut self) -> Self {
        self.track_coverage = false;
        self
    }

    /// The id is assigned by [`ProgramBuilder`]
    pub fn build(self) -> Function {
        Function {
            id: FunctionId(0),
            name: self.name,
            blocks: self.blocks,
            track_coverage: self.track_coverage,
        }
    }
}

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    functions: Vec<Function>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function and assigns the next id
    pub fn function(mut self, builder: FunctionBuilder) -> Self {
        let mut f = builder.build();
        f.id = FunctionId::from_index(self.functions.len());
        self.functions.push(f);
        self
    }

    /// Adds a declaration (no body)
    pub fn declaration(mut self, name: impl Into<String>) -> Self {
        let id = FunctionId::from_index(self.functions.len());
        self.functions.push(Function {
            id,
            name: name.into(),
            blocks: Vec::new(),
            track_coverage: true,
        });
        self
    }

    pub fn build(self) -> Program {
        Program {
            functions: self.functions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminator_classification() {
        assert!(Instruction::Return.is_terminator());
        assert!(Instruction::Switch.is_predicate());
        assert!(!Instruction::Branch { conditional: false }.is_predicate());
        assert!(!Instruction::call(vec![]).is_terminator());
    }

    #[test]
    fn test_program_builder_assigns_ids() {
        let program = ProgramBuilder::new()
            .function(FunctionBuilder::new("main").block(vec![Instruction::Return], &[]))
            .declaration("exit")
            .build();

        assert_eq!(program.functions[1].id, FunctionId(1));
        assert!(program.functions[1].is_declaration());
        assert_eq!(program.defined_functions().count(), 1);
        assert_eq!(
            program.instruction(InstLocation::new(FunctionId(0), BlockId(0), 0)),
            Some(&Instruction::Return)
        );
    }
}
