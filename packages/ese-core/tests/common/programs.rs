//! Programs shared by the scenarios

use ese_core::shared::models::{
    BlockId, FunctionBuilder, FunctionId, InstLocation, Instruction, Program, ProgramBuilder,
};

pub fn loc(block: u32, index: u32) -> InstLocation {
    InstLocation::new(FunctionId(0), BlockId(block), index)
}

fn branch() -> Instruction {
    Instruction::Branch { conditional: true }
}

fn jump() -> Instruction {
    Instruction::Branch { conditional: false }
}

/// Two arms that join and branch again
///
/// ```text
/// bb0: x = ..; br x        → bb1, bb2
/// bb1: y = ..; jmp         → bb3
/// bb2: y = ..; jmp         → bb3
/// bb3: z = load/copy; br z → bb4, bb5
/// bb4: ret
/// bb5: ret
/// ```
pub fn join_branch_program() -> Program {
    ProgramBuilder::new()
        .function(
            FunctionBuilder::new("main")
                .block(vec![Instruction::Other, branch()], &[1, 2])
                .block(vec![Instruction::Other, jump()], &[3])
                .block(vec![Instruction::Other, jump()], &[3])
                .block(vec![Instruction::Other, branch()], &[4, 5])
                .block(vec![Instruction::Return], &[])
                .block(vec![Instruction::Return], &[]),
        )
        .build()
}

/// A counted loop: the header controls itself
///
/// ```text
/// bb0: jmp          → bb1
/// bb1: i = ..; br i → bb2, bb3
/// bb2: jmp          → bb1
/// bb3: ret
/// ```
pub fn loop_program() -> Program {
    ProgramBuilder::new()
        .function(
            FunctionBuilder::new("main")
                .block(vec![jump()], &[1])
                .block(vec![Instruction::Other, branch()], &[2, 3])
                .block(vec![jump()], &[1])
                .block(vec![Instruction::Return], &[]),
        )
        .build()
}
