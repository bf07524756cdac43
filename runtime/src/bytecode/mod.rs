mod instruction;
mod opcode;

pub use instruction::{Instruction, Operand, Register};
pub use opcode::{OpCode, MNEMONICS};

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::utils::Cursor;

/// An assembled Alpha program: the instruction sequence plus the tag table.
///
/// Immutable once built. Cloning is cheap, the instructions are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    instructions: Arc<[Instruction]>,
    tags: FxHashMap<String, usize>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>, tags: FxHashMap<String, usize>) -> Self {
        Self {
            instructions: instructions.into(),
            tags,
        }
    }

    /// Build a program from instructions alone, indexing every tag instruction
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        let tags = instructions
            .iter()
            .enumerate()
            .filter_map(|(index, instruction)| {
                instruction.tag_name.clone().map(|name| (name, index))
            })
            .collect();
        Self::new(instructions, tags)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Index of the tag instruction named `name`
    pub fn tag(&self, name: &str) -> Option<usize> {
        self.tags.get(name).copied()
    }

    pub fn tags(&self) -> &FxHashMap<String, usize> {
        &self.tags
    }

    /// A fresh cursor over the instructions, positioned at the start
    pub fn cursor(&self) -> Cursor<Instruction> {
        Cursor::new(self.instructions.clone())
    }
}
