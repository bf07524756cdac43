use crate::lexer::{Argument, Block, Lexer, LexerError};
use alpha::{Instruction, Operand, Program};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Lexer(#[from] LexerError),

    #[error("Tag ':{name}:' is defined twice (instructions {first} and {second})")]
    DuplicateTag {
        name: String,
        first: usize,
        second: usize,
    },

    #[error("Reference to undefined tag ':{name}:' at position {position}")]
    UndefinedTag { name: String, position: usize },
}

impl AssemblyError {
    /// Offset in the stripped source the error points at, if any
    pub fn position(&self) -> Option<usize> {
        match self {
            AssemblyError::Lexer(error) => Some(error.position()),
            AssemblyError::UndefinedTag { position, .. } => Some(*position),
            AssemblyError::DuplicateTag { .. } => None,
        }
    }
}

/// Turns Alpha source into a `Program`.
///
/// Assembly is all or nothing: the first error aborts it and no partial
/// program is produced.
pub struct Assembler;

impl Assembler {
    pub fn assemble(source: &str) -> Result<Program, AssemblyError> {
        let mut lexer = Lexer::new(source);
        let mut blocks = Vec::new();
        let mut tags: FxHashMap<String, usize> = FxHashMap::default();

        while !lexer.is_at_end() {
            let block = lexer.next_block()?;
            if let Block::Tag { name, .. } = &block {
                // A tag's own index is its jump target
                let index = blocks.len();
                if let Some(&first) = tags.get(name) {
                    return Err(AssemblyError::DuplicateTag {
                        name: name.clone(),
                        first,
                        second: index,
                    });
                }
                tags.insert(name.clone(), index);
            }
            blocks.push(block);
        }

        // Second pass so tags can be referenced before they are defined
        let instructions = blocks
            .into_iter()
            .map(|block| Self::link(block, &tags))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            instructions = instructions.len(),
            tags = tags.len(),
            "assembled program"
        );
        Ok(Program::new(instructions, tags))
    }

    fn link(block: Block, tags: &FxHashMap<String, usize>) -> Result<Instruction, AssemblyError> {
        match block {
            Block::Tag { name, .. } => Ok(Instruction::tag(name)),
            Block::Action {
                opcode,
                argument,
                breakpoint,
                position,
            } => {
                let instruction = Instruction::new(opcode).with_breakpoint(breakpoint);
                let operand = match argument {
                    None => return Ok(instruction),
                    Some(Argument::Literal(value)) => Operand::Literal(value),
                    Some(Argument::Register(register)) => Operand::Register(register),
                    Some(Argument::Tag(name)) => match tags.get(&name) {
                        Some(&target) => Operand::Tag { name, target },
                        None => return Err(AssemblyError::UndefinedTag { name, position }),
                    },
                };
                Ok(instruction.with_operand(operand))
            }
        }
    }
}

/// Assemble `source` into a program
pub fn assemble(source: &str) -> Result<Program, AssemblyError> {
    Assembler::assemble(source)
}
