use std::fmt;
use crate::bytecode::OpCode;

/// One of the four special operand sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// `A`: the current accumulator
    Accumulator,
    /// `Z`: the accumulator negated
    NegatedAccumulator,
    /// `S`: pops the stack, 0 when empty
    StackTop,
    /// `I`: the next value from the input source
    Input,
}

impl Register {
    pub fn from_symbol(symbol: char) -> Option<Register> {
        match symbol {
            'A' => Some(Register::Accumulator),
            'Z' => Some(Register::NegatedAccumulator),
            'S' => Some(Register::StackTop),
            'I' => Some(Register::Input),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Register::Accumulator => 'A',
            Register::NegatedAccumulator => 'Z',
            Register::StackTop => 'S',
            Register::Input => 'I',
        }
    }
}

/// Operand of an instruction, resolved once by the assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(i64),
    Register(Register),
    /// Reference to a tag, already linked to the tag's instruction index
    Tag { name: String, target: usize },
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(value) => write!(f, "{}", value),
            Operand::Register(register) => write!(f, "{}", register.symbol()),
            Operand::Tag { name, .. } => write!(f, ":{}:", name),
        }
    }
}

/// Represents a single decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operand: Option<Operand>,
    pub breakpoint: bool,
    pub tag_name: Option<String>,  // Only set on OpCode::Tag
}

impl Instruction {
    pub fn new(opcode: OpCode) -> Self {
        Self {
            opcode,
            operand: None,
            breakpoint: false,
            tag_name: None,
        }
    }

    /// A tag definition; its own index is its jump target
    pub fn tag(name: impl Into<String>) -> Self {
        Self {
            opcode: OpCode::Tag,
            operand: None,
            breakpoint: false,
            tag_name: Some(name.into()),
        }
    }

    pub fn with_operand(mut self, operand: Operand) -> Self {
        self.operand = Some(operand);
        self
    }

    pub fn with_breakpoint(mut self, breakpoint: bool) -> Self {
        self.breakpoint = breakpoint;
        self
    }

    pub fn is_tag(&self) -> bool {
        self.opcode == OpCode::Tag
    }
}

/// Canonical source form, which assembles back to the same instruction
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_tag() {
            return write!(f, ":{}:", self.tag_name.as_deref().unwrap_or_default());
        }
        write!(f, "{}", self.opcode)?;
        if let Some(operand) = &self.operand {
            write!(f, "{}", operand)?;
        }
        if self.breakpoint {
            write!(f, "*")?;
        }
        Ok(())
    }
}
