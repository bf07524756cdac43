use std::fmt;

/// Opcodes for the VM

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // Accumulator
    Accumulate,     // acc: accumulator += operand
    Assign,         // giv: accumulator = operand

    // Control flow
    Jump,           // jmp: unconditional
    JumpIfPositive, // jgz: jump if accumulator > 0
    JumpIfNegative, // jlz: jump if accumulator < 0
    JumpIfZero,     // jez: jump if accumulator == 0

    // Stack
    Push,           // push: push accumulator
    Pop,            // pop: accumulator = pop, or 0 if empty
    Flush,          // flush: clear the stack

    // Output
    OutputChar,     // oc
    OutputNumber,   // on

    Nop,            // nop
    Tag,            // :name: jump target, no effect when executed
}

/// Every source mnemonic and the opcode it assembles to
pub const MNEMONICS: [(&str, OpCode); 12] = [
    ("acc", OpCode::Accumulate),
    ("jgz", OpCode::JumpIfPositive),
    ("jez", OpCode::JumpIfZero),
    ("jlz", OpCode::JumpIfNegative),
    ("jmp", OpCode::Jump),
    ("giv", OpCode::Assign),
    ("oc", OpCode::OutputChar),
    ("on", OpCode::OutputNumber),
    ("push", OpCode::Push),
    ("pop", OpCode::Pop),
    ("flush", OpCode::Flush),
    ("nop", OpCode::Nop),
];

impl OpCode {
    /// Look up the opcode for an exact mnemonic
    pub fn from_mnemonic(text: &str) -> Option<OpCode> {
        MNEMONICS
            .iter()
            .find(|(mnemonic, _)| *mnemonic == text)
            .map(|(_, opcode)| *opcode)
    }

    /// Source mnemonic, or `None` for tags which have no mnemonic
    pub fn mnemonic(&self) -> Option<&'static str> {
        MNEMONICS
            .iter()
            .find(|(_, opcode)| opcode == self)
            .map(|(mnemonic, _)| *mnemonic)
    }

    /// Characters that can follow `prefix` inside some longer mnemonic.
    ///
    /// Empty when no mnemonic has `prefix` as a strict prefix.
    pub fn continuations(prefix: &str) -> Vec<char> {
        let mut chars: Vec<char> = MNEMONICS
            .iter()
            .filter(|(mnemonic, _)| mnemonic.len() > prefix.len() && mnemonic.starts_with(prefix))
            .filter_map(|(mnemonic, _)| mnemonic[prefix.len()..].chars().next())
            .collect();
        chars.sort_unstable();
        chars.dedup();
        chars
    }

    /// Whether the instruction reads an operand
    pub fn takes_operand(&self) -> bool {
        matches!(
            self,
            OpCode::Accumulate
                | OpCode::Assign
                | OpCode::Jump
                | OpCode::JumpIfPositive
                | OpCode::JumpIfNegative
                | OpCode::JumpIfZero
                | OpCode::Push
        )
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(mnemonic) => write!(f, "{}", mnemonic),
            None => write!(f, "tag"),
        }
    }
}
