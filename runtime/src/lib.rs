// Alpha - A virtual machine for the Alpha accumulator/stack teaching language

pub mod bytecode;
pub mod vm;
pub mod runtime;
pub mod utils;

pub use bytecode::{Instruction, OpCode, Operand, Program, Register};
pub use vm::{
    BreakpointObserver, BufferedOutput, InputSource, MachineState, NullObserver, OutputSink, Step,
    TextInput, VMError, VM,
};
pub use runtime::{Halt, Runtime, RuntimeConfig};
pub use utils::{Cursor, CursorError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
