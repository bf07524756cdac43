mod interpreter;
mod execution_context;
mod error;
mod io;

pub use interpreter::{Step, VM};
pub use execution_context::{ExecutionContext, MachineState};
pub use error::{VMError, VMResult};
pub use io::{
    BreakpointObserver, BufferedOutput, EmptyInput, InputSource, NullObserver, OutputSink,
    RecordingObserver, TextInput,
};
