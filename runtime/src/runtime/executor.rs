use std::sync::Arc;
use crate::bytecode::Program;
use crate::runtime::{RuntimeConfig, RuntimeError, RuntimeResult};
use crate::vm::{
    BreakpointObserver, BufferedOutput, InputSource, MachineState, NullObserver, OutputSink, Step,
    TextInput, VM,
};

/// Why a run stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    /// Every instruction has been consumed
    Finished,
    /// A breakpoint instruction ran; the runtime is now paused
    Breakpoint(MachineState),
    /// The runtime was paused before this run started
    Paused,
    /// The configured step limit was reached
    StepLimit,
}

/// Drives a VM from the host side: stepping, running in bounded ticks,
/// pausing at breakpoints and resuming.
///
/// The VM itself only ever executes one instruction per call; this is the
/// loop around it.
pub struct Runtime<I = TextInput, O = BufferedOutput, B = NullObserver> {
    vm: VM<I, O, B>,
    config: RuntimeConfig,
    paused: bool,
    steps: u64,
}

impl<I: InputSource, O: OutputSink, B: BreakpointObserver> Runtime<I, O, B> {
    /// Create a new runtime with default configuration
    pub fn new(program: impl Into<Arc<Program>>, input: I, output: O, observer: B) -> Self {
        Self::from_vm(VM::new(program, input, output, observer), RuntimeConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(
        program: impl Into<Arc<Program>>,
        input: I,
        output: O,
        observer: B,
        config: RuntimeConfig,
    ) -> RuntimeResult<Self> {
        if config.steps_per_tick == 0 {
            return Err(RuntimeError::ConfigError(
                "steps_per_tick must be at least 1".to_string(),
            ));
        }
        Ok(Self::from_vm(VM::new(program, input, output, observer), config))
    }

    fn from_vm(mut vm: VM<I, O, B>, config: RuntimeConfig) -> Self {
        vm.set_trace(config.trace);
        Self {
            vm,
            config,
            paused: false,
            steps: 0,
        }
    }

    /// Execute exactly one instruction, paused or not
    pub fn step(&mut self) -> RuntimeResult<Step> {
        let step = self.vm.run_one()?;
        self.steps += 1;
        Ok(step)
    }

    /// Run until the program finishes, hits a breakpoint, or reaches the step limit.
    ///
    /// Without a step limit an endless program never returns.
    pub fn run(&mut self) -> RuntimeResult<Halt> {
        loop {
            if let Some(halt) = self.run_for(usize::MAX)? {
                return Ok(halt);
            }
        }
    }

    /// One scheduling tick of `steps_per_tick` instructions
    pub fn tick(&mut self) -> RuntimeResult<Option<Halt>> {
        self.run_for(self.config.steps_per_tick)
    }

    /// Run at most `budget` instructions. `None` means the program is still
    /// running and the caller should come back later.
    pub fn run_for(&mut self, budget: usize) -> RuntimeResult<Option<Halt>> {
        if self.paused {
            return Ok(Some(Halt::Paused));
        }

        for _ in 0..budget {
            if self.vm.at_end() {
                return Ok(Some(Halt::Finished));
            }
            if self.config.step_limit.map_or(false, |limit| self.steps >= limit) {
                tracing::debug!(steps = self.steps, "step limit reached");
                return Ok(Some(Halt::StepLimit));
            }

            let step = self.step()?;
            if step.breakpoint && self.config.stop_at_breakpoints {
                self.paused = true;
                return Ok(Some(Halt::Breakpoint(self.vm.state())));
            }
        }

        if self.vm.at_end() {
            Ok(Some(Halt::Finished))
        } else {
            Ok(None)
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_finished(&self) -> bool {
        self.vm.at_end()
    }

    /// Rewind the program and clear the step count. Collaborators are untouched.
    pub fn reset(&mut self) {
        self.vm.reset();
        self.paused = false;
        self.steps = 0;
    }

    /// Number of instructions executed since the last reset
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn state(&self) -> MachineState {
        self.vm.state()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn vm(&self) -> &VM<I, O, B> {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut VM<I, O, B> {
        &mut self.vm
    }
}
