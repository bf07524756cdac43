//! Runtime configuration options

/// Configuration options for driving an Alpha program
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Log every executed instruction at debug level
    pub trace: bool,
    /// Pause when an instruction marked with `*` executes
    pub stop_at_breakpoints: bool,
    /// Stop after this many executed instructions
    pub step_limit: Option<u64>,
    /// Instructions executed per scheduling tick
    pub steps_per_tick: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            trace: false,
            stop_at_breakpoints: true,
            step_limit: None,
            steps_per_tick: 1,
        }
    }
}

impl RuntimeConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable instruction tracing
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Pause at breakpoints, or run straight through them
    pub fn with_stop_at_breakpoints(mut self, stop: bool) -> Self {
        self.stop_at_breakpoints = stop;
        self
    }

    /// Bound the number of executed instructions
    pub fn with_step_limit(mut self, limit: Option<u64>) -> Self {
        self.step_limit = limit;
        self
    }

    /// Set how many instructions run per tick
    pub fn with_steps_per_tick(mut self, steps: usize) -> Self {
        self.steps_per_tick = steps;
        self
    }
}
