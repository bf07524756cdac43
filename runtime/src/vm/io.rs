//! Collaborators the VM calls out to while executing: where input comes
//! from, where output goes, and who hears about breakpoints.

use crate::vm::{MachineState, VMError};

/// Source for the `I` register. Returns 0 once exhausted.
pub trait InputSource {
    fn next(&mut self) -> i64;
}

/// Receives program output and runtime error reports
pub trait OutputSink {
    /// `code` is the accumulator interpreted as a character code
    fn write_char(&mut self, code: i64);

    fn write_number(&mut self, value: i64);

    /// Report a runtime error. Renders the error text through `write_char` by default.
    fn write_error(&mut self, error: &VMError) {
        for c in error.to_string().chars() {
            self.write_char(c as i64);
        }
    }
}

/// Notified after an instruction marked with `*` executes
pub trait BreakpointObserver {
    fn on_breakpoint(&mut self, state: &MachineState);
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn next(&mut self) -> i64 {
        (**self).next()
    }
}

impl<T: OutputSink + ?Sized> OutputSink for &mut T {
    fn write_char(&mut self, code: i64) {
        (**self).write_char(code)
    }

    fn write_number(&mut self, value: i64) {
        (**self).write_number(value)
    }

    fn write_error(&mut self, error: &VMError) {
        (**self).write_error(error)
    }
}

impl<T: BreakpointObserver + ?Sized> BreakpointObserver for &mut T {
    fn on_breakpoint(&mut self, state: &MachineState) {
        (**self).on_breakpoint(state)
    }
}

/// Feeds the character codes of a string, then zeros
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    codes: Vec<i64>,
    index: usize,
}

impl TextInput {
    pub fn new(text: &str) -> Self {
        Self {
            codes: text.chars().map(|c| c as i64).collect(),
            index: 0,
        }
    }

    /// Start over from the first character
    pub fn reset(&mut self) {
        self.index = 0;
    }
}

impl InputSource for TextInput {
    fn next(&mut self) -> i64 {
        match self.codes.get(self.index) {
            Some(code) => {
                self.index += 1;
                *code
            }
            None => 0,
        }
    }
}

/// Input that is always exhausted
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyInput;

impl InputSource for EmptyInput {
    fn next(&mut self) -> i64 {
        0
    }
}

/// Collects output into a string
#[derive(Debug, Clone, Default)]
pub struct BufferedOutput {
    buffer: String,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &str {
        &self.buffer
    }

    /// Drain everything written so far
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

impl OutputSink for BufferedOutput {
    fn write_char(&mut self, code: i64) {
        let c = u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        self.buffer.push(c);
    }

    fn write_number(&mut self, value: i64) {
        self.buffer.push_str(&value.to_string());
    }
}

/// Ignores breakpoints
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl BreakpointObserver for NullObserver {
    fn on_breakpoint(&mut self, _state: &MachineState) {}
}

/// Keeps every breakpoint snapshot in order
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub hits: Vec<MachineState>,
}

impl BreakpointObserver for RecordingObserver {
    fn on_breakpoint(&mut self, state: &MachineState) {
        self.hits.push(state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_input_exhausts_to_zero() {
        let mut input = TextInput::new("Hi");
        assert_eq!(input.next(), 'H' as i64);
        assert_eq!(input.next(), 'i' as i64);
        assert_eq!(input.next(), 0);
        assert_eq!(input.next(), 0);

        input.reset();
        assert_eq!(input.next(), 'H' as i64);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(EmptyInput.next(), 0);
    }

    #[test]
    fn test_buffered_output() {
        let mut output = BufferedOutput::new();
        output.write_char(65);
        output.write_number(-42);
        output.write_char(0x1F600);
        assert_eq!(output.contents(), "A-42\u{1F600}");

        assert_eq!(output.take(), "A-42\u{1F600}");
        assert_eq!(output.contents(), "");
    }

    #[test]
    fn test_buffered_output_invalid_char_codes() {
        let mut output = BufferedOutput::new();
        output.write_char(-1);
        output.write_char(0xD800);
        assert_eq!(output.contents(), "\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn test_write_error_renders_text() {
        let mut output = BufferedOutput::new();
        output.write_error(&VMError::OutOfBounds { target: 9, len: 2 });
        assert_eq!(output.contents(), VMError::OutOfBounds { target: 9, len: 2 }.to_string());
    }

    #[test]
    fn test_mut_ref_forwarding() {
        fn notify<B: BreakpointObserver>(mut observer: B) {
            observer.on_breakpoint(&MachineState { accumulator: 1, stack: vec![], cursor: 0 });
        }

        let mut observer = RecordingObserver::default();
        notify(&mut observer);
        notify(&mut observer);
        assert_eq!(observer.hits.len(), 2);
        assert_eq!(observer.hits[0].accumulator, 1);
    }
}
