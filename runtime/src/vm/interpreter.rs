use std::sync::Arc;
use crate::bytecode::{Instruction, OpCode, Operand, Program, Register};
use crate::vm::{
    BreakpointObserver, BufferedOutput, ExecutionContext, InputSource, MachineState, NullObserver,
    OutputSink, TextInput, VMError, VMResult,
};

/// Outcome of executing a single instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Index of the instruction that ran
    pub index: usize,
    /// The instruction carried a breakpoint marker and the observer was notified
    pub breakpoint: bool,
    /// Runtime error raised by the instruction, already reported to the output sink
    pub fault: Option<VMError>,
}

/// The Virtual Machine that executes an assembled Alpha program one instruction at a time
pub struct VM<I = TextInput, O = BufferedOutput, B = NullObserver> {
    program: Arc<Program>,
    context: ExecutionContext,
    input: I,
    output: O,
    observer: B,
    trace_enabled: bool,
}

impl<I: InputSource, O: OutputSink, B: BreakpointObserver> VM<I, O, B> {
    pub fn new(program: impl Into<Arc<Program>>, input: I, output: O, observer: B) -> Self {
        let program = program.into();
        let context = ExecutionContext::new(&program);
        Self {
            program,
            context,
            input,
            output,
            observer,
            trace_enabled: false,
        }
    }

    /// Enable or disable per-instruction tracing
    pub fn set_trace(&mut self, enabled: bool) {
        self.trace_enabled = enabled;
    }

    /// Execute the next instruction.
    ///
    /// Fails only with `ProgramExhausted`. Any other error raised by the
    /// instruction is written to the output sink and returned in
    /// `Step::fault`; the cursor has already moved past the instruction, so
    /// the next call carries on.
    pub fn run_one(&mut self) -> VMResult<Step> {
        let index = self.context.pc();
        let instruction = self
            .context
            .next_instruction()
            .map_err(|_| VMError::ProgramExhausted)?;

        if self.trace_enabled {
            tracing::debug!(
                pc = index,
                instruction = %instruction,
                accumulator = self.context.accumulator(),
                stack = ?self.context.stack(),
                "executing"
            );
        }

        let fault = match self.execute(&instruction) {
            Ok(()) => None,
            Err(error) => {
                tracing::warn!(pc = index, %instruction, %error, "runtime error");
                self.output.write_error(&error);
                Some(error)
            }
        };

        if instruction.breakpoint {
            let state = self.context.snapshot();
            tracing::debug!(pc = index, %state, "breakpoint");
            self.observer.on_breakpoint(&state);
        }

        Ok(Step {
            index,
            breakpoint: instruction.breakpoint,
            fault,
        })
    }

    /// True once every instruction has been consumed
    pub fn at_end(&self) -> bool {
        !self.context.has_more_instructions()
    }

    /// Rewind to the first instruction with a clean accumulator and stack.
    /// The collaborators keep their own state.
    pub fn reset(&mut self) {
        self.context.reset();
    }

    pub fn state(&self) -> MachineState {
        self.context.snapshot()
    }

    pub fn accumulator(&self) -> i64 {
        self.context.accumulator()
    }

    pub fn stack(&self) -> &[i64] {
        self.context.stack()
    }

    pub fn pc(&self) -> usize {
        self.context.pc()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn observer(&self) -> &B {
        &self.observer
    }

    /// Hand back the collaborators
    pub fn into_parts(self) -> (I, O, B) {
        (self.input, self.output, self.observer)
    }

    fn execute(&mut self, instruction: &Instruction) -> VMResult<()> {
        if instruction.is_tag() {
            return Ok(());
        }

        // Operands are evaluated even where the opcode ignores the value,
        // so `S` still pops and `I` still consumes input.
        let value = match &instruction.operand {
            Some(operand) => self.evaluate(operand),
            None => 0,
        };

        match instruction.opcode {
            OpCode::Accumulate => self.context.accumulate(value),
            OpCode::Assign => self.context.set_accumulator(value),
            OpCode::Jump => self.jump(value)?,
            OpCode::JumpIfPositive => {
                if self.context.accumulator() > 0 {
                    self.jump(value)?;
                }
            }
            OpCode::JumpIfNegative => {
                if self.context.accumulator() < 0 {
                    self.jump(value)?;
                }
            }
            OpCode::JumpIfZero => {
                if self.context.accumulator() == 0 {
                    self.jump(value)?;
                }
            }
            OpCode::Push => {
                let accumulator = self.context.accumulator();
                self.context.push(accumulator);
            }
            OpCode::Pop => {
                let top = self.context.pop_or_zero();
                self.context.set_accumulator(top);
            }
            OpCode::Flush => self.context.clear_stack(),
            OpCode::OutputChar => self.output.write_char(self.context.accumulator()),
            OpCode::OutputNumber => self.output.write_number(self.context.accumulator()),
            OpCode::Nop | OpCode::Tag => {}
        }
        Ok(())
    }

    fn evaluate(&mut self, operand: &Operand) -> i64 {
        match operand {
            Operand::Literal(value) => *value,
            Operand::Register(Register::Accumulator) => self.context.accumulator(),
            Operand::Register(Register::NegatedAccumulator) => self.context.accumulator().wrapping_neg(),
            Operand::Register(Register::StackTop) => self.context.pop_or_zero(),
            Operand::Register(Register::Input) => self.input.next(),
            Operand::Tag { target, .. } => *target as i64,
        }
    }

    fn jump(&mut self, target: i64) -> VMResult<()> {
        let len = self.context.program_len();
        let index = usize::try_from(target).map_err(|_| VMError::OutOfBounds { target, len })?;
        self.context
            .jump_to(index)
            .map_err(|_| VMError::OutOfBounds { target, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{EmptyInput, RecordingObserver};

    fn literal(opcode: OpCode, value: i64) -> Instruction {
        Instruction::new(opcode).with_operand(Operand::Literal(value))
    }

    fn register(opcode: OpCode, register: Register) -> Instruction {
        Instruction::new(opcode).with_operand(Operand::Register(register))
    }

    fn create_test_vm(instructions: Vec<Instruction>) -> VM {
        create_test_vm_with_input(instructions, "")
    }

    fn create_test_vm_with_input(instructions: Vec<Instruction>, input: &str) -> VM {
        let program = Program::from_instructions(instructions);
        VM::new(program, TextInput::new(input), BufferedOutput::new(), NullObserver)
    }

    fn run_to_end<I: InputSource, O: OutputSink, B: BreakpointObserver>(vm: &mut VM<I, O, B>) {
        while !vm.at_end() {
            vm.run_one().unwrap();
        }
    }

    #[test]
    fn test_accumulate_and_assign() {
        let mut vm = create_test_vm(vec![
            literal(OpCode::Assign, 10),
            literal(OpCode::Accumulate, 5),
            literal(OpCode::Accumulate, -20),
        ]);
        run_to_end(&mut vm);
        assert_eq!(vm.accumulator(), -5);
    }

    #[test]
    fn test_negated_accumulator_register() {
        let mut vm = create_test_vm(vec![
            literal(OpCode::Assign, 5),
            register(OpCode::Assign, Register::NegatedAccumulator),
        ]);
        run_to_end(&mut vm);
        assert_eq!(vm.accumulator(), -5);
    }

    #[test]
    fn test_accumulator_register_doubles() {
        let mut vm = create_test_vm(vec![
            literal(OpCode::Assign, 21),
            register(OpCode::Accumulate, Register::Accumulator),
        ]);
        run_to_end(&mut vm);
        assert_eq!(vm.accumulator(), 42);
    }

    #[test]
    fn test_stack_register_pops_or_yields_zero() {
        let mut vm = create_test_vm(vec![
            literal(OpCode::Assign, 3),
            Instruction::new(OpCode::Push).with_operand(Operand::Literal(0)),
            literal(OpCode::Assign, 0),
            register(OpCode::Accumulate, Register::StackTop),
            register(OpCode::Accumulate, Register::StackTop),
        ]);
        run_to_end(&mut vm);
        assert_eq!(vm.accumulator(), 3);
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn test_input_register() {
        let mut vm = create_test_vm_with_input(
            vec![
                register(OpCode::Assign, Register::Input),
                Instruction::new(OpCode::OutputChar),
                register(OpCode::Assign, Register::Input),
                Instruction::new(OpCode::OutputNumber),
            ],
            "x",
        );
        run_to_end(&mut vm);
        assert_eq!(vm.output().contents(), "x0");
    }

    #[test]
    fn test_push_pop_flush() {
        let mut vm = create_test_vm(vec![
            literal(OpCode::Assign, 1),
            literal(OpCode::Push, 0),
            literal(OpCode::Assign, 2),
            literal(OpCode::Push, 0),
            Instruction::new(OpCode::Pop),
        ]);
        run_to_end(&mut vm);
        assert_eq!(vm.accumulator(), 2);
        assert_eq!(vm.stack(), &[1]);

        let mut vm = create_test_vm(vec![
            literal(OpCode::Push, 0),
            literal(OpCode::Push, 0),
            Instruction::new(OpCode::Flush),
        ]);
        run_to_end(&mut vm);
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn test_push_evaluates_operand_side_effects() {
        let mut vm = create_test_vm_with_input(
            vec![
                literal(OpCode::Assign, 9),
                register(OpCode::Push, Register::Input),
                register(OpCode::Push, Register::StackTop),
            ],
            "ab",
        );
        run_to_end(&mut vm);
        // `pushS` pops the 9 and pushes the accumulator straight back
        assert_eq!(vm.stack(), &[9]);
        assert_eq!(vm.input_mut().next(), 'b' as i64);
    }

    #[test]
    fn test_pop_empty_stack_yields_zero() {
        let mut vm = create_test_vm(vec![literal(OpCode::Assign, 7), Instruction::new(OpCode::Pop)]);
        run_to_end(&mut vm);
        assert_eq!(vm.accumulator(), 0);
        assert!(vm.output().contents().is_empty());
    }

    #[test]
    fn test_output_char_and_number() {
        let mut vm = create_test_vm(vec![
            literal(OpCode::Assign, 'H' as i64),
            Instruction::new(OpCode::OutputChar),
            literal(OpCode::Assign, -17),
            Instruction::new(OpCode::OutputNumber),
        ]);
        run_to_end(&mut vm);
        assert_eq!(vm.output().contents(), "H-17");
    }

    #[test]
    fn test_tag_loop_increments_accumulator() {
        let program = Program::from_instructions(vec![
            Instruction::tag("start"),
            literal(OpCode::Accumulate, 1),
            Instruction::new(OpCode::Jump).with_operand(Operand::Tag {
                name: "start".to_string(),
                target: 0,
            }),
        ]);
        let mut vm = VM::new(program, TextInput::default(), BufferedOutput::new(), NullObserver);

        for iteration in 1..=50 {
            for _ in 0..3 {
                vm.run_one().unwrap();
            }
            assert_eq!(vm.accumulator(), iteration);
            assert_eq!(vm.pc(), 0);
        }
        assert!(!vm.at_end());
    }

    #[test]
    fn test_conditional_jumps() {
        // Counts down from 3, printing each value
        let program = Program::from_instructions(vec![
            literal(OpCode::Assign, 3),
            Instruction::tag("loop"),
            Instruction::new(OpCode::OutputNumber),
            literal(OpCode::Accumulate, -1),
            Instruction::new(OpCode::JumpIfPositive).with_operand(Operand::Tag {
                name: "loop".to_string(),
                target: 1,
            }),
        ]);
        let mut vm = VM::new(program, EmptyInput, BufferedOutput::new(), NullObserver);
        run_to_end(&mut vm);
        assert_eq!(vm.output().contents(), "321");
        assert_eq!(vm.accumulator(), 0);
    }

    #[test]
    fn test_jump_if_zero_and_negative() {
        let mut vm = create_test_vm(vec![
            literal(OpCode::Assign, 0),
            literal(OpCode::JumpIfZero, 3),
            literal(OpCode::Assign, 100), // skipped
            literal(OpCode::Assign, -1),
            literal(OpCode::JumpIfNegative, 6),
            literal(OpCode::Assign, 200), // skipped
            Instruction::new(OpCode::Nop),
        ]);
        run_to_end(&mut vm);
        assert_eq!(vm.accumulator(), -1);
    }

    #[test]
    fn test_untaken_jump_advances() {
        let mut vm = create_test_vm(vec![
            literal(OpCode::Assign, 1),
            literal(OpCode::JumpIfZero, 0),
            literal(OpCode::JumpIfNegative, 0),
        ]);
        run_to_end(&mut vm);
        assert_eq!(vm.pc(), 3);
    }

    #[test]
    fn test_jump_to_end_finishes_program() {
        let mut vm = create_test_vm(vec![literal(OpCode::Jump, 2), literal(OpCode::Assign, 1)]);
        vm.run_one().unwrap();
        assert!(vm.at_end());
        assert_eq!(vm.accumulator(), 0);
    }

    #[test]
    fn test_out_of_bounds_jump_is_reported_and_execution_continues() {
        let mut vm = create_test_vm(vec![
            literal(OpCode::Jump, 100),
            literal(OpCode::Assign, 42),
        ]);
        let step = vm.run_one().unwrap();
        assert_eq!(step.index, 0);
        assert_eq!(step.fault, Some(VMError::OutOfBounds { target: 100, len: 2 }));
        assert_eq!(vm.output().contents(), VMError::OutOfBounds { target: 100, len: 2 }.to_string());
        assert_eq!(vm.pc(), 1);

        let step = vm.run_one().unwrap();
        assert!(step.fault.is_none());
        assert_eq!(vm.accumulator(), 42);
    }

    #[test]
    fn test_negative_jump_target_is_out_of_bounds() {
        let mut vm = create_test_vm(vec![literal(OpCode::Assign, -3), register(OpCode::Jump, Register::Accumulator)]);
        vm.run_one().unwrap();
        let step = vm.run_one().unwrap();
        assert_eq!(step.fault, Some(VMError::OutOfBounds { target: -3, len: 2 }));
        assert!(vm.at_end());
    }

    #[test]
    fn test_program_exhausted() {
        let mut vm = create_test_vm(vec![Instruction::new(OpCode::Nop)]);
        assert!(!vm.at_end());
        vm.run_one().unwrap();
        assert!(vm.at_end());
        assert_eq!(vm.run_one(), Err(VMError::ProgramExhausted));
        assert_eq!(vm.run_one(), Err(VMError::ProgramExhausted));
    }

    #[test]
    fn test_empty_program_is_at_end() {
        let mut vm = create_test_vm(Vec::new());
        assert!(vm.at_end());
        assert_eq!(vm.run_one(), Err(VMError::ProgramExhausted));
    }

    #[test]
    fn test_breakpoint_notifies_once_with_post_state() {
        let program = Program::from_instructions(vec![
            literal(OpCode::Assign, 4),
            literal(OpCode::Push, 0).with_breakpoint(true),
            literal(OpCode::Accumulate, 1),
        ]);
        let mut vm = VM::new(program, TextInput::default(), BufferedOutput::new(), RecordingObserver::default());

        assert!(!vm.run_one().unwrap().breakpoint);
        assert!(vm.observer().hits.is_empty());

        let step = vm.run_one().unwrap();
        assert!(step.breakpoint);
        assert_eq!(
            vm.observer().hits,
            vec![MachineState { accumulator: 4, stack: vec![4], cursor: 2 }]
        );

        vm.run_one().unwrap();
        assert_eq!(vm.observer().hits.len(), 1);
    }

    #[test]
    fn test_breakpoint_on_taken_jump_reports_target() {
        let program = Program::from_instructions(vec![
            Instruction::new(OpCode::Nop),
            literal(OpCode::Jump, 0).with_breakpoint(true),
        ]);
        let mut observer = RecordingObserver::default();
        {
            let mut vm = VM::new(program, TextInput::default(), BufferedOutput::new(), &mut observer);
            vm.run_one().unwrap();
            vm.run_one().unwrap();
        }
        assert_eq!(observer.hits[0].cursor, 0);
    }

    #[test]
    fn test_reset_reruns_program() {
        let mut vm = create_test_vm(vec![literal(OpCode::Accumulate, 2), literal(OpCode::Push, 0)]);
        run_to_end(&mut vm);
        assert_eq!(vm.state(), MachineState { accumulator: 2, stack: vec![2], cursor: 2 });

        vm.reset();
        assert_eq!(vm.state(), MachineState::default());
        run_to_end(&mut vm);
        assert_eq!(vm.accumulator(), 2);
    }

    #[test]
    fn test_tag_instruction_is_noop() {
        let mut vm = create_test_vm(vec![Instruction::tag("t"), Instruction::tag("u")]);
        let step = vm.run_one().unwrap();
        assert_eq!(step, Step { index: 0, breakpoint: false, fault: None });
        assert_eq!(vm.state(), MachineState { accumulator: 0, stack: vec![], cursor: 1 });
    }

    #[test]
    fn test_into_parts_returns_collaborators() {
        let mut vm = create_test_vm(vec![literal(OpCode::Assign, 5), Instruction::new(OpCode::OutputNumber)]);
        vm.set_trace(true);
        run_to_end(&mut vm);
        let (_, output, _) = vm.into_parts();
        assert_eq!(output.contents(), "5");
    }
}
