use crate::assembler::assemble;
use crate::lexer::SourceMap;
use crate::listing::ProgramListing;
use alpha::{BufferedOutput, Halt, NullObserver, Program, Runtime, RuntimeConfig, TextInput};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "alpha-lang", version, about = "Assemble, inspect and run Alpha programs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Per-instruction tracing was requested
    pub fn trace(&self) -> bool {
        matches!(self.command, Commands::Run { trace: true, .. })
    }
}

/// Where the `I` register reads from
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Text fed to the program's input
    #[arg(long, conflicts_with = "input_file")]
    pub input: Option<String>,

    /// File whose contents are fed to the program's input
    #[arg(long)]
    pub input_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble and run a program
    Run {
        file: PathBuf,

        #[command(flatten)]
        input_args: InputArgs,

        /// Milliseconds between scheduling ticks
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        tick_ms: u64,

        /// Instructions executed per tick
        #[arg(long, default_value_t = 1000, value_parser = parse_steps_per_tick)]
        steps_per_tick: usize,

        /// Stop after this many instructions
        #[arg(long)]
        max_steps: Option<u64>,

        /// Run straight through breakpoints without reporting them
        #[arg(long)]
        ignore_breakpoints: bool,

        /// Log every executed instruction
        #[arg(long)]
        trace: bool,
    },
    /// Assemble only and report errors
    Check { file: PathBuf },
    /// Print the assembled program
    Dump {
        file: PathBuf,

        /// Emit JSON instead of a text table
        #[arg(long, conflicts_with = "source")]
        json: bool,

        /// Emit canonical source that assembles back to the same program
        #[arg(long)]
        source: bool,
    },
    /// Step through a program interactively
    Debug {
        file: PathBuf,

        #[command(flatten)]
        input_args: InputArgs,

        /// Instructions a single `continue` may execute
        #[arg(long, default_value_t = 1_000_000)]
        max_steps: usize,
    },
}

fn parse_steps_per_tick(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(steps) => Ok(steps),
        Err(e) => Err(e.to_string()),
    }
}

/// How `dump` prints a program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingFormat {
    Text,
    Json,
    Source,
}

impl ListingFormat {
    fn from_flags(json: bool, source: bool) -> Self {
        match (json, source) {
            (true, _) => ListingFormat::Json,
            (false, true) => ListingFormat::Source,
            (false, false) => ListingFormat::Text,
        }
    }
}

/// Commands accepted by the interactive debugger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugCommand {
    Step(usize),
    Continue,
    Status,
    List,
    Reset,
    Quit,
    Help,
}

impl FromStr for DebugCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        // A bare return steps once
        let command = match parts.next().unwrap_or("step") {
            "s" | "step" => {
                let count = match parts.next() {
                    Some(count) => count
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid step count '{}'", count))?,
                    None => 1,
                };
                DebugCommand::Step(count)
            }
            "c" | "continue" => DebugCommand::Continue,
            "st" | "status" => DebugCommand::Status,
            "l" | "list" => DebugCommand::List,
            "r" | "reset" => DebugCommand::Reset,
            "q" | "quit" | "exit" => DebugCommand::Quit,
            "h" | "help" | "?" => DebugCommand::Help,
            other => return Err(format!("Unknown command '{}', try 'help'", other)),
        };

        match parts.next() {
            Some(extra) => Err(format!("Unexpected argument '{}'", extra)),
            None => Ok(command),
        }
    }
}

const DEBUG_HELP: &str = "\
step [n]   execute n instructions (default 1)
continue   run until a breakpoint or the end
status     show accumulator, stack and index
list       show the program with the current position
reset      rewind the program and its input
quit       leave the debugger
";

/// Runs the command-line commands
pub struct CliHandler;

impl Default for CliHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CliHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn handle(&self, cli: Cli) -> Result<()> {
        match cli.command {
            Commands::Run {
                file,
                input_args,
                tick_ms,
                steps_per_tick,
                max_steps,
                ignore_breakpoints,
                trace,
            } => {
                let program = self.load_program(&file).await?;
                let input = self.load_input(&input_args).await?;
                let config = RuntimeConfig::new()
                    .with_trace(trace)
                    .with_stop_at_breakpoints(!ignore_breakpoints)
                    .with_step_limit(max_steps)
                    .with_steps_per_tick(steps_per_tick);

                let mut stdout = tokio::io::stdout();
                let halt = self
                    .run_program(program, input, config, Duration::from_millis(tick_ms), &mut stdout)
                    .await?;
                match halt {
                    Halt::StepLimit => eprintln!("Stopped: step limit reached"),
                    Halt::Paused => eprintln!("Stopped: interrupted"),
                    _ => {}
                }
                Ok(())
            }
            Commands::Check { file } => {
                let program = self.load_program(&file).await?;
                println!(
                    "{}: ok ({} instructions, {} tags)",
                    file.display(),
                    program.len(),
                    program.tags().len()
                );
                Ok(())
            }
            Commands::Dump { file, json, source } => {
                let program = self.load_program(&file).await?;
                let format = ListingFormat::from_flags(json, source);
                print!("{}", self.render_listing(&program, format)?);
                Ok(())
            }
            Commands::Debug {
                file,
                input_args,
                max_steps,
            } => {
                let program = self.load_program(&file).await?;
                let input = self.load_input(&input_args).await?;
                let stdin = BufReader::new(tokio::io::stdin());
                let mut stdout = tokio::io::stdout();
                self.debug_session(program, input, max_steps, stdin, &mut stdout)
                    .await
            }
        }
    }

    /// Read and assemble a source file
    pub async fn load_program(&self, path: &Path) -> Result<Program> {
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        assemble(&source).map_err(|e| match e.position() {
            Some(position) => {
                let location = SourceMap::new(&source).locate(position);
                anyhow!("{}:{}: {}", path.display(), location, e)
            }
            None => anyhow!("{}: {}", path.display(), e),
        })
    }

    pub async fn load_input(&self, args: &InputArgs) -> Result<TextInput> {
        if let Some(path) = &args.input_file {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read input file {}", path.display()))?;
            return Ok(TextInput::new(&text));
        }
        Ok(TextInput::new(args.input.as_deref().unwrap_or("")))
    }

    pub fn render_listing(&self, program: &Program, format: ListingFormat) -> Result<String> {
        let listing = ProgramListing::from_program(program);
        match format {
            ListingFormat::Text => Ok(listing.to_string()),
            ListingFormat::Json => Ok(format!("{}\n", listing.to_json()?)),
            ListingFormat::Source => Ok(format!("{}\n", listing.to_source())),
        }
    }

    /// Run on a timer, one tick of instructions per interval, until the
    /// program finishes, the step limit is hit or Ctrl-C arrives.
    /// Breakpoints print the machine state to stderr and the run carries on.
    pub async fn run_program<W: AsyncWrite + Unpin>(
        &self,
        program: Program,
        input: TextInput,
        config: RuntimeConfig,
        tick: Duration,
        out: &mut W,
    ) -> Result<Halt> {
        let mut runtime =
            Runtime::with_config(program, input, BufferedOutput::new(), NullObserver, config)?;
        let mut interval = tokio::time::interval(tick);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    Self::drain_output(&mut runtime, out).await?;
                    tracing::debug!(steps = runtime.steps(), "interrupted");
                    return Ok(Halt::Paused);
                }
                _ = interval.tick() => {
                    let halt = runtime.tick()?;
                    Self::drain_output(&mut runtime, out).await?;
                    match halt {
                        None => {}
                        Some(Halt::Breakpoint(state)) => {
                            eprintln!("Breakpoint: {}", state);
                            runtime.resume();
                        }
                        Some(halt) => {
                            tracing::debug!(steps = runtime.steps(), ?halt, "run stopped");
                            return Ok(halt);
                        }
                    }
                }
            }
        }
    }

    /// Line-driven debugger over `reader`, writing to `out`
    pub async fn debug_session<R, W>(
        &self,
        program: Program,
        input: TextInput,
        max_steps: usize,
        reader: R,
        out: &mut W,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let listing = ProgramListing::from_program(&program);
        let mut runtime = Runtime::new(program, input, BufferedOutput::new(), NullObserver);
        let mut lines = reader.lines();

        let banner = format!(
            "{} instructions loaded, type 'help' for commands",
            listing.instructions.len()
        );
        Self::write_line(out, &banner).await?;

        loop {
            out.write_all(b"(alpha) ").await?;
            out.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let command = match line.parse::<DebugCommand>() {
                Ok(command) => command,
                Err(message) => {
                    Self::write_line(out, &message).await?;
                    continue;
                }
            };

            match command {
                DebugCommand::Step(count) => {
                    for _ in 0..count {
                        if runtime.is_finished() {
                            break;
                        }
                        let step = runtime.step()?;
                        if step.breakpoint {
                            Self::write_line(out, &format!("Breakpoint at {}", step.index)).await?;
                        }
                    }
                    Self::drain_debug_output(&mut runtime, out).await?;
                    Self::write_status(&runtime, out).await?;
                }
                DebugCommand::Continue => {
                    runtime.resume();
                    let halt = runtime.run_for(max_steps)?;
                    Self::drain_debug_output(&mut runtime, out).await?;
                    let message = match halt {
                        Some(Halt::Finished) => "Program finished".to_string(),
                        Some(Halt::Breakpoint(state)) => format!("Breakpoint: {}", state),
                        Some(Halt::StepLimit) | Some(Halt::Paused) | None => {
                            format!("Stopped after {} steps", max_steps)
                        }
                    };
                    Self::write_line(out, &message).await?;
                }
                DebugCommand::Status => Self::write_status(&runtime, out).await?,
                DebugCommand::List => {
                    let text = listing.render_with_marker(runtime.state().cursor);
                    out.write_all(text.as_bytes()).await?;
                }
                DebugCommand::Reset => {
                    runtime.reset();
                    runtime.vm_mut().input_mut().reset();
                    Self::write_line(out, "Program reset").await?;
                }
                DebugCommand::Quit => break,
                DebugCommand::Help => out.write_all(DEBUG_HELP.as_bytes()).await?,
            }
        }

        out.flush().await?;
        Ok(())
    }

    async fn drain_output<W: AsyncWrite + Unpin>(runtime: &mut Runtime, out: &mut W) -> Result<()> {
        let text = runtime.vm_mut().output_mut().take();
        if !text.is_empty() {
            out.write_all(text.as_bytes()).await?;
            out.flush().await?;
        }
        Ok(())
    }

    async fn drain_debug_output<W: AsyncWrite + Unpin>(
        runtime: &mut Runtime,
        out: &mut W,
    ) -> Result<()> {
        let text = runtime.vm_mut().output_mut().take();
        if !text.is_empty() {
            Self::write_line(out, &format!("Output: {}", text)).await?;
        }
        Ok(())
    }

    async fn write_status<W: AsyncWrite + Unpin>(runtime: &Runtime, out: &mut W) -> Result<()> {
        let suffix = if runtime.is_finished() { " (finished)" } else { "" };
        Self::write_line(out, &format!("{}{}", runtime.state(), suffix)).await
    }

    async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, line: &str) -> Result<()> {
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        Ok(())
    }
}
