use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use crossterm::style::{Color, Stylize, style};
use reedline::{
    Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, Reedline, Signal,
};
use tracing::{debug, info};

use crate::shell::{Dispatch, Outcome, Registry};

/// Read-only settings handed to the loop at construction
#[derive(Debug, Clone)]
pub struct ReplConfig {
    pub name: &'static str,
    pub version: &'static str,
    pub tagline: &'static str,
    pub prompt: &'static str,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            name: "privacy-scrub",
            version: env!("CARGO_PKG_VERSION"),
            tagline: "Type 'help' for commands, 'exit' to quit.",
            prompt: "scrub> ",
        }
    }
}

/// Whether the loop should keep prompting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminated,
}

/// One read from the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// Ctrl+C at the prompt
    Interrupted,
    /// Ctrl+D or closed stdin
    EndOfInput,
}

/// Source of input lines for the loop
pub trait LineReader {
    fn read_line(&mut self, prompt: &ScrubPrompt) -> io::Result<Input>;
}

impl LineReader for Reedline {
    fn read_line(&mut self, prompt: &ScrubPrompt) -> io::Result<Input> {
        match Reedline::read_line(self, prompt)? {
            Signal::Success(line) => Ok(Input::Line(line)),
            Signal::CtrlC => Ok(Input::Interrupted),
            Signal::CtrlD => Ok(Input::EndOfInput),
        }
    }
}

/// Prompt shown by the line editor
pub struct ScrubPrompt {
    left: String,
}

impl ScrubPrompt {
    pub fn new(left: &str) -> Self {
        Self {
            left: left.to_string(),
        }
    }
}

impl Prompt for ScrubPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        // Use ANSI reset code to ensure white/default terminal color
        Cow::Owned(format!("\x1b[0m{}", self.left))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!("({}reverse search) ", prefix))
    }
}

/// Print an outcome, green for success and red for failure
pub fn print_outcome<W: Write>(out: &mut W, outcome: &Outcome) -> io::Result<()> {
    if outcome.message().is_empty() {
        return Ok(());
    }
    let color = if outcome.is_success() {
        Color::Green
    } else {
        Color::Red
    };
    writeln!(out, "{}", style(outcome.message()).with(color))
}

/// The interactive read-eval-print loop
pub struct Repl<'a, R: LineReader, W: Write> {
    registry: &'a Registry,
    config: ReplConfig,
    prompt: ScrubPrompt,
    reader: R,
    out: W,
    state: LoopState,
    interrupted: Arc<AtomicBool>,
}

impl<'a, R: LineReader, W: Write> Repl<'a, R, W> {
    pub fn new(registry: &'a Registry, config: ReplConfig, reader: R, out: W) -> Self {
        let prompt = ScrubPrompt::new(config.prompt);
        Self {
            registry,
            config,
            prompt,
            reader,
            out,
            state: LoopState::Running,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use `flag` to learn about interrupts delivered while a command runs
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Print the banner and loop until terminated
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.print_banner()?;

        while self.state == LoopState::Running {
            let input = self
                .reader
                .read_line(&self.prompt)
                .context("failed to read from terminal")?;
            self.step(input)?;
        }

        Ok(())
    }

    /// Handle one read from the terminal
    pub fn step(&mut self, input: Input) -> io::Result<()> {
        match input {
            Input::Line(line) => {
                if let Some(dispatch) = self.registry.dispatch_line(&line) {
                    match dispatch {
                        Dispatch::Completed(outcome) => print_outcome(&mut self.out, &outcome)?,
                        Dispatch::Terminate => self.terminate(false)?,
                    }
                }
                // SIGINT while the command ran
                if self.state == LoopState::Running && self.interrupted.swap(false, Ordering::SeqCst)
                {
                    self.terminate(true)?;
                }
            }
            Input::Interrupted => {
                writeln!(self.out, "^C")?;
                self.terminate(true)?;
            }
            Input::EndOfInput => self.terminate(true)?,
        }
        self.out.flush()
    }

    fn terminate(&mut self, acknowledge: bool) -> io::Result<()> {
        debug!("loop terminated");
        if acknowledge {
            writeln!(self.out, "Exiting...")?;
        }
        self.state = LoopState::Terminated;
        Ok(())
    }

    fn print_banner(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "{}",
            style(format!("{} v{}", self.config.name, self.config.version)).bold()
        )?;
        writeln!(self.out, "{}", self.config.tagline)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

/// Start an interactive session on the terminal
pub fn run(registry: &Registry, config: ReplConfig) -> anyhow::Result<()> {
    // Ctrl+C outside the line editor sets the flag instead of killing us
    let interrupted = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupted))
        .context("failed to install SIGINT handler")?;

    info!("starting interactive session");
    let mut repl = Repl::new(registry, config, Reedline::create(), io::stdout())
        .with_interrupt_flag(interrupted);
    repl.run()
}
