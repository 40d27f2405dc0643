//! Operator-facing console.
//!
//! The pipeline only ever talks to the `Console` trait: it prints messages and
//! reads single lines. `TerminalConsole` draws the boxed banners on a real
//! terminal; tests substitute a scripted console.

use crossterm::style::{Color, Stylize};
use std::io::{self, BufRead, Write};

/// Kind of message, which decides how it is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    /// Numbered step header
    Step,
    /// Short green confirmation after a step completes
    Done,
    Warning,
    Error,
    Success,
}

/// A line of operator output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

impl Message {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Info, text)
    }

    pub fn step(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Step, text)
    }

    pub fn done(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Done, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Success, text)
    }
}

/// Presentation collaborator used by the pipeline
pub trait Console {
    fn print(&mut self, message: Message);

    /// Read one line after showing `prompt`. `None` means input was closed.
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// Answer to a yes/no/cancel question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    Cancel,
}

/// Ask until the operator answers `y`, `n` or `cancel` (case-insensitive).
/// Closed input counts as `Cancel`.
pub fn ask_confirmation(console: &mut dyn Console, question: &str) -> Confirmation {
    let prompt = format!("{} (y/n/cancel): ", question);
    loop {
        let Some(input) = console.read_line(&prompt) else {
            return Confirmation::Cancel;
        };

        match input.trim().to_ascii_lowercase().as_str() {
            "y" => return Confirmation::Yes,
            "n" => return Confirmation::No,
            "cancel" => return Confirmation::Cancel,
            _ => console.print(Message::error("INVALID INPUT!")),
        }
    }
}

/// Ask for free text. Blank or closed input cancels.
pub fn ask_text(console: &mut dyn Console, prompt: &str) -> Option<String> {
    let prompt = format!("{} (leave blank to cancel): ", prompt);
    console
        .read_line(&prompt)
        .filter(|input| !input.trim().is_empty())
}

const BANNER_WIDTH: usize = 70;

/// Console on stdin/stdout with boxed, coloured banners
pub struct TerminalConsole<R = io::StdinLock<'static>, W = io::Stdout> {
    input: R,
    output: W,
    color: bool,
}

impl TerminalConsole {
    pub fn stdio() -> Self {
        Self {
            input: io::stdin().lock(),
            output: io::stdout(),
            color: true,
        }
    }
}

impl<R: BufRead, W: Write> TerminalConsole<R, W> {
    /// Console over arbitrary streams, without colour
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            color: false,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn write_banner(&mut self, title: &str, text: &str, color: Color) -> io::Result<()> {
        let border = "*".repeat(BANNER_WIDTH + 8);
        let mut lines = vec![
            border.clone(),
            format!("*{:^width$}*", title, width = BANNER_WIDTH + 6),
            format!("*{}*", " ".repeat(BANNER_WIDTH + 6)),
        ];
        for line in wrap(text, BANNER_WIDTH) {
            lines.push(format!("*   {:<width$}   *", line, width = BANNER_WIDTH));
        }
        lines.push(format!("*{}*", " ".repeat(BANNER_WIDTH + 6)));
        lines.push(border);

        writeln!(self.output)?;
        for line in lines {
            let painted = self.paint(&line, color);
            writeln!(self.output, "{}", painted)?;
        }
        writeln!(self.output)
    }

    fn write_message(&mut self, message: &Message) -> io::Result<()> {
        match message.kind {
            MessageKind::Info => writeln!(self.output, "{}", message.text),
            MessageKind::Done => {
                let painted = self.paint(&message.text, Color::Green);
                writeln!(self.output, "{}", painted)
            }
            MessageKind::Step => {
                let rule = "*".repeat(message.text.chars().count());
                writeln!(self.output)?;
                writeln!(self.output, "{}", rule)?;
                writeln!(self.output, "{}", message.text)?;
                writeln!(self.output, "{}", rule)?;
                writeln!(self.output)
            }
            MessageKind::Warning => self.write_banner("WARNING", &message.text, Color::Yellow),
            MessageKind::Error => self.write_banner("ERROR", &message.text, Color::Red),
            MessageKind::Success => self.write_banner("SUCCESS", &message.text, Color::Green),
        }
    }
}

impl<R: BufRead, W: Write> Console for TerminalConsole<R, W> {
    fn print(&mut self, message: Message) {
        if let Err(e) = self.write_message(&message).and_then(|_| self.output.flush()) {
            tracing::warn!("Failed to write to console: {}", e);
        }
    }

    fn read_line(&mut self, prompt: &str) -> Option<String> {
        let _ = write!(self.output, "{}", prompt);
        let _ = self.output.flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                tracing::warn!("Failed to read operator input: {}", e);
                None
            }
        }
    }
}

/// Greedy word wrap. Words longer than `width` are split with a trailing hyphen.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();

        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(width - 1).collect();
            lines.push(format!("{}-", head));
            word = word.chars().skip(width - 1).collect();
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
