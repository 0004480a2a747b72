//! Colored terminal output for release runs
//!
//! Normal progress goes to stdout; failures, stage errors and the fatal
//! banner go to stderr so they survive output redirection.

use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    errwtr: BufferWriter,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.quiet)
    }
}

impl Default for OutputManager {
    fn default() -> Self {
        Self::new(false)
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            errwtr: BufferWriter::stderr(ColorChoice::Auto),
            quiet,
        }
    }

    fn emit(&self, to_stderr: bool, marker: &str, color: Color, bold: bool, message: &str) {
        let wtr = if to_stderr { &self.errwtr } else { &self.bufwtr };
        let mut buffer = wtr.buffer();
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold));
        let _ = write!(&mut buffer, "{marker}");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, " {message}");
        if wtr.print(&buffer).is_err() {
            // Last resort when the terminal is gone
            eprintln!("{marker} {message}");
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.emit(false, "ℹ", Color::Cyan, false, message);
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.emit(false, "✓", Color::Green, true, message);
        }
    }

    /// Print a progress message for a step about to run
    pub fn progress(&self, message: &str) {
        if !self.quiet {
            self.emit(false, "⋯", Color::Magenta, false, message);
        }
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        if !self.quiet {
            self.emit(true, "⚠", Color::Yellow, true, message);
        }
    }

    /// Print an error message (always shown)
    pub fn error(&self, message: &str) {
        self.emit(true, "✗", Color::Red, true, message);
    }

    /// Print a failure line prefixed with the tool stage, e.g. `[git]`
    pub fn stage_failure(&self, stage: &str, message: &str) {
        self.error(&format!("[{stage}] {message}"));
    }

    /// Report a command that a dry run skipped
    pub fn dry_run(&self, command: &str) {
        if !self.quiet {
            self.emit(false, "[dry-run]", Color::Blue, true, &format!("would run: {command}"));
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer);
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
        let _ = writeln!(&mut buffer, "═══ {title} ═══");
        let _ = buffer.reset();
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) {
        if !self.quiet {
            let mut buffer = self.bufwtr.buffer();
            let _ = writeln!(&mut buffer, "    {message}");
            let _ = self.bufwtr.print(&buffer);
        }
    }

    /// Print a plain message
    pub fn println(&self, message: &str) {
        if !self.quiet {
            let mut buffer = self.bufwtr.buffer();
            let _ = writeln!(&mut buffer, "{message}");
            let _ = self.bufwtr.print(&buffer);
        }
    }

    /// Print the boxed banner for failures past the publication boundary
    ///
    /// Never suppressed by quiet mode.
    pub fn fatal_banner(&self, title: &str, lines: &[String]) {
        let text = render_banner(title, lines);
        let mut buffer = self.errwtr.buffer();
        let _ = buffer.set_color(
            ColorSpec::new()
                .set_fg(Some(Color::White))
                .set_bg(Some(Color::Red))
                .set_bold(true),
        );
        let _ = write!(&mut buffer, "{text}");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer);
        if self.errwtr.print(&buffer).is_err() {
            eprintln!("{text}");
        }
    }
}

/// Box `title` and `lines` in a frame sized to the widest line
pub fn render_banner(title: &str, lines: &[String]) -> String {
    let width = std::iter::once(title.chars().count())
        .chain(lines.iter().map(|l| l.chars().count()))
        .max()
        .unwrap_or(0)
        + 4;
    let rule = "#".repeat(width + 2);
    let blank = format!("#{}#", " ".repeat(width));

    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&blank);
    out.push('\n');
    for line in std::iter::once(title).chain(lines.iter().map(String::as_str)) {
        let pad = width - 2 - line.chars().count();
        out.push_str(&format!("#  {line}{}#\n", " ".repeat(pad)));
    }
    out.push_str(&blank);
    out.push('\n');
    out.push_str(&rule);
    out
}
