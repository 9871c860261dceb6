//! Console output for the yabrc CLI.
//!
//! - Dimmed colors for routine messages
//! - Verbosity control (quiet, normal, verbose)
//! - Yes/no confirmation prompts

use colored::Colorize;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicU8, Ordering};

/// Verbosity level for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Suppress informational messages, show only warnings and errors.
    Quiet = 0,
    /// Default verbosity level, show all standard messages.
    Normal = 1,
    /// Show verbose debug messages in addition to standard output.
    Verbose = 2,
}

/// Global verbosity setting (default: Normal).
static VERBOSITY: AtomicU8 = AtomicU8::new(1);

/// Sets the global verbosity level for all output functions.
pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

/// Gets the current global verbosity level.
pub fn get_verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        2 => Verbosity::Verbose,
        _ => Verbosity::Normal,
    }
}

/// Prints a success message in green (respects quiet mode).
pub fn success(message: &str) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }
    eprintln!("{}", message.green());
}

/// Prints an informational message in dimmed color (respects quiet mode).
pub fn info(message: &str) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }
    eprintln!("{}", message.dimmed());
}

/// Prints a git-style action message with dimmed verb and normal message.
pub fn action(verb: &str, message: &str) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }
    eprintln!("{} {}", verb.dimmed().bold(), message);
}

/// Asks `prompt` on `writer` until the answer read from `reader` starts with
/// `y` or `n`, ignoring case.
///
/// End of input and read errors count as "no".
pub fn confirm<R: BufRead, W: Write>(prompt: &str, reader: &mut R, writer: &mut W) -> bool {
    let mut answer = String::new();
    loop {
        if write!(writer, "{prompt}? (y/n) ").and_then(|()| writer.flush()).is_err() {
            return false;
        }

        answer.clear();
        match reader.read_line(&mut answer) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }

        let answer = answer.trim().to_lowercase();
        if answer.starts_with('y') {
            return true;
        }
        if answer.starts_with('n') {
            return false;
        }
    }
}

/// [`confirm`] on the process stdin and stdout.
pub fn confirm_stdin(prompt: &str) -> bool {
    confirm(prompt, &mut std::io::stdin().lock(), &mut std::io::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    #[test]
    fn test_verbosity_round_trip() {
        let levels = [Verbosity::Quiet, Verbosity::Normal, Verbosity::Verbose];
        for level in &levels {
            set_verbosity(*level);
            assert_eq!(get_verbosity(), *level);
        }
        set_verbosity(Verbosity::Normal);
    }

    #[rstest]
    #[case("y\n", true)]
    #[case("Yes\n", true)]
    #[case("  YEP  \n", true)]
    #[case("n\n", false)]
    #[case("NO\n", false)]
    #[case("maybe\n\nyes\n", true)]
    #[case("what\nnope\n", false)]
    #[case("", false)]
    #[case("huh", false)]
    fn test_confirm(#[case] input: &str, #[case] expected: bool) {
        let mut reader = Cursor::new(input.as_bytes());
        let mut out = Vec::new();
        assert_eq!(confirm("save Index", &mut reader, &mut out), expected);
        assert!(String::from_utf8(out).unwrap().starts_with("save Index? (y/n) "));
    }

    #[test]
    fn test_confirm_reprompts() {
        let mut reader = Cursor::new("x\ny\n".as_bytes());
        let mut out = Vec::new();
        assert!(confirm("move", &mut reader, &mut out));
        assert_eq!(String::from_utf8(out).unwrap(), "move? (y/n) move? (y/n) ");
    }
}
