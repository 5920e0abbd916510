//! Terminal output: right-aligned status lines and a resolve spinner.
//!
//! Everything goes to stderr so `poise show --json` keeps stdout clean.

use std::io::Write;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

const LABEL_WIDTH: usize = 12;

fn emit(style: Style, label: &str, message: &str) {
    let _ = writeln!(
        std::io::stderr(),
        "{:>width$} {message}",
        style.apply_to(label),
        width = LABEL_WIDTH
    );
}

/// An action that happened: `      Locked 19 packages for web-service v0.3.0`.
pub fn status(label: &str, message: &str) {
    emit(Style::new().green().bold(), label, message);
}

/// A note that changes nothing on disk.
pub fn status_info(label: &str, message: &str) {
    emit(Style::new().cyan().bold(), label, message);
}

pub fn status_warn(label: &str, message: &str) {
    emit(Style::new().yellow().bold(), label, message);
}

/// A ticking spinner for work of unknown length, such as a resolve.
/// Returns a hidden bar when stderr is not a terminal; finish it with
/// [`ProgressBar::finish_and_clear`].
pub fn spinner(message: &str) -> ProgressBar {
    if !console::Term::stderr().is_term() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}
