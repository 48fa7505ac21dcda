//! Output formatting utilities for the CLI

use std::io::Write;

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

use sw_core::Profile;

/// One picker row: `name(alias) user@host`
///
/// The alias part is omitted when empty, the address part unless the
/// profile shows its host.
pub fn format_profile_line(profile: &Profile) -> String {
    let mut line = profile.name.clone();
    if !profile.alias.is_empty() {
        line.push_str(&format!("({})", profile.alias));
    }
    if let Some(host) = profile.masked_host().filter(|h| !h.is_empty()) {
        line.push(' ');
        if !profile.user.is_empty() {
            line.push_str(&format!("{}@", profile.user));
        }
        line.push_str(&host);
    }
    line
}

fn print_marked(out: &mut impl Write, color: Color, mark: &str, msg: &str) {
    let _ = crossterm::execute!(
        out,
        SetForegroundColor(color),
        Print(mark),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a success message in green to stdout
pub fn print_success(msg: &str) {
    print_marked(&mut std::io::stdout(), Color::Green, "✓ ", msg);
}

/// Print an error message in red to stderr
pub fn print_error(msg: &str) {
    print_marked(&mut std::io::stderr(), Color::Red, "✗ ", msg);
}

/// Print a warning message in yellow to stderr
pub fn print_warning(msg: &str) {
    print_marked(&mut std::io::stderr(), Color::Yellow, "⚠ ", msg);
}

/// Print an informational message in cyan to stdout
pub fn print_info(msg: &str) {
    print_marked(&mut std::io::stdout(), Color::Cyan, "ℹ ", msg);
}
