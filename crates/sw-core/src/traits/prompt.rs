//! Terminal prompting trait

use std::io;

use zeroize::Zeroizing;

/// Source of interactive answers
///
/// The master password gate and keyboard-interactive authentication read
/// through this seam so they can run without a terminal.
pub trait Prompter: Send + Sync {
    /// Read a secret without echoing it
    fn read_secret(&self, prompt: &str) -> io::Result<Zeroizing<String>>;

    /// Read one echoed line, without its trailing newline
    fn read_line(&self, prompt: &str) -> io::Result<String>;
}
