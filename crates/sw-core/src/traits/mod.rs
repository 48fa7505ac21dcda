//! Core trait definitions

mod prompt;
mod store;

pub use prompt::Prompter;
pub use store::PasswordStore;
