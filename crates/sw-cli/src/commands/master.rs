//! Master password commands

use std::sync::Arc;

use anyhow::{Context, Result};

use sw_core::masterkey::{self, MasterPasswordGate};
use sw_core::prompt::TerminalPrompter;

use crate::output::print_success;

/// Gate over the host's password store, prompting on the terminal
pub fn open_gate() -> Result<MasterPasswordGate> {
    let store = masterkey::select_store().context("Failed to open password store")?;
    let gate = MasterPasswordGate::new(store, Arc::new(TerminalPrompter));
    tracing::debug!("Using {} master password store", gate.store_name());
    Ok(gate)
}

pub fn set_master_password(gate: &MasterPasswordGate) -> Result<()> {
    gate.set_master_password()
        .context("Failed to set master password")?;
    print_success("Master password set");
    Ok(())
}

pub fn change_master_password(gate: &MasterPasswordGate) -> Result<()> {
    gate.change_master_password()
        .context("Failed to change master password")?;
    print_success("Master password changed");
    Ok(())
}

pub fn remove_master_password(gate: &MasterPasswordGate) -> Result<()> {
    gate.remove_master_password()
        .context("Failed to remove master password")?;
    print_success("Master password removed");
    Ok(())
}

/// Drop the cached master password; the next unlock prompts again
pub fn forget_master_password(gate: &MasterPasswordGate) -> Result<()> {
    gate.invalidate_cache()
        .context("Failed to clear cached master password")?;
    print_success("Cached master password cleared");
    Ok(())
}
