//! CLI command implementations

mod encryption;
mod login;
mod master;

pub use encryption::{check_command, decrypt_command, encrypt_command, status_message};
pub use login::{load_tree, login_command, pick_profile};
pub use master::{
    change_master_password, forget_master_password, open_gate, remove_master_password,
    set_master_password,
};
