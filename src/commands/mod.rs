//! CLI commands

pub mod cart;
pub mod checkout;
pub mod clean;
pub mod generate;
pub mod init;
pub mod list;
pub mod new;
