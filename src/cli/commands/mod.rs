//! One module per `qvault` subcommand.

pub mod clear;
pub mod get;
pub mod init;
pub mod list;
pub mod passwd;
pub mod remove;
pub mod set;
