//! Command implementations that are not plain engine calls.

pub mod init;
