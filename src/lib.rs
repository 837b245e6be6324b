pub mod cli;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod init;
pub mod keys;
pub mod storage;

#[cfg(test)]
mod test_fixtures;
