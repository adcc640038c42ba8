//! The SSH adapter: connection pool, channel-per-exec execution, file
//! transfer, and keep-alive (spec §4.4).

mod adapter;
mod auth;
mod connection;
mod exec;
mod pool;
mod sftp;

pub use adapter::SshAdapter;
pub use pool::{PoolStats, SshPool};

#[cfg(test)]
mod tests;
