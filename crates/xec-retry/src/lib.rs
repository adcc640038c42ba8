//! Retry / timeout / cancellation wrapper (spec §4.7): wraps any adapter
//! call with bounded retries, a per-attempt deadline, and a cooperative
//! cancellation token.

mod policy;

pub use policy::{Observation, RetryRuntime};

#[cfg(test)]
mod tests;
