//! Name generation for ephemeral containers (spec §4.5 "Ephemeral
//! containers"): `<prefix>-<counter>-<random6>`, unique enough to avoid
//! collisions across concurrent handles without needing a central registry.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::distr::{Alphanumeric, SampleString};

static COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn generate_name(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let suffix = Alphanumeric.sample_string(&mut rand::rng(), 6).to_lowercase();
    format!("{prefix}-{n}-{suffix}")
}
