//! Proxy module for outbound request routing
//!
//! This module contains:
//! - Proxy endpoint parsing (`ip:port:username:password`)
//! - Proxy list loading from a URL or file
//! - Liveness probing of candidates
//! - The shared, self-reloading proxy pool

mod endpoint;
mod pool;
mod probe;
mod source;

pub use endpoint::ProxyEndpoint;
pub use pool::ProxyPool;
pub use probe::{HttpProbe, ProxyProbe};
pub use source::{parse_candidates, ProxySource};

use crate::config::ProxyConfig;
use std::sync::Arc;
use std::time::Duration;

/// Builds a pool from configuration, using the HTTP liveness probe
///
/// The pool is returned unloaded; call [`ProxyPool::load`] to validate the
/// list up front.
pub fn pool_from_config(config: &ProxyConfig) -> ProxyPool {
    let probe = HttpProbe::new(
        &config.probe_url,
        Duration::from_secs(config.probe_timeout_secs),
    );
    ProxyPool::new(
        ProxySource::from_config(config),
        Arc::new(probe),
        config.validate_workers,
    )
}
