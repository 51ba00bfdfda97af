// Cache module for Conduit responses.
// Content-addressed storage keyed by request fingerprint so repeat runs skip the network.

#![allow(dead_code, unused_imports)]

pub mod fingerprint;
pub mod paths;
pub mod store;

pub use fingerprint::{RequestFingerprint, fingerprint};
pub use paths::default_cache_dir;
pub use store::{DiskCache, MemoryCache, ResponseCache};
