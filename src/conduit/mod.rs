// Conduit API module.
// Provides the caching client, wire types and the two paginated endpoints used for reports.

#![allow(dead_code, unused_imports)]

pub mod client;
pub mod feed;
pub mod transactions;
pub mod transport;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use client::{Conduit, ConduitClient};
pub use feed::FeedPaginator;
pub use transactions::CommentPaginator;
pub use transport::{HttpTransport, Transport};
pub use types::*;
