//! Upstream plumbing shared by the gateway and analytics services.
//!
//! A request arriving at one of the services is answered by:
//! 1. Issuing one or more bounded-timeout calls to record-store services
//!    ([`client::UpstreamClient`], [`dispatcher::Dispatcher`])
//! 2. Deciding what the collected outcomes mean for the caller
//!    ([`aggregator`]), joining related records ([`join`]) where needed
//! 3. Rolling up dependency liveness for health requests ([`health`])
//!
//! Nothing here holds state between requests.

pub mod aggregator;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod health;
pub mod join;
pub mod metrics_defs;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

pub use client::{Outcome, Reply, Upstream, UpstreamClient};
pub use errors::UpstreamError;
