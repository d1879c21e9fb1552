//! Test suites for scopelink servers.

mod dispatch_behaviour;
mod router_behaviour;
mod support;
