//! Test suites for the scopelink client runtime.

mod support;
