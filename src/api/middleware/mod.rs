//! HTTP middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Audit logger: sees every response, including gatekeeper redirects
//! 2. Edge gatekeeper: headers + session gate on protected paths
//! 3. Session requirement: JSON API only, 401 instead of redirect

pub mod audit;
pub mod gatekeeper;
pub mod session;
