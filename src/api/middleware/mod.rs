//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Auth validator: bearer token → `Principal`
//! 2. Audit logger: logs after auth, has the account
//! 3. Role gate: per endpoint group

pub mod audit;
pub mod auth;
