//! Turnstile - Request Admission Control Engine
//!
//! This crate implements the per-identifier, multi-policy rate limiter that
//! guards the document-formatting API. Request handlers resolve each caller
//! to a stable identifier, name the policy for their endpoint class, and
//! enforce the returned decision; counters live in process with no external
//! coordination service, with a pluggable store seam for a future
//! distributed backend.

pub mod config;
pub mod error;
pub mod ratelimit;
