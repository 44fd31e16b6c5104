//! Decision engine
//!
//! Composes scope matching, address resolution and classification into a
//! per-request [`Verdict`]. [`FilterChain`] runs several filters as one stage.

pub mod chain;
pub mod decision;

pub use chain::FilterChain;
pub use decision::{ClassificationSource, Decision, FilterConfig, Rule, Verdict};
