//! Domain models for the blueprint pipeline.
//!
//! # Core Concepts
//!
//! - [`Phase`]: one step of the fixed, linear pipeline from idea to user stories.
//! - [`Role`]: the specialist persona (Analyst, PM, Architect, PO/SM) that owns a phase.
//! - [`Session`]: one user's walk through the pipeline. Held in memory only.
//! - [`PhaseResult`]: the output generated for a phase, pending the user's [`Decision`].
//! - [`FeedbackEntry`]: append-only log of the review loop.
//! - [`Artifact`]: an approved phase output, fed into later phases.

mod feedback;
mod phase;
mod result;
mod role;
mod session;

pub use feedback::*;
pub use phase::*;
pub use result::*;
pub use role::*;
pub use session::*;
