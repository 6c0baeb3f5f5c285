//! Collaborator trait interfaces for firebreakd
//!
//! The core computes *what* should happen; these traits are the seams to
//! the mechanisms that make it happen:
//! - [`WakeupScheduler`]: one-shot named timers that outlive the process
//! - [`RuleEngine`]: the declarative request-blocking rule set
//!
//! Mock implementations with failure injection ([`MockScheduler`],
//! [`MockRules`]) back the unit and integration tests.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
