//! Local collaborator implementations for firebreakd
//!
//! - [`TokioScheduler`]: one-shot named timers backed by tokio sleep
//!   tasks. Suitable for a continuously running daemon; a deployment
//!   with an OS-level timer facility would implement the same trait
//!   against that facility instead.
//! - [`FileRules`]: materializes the declarative rule set as a JSON
//!   file replaced atomically, for an external matcher to consume.

mod rules_file;
mod scheduler;

pub use rules_file::*;
pub use scheduler::*;
