//! Query routing, lookup orchestration and result rendering for the
//! `pagemeta` launcher command.

pub mod command;
pub mod feedback;
pub mod workflow;

pub use command::Command;
pub use feedback::{Feedback, Item};
pub use workflow::{LookupError, Workflow};
