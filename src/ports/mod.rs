//! Port traits: the collaborators the domain consumes but does not implement.

pub mod config_port;
pub mod data_port;
pub mod report_port;
