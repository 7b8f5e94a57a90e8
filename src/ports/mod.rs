//! Port traits: the narrow capabilities collaborators program against.

pub mod config_port;
pub mod indexed_access;
pub mod record_cursor;
pub mod size_query;
