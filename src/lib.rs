//! Annotate redis-py command wrappers with the reply types documented on
//! redis.io.
//!
//! Parses a Python module, finds functions that return
//! `self.execute_command("CMD", ...)`, reads the reply section of each
//! command's documentation page, and rewrites the function's return
//! annotation to `ResponseT[...]`.

pub mod annotate;
pub mod classify;
pub mod docs;
pub mod error;
pub mod introspect;
pub mod label;
pub mod python;
pub mod report;
pub mod rewrite;
