//! Library half of the `ngmigrate` binary: config discovery and the notice text.

pub mod config;
pub mod notice;
