//! Wisecow - fortune-telling cow over HTTP
//!
//! Answers every connection with a random fortune rendered by a cow.

pub mod config;
pub mod fortune;
pub mod http;
pub mod server;
