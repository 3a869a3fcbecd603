//! classpoll library
//!
//! Server side of a live classroom poll: one teacher, many students and a
//! single shared poll, coordinated over WebSockets. The session core lives in
//! [`session`] and [`polls`]; [`broadcast`] fans events out to connections
//! and [`server`] exposes them over axum.

pub mod broadcast;
pub mod cli;
pub mod config;
pub mod logging;
pub mod polls;
pub mod server;
pub mod session;
