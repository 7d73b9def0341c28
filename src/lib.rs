//! Interactive single-socket TCP controller
//!
//! A [`session::Session`] owns exactly one TCP descriptor, either connected
//! to a host or accepted from a listening port. The operator drives it one
//! command at a time through a [`dispatcher::Dispatcher`], and every socket
//! call comes back as an [`outcome::Outcome`] for [`render`] to print.

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod handle;
pub mod outcome;
pub mod render;
pub mod session;
pub mod signal;
pub mod transport;
