// src/control/mod.rs

//! Local control channel: add, remove and list watches, stop the daemon.

pub mod client;
pub mod handler;
pub mod protocol;
pub mod server;

pub use client::send_request;
pub use handler::handle_request;
pub use protocol::{Request, Response};
pub use server::ControlServer;
