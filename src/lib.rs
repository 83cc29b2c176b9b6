//! Client-side session logic for playing an endgame against a remote
//! rules/solving engine.

pub mod client;
pub mod config;
pub mod error;
pub mod position;
pub mod remote;
pub mod session;
pub mod util;

pub use client::{Completion, Confirm, GameClient, Notice, Pending};
pub use error::SessionError;
