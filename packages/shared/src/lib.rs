//! Shared utilities for the Navbat server and client.

pub mod logger;
pub mod time;
