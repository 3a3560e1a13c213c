//! Infrastructure layer: storage, wire formats and real-time fan-out.

pub mod dto;
pub mod realtime;
pub mod repository;
