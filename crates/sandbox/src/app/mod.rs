//! Application layer: editor state machine, build-checks, and persistence.

pub mod check;
pub mod editor;
pub mod flash;
pub mod log;
pub mod mapper;
pub mod persist;
pub mod registry;
pub mod selection;
pub mod session;
pub mod workspace;
