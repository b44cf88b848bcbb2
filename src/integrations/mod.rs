//! External services the dashboard talks to

pub mod api;
