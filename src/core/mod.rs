//! Core dashboard machinery: state, events, the render loop and terminal mode

pub mod app;
pub mod controller;
pub mod events;
pub mod state;
pub mod terminal;
