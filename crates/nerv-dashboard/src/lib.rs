#![deny(unsafe_op_in_unsafe_fn)]
// Library interface for the dashboard so pages, layout and the app loop can
// be tested without the panel or GPIO attached.

pub mod app;
pub mod cli;
pub mod config;
pub mod frame;
pub mod input;
pub mod pages;
pub mod palette;
pub mod panel;
pub mod sun;
pub mod ui;
