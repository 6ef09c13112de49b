//! Collection of reusable TUI components.

pub mod command_palette;
pub mod dir_tree;
pub mod log_panel;
pub mod source_view;
