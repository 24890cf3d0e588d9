pub mod config;
pub mod macros;
pub mod panel_models;
