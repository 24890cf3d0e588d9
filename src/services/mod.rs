pub mod bot_init;
pub mod database;
pub mod memory_store;
pub mod panel_store;
