pub mod alert_overlay;
pub mod config_overlay;
pub mod dialog;
pub mod footer;
pub mod header;
pub mod menu_popover;
pub mod render;
pub mod run_table;
pub mod spinner;
pub mod startup;
