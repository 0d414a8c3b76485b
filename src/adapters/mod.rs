//! Concrete adapter implementations of the port traits.

pub mod file_config_adapter;
pub mod csv_import_adapter;
pub mod csv_report_adapter;

#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
