pub mod folder_loader;
pub mod toml_loader;

pub use folder_loader::scan_upload_folder;
pub use toml_loader::load_policy_table;
