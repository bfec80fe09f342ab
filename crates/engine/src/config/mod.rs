mod loader;
mod schema;

pub use loader::{
    apply_overrides, default_config_path, load_from_file, load_from_str, read_from_file,
    read_from_str, LoadError, RULES_DIR_ENV, SERVER_ENV,
};
pub use schema::EngineConfig;
