/// Database connection and schema creation
pub mod database;

/// Settings loaded from stockroom.toml and the environment
pub mod settings;
