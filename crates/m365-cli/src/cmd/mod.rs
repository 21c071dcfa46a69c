pub mod audit;
pub mod config;
pub mod health;
pub mod init_db;
pub mod mcp;
pub mod templates;
pub mod tools;
