pub mod file_on_database;
pub mod file_on_file_system;
