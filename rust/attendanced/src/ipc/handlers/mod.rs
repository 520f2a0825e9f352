pub mod backup;
pub mod class;
pub mod core;
pub mod export;
pub mod session;
pub mod settings;
pub mod students;
