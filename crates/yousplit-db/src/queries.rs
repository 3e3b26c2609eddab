//! Database query functions organized by domain.

pub mod history;
pub mod pool;
pub mod settings;
