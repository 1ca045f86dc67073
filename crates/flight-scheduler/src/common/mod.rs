pub mod arraydef;
pub mod arrayparser;
pub mod config;
pub mod error;
pub mod nodecount;
pub mod parser;
pub mod setup;
pub mod validation;
