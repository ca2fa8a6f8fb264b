pub mod config;
pub mod defaults;
pub mod ident;
pub mod url;
