pub mod args;
pub mod cli;
