pub mod execute;
pub mod flatpak_builder;
