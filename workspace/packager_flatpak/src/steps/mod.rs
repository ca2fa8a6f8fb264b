pub mod clean_builder_cache;
