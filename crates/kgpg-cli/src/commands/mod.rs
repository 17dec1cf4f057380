pub mod config;
pub mod ensure_tag;
pub mod index;
pub mod pack;
