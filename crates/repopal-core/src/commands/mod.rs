pub mod add_license;
pub mod find_replace;
pub mod hello_world;
