pub mod locator;
pub mod path;
pub mod tree;
