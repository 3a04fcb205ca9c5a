pub mod catalog_file;
pub(crate) mod env;
pub mod image;
pub mod key_selection;
pub mod reference_file;
