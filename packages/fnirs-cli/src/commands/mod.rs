pub mod process;
pub mod regions;
pub mod validate;
