pub mod product;
pub mod summary;
