//! ERP load template: typed form access and batch writer

pub mod form;
pub mod writer;

pub use writer::{OutputRow, output_rows, write_template};
