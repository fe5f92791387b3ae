//! Record loading from warehouse receipt exports

pub mod records;
pub mod table;

pub use records::{InputRecord, load_records};
pub use table::{Table, read_table};
