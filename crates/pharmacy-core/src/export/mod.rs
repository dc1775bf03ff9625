//! Export of the catalog as CSV.

mod catalog;

pub use catalog::*;
