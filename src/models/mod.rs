pub mod permit;

pub use permit::*;
