pub mod dates;
pub mod pagination;

pub use dates::*;
pub use pagination::Pagination;
