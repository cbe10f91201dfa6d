pub mod dupes;
pub mod hash;
pub mod scan;
pub mod search;

pub use dupes::DupeOptions;
