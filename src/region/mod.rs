pub mod region;
pub mod utility;

pub use region::{Region, UnreachableError};
pub use utility::{RegionUtility, TreeArc};
