pub mod classification;
pub mod enums;
pub mod extraction;

pub use classification::*;
pub use enums::*;
pub use extraction::*;
