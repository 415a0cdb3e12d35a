pub mod display;
pub mod parsers;

pub use display::*;
pub use parsers::*;
