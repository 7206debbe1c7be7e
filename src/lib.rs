pub mod engine;
pub mod ffi;

pub use engine::*;
