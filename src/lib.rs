pub mod dsl;
pub mod geometry;
pub mod logging;
pub mod pdf;
pub mod shader;
