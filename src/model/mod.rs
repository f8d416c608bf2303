pub mod common;
pub mod course;
pub mod group;
pub mod student;

pub use common::*;
pub use course::*;
pub use group::*;
pub use student::*;
