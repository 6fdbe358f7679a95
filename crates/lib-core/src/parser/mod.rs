pub mod markers;
pub mod segments;
