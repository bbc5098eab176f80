pub mod steps;
pub mod sync;
pub mod workflows;
