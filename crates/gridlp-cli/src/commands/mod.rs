pub mod formulate;
pub mod solve;
