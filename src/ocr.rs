pub mod engine;
pub mod evaluator;
pub mod probe;
