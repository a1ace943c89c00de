pub mod evaluator;
pub mod rules;

pub use evaluator::{can, Decision};
pub use rules::{Changes, Operation, Resource, Subject, Table};
