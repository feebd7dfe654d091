pub mod plan;
pub mod predicate;
pub mod result;
pub mod runtime;
pub mod undo;

pub use plan::EvalPlan;
pub use result::QueryResult;
pub use runtime::handle_statement;
