//! Optimizer pass traits and result types.
//!
//! Two kinds of passes exist: [`SparqlOptimizerPass`] rewrites the expanded
//! SPARQL algebra once before lowering, [`RelationalOptimizerPass`] rewrites
//! the relational query after every lowered node.
//!
//! # Implementing a Pass
//!
//! ```ignore
//! impl RelationalOptimizerPass for MyPass {
//!     fn pass(&self) -> Pass { .. }
//!
//!     fn optimize(&self, query: RelationalQuery, ctx: &QueryContext)
//!         -> OptimizerResult<Transformed<RelationalQuery>> {
//!         // Transform query here
//!     }
//! }
//! ```

use crate::query_planner::{
    calculus::RelationalQuery,
    optimizer::errors::{OptimizerError, Pass},
    query_ctx::QueryContext,
    transformed::Transformed,
};
use crate::sparql::GraphPattern;

pub type OptimizerResult<T> = Result<T, OptimizerError>;

pub trait SparqlOptimizerPass {
    fn pass(&self) -> Pass;

    fn optimize(
        &self,
        pattern: GraphPattern,
        ctx: &QueryContext,
    ) -> OptimizerResult<Transformed<GraphPattern>>;
}

pub trait RelationalOptimizerPass {
    fn pass(&self) -> Pass;

    fn optimize(
        &self,
        query: RelationalQuery,
        ctx: &QueryContext,
    ) -> OptimizerResult<Transformed<RelationalQuery>>;
}
