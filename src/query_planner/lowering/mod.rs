//! Lowering of R2RML term maps and SPARQL expressions into calculus
//! expressions and filter conditions.

pub mod condition_builder;
pub mod expression_builder;

pub use condition_builder::{
    category_is, create_equals_condition, create_is_bound_condition, create_join_equal_condition,
    lower_sparql_condition, not_null_condition, ConditionPart,
};
pub use expression_builder::{
    binder_expressions, expressions_set_bound, lower_rdf_node, lower_sparql_expression,
    lower_term_map,
};
