use std::fmt::Display;

use thiserror::Error;

use crate::mapping::MappingError;

#[derive(Debug, Clone, PartialEq)]
pub enum Pass {
    TriplePatternPruning,
    UnionJoinPruning,
    ConstantExpressionEquality,
    NumericStringComparison,
    CaseHoisting,
    ConcatenationEquality,
    IsNullPropagation,
    SelfJoinElimination,
}

impl Display for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pass::TriplePatternPruning => write!(f, "TriplePatternPruning"),
            Pass::UnionJoinPruning => write!(f, "UnionJoinPruning"),
            Pass::ConstantExpressionEquality => write!(f, "ConstantExpressionEquality"),
            Pass::NumericStringComparison => write!(f, "NumericStringComparison"),
            Pass::CaseHoisting => write!(f, "CaseHoisting"),
            Pass::ConcatenationEquality => write!(f, "ConcatenationEquality"),
            Pass::IsNullPropagation => write!(f, "IsNullPropagation"),
            Pass::SelfJoinElimination => write!(f, "SelfJoinElimination"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OptimizerError {
    #[error("{pass}: invalid mapping: {source}.")]
    Mapping {
        pass: Pass,
        #[source]
        source: MappingError,
    },
    #[error("{pass}: table `{table}` not found in schema.")]
    UnknownTable { pass: Pass, table: String },
}
