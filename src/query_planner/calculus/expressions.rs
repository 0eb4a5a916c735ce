//! Scalar relational expressions and the six-slot RDF term encoding.

use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::database::SqlType;
use crate::types::TypeCategory;

use super::conditions::FilterCondition;
use super::{CalculusVariable, VariableId};

/// Typed SQL literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Constant {
    pub fn sql_type(&self) -> SqlType {
        match self {
            Constant::String(_) => SqlType::String,
            Constant::Int(_) => SqlType::Int,
            Constant::Double(_) => SqlType::Double,
            Constant::Bool(_) => SqlType::Bool,
            Constant::DateTime(_) => SqlType::DateTime,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Constant::Int(i) => Some(*i as f64),
            Constant::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Value comparison; `None` when the two constants are not comparable.
    pub fn compare(&self, other: &Constant) -> Option<Ordering> {
        match (self, other) {
            (Constant::String(a), Constant::String(b)) => Some(a.cmp(b)),
            (Constant::Int(a), Constant::Int(b)) => Some(a.cmp(b)),
            (Constant::Bool(a), Constant::Bool(b)) => Some(a.cmp(b)),
            (Constant::DateTime(a), Constant::DateTime(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    pub condition: FilterCondition,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Value of a calculus variable. `iri_escaped` marks values that end up
    /// percent-encoded inside an IRI.
    Column {
        variable: CalculusVariable,
        iri_escaped: bool,
    },
    Constant(Constant),
    /// String concatenation; non-string parts are cast to string.
    Concatenation(Vec<Expression>),
    /// First branch whose condition holds; NULL when none does.
    Case {
        branches: Vec<CaseBranch>,
        sql_type: SqlType,
    },
    Coalesce(Vec<Expression>),
    Null(SqlType),
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn column(variable: CalculusVariable) -> Self {
        Expression::Column {
            variable,
            iri_escaped: false,
        }
    }

    pub fn iri_column(variable: CalculusVariable) -> Self {
        Expression::Column {
            variable,
            iri_escaped: true,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::Constant(Constant::String(value.into()))
    }

    pub fn int(value: i64) -> Self {
        Expression::Constant(Constant::Int(value))
    }

    pub fn double(value: f64) -> Self {
        Expression::Constant(Constant::Double(value))
    }

    pub fn bool(value: bool) -> Self {
        Expression::Constant(Constant::Bool(value))
    }

    /// Concatenation of parts, collapsing adjacent string constants and
    /// single-part concatenations.
    pub fn concat(parts: Vec<Expression>) -> Self {
        let mut merged: Vec<Expression> = Vec::with_capacity(parts.len());
        for part in parts {
            let part = match part {
                Expression::Concatenation(inner) => {
                    merged.extend(inner);
                    continue;
                }
                other => other,
            };
            if let (
                Some(Expression::Constant(Constant::String(prev))),
                Expression::Constant(Constant::String(next)),
            ) = (merged.last_mut(), &part)
            {
                prev.push_str(next);
                continue;
            }
            merged.push(part);
        }
        merged.retain(|p| !matches!(p, Expression::Constant(Constant::String(s)) if s.is_empty()));
        match merged.len() {
            0 => Expression::string(""),
            1 if merged[0].sql_type() == SqlType::String => merged.remove(0),
            _ => Expression::Concatenation(merged),
        }
    }

    /// CASE expression; branches with a false condition are dropped and a
    /// leading always-true branch becomes the whole expression.
    pub fn case(branches: Vec<CaseBranch>, sql_type: SqlType) -> Self {
        let mut kept = Vec::new();
        for branch in branches {
            match branch.condition {
                FilterCondition::False => continue,
                FilterCondition::True => {
                    if kept.is_empty() {
                        return branch.value;
                    }
                    kept.push(branch);
                    break;
                }
                _ => kept.push(branch),
            }
        }
        if kept.is_empty() {
            Expression::Null(sql_type)
        } else {
            Expression::Case {
                branches: kept,
                sql_type,
            }
        }
    }

    pub fn coalesce(alternatives: Vec<Expression>) -> Self {
        let mut kept = Vec::new();
        let sql_type = alternatives
            .first()
            .map(|e| e.sql_type())
            .unwrap_or(SqlType::String);
        for alternative in alternatives {
            match alternative {
                Expression::Null(_) => continue,
                Expression::Constant(_) => {
                    kept.push(alternative);
                    break;
                }
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => Expression::Null(sql_type),
            1 => kept.remove(0),
            _ => Expression::Coalesce(kept),
        }
    }

    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn sql_type(&self) -> SqlType {
        match self {
            Expression::Column { variable, .. } => variable.sql_type,
            Expression::Constant(constant) => constant.sql_type(),
            Expression::Concatenation(_) => SqlType::String,
            Expression::Case { sql_type, .. } => *sql_type,
            Expression::Coalesce(alternatives) => alternatives
                .first()
                .map(|e| e.sql_type())
                .unwrap_or(SqlType::String),
            Expression::Null(sql_type) => *sql_type,
            Expression::Binary {
                operator,
                left,
                right,
            } => {
                if *operator == BinaryOperator::Divide
                    || left.sql_type() == SqlType::Double
                    || right.sql_type() == SqlType::Double
                {
                    SqlType::Double
                } else {
                    SqlType::Int
                }
            }
        }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Expression::Constant(constant) => Some(constant),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<CalculusVariable> {
        match self {
            Expression::Column { variable, .. } => Some(*variable),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Expression::Null(_))
    }

    pub fn collect_variables(&self, out: &mut BTreeSet<VariableId>) {
        match self {
            Expression::Column { variable, .. } => {
                out.insert(variable.id);
            }
            Expression::Constant(_) | Expression::Null(_) => {}
            Expression::Concatenation(parts) | Expression::Coalesce(parts) => {
                for part in parts {
                    part.collect_variables(out);
                }
            }
            Expression::Case { branches, .. } => {
                for branch in branches {
                    branch.condition.collect_variables(out);
                    branch.value.collect_variables(out);
                }
            }
            Expression::Binary { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
        }
    }

    pub fn substitute(&self, map: &HashMap<VariableId, CalculusVariable>) -> Expression {
        match self {
            Expression::Column {
                variable,
                iri_escaped,
            } => Expression::Column {
                variable: map.get(&variable.id).copied().unwrap_or(*variable),
                iri_escaped: *iri_escaped,
            },
            Expression::Constant(_) | Expression::Null(_) => self.clone(),
            Expression::Concatenation(parts) => {
                Expression::Concatenation(parts.iter().map(|p| p.substitute(map)).collect())
            }
            Expression::Coalesce(parts) => {
                Expression::Coalesce(parts.iter().map(|p| p.substitute(map)).collect())
            }
            Expression::Case { branches, sql_type } => Expression::Case {
                branches: branches
                    .iter()
                    .map(|b| CaseBranch {
                        condition: b.condition.substitute(map),
                        value: b.value.substitute(map),
                    })
                    .collect(),
                sql_type: *sql_type,
            },
            Expression::Binary {
                operator,
                left,
                right,
            } => Expression::binary(*operator, left.substitute(map), right.substitute(map)),
        }
    }
}

/// One RDF term spread over six typed expressions.
///
/// `type_id` identifies the exact type, `type_category` selects the payload
/// slot that carries the value; the other payload slots are NULL. Other
/// literals reuse the string slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionsSet {
    pub type_id: Expression,
    pub type_category: Expression,
    pub string: Expression,
    pub numeric: Expression,
    pub boolean: Expression,
    pub datetime: Expression,
}

impl ExpressionsSet {
    /// The unbound term: every slot NULL.
    pub fn null() -> Self {
        Self {
            type_id: Expression::Null(SqlType::Int),
            type_category: Expression::Null(SqlType::Int),
            string: Expression::Null(SqlType::String),
            numeric: Expression::Null(SqlType::Double),
            boolean: Expression::Null(SqlType::Bool),
            datetime: Expression::Null(SqlType::DateTime),
        }
    }

    /// A term of a statically known type with `value` in the slot of its
    /// category.
    pub fn typed(type_id: i64, category: TypeCategory, value: Expression) -> Self {
        let mut set = Self {
            type_id: Expression::int(type_id),
            type_category: Expression::int(category.code()),
            ..Self::null()
        };
        *set.payload_mut(category) = value;
        set
    }

    pub fn payload(&self, category: TypeCategory) -> &Expression {
        match category {
            TypeCategory::Numeric => &self.numeric,
            TypeCategory::Boolean => &self.boolean,
            TypeCategory::DateTime => &self.datetime,
            _ => &self.string,
        }
    }

    fn payload_mut(&mut self, category: TypeCategory) -> &mut Expression {
        match category {
            TypeCategory::Numeric => &mut self.numeric,
            TypeCategory::Boolean => &mut self.boolean,
            TypeCategory::DateTime => &mut self.datetime,
            _ => &mut self.string,
        }
    }

    pub fn map(&self, mut f: impl FnMut(&Expression) -> Expression) -> Self {
        Self {
            type_id: f(&self.type_id),
            type_category: f(&self.type_category),
            string: f(&self.string),
            numeric: f(&self.numeric),
            boolean: f(&self.boolean),
            datetime: f(&self.datetime),
        }
    }

    pub fn try_map<E>(
        &self,
        mut f: impl FnMut(&Expression) -> Result<Expression, E>,
    ) -> Result<Self, E> {
        Ok(Self {
            type_id: f(&self.type_id)?,
            type_category: f(&self.type_category)?,
            string: f(&self.string)?,
            numeric: f(&self.numeric)?,
            boolean: f(&self.boolean)?,
            datetime: f(&self.datetime)?,
        })
    }

    /// Combines sets slot by slot.
    pub fn zip_with(sets: &[ExpressionsSet], f: impl Fn(Vec<Expression>) -> Expression) -> Self {
        let slot = |i: usize| f(sets.iter().map(|s| s.expressions()[i].clone()).collect());
        Self {
            type_id: slot(0),
            type_category: slot(1),
            string: slot(2),
            numeric: slot(3),
            boolean: slot(4),
            datetime: slot(5),
        }
    }

    pub fn expressions(&self) -> [&Expression; 6] {
        [
            &self.type_id,
            &self.type_category,
            &self.string,
            &self.numeric,
            &self.boolean,
            &self.datetime,
        ]
    }

    pub fn collect_variables(&self, out: &mut BTreeSet<VariableId>) {
        for expression in self.expressions() {
            expression.collect_variables(out);
        }
    }

    /// Statically known category, if the category slot is a constant.
    pub fn constant_category(&self) -> Option<TypeCategory> {
        match &self.type_category {
            Expression::Constant(Constant::Int(code)) => TypeCategory::from_code(*code),
            _ => None,
        }
    }
}
