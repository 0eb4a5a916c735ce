//! Value binders: how a SPARQL variable's RDF term is produced from the
//! calculus variables of a relational query.

use std::collections::{BTreeSet, HashMap};

use crate::mapping::TermMap;

use super::calculus::{CalculusVariable, ExpressionsSet, TableColumn, VariableId};

/// A term map evaluated over the columns of one table source.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseValueBinder {
    pub name: String,
    pub term_map: TermMap,
    /// Variables of the columns the term map reads, in template order.
    pub columns: Vec<TableColumn>,
}

impl BaseValueBinder {
    pub fn variable_of(&self, column: &str) -> Option<CalculusVariable> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.variable)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub case_value: i64,
    pub binder: ValueBinder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueBinder {
    Base(BaseValueBinder),
    /// Never bound.
    Empty { name: String },
    /// First alternative that is bound wins.
    Coalesce {
        name: String,
        binders: Vec<ValueBinder>,
    },
    /// Alternative selected by the value of a union's case variable.
    Switch {
        name: String,
        case_variable: CalculusVariable,
        cases: Vec<SwitchCase>,
    },
    /// A precomputed term; its slots are constants, NULLs or plain columns.
    ExpressionSet {
        name: String,
        expressions: ExpressionsSet,
    },
}

impl ValueBinder {
    pub fn empty(name: impl Into<String>) -> Self {
        ValueBinder::Empty { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            ValueBinder::Base(base) => &base.name,
            ValueBinder::Empty { name }
            | ValueBinder::Coalesce { name, .. }
            | ValueBinder::Switch { name, .. }
            | ValueBinder::ExpressionSet { name, .. } => name,
        }
    }

    /// The same binder under another variable name.
    pub fn renamed(&self, name: &str) -> ValueBinder {
        match self {
            ValueBinder::Base(base) => ValueBinder::Base(BaseValueBinder {
                name: name.to_string(),
                ..base.clone()
            }),
            ValueBinder::Empty { .. } => ValueBinder::empty(name),
            ValueBinder::Coalesce { binders, .. } => ValueBinder::Coalesce {
                name: name.to_string(),
                binders: binders.iter().map(|b| b.renamed(name)).collect(),
            },
            ValueBinder::Switch {
                case_variable,
                cases,
                ..
            } => ValueBinder::Switch {
                name: name.to_string(),
                case_variable: *case_variable,
                cases: cases
                    .iter()
                    .map(|c| SwitchCase {
                        case_value: c.case_value,
                        binder: c.binder.renamed(name),
                    })
                    .collect(),
            },
            ValueBinder::ExpressionSet { expressions, .. } => ValueBinder::ExpressionSet {
                name: name.to_string(),
                expressions: expressions.clone(),
            },
        }
    }

    /// Calculus variables read when materializing the term.
    pub fn needed_variables(&self) -> Vec<CalculusVariable> {
        let mut ids = BTreeSet::new();
        let mut out = Vec::new();
        self.collect_needed(&mut ids, &mut out);
        out
    }

    fn collect_needed(&self, seen: &mut BTreeSet<VariableId>, out: &mut Vec<CalculusVariable>) {
        let mut push = |variable: CalculusVariable, out: &mut Vec<CalculusVariable>| {
            if seen.insert(variable.id) {
                out.push(variable);
            }
        };
        match self {
            ValueBinder::Base(base) => {
                for column in &base.columns {
                    push(column.variable, out);
                }
            }
            ValueBinder::Empty { .. } => {}
            ValueBinder::Coalesce { binders, .. } => {
                let mut nested = Vec::new();
                for binder in binders {
                    nested.extend(binder.needed_variables());
                }
                for variable in nested {
                    push(variable, out);
                }
            }
            ValueBinder::Switch {
                case_variable,
                cases,
                ..
            } => {
                push(*case_variable, out);
                let mut nested = Vec::new();
                for case in cases {
                    nested.extend(case.binder.needed_variables());
                }
                for variable in nested {
                    push(variable, out);
                }
            }
            ValueBinder::ExpressionSet { expressions, .. } => {
                for expression in expressions.expressions() {
                    if let Some(variable) = expression.as_variable() {
                        push(variable, out);
                    }
                }
            }
        }
    }

    pub fn substitute(&self, map: &HashMap<VariableId, CalculusVariable>) -> ValueBinder {
        match self {
            ValueBinder::Base(base) => ValueBinder::Base(BaseValueBinder {
                name: base.name.clone(),
                term_map: base.term_map.clone(),
                columns: base
                    .columns
                    .iter()
                    .map(|c| TableColumn {
                        name: c.name.clone(),
                        variable: map.get(&c.variable.id).copied().unwrap_or(c.variable),
                    })
                    .collect(),
            }),
            ValueBinder::Empty { .. } => self.clone(),
            ValueBinder::Coalesce { name, binders } => ValueBinder::Coalesce {
                name: name.clone(),
                binders: binders.iter().map(|b| b.substitute(map)).collect(),
            },
            ValueBinder::Switch {
                name,
                case_variable,
                cases,
            } => ValueBinder::Switch {
                name: name.clone(),
                case_variable: map
                    .get(&case_variable.id)
                    .copied()
                    .unwrap_or(*case_variable),
                cases: cases
                    .iter()
                    .map(|c| SwitchCase {
                        case_value: c.case_value,
                        binder: c.binder.substitute(map),
                    })
                    .collect(),
            },
            ValueBinder::ExpressionSet { name, expressions } => ValueBinder::ExpressionSet {
                name: name.clone(),
                expressions: expressions.map(|e| e.substitute(map)),
            },
        }
    }
}
