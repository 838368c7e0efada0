//! Condition evaluation engine.
//!
//! Evaluates an entry/exit logic list against one row of the series table.
//!
//! # Evaluation Semantics
//!
//! - The list is a conjunction; an empty list is `true`
//! - Evaluation short-circuits on the first `false` clause
//! - `crosses_above`/`crosses_below` read the previous value of each operand from
//!   its `<name>_prev` companion, falling back to the current value when absent
//!
//! # Operand resolution
//!
//! A name is looked up in `values`, then in the row, and is otherwise taken as
//! a literal: a number if it parses as one, opaque text if not. Two opaque
//! operands compare as strings. A number never compares with opaque text, and
//! `NaN` never compares with anything.

use std::cmp::Ordering;

use crate::domain::series::{PREV_SUFFIX, SeriesLookup};
use crate::domain::strategy::{Condition, ConditionOp, Operand};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    Series(f64),
    Row(f64),
    Literal(f64),
    Opaque(&'a str),
}

impl Resolved<'_> {
    pub fn number(&self) -> Option<f64> {
        match *self {
            Resolved::Series(v) | Resolved::Row(v) | Resolved::Literal(v) => Some(v),
            Resolved::Opaque(_) => None,
        }
    }
}

pub fn resolve_operand<'a>(
    operand: &'a Operand,
    values: &impl SeriesLookup,
    row: &impl SeriesLookup,
) -> Resolved<'a> {
    match operand {
        Operand::Literal(v) => Resolved::Literal(*v),
        Operand::Name(name) => {
            if let Some(v) = values.lookup(name) {
                Resolved::Series(v)
            } else if let Some(v) = row.lookup(name) {
                Resolved::Row(v)
            } else if let Ok(v) = name.trim().parse::<f64>() {
                Resolved::Literal(v)
            } else {
                Resolved::Opaque(name)
            }
        }
    }
}

fn previous<'a>(operand: &Operand, current: Resolved<'a>, row: &impl SeriesLookup) -> Resolved<'a> {
    match operand {
        Operand::Name(name) => row
            .lookup(&format!("{name}{PREV_SUFFIX}"))
            .map(Resolved::Row)
            .unwrap_or(current),
        Operand::Literal(_) => current,
    }
}

fn compare(a: Resolved<'_>, b: Resolved<'_>) -> Option<Ordering> {
    match (a, b) {
        (Resolved::Opaque(x), Resolved::Opaque(y)) => Some(x.cmp(y)),
        _ => match (a.number(), b.number()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}

pub fn evaluate_condition(
    condition: &Condition,
    values: &impl SeriesLookup,
    row: &impl SeriesLookup,
) -> bool {
    let a = resolve_operand(&condition.a, values, row);
    let b = resolve_operand(&condition.b, values, row);

    match condition.op {
        ConditionOp::GreaterThan => compare(a, b) == Some(Ordering::Greater),
        ConditionOp::LessThan => compare(a, b) == Some(Ordering::Less),
        ConditionOp::CrossesAbove => {
            let a_prev = previous(&condition.a, a, row);
            let b_prev = previous(&condition.b, b, row);
            compare(a, b) == Some(Ordering::Greater)
                && matches!(
                    compare(a_prev, b_prev),
                    Some(Ordering::Less | Ordering::Equal)
                )
        }
        ConditionOp::CrossesBelow => {
            let a_prev = previous(&condition.a, a, row);
            let b_prev = previous(&condition.b, b, row);
            compare(a, b) == Some(Ordering::Less)
                && matches!(
                    compare(a_prev, b_prev),
                    Some(Ordering::Greater | Ordering::Equal)
                )
        }
    }
}

pub fn evaluate(logic: &[Condition], values: &impl SeriesLookup, row: &impl SeriesLookup) -> bool {
    logic.iter().all(|c| evaluate_condition(c, values, row))
}
