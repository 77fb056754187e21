use std::str::FromStr;

use crate::ConditionError;

/// Scalar comparison between the observed value (left) and the target (right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

type Compare = fn(f64, f64) -> bool;

fn gt(a: f64, b: f64) -> bool {
    a > b
}

fn ge(a: f64, b: f64) -> bool {
    a >= b
}

fn lt(a: f64, b: f64) -> bool {
    a < b
}

fn le(a: f64, b: f64) -> bool {
    a <= b
}

fn eq(a: f64, b: f64) -> bool {
    a == b
}

/// Every operator with its token and comparison function.
const DISPATCH: [(Operator, &str, Compare); 5] = [
    (Operator::Gt, ">", gt),
    (Operator::Ge, ">=", ge),
    (Operator::Lt, "<", lt),
    (Operator::Le, "<=", le),
    (Operator::Eq, "==", eq),
];

impl Operator {
    fn entry(self) -> &'static (Operator, &'static str, Compare) {
        let idx = match self {
            Operator::Gt => 0,
            Operator::Ge => 1,
            Operator::Lt => 2,
            Operator::Le => 3,
            Operator::Eq => 4,
        };
        &DISPATCH[idx]
    }

    pub fn symbol(self) -> &'static str {
        self.entry().1
    }

    /// Compare `lhs` with `rhs`. Non-finite inputs never satisfy a comparison.
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        if !lhs.is_finite() || !rhs.is_finite() {
            return false;
        }
        (self.entry().2)(lhs, rhs)
    }
}

impl FromStr for Operator {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        DISPATCH
            .iter()
            .find(|(_, symbol, _)| *symbol == token)
            .map(|(op, _, _)| *op)
            .ok_or_else(|| ConditionError::UnknownOperator(token.to_string()))
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}
