use std::{cmp::Ordering, fmt};

use serde_json::Value;

use super::{dataset::Record, error::RuleError, parser};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// The operator with its operands swapped: `a < b` holds iff `b > a` does.
    pub const fn flip(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => {
                f.write_str("'")?;
                for c in s.chars() {
                    match c {
                        '\'' => f.write_str("\\'")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("'")
            }
            Self::Bool(true) => f.write_str("true"),
            Self::Bool(false) => f.write_str("false"),
        }
    }
}

/// A parsed filter predicate.
///
/// Comparisons always have the field on the left; `25 < age` is stored as `age > 25`.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Comparison {
        field: String,
        op: CompareOp,
        literal: Literal,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Parses `source`, rejecting anything outside the comparison grammar.
    ///
    /// Constructs such as function calls or attribute access fail with
    /// [`RuleError::UnsafePredicate`] before parsing proper; syntax errors and empty input fail
    /// with [`RuleError::InvalidPredicate`], as do predicates nested or chained too deeply to
    /// evaluate safely.
    pub fn parse(source: &str) -> Result<Self, RuleError> {
        parser::parse_predicate(source)
    }

    /// Field names referenced by the predicate, in order of first occurrence.
    pub fn fields(&self) -> Vec<&str> {
        fn collect<'p>(predicate: &'p Predicate, fields: &mut Vec<&'p str>) {
            match predicate {
                Predicate::Comparison { field, .. } => {
                    if !fields.contains(&field.as_str()) {
                        fields.push(field);
                    }
                }
                Predicate::And(left, right) | Predicate::Or(left, right) => {
                    collect(left, fields);
                    collect(right, fields);
                }
                Predicate::Not(inner) => collect(inner, fields),
            }
        }

        let mut fields = Vec::new();
        collect(self, &mut fields);
        fields
    }

    /// Whether `record` satisfies the predicate. A comparison on a field that the record lacks
    /// (or holds as null) is false.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Comparison { field, op, literal } => compare(record.get(field), *op, literal),
            Self::And(left, right) => left.matches(record) && right.matches(record),
            Self::Or(left, right) => left.matches(record) || right.matches(record),
            Self::Not(inner) => !inner.matches(record),
        }
    }
}

/// A present value of a different kind than the literal is unequal to it: `!=` holds, every
/// other operator is false. Absent and null values never compare, `!=` included.
fn compare(value: Option<&Value>, op: CompareOp, literal: &Literal) -> bool {
    let ordering = match (value, literal) {
        (None | Some(Value::Null), _) => return false,
        (Some(Value::Number(value)), Literal::Number(literal)) => {
            value.as_f64().and_then(|value| value.partial_cmp(literal))
        }
        (Some(Value::String(value)), Literal::String(literal)) => {
            Some(value.as_str().cmp(literal.as_str()))
        }
        (Some(Value::Bool(value)), Literal::Bool(literal)) => {
            return match op {
                CompareOp::Eq => value == literal,
                CompareOp::Ne => value != literal,
                _ => false,
            };
        }
        _ => return op == CompareOp::Ne,
    };
    ordering.map_or(false, |ordering| op.holds(ordering))
}

/// Prints the canonical, fully parenthesized form, which parses back to the same predicate.
impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comparison { field, op, literal } => write!(f, "{field} {op} {literal}"),
            Self::And(left, right) => write!(f, "({left}) and ({right})"),
            Self::Or(left, right) => write!(f, "({left}) or ({right})"),
            Self::Not(inner) => write!(f, "not ({inner})"),
        }
    }
}
