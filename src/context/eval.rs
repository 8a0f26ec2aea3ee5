//! Expression interpreter.
//!
//! `eval` takes an expression (a single-key map or a literal) and evaluates it
//! against a context. Operator keys dispatch through `Operator`; any other key
//! looks up a property on the current context and evaluates the operand inside
//! it, so nested contexts are addressed by name.
//!
//! Operands are evaluated lazily and left to right. Non-commutative operators
//! fold from the first operand: `subtract [a, b, c]` is `(a - b) - c`, and the
//! comparisons check the first operand against every later one.

use std::cmp::Ordering;

use thiserror::Error;

use super::host::Host;
use super::operator::Operator;
use super::store::ContextRef;
use super::value::Value;

/// Largest number of dice one `die-roll` may throw
pub const MAX_DIE_COUNT: f64 = 1000.0;
/// Largest die one `die-roll` may throw
pub const MAX_DIE_SIDES: f64 = 10_000.0;

/// Error type for expression evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Neither an operator nor a property anywhere up the base chain
    #[error("Unresolved key: {0}")]
    UnresolvedKey(String),

    #[error("Property {key} is a {found}, not a context")]
    NotAContext { key: String, found: &'static str },

    #[error("Malformed {operator} expression: {reason}")]
    MalformedExpression { operator: String, reason: String },

    #[error("{operator} is missing operand {operand}")]
    MissingOperand { operator: String, operand: String },

    #[error("Absent operand in {0}")]
    AbsentOperand(String),

    #[error("{operator} cannot use a {found}")]
    TypeMismatch {
        operator: String,
        found: &'static str,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid die: {count}d{sides}")]
    InvalidDie { count: String, sides: String },

    /// Failure raised by the host while servicing an operator (e.g. a roll hook)
    #[error("Host error: {0}")]
    Host(String),
}

fn malformed(op: Operator, reason: &str) -> EvalError {
    EvalError::MalformedExpression {
        operator: op.key().to_string(),
        reason: reason.to_string(),
    }
}

fn missing(op: Operator, operand: &str) -> EvalError {
    EvalError::MissingOperand {
        operator: op.key().to_string(),
        operand: operand.to_string(),
    }
}

fn mismatch(op: Operator, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        operator: op.key().to_string(),
        found: found.type_name(),
    }
}

/// Operand list, written either bare or under an `arguments` key
fn operands(op: Operator, operand: &Value) -> Result<&[Value], EvalError> {
    match operand {
        Value::List(items) => Ok(items),
        Value::Map(map) => match map.get("arguments") {
            Some(Value::List(items)) => Ok(items),
            _ => Err(malformed(op, "expected a list of operands")),
        },
        _ => Err(malformed(op, "expected a list of operands")),
    }
}

/// The operand stored under `key` when given as a map, else the operand itself
fn named_operand<'a>(operand: &'a Value, key: &str) -> &'a Value {
    match operand {
        Value::Map(map) if map.len() == 1 && map.contains_key(key) => &map[key],
        _ => operand,
    }
}

/// A unary operand, unwrapping a one-element argument list
fn single_operand(operand: &Value) -> &Value {
    match named_operand(operand, "arguments") {
        Value::List(items) if items.len() == 1 => &items[0],
        other => other,
    }
}

fn number(op: Operator, value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Null => Err(EvalError::AbsentOperand(op.key().to_string())),
        other => Err(mismatch(op, other)),
    }
}

fn compare(op: Operator, left: &Value, right: &Value) -> Result<Ordering, EvalError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a
            .partial_cmp(b)
            .ok_or_else(|| malformed(op, "cannot order NaN")),
        (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        (Value::Null, _) | (_, Value::Null) => Err(EvalError::AbsentOperand(op.key().to_string())),
        (Value::Number(_), other) | (Value::Text(_), other) | (Value::Bool(_), other) => {
            Err(mismatch(op, other))
        }
        (other, _) => Err(mismatch(op, other)),
    }
}

impl ContextRef {
    /// Evaluate an expression in this context
    pub fn eval(&self, expression: &Value, host: &mut dyn Host) -> Result<Value, EvalError> {
        if let Value::Map(map) = expression {
            if map.len() == 1 {
                if let Some((key, operand)) = map.iter().next() {
                    return match Operator::from_key(key) {
                        Some(op) => self.apply(op, operand, host),
                        None => self.address(key, operand, host),
                    };
                }
            }
        }

        Ok(expression.clone())
    }

    /// True when every condition evaluates truthy; stops at the first failure
    pub fn check_conditions(
        &self,
        conditions: &[Value],
        host: &mut dyn Host,
    ) -> Result<bool, EvalError> {
        for condition in conditions {
            if !self.eval(condition, host)?.is_truthy() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// `{property: operand}`: evaluate the operand inside the named property
    fn address(&self, key: &str, operand: &Value, host: &mut dyn Host) -> Result<Value, EvalError> {
        match self.get(key) {
            Value::Context(ctx) => ctx.eval(operand, host),
            Value::Map(data) => self.child(key, data).eval(operand, host),
            Value::Null => Err(EvalError::UnresolvedKey(key.to_string())),
            other => Err(EvalError::NotAContext {
                key: key.to_string(),
                found: other.type_name(),
            }),
        }
    }

    fn apply(&self, op: Operator, operand: &Value, host: &mut dyn Host) -> Result<Value, EvalError> {
        match op {
            Operator::Context => {
                let key = self.eval(named_operand(operand, "value"), host)?;
                let key = key.as_key().ok_or_else(|| mismatch(op, &key))?;
                Ok(self.get(&key))
            }

            Operator::Add => {
                let mut total = 0.0;
                for argument in operands(op, operand)? {
                    total += number(op, &self.eval(argument, host)?)?;
                }
                Ok(Value::Number(total))
            }

            Operator::Subtract | Operator::Multiply | Operator::Divide => {
                let arguments = operands(op, operand)?;
                let (first, rest) = arguments.split_first().ok_or_else(|| missing(op, "0"))?;
                let mut total = number(op, &self.eval(first, host)?)?;
                for argument in rest {
                    let value = number(op, &self.eval(argument, host)?)?;
                    total = match op {
                        Operator::Subtract => total - value,
                        Operator::Multiply => total * value,
                        _ => {
                            if value == 0.0 {
                                return Err(EvalError::DivisionByZero);
                            }
                            total / value
                        }
                    };
                }
                Ok(Value::Number(total))
            }

            Operator::Greater
            | Operator::Less
            | Operator::GreaterOrEqual
            | Operator::LessOrEqual => {
                let arguments = operands(op, operand)?;
                let (first, rest) = arguments.split_first().ok_or_else(|| missing(op, "0"))?;
                let first = self.eval(first, host)?;
                for argument in rest {
                    let ordering = compare(op, &first, &self.eval(argument, host)?)?;
                    let holds = match op {
                        Operator::Greater => ordering == Ordering::Greater,
                        Operator::Less => ordering == Ordering::Less,
                        Operator::GreaterOrEqual => ordering != Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    };
                    if !holds {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }

            Operator::Max | Operator::Min => {
                let arguments = operands(op, operand)?;
                let (first, rest) = arguments.split_first().ok_or_else(|| missing(op, "0"))?;
                let mut best = self.eval(first, host)?;
                for argument in rest {
                    let value = self.eval(argument, host)?;
                    let wanted = if op == Operator::Max {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    };
                    if compare(op, &value, &best)? == wanted {
                        best = value;
                    }
                }
                Ok(best)
            }

            Operator::Map => {
                let arguments = operands(op, operand)?;
                let collection = arguments.first().ok_or_else(|| missing(op, "collection"))?;
                let function = arguments.get(1).ok_or_else(|| missing(op, "function"))?;

                let items = match self.eval(collection, host)? {
                    Value::List(items) => items,
                    Value::Null => return Err(EvalError::AbsentOperand(op.key().to_string())),
                    other => return Err(mismatch(op, &other)),
                };

                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    let result = match item {
                        Value::Context(ctx) => ctx.eval(function, host)?,
                        Value::Map(data) => self.child("item", data).eval(function, host)?,
                        other => return Err(mismatch(op, &other)),
                    };
                    results.push(result);
                }
                Ok(Value::List(results))
            }

            Operator::Contains => {
                let arguments = operands(op, operand)?;
                let (first, rest) = arguments.split_first().ok_or_else(|| missing(op, "0"))?;
                let container = self.eval(first, host)?;
                if container.is_null() {
                    return Ok(Value::Bool(false));
                }
                for argument in rest {
                    let needle = self.eval(argument, host)?;
                    let found = match &container {
                        Value::List(items) => items.contains(&needle),
                        Value::Map(map) => needle.as_key().is_some_and(|k| map.contains_key(&k)),
                        Value::Text(text) => needle.as_str().is_some_and(|s| text.contains(s)),
                        Value::Context(ctx) => {
                            needle.as_key().is_some_and(|k| !ctx.get(&k).is_null())
                        }
                        other => return Err(mismatch(op, other)),
                    };
                    if !found {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }

            Operator::And => {
                for argument in operands(op, operand)? {
                    if !self.eval(argument, host)?.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }

            Operator::Or => {
                for argument in operands(op, operand)? {
                    if self.eval(argument, host)?.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }

            Operator::Not => {
                let inner = single_operand(operand);
                Ok(Value::Bool(!self.eval(inner, host)?.is_truthy()))
            }

            Operator::Get => {
                let arguments = operands(op, operand)?;
                let container = arguments.first().ok_or_else(|| missing(op, "container"))?;
                let key = arguments.get(1).ok_or_else(|| missing(op, "key"))?;

                let container = self.eval(container, host)?;
                let key = self.eval(key, host)?;

                match container {
                    Value::Context(ctx) => {
                        let key = key.as_key().ok_or_else(|| mismatch(op, &key))?;
                        Ok(ctx.get(&key))
                    }
                    Value::Map(map) => {
                        let key = key.as_key().ok_or_else(|| mismatch(op, &key))?;
                        Ok(map.get(&key).cloned().unwrap_or_default())
                    }
                    Value::List(items) => {
                        let index = number(op, &key)?;
                        if index < 0.0 || index.fract() != 0.0 {
                            return Err(mismatch(op, &key));
                        }
                        Ok(items.get(index as usize).cloned().unwrap_or_default())
                    }
                    Value::Null => Err(EvalError::AbsentOperand(op.key().to_string())),
                    other => Err(mismatch(op, &other)),
                }
            }

            Operator::Eval => {
                // the operand may resolve to a stored expression; run that too
                let inner = self.eval(operand, host)?;
                self.eval(&inner, host)
            }

            Operator::DieRoll => {
                let spec = operand
                    .as_map()
                    .ok_or_else(|| malformed(op, "expected {count, sides}"))?;
                let count = match spec.get("count") {
                    Some(count) => self.eval(count, host)?,
                    None => Value::Number(1.0),
                };
                let sides = spec.get("sides").ok_or_else(|| missing(op, "sides"))?;
                let sides = self.eval(sides, host)?;

                let count_n = number(op, &count)?;
                let sides_n = number(op, &sides)?;
                if !(0.0..=MAX_DIE_COUNT).contains(&count_n)
                    || count_n.fract() != 0.0
                    || !(1.0..=MAX_DIE_SIDES).contains(&sides_n)
                    || sides_n.fract() != 0.0
                {
                    return Err(EvalError::InvalidDie {
                        count: count.to_string(),
                        sides: sides.to_string(),
                    });
                }

                let total = host.roll(self, count_n as u32, sides_n as u32)?;
                Ok(Value::Number(total as f64))
            }

            Operator::SetTemp => {
                let (key, value) = match operand {
                    Value::List(items) if items.len() == 2 => (&items[0], &items[1]),
                    Value::Map(map) => (
                        map.get("key").ok_or_else(|| missing(op, "key"))?,
                        map.get("value").ok_or_else(|| missing(op, "value"))?,
                    ),
                    _ => return Err(malformed(op, "expected [key, value]")),
                };
                let key = self.eval(key, host)?;
                let key = key.as_key().ok_or_else(|| mismatch(op, &key))?;
                let value = self.eval(value, host)?;
                self.set_temp(key, value.clone());
                Ok(value)
            }

            Operator::Quantity => {
                let resource = self.eval(named_operand(operand, "value"), host)?;
                let resource = resource.as_key().ok_or_else(|| mismatch(op, &resource))?;
                Ok(self
                    .owner()
                    .and_then(|owner| host.quantity(&owner, &resource))
                    .map(Value::Number)
                    .unwrap_or_default())
            }

            Operator::Initiative => Ok(self
                .owner()
                .and_then(|owner| host.initiative(&owner))
                .map(Value::Number)
                .unwrap_or_default()),

            Operator::IsInPlay => Ok(self
                .owner()
                .and_then(|owner| host.in_play(&owner))
                .map(Value::Bool)
                .unwrap_or_default()),
        }
    }
}
