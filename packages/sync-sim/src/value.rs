//! Values that flow through the statement interpreter.
//!
//! Scalars are stored inline. Synchronization objects live in the
//! environment's object store and are referenced by handle, so assigning a
//! semaphore to a second name aliases the same semaphore.

use std::fmt;

use crate::ids::{LightswitchId, SemaphoreId};

/// A value bound in the shared variable environment.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Semaphore(SemaphoreId),
    Lightswitch(LightswitchId),
    Builtin(Builtin),
}

/// Functions visible to every row without being bound in the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Semaphore,
    RandomSemaphore,
    Lightswitch,
    Pid,
    NumThreads,
    Len,
    Str,
    Int,
    Abs,
    Min,
    Max,
    Random,
    Randint,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        let builtin = match name {
            "Semaphore" => Builtin::Semaphore,
            "RandomSemaphore" => Builtin::RandomSemaphore,
            "Lightswitch" => Builtin::Lightswitch,
            "pid" => Builtin::Pid,
            "num_threads" => Builtin::NumThreads,
            "len" => Builtin::Len,
            "str" => Builtin::Str,
            "int" => Builtin::Int,
            "abs" => Builtin::Abs,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "random" => Builtin::Random,
            "randint" => Builtin::Randint,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Semaphore => "Semaphore",
            Builtin::RandomSemaphore => "RandomSemaphore",
            Builtin::Lightswitch => "Lightswitch",
            Builtin::Pid => "pid",
            Builtin::NumThreads => "num_threads",
            Builtin::Len => "len",
            Builtin::Str => "str",
            Builtin::Int => "int",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Random => "random",
            Builtin::Randint => "randint",
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Semaphore(_) => "Semaphore",
            Value::Lightswitch(_) => "Lightswitch",
            Value::Builtin(_) => "builtin_function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Semaphore(_) | Value::Lightswitch(_) | Value::Builtin(_) => true,
        }
    }

    /// Numeric view used by arithmetic; booleans count as 0/1 like Python.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(*b as i64)),
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }
}

/// Arithmetic operand after numeric coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

pub(crate) fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Semaphore(id) => write!(f, "<Semaphore #{}>", id.index()),
            Value::Lightswitch(id) => write!(f, "<Lightswitch #{}>", id.index()),
            Value::Builtin(b) => write!(f, "<built-in function {}>", b.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_style_rendering() {
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(Value::Str("A".into()).to_string(), "A");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Semaphore(SemaphoreId(0)).is_truthy());
        assert!(!Value::None.is_truthy());
    }

    #[test]
    fn test_builtin_lookup_roundtrip() {
        for name in ["Semaphore", "pid", "num_threads", "randint"] {
            let builtin = Builtin::lookup(name).expect("builtin exists");
            assert_eq!(builtin.name(), name);
        }
        assert!(Builtin::lookup("eval").is_none());
    }
}
