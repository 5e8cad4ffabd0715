use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Float,
    Bool,
    Str,
}

impl DataType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }

    pub fn zero(self) -> Value {
        match self {
            DataType::Int => Value::Int(0),
            DataType::Float => Value::Float(0.0),
            DataType::Bool => Value::Bool(false),
            DataType::Str => Value::Str("''".to_string()),
        }
    }

    // float dominates int; callers must have rejected non-numeric operands already
    pub fn unify_numeric(a: DataType, b: DataType) -> DataType {
        if a == DataType::Float || b == DataType::Float {
            DataType::Float
        } else {
            DataType::Int
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Bool => "bool",
            DataType::Str => "str",
        };
        f.write_str(name)
    }
}

/// A compile-time literal. Strings keep the quotes they were written with.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn datatype(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Bool(_) => DataType::Bool,
            Value::Str(_) => DataType::Str,
        }
    }

    // widens an int to float when the target type asks for it
    pub(crate) fn widen_to(self, datatype: DataType) -> Value {
        match (self, datatype) {
            (Value::Int(v), DataType::Float) => Value::Float(v as f64),
            (value, _) => value,
        }
    }

    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    // string contents without the surrounding quotes
    pub(crate) fn str_contents(&self) -> Option<&str> {
        match self {
            Value::Str(s) if s.len() >= 2 => Some(&s[1..s.len() - 1]),
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            // the VM treats a zero residue as true
            Value::Bool(v) => write!(f, "{}", if *v { 0 } else { 1 }),
            Value::Str(s) => f.write_str(s),
        }
    }
}
