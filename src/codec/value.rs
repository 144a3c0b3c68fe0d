//! Scalar values and outbound messages.
//!
//! Every field on the wire is text. [`Value`] captures what callers hand
//! in and how each kind is stringified:
//!
//! | value | field |
//! |---|---|
//! | `true` / `false` | `"1"` / `"0"` |
//! | integers, floats | decimal text |
//! | `None` | empty field |
//! | nested list | items joined by `,` in one field |
//!
//! # Example
//!
//! ```
//! use tws_wire::codec::{Message, Value};
//!
//! let msg = Message::from(vec![Value::from(71), Value::from(true), Value::from("x")]);
//! assert_eq!(msg.fields(), vec!["71", "1", "x"]);
//! ```

use std::fmt;

/// One outbound field before stringification.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value, encoded as an empty field.
    Null,
    /// Boolean, encoded as `1` / `0`.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Double precision number.
    Float(f64),
    /// Single precision number, printed at its own precision.
    Float32(f32),
    /// Text, sent verbatim.
    Text(String),
    /// Nested grouping, collapsed into one comma-joined field.
    List(Vec<Value>),
}

impl Value {
    /// Stringify this value as a single wire field.
    pub fn to_field(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
            Value::Int(n) => write!(f, "{}", n),
            Value::UInt(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Float32(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! impl_from_int {
    ($variant:ident: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_int!(Int: i8, i16, i32, i64);
impl_from_int!(UInt: u8, u16, u32, u64);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

/// An ordered outbound message.
///
/// Building a message flattens exactly one level: a single list value
/// becomes the message's fields, any list nested inside stays one field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message(Vec<Value>);

impl Message {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value.
    pub fn push(mut self, value: impl Into<Value>) -> Self {
        self.0.push(value.into());
        self
    }

    /// Values in field order.
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the message has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stringified fields in order.
    pub fn fields(&self) -> Vec<String> {
        self.0.iter().map(Value::to_field).collect()
    }
}

impl From<Vec<Value>> for Message {
    fn from(values: Vec<Value>) -> Self {
        Message(values)
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        match value {
            Value::List(items) => Message(items),
            scalar => Message(vec![scalar]),
        }
    }
}

impl From<&str> for Message {
    fn from(v: &str) -> Self {
        Message(vec![Value::from(v)])
    }
}

impl From<String> for Message {
    fn from(v: String) -> Self {
        Message(vec![Value::from(v)])
    }
}

impl FromIterator<Value> for Message {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Message(iter.into_iter().collect())
    }
}

/// Build a [`Message`] from heterogeneous values.
///
/// ```
/// use tws_wire::msg;
///
/// let m = msg![176, 2, "5", false];
/// assert_eq!(m.fields(), vec!["176", "2", "5", "0"]);
/// ```
#[macro_export]
macro_rules! msg {
    () => { $crate::codec::Message::new() };
    ($($v:expr),+ $(,)?) => {
        $crate::codec::Message::from(vec![$($crate::codec::Value::from($v)),+])
    };
}
