//! Typed data slots: input/output data ports and scoped variables.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a data port, unique within its declaring state.
///
/// Input ports, output ports and scoped variables of one state share
/// this namespace.
pub type PortId = u32;

/// Runtime data exchanged between states, keyed by port name.
pub type DataMap = serde_json::Map<String, Value>;

/// Declared type of a data port.
///
/// `Null` is accepted by every type and stands for "no value yet".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Any,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
}

impl DataType {
    /// Check whether a value conforms to this type (pure).
    ///
    /// # Example
    ///
    /// ```rust
    /// use arbor::core::DataType;
    /// use serde_json::json;
    ///
    /// assert!(DataType::Int.accepts(&json!(5)));
    /// assert!(!DataType::Int.accepts(&json!("five")));
    /// assert!(DataType::Float.accepts(&json!(5)));
    /// assert!(DataType::Str.accepts(&json!(null)));
    /// ```
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            Self::Any => true,
            Self::Bool => value.is_boolean(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Str => value.is_string(),
            Self::List => value.is_array(),
            Self::Map => value.is_object(),
        }
    }

    /// Whether data of type `self` may flow into a port of type `target`.
    pub fn flows_into(&self, target: DataType) -> bool {
        *self == target
            || matches!(self, Self::Any)
            || matches!(target, Self::Any)
            || matches!((self, target), (Self::Int, Self::Float))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::List => "list",
            Self::Map => "map",
        };
        f.write_str(name)
    }
}

/// Typed, named data slot with an optional default value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataPort {
    pub id: PortId,
    pub name: String,
    pub data_type: DataType,
    pub default_value: Option<Value>,
}

impl DataPort {
    pub fn new(id: PortId, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id,
            name: name.into(),
            data_type,
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// The value a port holds before anything is written to it.
    pub fn initial_value(&self) -> Value {
        self.default_value.clone().unwrap_or(Value::Null)
    }
}

/// A container-owned data slot that additionally carries a current value.
///
/// The value is mutated during execution by data flows that target the
/// variable; whether it survives into the next run is decided by
/// [`ScopedVariablePolicy`](crate::config::ScopedVariablePolicy).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScopedVariable {
    port: DataPort,
    value: Value,
}

impl ScopedVariable {
    pub fn new(port: DataPort) -> Self {
        let value = port.initial_value();
        Self { port, value }
    }

    pub fn port(&self) -> &DataPort {
        &self.port
    }

    pub fn id(&self) -> PortId {
        self.port.id
    }

    pub fn name(&self) -> &str {
        &self.port.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    pub(crate) fn reset(&mut self) {
        self.value = self.port.initial_value();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_matches_json_shapes() {
        assert!(DataType::Bool.accepts(&json!(true)));
        assert!(DataType::List.accepts(&json!([1, 2])));
        assert!(DataType::Map.accepts(&json!({"a": 1})));
        assert!(!DataType::Int.accepts(&json!(1.5)));
        assert!(!DataType::Map.accepts(&json!([1])));
        assert!(DataType::Any.accepts(&json!("anything")));
    }

    #[test]
    fn int_flows_into_float_but_not_back() {
        assert!(DataType::Int.flows_into(DataType::Float));
        assert!(!DataType::Float.flows_into(DataType::Int));
        assert!(DataType::Any.flows_into(DataType::Str));
        assert!(!DataType::Str.flows_into(DataType::Bool));
    }

    #[test]
    fn port_initial_value_falls_back_to_null() {
        let port = DataPort::new(0, "in", DataType::Int);
        assert_eq!(port.initial_value(), Value::Null);

        let port = port.with_default(json!(7));
        assert_eq!(port.initial_value(), json!(7));
    }

    #[test]
    fn scoped_variable_reset_restores_default() {
        let mut variable = ScopedVariable::new(DataPort::new(3, "counter", DataType::Int).with_default(json!(0)));
        variable.set_value(json!(10));
        assert_eq!(variable.value(), &json!(10));

        variable.reset();
        assert_eq!(variable.value(), &json!(0));
    }
}
