//! The value model crossing the serialization boundary
//!
//! Parameters travel as [`FlowValue`] trees. Plain JSON shapes map
//! one to one; values JSON cannot express (types, function handles,
//! hoisted components) are encoded as single-key tagged objects under
//! [`SERIALIZED_OBJECT_TAG`].

use super::component::Component;
use super::error::{FlowError, Result};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::rc::Rc;

/// Tag key marking a JSON object as an encoded non-JSON value
pub const SERIALIZED_OBJECT_TAG: &str = "corredor:serialized_object";

/// Scalar element types a parameter may name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    F32,
    F64,
    I32,
    I64,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
            ScalarType::I32 => "i32",
            ScalarType::I64 => "i64",
        }
    }

    /// Parse a type name; `float` and `int` alias the wide variants
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "f32" => Ok(ScalarType::F32),
            "f64" | "float" => Ok(ScalarType::F64),
            "i32" => Ok(ScalarType::I32),
            "i64" | "int" => Ok(ScalarType::I64),
            other => Err(FlowError::UnknownType(other.to_string())),
        }
    }
}

/// A parameter value
///
/// `Tuple` and `List` both encode as JSON arrays; the distinction only
/// matters before encoding, where step lists are recognized by their
/// tuple shape. `Map` keys are sorted on encode so equal values encode
/// identically.
#[derive(Clone)]
pub enum FlowValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<FlowValue>),
    Tuple(Vec<FlowValue>),
    Map(Vec<(String, FlowValue)>),
    /// A scalar type name
    TypeRef(ScalarType),
    /// A registered free function, by path
    FunctionRef(String),
    /// A registered method descriptor, by path
    MethodRef(String),
    /// Placeholder for a component hoisted into a sibling sub-flow
    ComponentRef {
        key: String,
        step_name: Option<String>,
        argument: Option<String>,
    },
    /// A live component; must be hoisted before encoding
    Component(Rc<dyn Component>),
}

impl FlowValue {
    /// Encode to JSON; live components must already be hoisted
    pub fn to_json(&self) -> Result<Value> {
        match self {
            FlowValue::Null => Ok(Value::Null),
            FlowValue::Bool(b) => Ok(Value::Bool(*b)),
            FlowValue::Int(i) => Ok(Value::Number((*i).into())),
            FlowValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .ok_or(FlowError::NonFiniteNumber(*f)),
            FlowValue::Str(s) => Ok(Value::String(s.clone())),
            FlowValue::List(items) | FlowValue::Tuple(items) => Ok(Value::Array(
                items.iter().map(FlowValue::to_json).collect::<Result<_>>()?,
            )),
            FlowValue::Map(entries) => {
                let mut sorted: Vec<_> = entries.iter().collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                let mut map = Map::new();
                for (k, v) in sorted {
                    if k == SERIALIZED_OBJECT_TAG {
                        return Err(FlowError::InvalidKey(k.clone()));
                    }
                    map.insert(k.clone(), v.to_json()?);
                }
                Ok(Value::Object(map))
            }
            FlowValue::TypeRef(t) => Ok(tagged("type", Value::String(t.name().to_string()))),
            FlowValue::FunctionRef(path) => {
                Ok(tagged("function", Value::String(path.clone())))
            }
            FlowValue::MethodRef(path) => {
                Ok(tagged("methoddescriptor", Value::String(path.clone())))
            }
            FlowValue::ComponentRef {
                key,
                step_name,
                argument,
            } => {
                let mut body = Map::new();
                body.insert("key".to_string(), Value::String(key.clone()));
                body.insert(
                    "step_name".to_string(),
                    step_name.clone().map_or(Value::Null, Value::String),
                );
                body.insert(
                    "argument_1".to_string(),
                    argument.clone().map_or(Value::Null, Value::String),
                );
                Ok(tagged("component_reference", Value::Object(body)))
            }
            FlowValue::Component(c) => {
                Err(FlowError::UnhoistedComponent(c.class_path().to_string()))
            }
        }
    }

    /// Decode from JSON; tagged objects become their reference variants
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(FlowValue::Null),
            Value::Bool(b) => Ok(FlowValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(FlowValue::Int(i))
                } else {
                    Ok(FlowValue::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            Value::String(s) => Ok(FlowValue::Str(s.clone())),
            Value::Array(items) => Ok(FlowValue::List(
                items.iter().map(FlowValue::from_json).collect::<Result<_>>()?,
            )),
            Value::Object(map) => match map.get(SERIALIZED_OBJECT_TAG).and_then(Value::as_str) {
                Some("type") => {
                    let name = map.get("value").and_then(Value::as_str).unwrap_or_default();
                    Ok(FlowValue::TypeRef(ScalarType::parse(name)?))
                }
                Some("function") => Ok(FlowValue::FunctionRef(
                    map.get("value")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                )),
                Some("methoddescriptor") => Ok(FlowValue::MethodRef(
                    map.get("value")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                )),
                Some("component_reference") => {
                    let body = map.get("value").cloned().unwrap_or(Value::Null);
                    let key = body
                        .get("key")
                        .and_then(Value::as_str)
                        .ok_or_else(|| FlowError::MissingComponent(body.to_string()))?
                        .to_string();
                    let step_name = body
                        .get("step_name")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    let argument = body
                        .get("argument_1")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    Ok(FlowValue::ComponentRef {
                        key,
                        step_name,
                        argument,
                    })
                }
                Some(other) => Err(FlowError::UnknownSerializedKind(other.to_string())),
                None => Ok(FlowValue::Map(
                    map.iter()
                        .map(|(k, v)| Ok((k.clone(), FlowValue::from_json(v)?)))
                        .collect::<Result<_>>()?,
                )),
            },
        }
    }
}

// Hand-written because trait objects carry no Debug bound; components
// print as their class path.
impl fmt::Debug for FlowValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowValue::Null => f.write_str("Null"),
            FlowValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            FlowValue::Int(i) => f.debug_tuple("Int").field(i).finish(),
            FlowValue::Float(x) => f.debug_tuple("Float").field(x).finish(),
            FlowValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            FlowValue::List(items) => f.debug_tuple("List").field(items).finish(),
            FlowValue::Tuple(items) => f.debug_tuple("Tuple").field(items).finish(),
            FlowValue::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            FlowValue::TypeRef(t) => f.debug_tuple("TypeRef").field(t).finish(),
            FlowValue::FunctionRef(path) => f.debug_tuple("FunctionRef").field(path).finish(),
            FlowValue::MethodRef(path) => f.debug_tuple("MethodRef").field(path).finish(),
            FlowValue::ComponentRef {
                key,
                step_name,
                argument,
            } => f
                .debug_struct("ComponentRef")
                .field("key", key)
                .field("step_name", step_name)
                .field("argument", argument)
                .finish(),
            FlowValue::Component(c) => {
                f.debug_tuple("Component").field(&c.class_path()).finish()
            }
        }
    }
}

fn tagged(kind: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(
        SERIALIZED_OBJECT_TAG.to_string(),
        Value::String(kind.to_string()),
    );
    map.insert("value".to_string(), value);
    Value::Object(map)
}

/// Structural equality over component graphs
///
/// Two components are equal when class path, parameters, and children
/// match recursively; identity is irrelevant.
pub fn components_equal(a: &Rc<dyn Component>, b: &Rc<dyn Component>) -> bool {
    if a.class_path() != b.class_path() {
        return false;
    }
    if a.params() != b.params() {
        return false;
    }
    let (ca, cb) = (a.children(), b.children());
    ca.len() == cb.len()
        && ca
            .iter()
            .zip(&cb)
            .all(|((na, a), (nb, b))| na == nb && components_equal(a, b))
}

impl PartialEq for FlowValue {
    fn eq(&self, other: &Self) -> bool {
        use FlowValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) | (Tuple(a), Tuple(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (TypeRef(a), TypeRef(b)) => a == b,
            (FunctionRef(a), FunctionRef(b)) => a == b,
            (MethodRef(a), MethodRef(b)) => a == b,
            (
                ComponentRef {
                    key: ka,
                    step_name: sa,
                    argument: aa,
                },
                ComponentRef {
                    key: kb,
                    step_name: sb,
                    argument: ab,
                },
            ) => ka == kb && sa == sb && aa == ab,
            (Component(a), Component(b)) => components_equal(a, b),
            _ => false,
        }
    }
}
