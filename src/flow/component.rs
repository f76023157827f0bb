//! The component seam and the class registry
//!
//! Anything serializable as a flow implements [`Component`]: it names
//! its class, exposes its constructor parameters as a [`ParamMap`], and
//! lists nested components as named children. Deserialization goes the
//! other way through a [`ComponentRegistry`] of class factories.

use super::error::{FlowError, Result};
use super::value::FlowValue;
use crate::metrics::MetricFn;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Constructor parameters keyed by name
pub type ParamMap = BTreeMap<String, FlowValue>;

/// Version tag of this crate, `name==version`
pub fn crate_version_tag() -> String {
    format!("{}=={}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// A model piece that can cross the serialization boundary
pub trait Component {
    /// Dotted class path, stable across versions
    fn class_path(&self) -> &str;

    /// Constructor parameters, children included as live values
    fn params(&self) -> ParamMap;

    /// Named nested components, in construction order
    fn children(&self) -> Vec<(String, Rc<dyn Component>)> {
        vec![]
    }

    /// Containers hold children as their primary structure
    fn is_container(&self) -> bool {
        false
    }

    /// Version tag of the package providing this class
    fn package_version(&self) -> String {
        crate_version_tag()
    }
}

/// How to rebuild one component class from its parameters
pub struct ClassEntry {
    pub factory: fn(ParamMap) -> Result<Rc<dyn Component>>,
    /// Parameters reset to their defaults when rebuilding fresh
    pub defaults: Vec<String>,
}

/// Class factories and function handles known to the codec
#[derive(Default)]
pub struct ComponentRegistry {
    classes: HashMap<String, ClassEntry>,
    functions: HashMap<String, MetricFn>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the crate's own classes and functions installed
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_class(
            Stack::CLASS_PATH,
            ClassEntry {
                factory: stack_factory,
                defaults: vec![],
            },
        );
        registry.register_function("corredor.metrics.accuracy", crate::metrics::accuracy);
        registry
    }

    pub fn register_class(&mut self, path: impl Into<String>, entry: ClassEntry) {
        self.classes.insert(path.into(), entry);
    }

    pub fn register_function(&mut self, path: impl Into<String>, func: MetricFn) {
        self.functions.insert(path.into(), func);
    }

    pub fn class(&self, path: &str) -> Result<&ClassEntry> {
        self.classes
            .get(path)
            .ok_or_else(|| FlowError::UnknownClass(path.to_string()))
    }

    pub fn function(&self, path: &str) -> Result<MetricFn> {
        self.functions
            .get(path)
            .copied()
            .ok_or_else(|| FlowError::UnknownFunction(path.to_string()))
    }
}

/// Ordered container of named components
///
/// The canonical container shape: its one parameter is the step list,
/// and every step is hoisted into a sub-flow on serialization.
pub struct Stack {
    steps: Vec<(String, Rc<dyn Component>)>,
}

impl Stack {
    pub const CLASS_PATH: &'static str = "corredor.flow.Stack";

    pub fn new(steps: Vec<(String, Rc<dyn Component>)>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[(String, Rc<dyn Component>)] {
        &self.steps
    }
}

impl Component for Stack {
    fn class_path(&self) -> &str {
        Self::CLASS_PATH
    }

    fn params(&self) -> ParamMap {
        let steps = self
            .steps
            .iter()
            .map(|(name, component)| {
                FlowValue::Tuple(vec![
                    FlowValue::Str(name.clone()),
                    FlowValue::Component(component.clone()),
                ])
            })
            .collect();
        let mut params = ParamMap::new();
        params.insert("steps".to_string(), FlowValue::List(steps));
        params
    }

    fn children(&self) -> Vec<(String, Rc<dyn Component>)> {
        self.steps.clone()
    }

    fn is_container(&self) -> bool {
        true
    }
}

fn stack_factory(mut params: ParamMap) -> Result<Rc<dyn Component>> {
    let raw = params
        .remove("steps")
        .ok_or_else(|| FlowError::MissingParameter {
            class: Stack::CLASS_PATH.to_string(),
            name: "steps".to_string(),
        })?;
    let items = match raw {
        FlowValue::List(items) | FlowValue::Tuple(items) => items,
        _ => {
            return Err(FlowError::BadParameter {
                class: Stack::CLASS_PATH.to_string(),
                name: "steps".to_string(),
            })
        }
    };
    let mut steps = Vec::with_capacity(items.len());
    for item in items {
        match item {
            FlowValue::Tuple(mut pair) | FlowValue::List(mut pair) if pair.len() == 2 => {
                let component = pair.pop();
                let name = pair.pop();
                match (name, component) {
                    (Some(FlowValue::Str(name)), Some(FlowValue::Component(component))) => {
                        steps.push((name, component));
                    }
                    _ => {
                        return Err(FlowError::BadParameter {
                            class: Stack::CLASS_PATH.to_string(),
                            name: "steps".to_string(),
                        })
                    }
                }
            }
            _ => {
                return Err(FlowError::BadParameter {
                    class: Stack::CLASS_PATH.to_string(),
                    name: "steps".to_string(),
                })
            }
        }
    }
    Ok(Rc::new(Stack::new(steps)))
}
