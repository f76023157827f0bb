//! Flow descriptor back to a live component graph
//!
//! Reconstruction walks the parameter text, resolving every
//! `component_reference` by consuming the matching hoisted sub-flow
//! exactly once and rebuilding it through the class registry. Steps
//! come back as `(name, component)` tuples via the reference's
//! `step_name`.

use super::component::{Component, ParamMap};
use super::descriptor::{ComponentPool, FlowDescriptor};
use super::error::{FlowError, Result};
use super::serialize::{check_uniqueness, FlowCodec};
use super::value::FlowValue;
use std::rc::Rc;

impl FlowCodec<'_> {
    /// Whether this crate produced the flow
    pub fn can_handle(&self, flow: &FlowDescriptor) -> bool {
        let prefix = concat!(env!("CARGO_PKG_NAME"), "==");
        flow.external_version
            .split(',')
            .any(|tag| tag.trim().starts_with(prefix))
    }

    /// Rebuild the component graph with its stored parameters
    pub fn deserialize(&self, flow: &FlowDescriptor) -> Result<Rc<dyn Component>> {
        self.reconstruct(flow, false)
    }

    /// Rebuild with defaulted parameters reset to their class defaults
    pub fn deserialize_with_defaults(&self, flow: &FlowDescriptor) -> Result<Rc<dyn Component>> {
        self.reconstruct(flow, true)
    }

    fn reconstruct(
        &self,
        flow: &FlowDescriptor,
        with_defaults: bool,
    ) -> Result<Rc<dyn Component>> {
        if !self.can_handle(flow) {
            return Err(FlowError::ForeignFlow(flow.name.clone()));
        }
        self.packages.check(&flow.dependencies)?;
        check_uniqueness(flow)?;
        self.deserialize_flow(flow, with_defaults)
    }

    fn deserialize_flow(
        &self,
        flow: &FlowDescriptor,
        with_defaults: bool,
    ) -> Result<Rc<dyn Component>> {
        let class_path = strip_unique_suffix(&flow.class_name);
        let entry = self.registry.class(class_path)?;
        let mut pool = ComponentPool::new(&flow.components);

        let mut params = ParamMap::new();
        for (name, raw) in &flow.parameters {
            let value = parse_parameter(raw)?;
            // Defaulted parameters are dropped unless they carry
            // sub-components; those fix the flow's structure.
            if with_defaults
                && entry.defaults.iter().any(|d| d == name)
                && !contains_component_ref(&value)
            {
                continue;
            }
            let resolved = self.resolve_parsed(value, &mut pool, with_defaults)?;
            params.insert(name.clone(), resolved);
        }
        (entry.factory)(params)
    }

    /// Resolve a value, JSON-parsing string payloads first
    fn resolve_value(
        &self,
        value: FlowValue,
        pool: &mut ComponentPool,
        with_defaults: bool,
    ) -> Result<FlowValue> {
        if let FlowValue::Str(text) = &value {
            // Not every string is JSON; plain strings stay as they are.
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(text) {
                let parsed = FlowValue::from_json(&json)?;
                return self.resolve_parsed(parsed, pool, with_defaults);
            }
            return Ok(value);
        }
        self.resolve_parsed(value, pool, with_defaults)
    }

    /// Resolve an already-parsed value; strings here are final
    fn resolve_parsed(
        &self,
        value: FlowValue,
        pool: &mut ComponentPool,
        with_defaults: bool,
    ) -> Result<FlowValue> {
        match value {
            FlowValue::ComponentRef {
                key,
                step_name,
                argument,
            } => {
                let sub = pool.take(&key)?;
                let component = self.deserialize_flow(&sub, with_defaults)?;
                Ok(match (step_name, argument) {
                    (Some(name), None) => FlowValue::Tuple(vec![
                        FlowValue::Str(name),
                        FlowValue::Component(component),
                    ]),
                    (Some(name), Some(arg)) => FlowValue::Tuple(vec![
                        FlowValue::Str(name),
                        FlowValue::Component(component),
                        FlowValue::Str(arg),
                    ]),
                    // Without a step name the reference stands for the
                    // component itself; a stray argument is ignored.
                    (None, _) => FlowValue::Component(component),
                })
            }
            FlowValue::List(items) => Ok(FlowValue::List(
                items
                    .into_iter()
                    .map(|v| self.resolve_value(v, pool, with_defaults))
                    .collect::<Result<_>>()?,
            )),
            FlowValue::Tuple(items) => Ok(FlowValue::Tuple(
                items
                    .into_iter()
                    .map(|v| self.resolve_value(v, pool, with_defaults))
                    .collect::<Result<_>>()?,
            )),
            FlowValue::Map(entries) => Ok(FlowValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((k, self.resolve_value(v, pool, with_defaults)?)))
                    .collect::<Result<_>>()?,
            )),
            FlowValue::FunctionRef(path) => {
                // Validate the handle resolves before handing it back.
                self.registry.function(&path)?;
                Ok(FlowValue::FunctionRef(path))
            }
            other => Ok(other),
        }
    }
}

/// Parse a parameter's stored text; non-JSON text is a plain string
fn parse_parameter(raw: &str) -> Result<FlowValue> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => FlowValue::from_json(&json),
        Err(_) => Ok(FlowValue::Str(raw.to_string())),
    }
}

fn contains_component_ref(value: &FlowValue) -> bool {
    match value {
        FlowValue::ComponentRef { .. } | FlowValue::Component(_) => true,
        FlowValue::List(items) | FlowValue::Tuple(items) => {
            items.iter().any(contains_component_ref)
        }
        FlowValue::Map(entries) => entries.iter().any(|(_, v)| contains_component_ref(v)),
        _ => false,
    }
}

/// Drop the random hex tag appended to class names on serialization
pub(crate) fn strip_unique_suffix(class_name: &str) -> &str {
    match class_name.rsplit_once('.') {
        Some((head, tail))
            if tail.len() == 16 && tail.chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            head
        }
        _ => class_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::component::ComponentRegistry;
    use std::collections::BTreeMap;

    #[test]
    fn test_strip_unique_suffix() {
        assert_eq!(
            strip_unique_suffix("corredor.flow.Stack.00112233aabbccdd"),
            "corredor.flow.Stack"
        );
        // No tag, or a segment that only looks partly hex, stays intact.
        assert_eq!(strip_unique_suffix("corredor.flow.Stack"), "corredor.flow.Stack");
        assert_eq!(strip_unique_suffix("demo.Dense"), "demo.Dense");
        assert_eq!(strip_unique_suffix("nodots"), "nodots");
    }

    #[test]
    fn test_non_json_parameter_text_stays_a_string() {
        assert_eq!(
            parse_parameter("relu").unwrap(),
            FlowValue::Str("relu".to_string())
        );
        assert_eq!(parse_parameter("3").unwrap(), FlowValue::Int(3));
        assert_eq!(
            parse_parameter("\"quoted\"").unwrap(),
            FlowValue::Str("quoted".to_string())
        );
    }

    #[test]
    fn test_foreign_flow_is_rejected() {
        let registry = ComponentRegistry::with_builtins();
        let codec = FlowCodec::new(&registry);
        let flow = FlowDescriptor {
            name: "torch.nn.Sequential".to_string(),
            class_name: "torch.nn.Sequential".to_string(),
            description: String::new(),
            parameters: BTreeMap::new(),
            components: vec![],
            external_version: "keras==3.0,torch==2.1".to_string(),
            dependencies: String::new(),
            tags: vec![],
        };
        assert!(!codec.can_handle(&flow));
        assert!(matches!(
            codec.deserialize(&flow),
            Err(FlowError::ForeignFlow(_))
        ));
    }

    #[test]
    fn test_unsatisfied_dependencies_are_rejected() {
        let registry = ComponentRegistry::with_builtins();
        let codec = FlowCodec::new(&registry);
        let flow = FlowDescriptor {
            name: "corredor.flow.Stack.0011223344556677".to_string(),
            class_name: "corredor.flow.Stack.0011223344556677".to_string(),
            description: String::new(),
            parameters: BTreeMap::new(),
            components: vec![],
            external_version: crate::flow::component::crate_version_tag(),
            dependencies: "ndarray>=99.0".to_string(),
            tags: vec![],
        };
        assert!(matches!(
            codec.deserialize(&flow),
            Err(FlowError::DependencyUnsatisfied { .. })
        ));
    }
}
