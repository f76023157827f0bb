//! Component graph to flow descriptor
//!
//! Nested components never stay inline: each one is hoisted into the
//! parent's `components` list and replaced in the parameter text by a
//! `component_reference`. Step lists (sequences of `(name, component)`
//! tuples) hoist every step under its identifier; a lone component
//! parameter hoists under the parameter name.

use super::component::{crate_version_tag, Component, ComponentRegistry};
use super::deps::InstalledPackages;
use super::descriptor::FlowDescriptor;
use super::error::{FlowError, Result};
use super::value::FlowValue;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::rc::Rc;

/// Serializes component graphs and reconstructs them from descriptors
pub struct FlowCodec<'r> {
    pub(crate) registry: &'r ComponentRegistry,
    pub(crate) packages: InstalledPackages,
}

/// Intermediate shape of one parameter value during serialization
pub(crate) enum Serialized {
    Plain(FlowValue),
    Flow(FlowDescriptor),
    Seq { tuple: bool, items: Vec<Serialized> },
}

impl<'r> FlowCodec<'r> {
    pub fn new(registry: &'r ComponentRegistry) -> Self {
        Self {
            registry,
            packages: InstalledPackages::default(),
        }
    }

    /// A codec checking dependencies against an explicit package set
    pub fn with_packages(registry: &'r ComponentRegistry, packages: InstalledPackages) -> Self {
        Self { registry, packages }
    }

    /// Serialize a component graph to a flow descriptor
    pub fn serialize(&self, component: &Rc<dyn Component>) -> Result<FlowDescriptor> {
        let flow = self.serialize_component(component)?;
        check_uniqueness(&flow)?;
        Ok(flow)
    }

    fn serialize_component(&self, component: &Rc<dyn Component>) -> Result<FlowDescriptor> {
        let class_path = component.class_path();
        let mut components: Vec<(String, FlowDescriptor)> = Vec::new();
        let mut parameters = BTreeMap::new();

        let mut params = component.params();
        // Containers already route their children through an ordered
        // step parameter; for anything else, children missing from the
        // parameter map are added under their own names.
        if !component.is_container() {
            for (name, child) in component.children() {
                params
                    .entry(name)
                    .or_insert_with(|| FlowValue::Component(child));
            }
        }
        let param_names: Vec<String> = params.keys().cloned().collect();

        for (pname, value) in params {
            let serialized = self.serialize_value(value)?;
            let flow_value = match serialized {
                Serialized::Flow(sub) => {
                    insert_component(&mut components, pname.clone(), sub)?;
                    FlowValue::ComponentRef {
                        key: pname.clone(),
                        step_name: None,
                        argument: None,
                    }
                }
                Serialized::Seq { tuple, items } if is_step_list(&items) => {
                    let reserved: Vec<&str> = param_names
                        .iter()
                        .map(String::as_str)
                        .filter(|n| *n != pname)
                        .collect();
                    let hoisted = hoist_steps(items, &mut components, &reserved)?;
                    if tuple {
                        FlowValue::Tuple(hoisted)
                    } else {
                        FlowValue::List(hoisted)
                    }
                }
                other => lower(other, &pname)?,
            };
            let json = flow_value.to_json()?;
            parameters.insert(pname, serde_json::to_string(&json)?);
        }

        let class_name = format!("{class_path}.{}", unique_suffix());
        let external_version = external_version(component.as_ref(), &components);

        Ok(FlowDescriptor {
            name: class_name.clone(),
            class_name,
            description: "Automatically created flow.".to_string(),
            parameters,
            components,
            external_version,
            dependencies: format!("{}\nndarray>=0.15", crate_version_tag()),
            tags: vec![env!("CARGO_PKG_NAME").to_string()],
        })
    }

    fn serialize_value(&self, value: FlowValue) -> Result<Serialized> {
        match value {
            FlowValue::Component(c) => Ok(Serialized::Flow(self.serialize_component(&c)?)),
            FlowValue::List(items) => Ok(Serialized::Seq {
                tuple: false,
                items: items
                    .into_iter()
                    .map(|v| self.serialize_value(v))
                    .collect::<Result<_>>()?,
            }),
            FlowValue::Tuple(items) => Ok(Serialized::Seq {
                tuple: true,
                items: items
                    .into_iter()
                    .map(|v| self.serialize_value(v))
                    .collect::<Result<_>>()?,
            }),
            other => Ok(Serialized::Plain(other)),
        }
    }
}

/// Random 16-hex-digit tag keeping repeated classes distinct by name
fn unique_suffix() -> String {
    let mut rng = rand::thread_rng();
    format!("{:08x}{:08x}", rng.gen::<u32>(), rng.gen::<u32>())
}

/// Union of version tags from this crate, the component, and sub-flows
fn external_version(
    component: &dyn Component,
    components: &[(String, FlowDescriptor)],
) -> String {
    let mut tags = BTreeSet::new();
    tags.insert(crate_version_tag());
    tags.insert(component.package_version());
    for (_, sub) in components {
        for tag in sub.external_version.split(',') {
            if !tag.is_empty() {
                tags.insert(tag.to_string());
            }
        }
    }
    tags.into_iter().collect::<Vec<_>>().join(",")
}

fn insert_component(
    components: &mut Vec<(String, FlowDescriptor)>,
    key: String,
    flow: FlowDescriptor,
) -> Result<()> {
    if components.iter().any(|(name, _)| *name == key) {
        return Err(FlowError::DuplicateComponent(key));
    }
    components.push((key, flow));
    Ok(())
}

/// A step list is a non-empty run of `(name, component-or-none)` tuples
/// with at least one live component among the payloads
fn is_step_list(items: &[Serialized]) -> bool {
    if items.is_empty() {
        return false;
    }
    let mut has_flow = false;
    for item in items {
        let Serialized::Seq {
            tuple: true,
            items: parts,
        } = item
        else {
            return false;
        };
        if !(2..=3).contains(&parts.len()) {
            return false;
        }
        if !matches!(parts[0], Serialized::Plain(FlowValue::Str(_))) {
            return false;
        }
        match &parts[1] {
            Serialized::Flow(_) => has_flow = true,
            Serialized::Plain(FlowValue::Null) => {}
            _ => return false,
        }
    }
    has_flow
}

/// Hoist each step's component and leave a reference tuple behind
///
/// Step identifiers may not collide with the other parameter names of
/// the owning component; the hoisted key would be ambiguous.
fn hoist_steps(
    items: Vec<Serialized>,
    components: &mut Vec<(String, FlowDescriptor)>,
    reserved: &[&str],
) -> Result<Vec<FlowValue>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Serialized::Seq {
            items: mut parts, ..
        } = item
        else {
            unreachable!("checked by is_step_list");
        };
        let argument = if parts.len() == 3 {
            match parts.pop() {
                Some(Serialized::Plain(FlowValue::Str(arg))) => Some(arg),
                _ => {
                    return Err(FlowError::MalformedStep(
                        "non-string step argument".to_string(),
                    ))
                }
            }
        } else {
            None
        };
        let payload = parts.pop();
        let name = match parts.pop() {
            Some(Serialized::Plain(FlowValue::Str(name))) => name,
            _ => unreachable!("checked by is_step_list"),
        };
        if reserved.contains(&name.as_str()) {
            return Err(FlowError::ShadowedIdentifier(name));
        }
        match payload {
            // The step tuple is rebuilt from `step_name` on decode, so
            // only the reference itself is kept here.
            Some(Serialized::Flow(sub)) => {
                insert_component(components, name.clone(), sub)?;
                out.push(FlowValue::ComponentRef {
                    key: name.clone(),
                    step_name: Some(name),
                    argument,
                });
            }
            // Disabled steps stay inline.
            Some(Serialized::Plain(FlowValue::Null)) => {
                out.push(FlowValue::Tuple(vec![
                    FlowValue::Str(name),
                    FlowValue::Null,
                ]));
            }
            _ => unreachable!("checked by is_step_list"),
        }
    }
    Ok(out)
}

/// Turn a hoist-free intermediate back into a plain value
fn lower(serialized: Serialized, pname: &str) -> Result<FlowValue> {
    match serialized {
        Serialized::Plain(v) => Ok(v),
        Serialized::Flow(_) => Err(FlowError::UnhoistedComponent(pname.to_string())),
        Serialized::Seq { tuple, items } => {
            let items = items
                .into_iter()
                .map(|item| lower(item, pname))
                .collect::<Result<_>>()?;
            Ok(if tuple {
                FlowValue::Tuple(items)
            } else {
                FlowValue::List(items)
            })
        }
    }
}

/// Reject repeated sibling identifiers and repeated flow names anywhere
/// in the tree
pub(crate) fn check_uniqueness(flow: &FlowDescriptor) -> Result<()> {
    let mut names = HashSet::new();
    check_uniqueness_inner(flow, &mut names)
}

fn check_uniqueness_inner<'f>(
    flow: &'f FlowDescriptor,
    names: &mut HashSet<&'f str>,
) -> Result<()> {
    if !names.insert(flow.name.as_str()) {
        return Err(FlowError::ShadowedIdentifier(flow.name.clone()));
    }
    let mut keys = HashSet::new();
    for (key, sub) in &flow.components {
        if !keys.insert(key.as_str()) {
            return Err(FlowError::DuplicateComponent(key.clone()));
        }
        check_uniqueness_inner(sub, names)?;
    }
    Ok(())
}
