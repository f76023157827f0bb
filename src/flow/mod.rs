//! Portable serialization of component graphs
//!
//! A live graph of [`Component`]s serializes to a [`FlowDescriptor`]:
//! nested components are hoisted into named sub-flows, parameters are
//! JSON-encoded, and the descriptor records version tags and dependency
//! lines. [`FlowCodec`] reconstructs the graph through a
//! [`ComponentRegistry`] of class factories, refusing flows this crate
//! did not produce or whose dependencies are unsatisfied.

mod component;
mod deps;
mod descriptor;
mod deserialize;
mod error;
mod serialize;
mod value;

pub use component::{
    crate_version_tag, ClassEntry, Component, ComponentRegistry, ParamMap, Stack,
};
pub use deps::{parse_dependency, Dependency, InstalledPackages, LooseVersion, VersionOp};
pub use descriptor::FlowDescriptor;
pub use error::{FlowError, Result};
pub use serialize::FlowCodec;
pub use value::{components_equal, FlowValue, ScalarType, SERIALIZED_OBJECT_TAG};
