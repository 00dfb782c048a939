//! # Machine Assembly
//!
//! An [`Emulation`] owns a set of named components and drives the configuration
//! protocol over them: properties (`set_value`), references (`set_ref`), data blobs
//! (`set_data`), then `init` in insertion order. A front end that reads a machine
//! description only needs this type and the component constructors.
//!
//! Components that reference each other (CPU and control bus) form `Rc` cycles.
//! [`Emulation::dispose`] breaks them, and dropping an `Emulation` disposes it.

use std::collections::HashMap;
use std::fmt;

use crate::component::{ComponentRef, ConfigError};

/// Errors raised while assembling a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmulationError {
    /// No component registered under this name
    UnknownComponent(String),
    /// A component with this name already exists
    DuplicateComponent(String),
    /// The component rejected the property name or value
    UnknownProperty { component: String, name: String },
    /// The component has no reference with this name
    UnknownRef { component: String, name: String },
    /// The component rejected the data blob
    UnknownData { component: String, name: String },
    /// `init` failed; assembly stopped at this component
    Init {
        component: String,
        source: ConfigError,
    },
}

impl fmt::Display for EmulationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EmulationError::UnknownComponent(name) => write!(f, "unknown component '{}'", name),
            EmulationError::DuplicateComponent(name) => {
                write!(f, "component '{}' already exists", name)
            }
            EmulationError::UnknownProperty { component, name } => {
                write!(f, "{}: cannot set property '{}'", component, name)
            }
            EmulationError::UnknownRef { component, name } => {
                write!(f, "{}: no reference named '{}'", component, name)
            }
            EmulationError::UnknownData { component, name } => {
                write!(f, "{}: cannot set data '{}'", component, name)
            }
            EmulationError::Init { component, source } => {
                write!(f, "{}: initialization failed: {}", component, source)
            }
        }
    }
}

impl std::error::Error for EmulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmulationError::Init { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A machine built from named components.
///
/// # Examples
///
/// ```
/// use a2core::{Component, ControlBus, Emulation, Mos6502, Ram};
///
/// let mut emulation = Emulation::new();
/// emulation.add("controlBus", ControlBus::new()).unwrap();
/// emulation.add("cpu", Mos6502::new()).unwrap();
/// emulation.add("ram", Ram::with_size(0x10000)).unwrap();
///
/// emulation.set_ref("controlBus", "cpu", Some("cpu")).unwrap();
/// emulation.set_ref("cpu", "controlBus", Some("controlBus")).unwrap();
/// emulation.set_ref("cpu", "memoryBus", Some("ram")).unwrap();
/// emulation.set_value("controlBus", "powerState", "on").unwrap();
/// emulation.init().unwrap();
///
/// assert_eq!(emulation.get_value("cpu", "s").unwrap(), "0xff");
/// ```
#[derive(Default)]
pub struct Emulation {
    components: Vec<(String, ComponentRef)>,
    index: HashMap<String, usize>,
}

impl Emulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `component` under `name`. Components are initialized in the order
    /// they are added.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        component: ComponentRef,
    ) -> Result<(), EmulationError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(EmulationError::DuplicateComponent(name));
        }
        self.index.insert(name.clone(), self.components.len());
        self.components.push((name, component));
        Ok(())
    }

    /// Component registered under `name`.
    pub fn get(&self, name: &str) -> Option<ComponentRef> {
        self.index
            .get(name)
            .map(|&slot| self.components[slot].1.clone())
    }

    /// Component names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|(name, _)| name.as_str())
    }

    fn lookup(&self, name: &str) -> Result<ComponentRef, EmulationError> {
        self.get(name)
            .ok_or_else(|| EmulationError::UnknownComponent(name.to_string()))
    }

    pub fn set_value(&self, component: &str, name: &str, value: &str) -> Result<(), EmulationError> {
        if self.lookup(component)?.set_value(name, value) {
            Ok(())
        } else {
            Err(EmulationError::UnknownProperty {
                component: component.to_string(),
                name: name.to_string(),
            })
        }
    }

    pub fn get_value(&self, component: &str, name: &str) -> Result<String, EmulationError> {
        self.lookup(component)?
            .get_value(name)
            .ok_or_else(|| EmulationError::UnknownProperty {
                component: component.to_string(),
                name: name.to_string(),
            })
    }

    /// Points reference `name` of `component` at the component called `target`, or
    /// clears it when `target` is `None`.
    pub fn set_ref(
        &self,
        component: &str,
        name: &str,
        target: Option<&str>,
    ) -> Result<(), EmulationError> {
        let source = self.lookup(component)?;
        let target = target.map(|target| self.lookup(target)).transpose()?;
        if source.set_ref(name, target) {
            Ok(())
        } else {
            Err(EmulationError::UnknownRef {
                component: component.to_string(),
                name: name.to_string(),
            })
        }
    }

    pub fn set_data(&self, component: &str, name: &str, data: &[u8]) -> Result<(), EmulationError> {
        if self.lookup(component)?.set_data(name, data) {
            Ok(())
        } else {
            Err(EmulationError::UnknownData {
                component: component.to_string(),
                name: name.to_string(),
            })
        }
    }

    /// Initializes every component in insertion order, stopping at the first failure.
    pub fn init(&self) -> Result<(), EmulationError> {
        for (name, component) in &self.components {
            if let Err(source) = component.init() {
                log::error!("{}: {}", name, source);
                return Err(EmulationError::Init {
                    component: name.clone(),
                    source,
                });
            }
            log::debug!("{}: initialized", name);
        }
        Ok(())
    }

    /// Calls `update` on every component.
    pub fn update(&self) {
        for (_, component) in &self.components {
            component.update();
        }
    }

    /// Disposes every component in reverse order and forgets them.
    pub fn dispose(&mut self) {
        for (_, component) in self.components.iter().rev() {
            component.dispose();
        }
        self.components.clear();
        self.index.clear();
    }
}

impl Drop for Emulation {
    fn drop(&mut self) {
        self.dispose();
    }
}
