use std::collections::{HashMap, HashSet};

use miniscroll_api::{Engine, ObjectHandle};
use tracing::{trace, warn};

use crate::registry::MiniObject;
use crate::Mini;

/// Builds the wrapper for a newly created engine object
pub type MiniFactory = Box<dyn Fn(&MiniObject) -> Box<dyn Mini>>;

/// Bindings from config section names to the wrapper types created for
/// objects whose section hierarchy contains that name.
#[derive(Default)]
pub struct ClassBindings {
    classes: HashMap<String, MiniFactory>,
}

/// Result of resolving an object against [`ClassBindings`]
pub struct Resolved<'b> {
    /// The object's own section
    pub section: String,
    /// The bound ancestor (or the section itself) that matched
    pub class_name: &'b str,
    pub factory: &'b MiniFactory,
}

impl ClassBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `section` to `T`, created with `T::default()`.
    ///
    /// Replaces any previous binding for the same section.
    pub fn bind<T: Mini + Default>(&mut self, section: impl Into<String>) -> &mut Self {
        self.bind_with(section, |_| T::default())
    }

    /// Bind `section` to a wrapper built from the object's metadata
    pub fn bind_with<T, F>(&mut self, section: impl Into<String>, factory: F) -> &mut Self
    where
        T: Mini,
        F: Fn(&MiniObject) -> T + 'static,
    {
        self.classes.insert(
            section.into(),
            Box::new(move |object: &MiniObject| Box::new(factory(object)) as Box<dyn Mini>),
        );
        self
    }

    pub fn with<T: Mini + Default>(mut self, section: impl Into<String>) -> Self {
        self.bind::<T>(section);
        self
    }

    pub fn unbind(&mut self, section: &str) -> bool {
        self.classes.remove(section).is_some()
    }

    pub fn contains(&self, section: &str) -> bool {
        self.classes.contains_key(section)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Bound section names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Find the binding for `object` by walking up its section's parents.
    ///
    /// Starts at the object's own section and stops at the first bound name,
    /// or when a section has no parent.
    pub fn resolve(&self, engine: &dyn Engine, object: ObjectHandle) -> Option<Resolved<'_>> {
        let section = engine.object_section(object)?;
        let mut visited = HashSet::new();
        let mut name = section.clone();

        loop {
            if let Some((class_name, factory)) = self.classes.get_key_value(&name) {
                return Some(Resolved {
                    section,
                    class_name: class_name.as_str(),
                    factory,
                });
            }
            if !visited.insert(name.clone()) {
                warn!(
                    target: "miniscroll",
                    "Section '{}' inherits from itself (via '{}'), treating {} as unbound",
                    section, name, object
                );
                return None;
            }
            match engine.parent_section(&name) {
                Some(parent) => name = parent,
                None => {
                    trace!(target: "miniscroll", "No bound class for {} (section '{}')", object, section);
                    return None;
                }
            }
        }
    }
}
