use std::collections::HashMap;

use miniscroll_api::{Guid, ObjectHandle};

use crate::context::Context;
use crate::Mini;

/// Everything miniscroll remembers about a bound engine object, fixed at
/// creation.
#[derive(Debug, Clone)]
pub struct MiniObject {
    handle: ObjectHandle,
    guid: Option<Guid>,
    /// Binding key the object's section hierarchy matched
    class_name: String,
    /// The object's own section, shared by every object created from it
    context: Context,
    /// The object's GUID-named section, holding per-object overrides
    instance_context: Context,
    input_names: Vec<String>,
}

impl MiniObject {
    pub(crate) fn new(
        handle: ObjectHandle,
        guid: Option<Guid>,
        class_name: String,
        context: Context,
        instance_context: Context,
        input_names: Vec<String>,
    ) -> Self {
        Self {
            handle,
            guid,
            class_name,
            context,
            instance_context,
            input_names,
        }
    }

    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    pub fn guid(&self) -> Option<Guid> {
        self.guid
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn instance_context(&self) -> &Context {
        &self.instance_context
    }

    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }
}

/// A live wrapper: the user's state plus the object metadata.
pub struct Instance {
    pub(crate) object: MiniObject,
    pub(crate) mini: Box<dyn Mini>,
}

impl Instance {
    pub(crate) fn new(object: MiniObject, mini: Box<dyn Mini>) -> Self {
        Self { object, mini }
    }

    pub fn object(&self) -> &MiniObject {
        &self.object
    }

    /// The user state, if it is a `T`
    pub fn downcast_ref<T: Mini>(&self) -> Option<&T> {
        let mini: &dyn Mini = &*self.mini;
        mini.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Mini>(&mut self) -> Option<&mut T> {
        let mini: &mut dyn Mini = &mut *self.mini;
        mini.as_any_mut().downcast_mut::<T>()
    }
}

/// Owns one wrapper per live bound engine object.
///
/// Entries are only added on object creation and only removed on object
/// deletion. Iteration follows insertion order.
#[derive(Default)]
pub struct InstanceRegistry {
    instances: HashMap<ObjectHandle, Instance>,
    order: Vec<ObjectHandle>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance unless its handle already has one.
    ///
    /// Returns the stored instance, or `None` if the handle was taken.
    pub(crate) fn insert(&mut self, instance: Instance) -> Option<&mut Instance> {
        let handle = instance.object.handle();
        if self.instances.contains_key(&handle) {
            return None;
        }
        self.order.push(handle);
        Some(self.instances.entry(handle).or_insert(instance))
    }

    pub(crate) fn remove(&mut self, handle: ObjectHandle) -> Option<Instance> {
        let instance = self.instances.remove(&handle)?;
        self.order.retain(|&h| h != handle);
        Some(instance)
    }

    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.instances.contains_key(&handle)
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&Instance> {
        self.instances.get(&handle)
    }

    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut Instance> {
        self.instances.get_mut(&handle)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Handles of all live instances, oldest first
    pub fn handles(&self) -> &[ObjectHandle] {
        &self.order
    }

    /// All live instances, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Instance> + '_ {
        self.order.iter().filter_map(|h| self.instances.get(h))
    }

    /// The `T` wrapper for `handle`, if it has one
    pub fn get_as<T: Mini>(&self, handle: ObjectHandle) -> Option<&T> {
        self.get(handle).and_then(Instance::downcast_ref::<T>)
    }

    pub fn get_as_mut<T: Mini>(&mut self, handle: ObjectHandle) -> Option<&mut T> {
        self.get_mut(handle).and_then(Instance::downcast_mut::<T>)
    }

    /// Every live `T` wrapper with its handle, oldest first
    pub fn objects<T: Mini>(&self) -> impl Iterator<Item = (ObjectHandle, &T)> + '_ {
        self.iter()
            .filter_map(|i| i.downcast_ref::<T>().map(|t| (i.object.handle(), t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Ship;
    impl Mini for Ship {}

    #[derive(Default)]
    struct Rock;
    impl Mini for Rock {}

    fn instance<T: Mini + Default>(raw: u64) -> Instance {
        let handle = ObjectHandle::new(raw);
        let object = MiniObject::new(
            handle,
            None,
            "Test".to_string(),
            Context::new("Test", None),
            Context::new(handle.to_string(), None),
            Vec::new(),
        );
        Instance::new(object, Box::new(T::default()))
    }

    #[test]
    fn test_insert_refuses_second_instance_for_handle() {
        let mut registry = InstanceRegistry::new();
        assert!(registry.insert(instance::<Ship>(1)).is_some());
        assert!(registry.insert(instance::<Rock>(1)).is_none());

        assert_eq!(registry.len(), 1);
        assert!(registry.get_as::<Ship>(ObjectHandle::new(1)).is_some());
        assert!(registry.get_as::<Rock>(ObjectHandle::new(1)).is_none());
    }

    #[test]
    fn test_iteration_follows_insertion_order() {
        let mut registry = InstanceRegistry::new();
        for raw in [5, 2, 9, 1] {
            registry.insert(instance::<Ship>(raw));
        }
        registry.remove(ObjectHandle::new(9));

        let order: Vec<u64> = registry.iter().map(|i| i.object().handle().raw()).collect();
        assert_eq!(order, vec![5, 2, 1]);
    }

    #[test]
    fn test_objects_filters_by_type() {
        let mut registry = InstanceRegistry::new();
        registry.insert(instance::<Ship>(1));
        registry.insert(instance::<Rock>(2));
        registry.insert(instance::<Ship>(3));

        let ships: Vec<u64> = registry.objects::<Ship>().map(|(h, _)| h.raw()).collect();
        assert_eq!(ships, vec![1, 3]);
        assert_eq!(registry.objects::<Rock>().count(), 1);
    }

    #[test]
    fn test_remove_missing_handle_is_none() {
        let mut registry = InstanceRegistry::new();
        assert!(registry.remove(ObjectHandle::new(4)).is_none());
        assert!(registry.is_empty());
    }
}
