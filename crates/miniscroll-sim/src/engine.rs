use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use miniscroll_api::{
    BodyPart, ClockId, Engine, EngineCallbacks, EngineEvent, Guid, ObjectHandle, ShaderParam,
    ShaderParamType, Vector,
};
use tracing::{debug, trace, warn};

use crate::error::SimError;
use crate::scene::{ContactDef, InputSetDef, Scene, ScriptStep, SectionDef, SpawnDef};

const GUID_BASE: u64 = 0x0100_0000_0000_0000;

/// A trigger event fired on an object, as recorded by the simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTrigger {
    pub object: ObjectHandle,
    pub event: String,
    pub refinements: Vec<String>,
}

#[derive(Debug, Clone)]
struct SimObject {
    section: String,
    guid: Guid,
    clock: Option<ClockId>,
    overrides: BTreeMap<String, String>,
    deleting: bool,
}

/// A headless engine that keeps config, input and objects in memory.
///
/// Notifications (creation, deletion, contacts) are queued and delivered by
/// [`SimEngine::pump`], so callbacks may freely create or delete objects
/// while they run. [`SimEngine::tick`] plays one frame: pending
/// notifications, the update callback, then whatever the update queued.
///
/// Every object gets an instance section named after its GUID. It inherits
/// from the object's own section and holds the object's overrides.
#[derive(Debug, Default)]
pub struct SimEngine {
    sections: BTreeMap<String, SectionDef>,
    input_sets: BTreeMap<String, InputSetDef>,
    clock_names: BTreeMap<String, ClockId>,
    clocks: Vec<f32>,

    objects: BTreeMap<ObjectHandle, SimObject>,
    guids: HashMap<Guid, ObjectHandle>,
    next_object: u64,

    section_stack: Vec<String>,
    input_stack: Vec<String>,
    unbalanced_pops: usize,

    enabled_sets: BTreeSet<String>,
    pressed: BTreeSet<String>,

    pending: VecDeque<EngineEvent>,
    triggers: Vec<FiredTrigger>,
    ticks: u64,
}

impl SimEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with the scene's config, input sets and clocks. Nothing is
    /// spawned yet, see [`SimEngine::spawn_scene`].
    pub fn from_scene(scene: &Scene) -> Self {
        let mut engine = Self {
            sections: scene.sections.clone(),
            input_sets: scene.input_sets.clone(),
            ..Self::default()
        };
        for (name, clock) in &scene.clocks {
            engine.define_clock(name, clock.multiplier);
        }
        engine
    }

    // ===== Setup =====

    pub fn define_section(&mut self, name: &str, parent: Option<&str>, values: &[(&str, &str)]) {
        let section = SectionDef {
            parent: parent.map(str::to_string),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        self.sections.insert(name.to_string(), section);
    }

    pub fn define_input_set(&mut self, name: &str, actions: &[&str]) {
        let set = InputSetDef {
            actions: actions.iter().map(|a| a.to_string()).collect(),
        };
        self.input_sets.insert(name.to_string(), set);
    }

    /// Add a clock that scales frame deltas by `multiplier`. Sections refer
    /// to it by name through their `Clock` value.
    pub fn define_clock(&mut self, name: &str, multiplier: f32) -> ClockId {
        let id = ClockId(self.clocks.len() as u32);
        self.clocks.push(multiplier);
        self.clock_names.insert(name.to_string(), id);
        id
    }

    pub fn set_clock_multiplier(&mut self, clock: ClockId, multiplier: f32) {
        if let Some(slot) = self.clocks.get_mut(clock.0 as usize) {
            *slot = multiplier;
        }
    }

    // ===== Objects =====

    /// Create an object from `section` and queue its creation notification
    pub fn spawn(&mut self, section: &str) -> Result<ObjectHandle, SimError> {
        self.spawn_with(section, BTreeMap::new())
    }

    /// Like [`SimEngine::spawn`], with values for the object's instance section
    pub fn spawn_with(
        &mut self,
        section: &str,
        overrides: BTreeMap<String, String>,
    ) -> Result<ObjectHandle, SimError> {
        if !self.sections.contains_key(section) {
            return Err(SimError::UnknownSection(section.to_string()));
        }

        self.next_object += 1;
        let handle = ObjectHandle::new(self.next_object);
        let guid = Guid::new(GUID_BASE + self.next_object);
        let clock = self
            .lookup(section, "Clock")
            .and_then(|name| self.clock_names.get(name))
            .copied();

        self.objects.insert(
            handle,
            SimObject {
                section: section.to_string(),
                guid,
                clock,
                overrides,
                deleting: false,
            },
        );
        self.guids.insert(guid, handle);
        self.pending.push_back(EngineEvent::Created(handle));

        debug!(target: "miniscroll::sim", "Spawned {} from '{}' ({})", handle, section, guid);
        Ok(handle)
    }

    /// Spawn everything the scene lists under `[[spawn]]`
    pub fn spawn_scene(&mut self, scene: &Scene) -> Result<Vec<ObjectHandle>, SimError> {
        let mut spawned = Vec::new();
        for SpawnDef {
            section,
            count,
            values,
        } in &scene.spawn
        {
            for _ in 0..*count {
                spawned.push(self.spawn_with(section, values.clone())?);
            }
        }
        Ok(spawned)
    }

    /// Queue the object's deletion. It stays queryable until the deletion
    /// notification has been delivered.
    pub fn despawn(&mut self, object: ObjectHandle) -> Result<(), SimError> {
        let entry = self
            .objects
            .get_mut(&object)
            .ok_or(SimError::UnknownObject(object))?;
        if entry.deleting {
            return Err(SimError::AlreadyDeleted(object));
        }
        entry.deleting = true;
        self.pending.push_back(EngineEvent::Deleted(object));
        debug!(target: "miniscroll::sim", "Despawning {}", object);
        Ok(())
    }

    pub fn is_alive(&self, object: ObjectHandle) -> bool {
        self.objects
            .get(&object)
            .is_some_and(|entry| !entry.deleting)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Live objects created from `section`, oldest first
    pub fn objects_of(&self, section: &str) -> Vec<ObjectHandle> {
        self.objects
            .iter()
            .filter(|(_, entry)| !entry.deleting && entry.section == section)
            .map(|(handle, _)| *handle)
            .collect()
    }

    /// Queue a collision between two body parts
    pub fn collide(
        &mut self,
        first: BodyPart,
        second: BodyPart,
        position: Vector,
        normal: Vector,
    ) -> Result<(), SimError> {
        self.check_alive(first.object)?;
        self.check_alive(second.object)?;
        self.pending.push_back(EngineEvent::CollisionBegin {
            first,
            second,
            position,
            normal,
        });
        Ok(())
    }

    /// Queue the end of a collision between two body parts
    pub fn separate(&mut self, first: BodyPart, second: BodyPart) -> Result<(), SimError> {
        self.check_alive(first.object)?;
        self.check_alive(second.object)?;
        self.pending
            .push_back(EngineEvent::CollisionEnd { first, second });
        Ok(())
    }

    fn check_alive(&self, object: ObjectHandle) -> Result<(), SimError> {
        if self.is_alive(object) {
            Ok(())
        } else {
            Err(SimError::UnknownObject(object))
        }
    }

    // ===== Input =====

    /// Mark `action` as activated for the next tick
    pub fn press(&mut self, action: &str) {
        self.pressed.insert(action.to_string());
    }

    // ===== Driving callbacks =====

    /// Deliver the init notification, then anything it queued
    pub fn init(&mut self, callbacks: &mut dyn EngineCallbacks) -> anyhow::Result<()> {
        EngineEvent::Init.deliver(callbacks, self)?;
        self.pump(callbacks)?;
        Ok(())
    }

    /// Deliver queued notifications until the queue is empty, including the
    /// ones queued while delivering. Returns how many were delivered.
    pub fn pump(&mut self, callbacks: &mut dyn EngineCallbacks) -> anyhow::Result<usize> {
        let mut delivered = 0;
        while let Some(event) = self.pending.pop_front() {
            trace!(target: "miniscroll::sim", "Delivering {} notification", event.kind());
            let result = event.deliver(callbacks, self);
            if let EngineEvent::Deleted(object) = event {
                self.destroy(object);
            }
            result?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Play one frame of `dt` seconds.
    ///
    /// The frame is counted and its presses cleared even when a callback fails.
    pub fn tick(&mut self, callbacks: &mut dyn EngineCallbacks, dt: f32) -> anyhow::Result<()> {
        let result = self.pump(callbacks).and_then(|_| {
            EngineEvent::Update { dt }.deliver(callbacks, self)?;
            self.pump(callbacks)?;
            Ok(())
        });
        self.pressed.clear();
        self.ticks += 1;
        result
    }

    /// Ask the callbacks for a shader parameter of `object`
    pub fn shader_param(
        &mut self,
        callbacks: &mut dyn EngineCallbacks,
        object: ObjectHandle,
        shader: &str,
        param: &str,
        param_type: ShaderParamType,
    ) -> anyhow::Result<Option<ShaderParam>> {
        callbacks.on_shader_param(self, object, shader, param, param_type)
    }

    /// Apply a scripted step: presses, spawns, deletions and contacts
    pub fn apply_step(&mut self, step: &ScriptStep) -> Result<(), SimError> {
        for action in &step.press {
            self.press(action);
        }
        for section in &step.spawn {
            self.spawn(section)?;
        }
        for section in &step.despawn {
            for object in self.objects_of(section) {
                self.despawn(object)?;
            }
        }
        for contact in &step.collide {
            let (first, second) = self.contact_parts(contact)?;
            self.collide(first, second, contact.position, contact.normal)?;
        }
        for contact in &step.separate {
            let (first, second) = self.contact_parts(contact)?;
            self.separate(first, second)?;
        }
        Ok(())
    }

    fn contact_parts(&self, contact: &ContactDef) -> Result<(BodyPart, BodyPart), SimError> {
        let first = self.first_of(&contact.first)?;
        let second = self.first_of(&contact.second)?;
        Ok((
            BodyPart::new(first, contact.first_part.clone()),
            BodyPart::new(second, contact.second_part.clone()),
        ))
    }

    fn first_of(&self, section: &str) -> Result<ObjectHandle, SimError> {
        self.objects_of(section)
            .into_iter()
            .next()
            .ok_or_else(|| SimError::NoObjectFor(section.to_string()))
    }

    // ===== Inspection =====

    pub fn section_depth(&self) -> usize {
        self.section_stack.len()
    }

    pub fn input_set_depth(&self) -> usize {
        self.input_stack.len()
    }

    pub fn active_section(&self) -> Option<&str> {
        self.section_stack.last().map(String::as_str)
    }

    pub fn active_input_set(&self) -> Option<&str> {
        self.input_stack.last().map(String::as_str)
    }

    /// Pops that found an empty stack
    pub fn unbalanced_pops(&self) -> usize {
        self.unbalanced_pops
    }

    pub fn is_input_set_enabled(&self, set: &str) -> bool {
        self.enabled_sets.contains(set)
    }

    pub fn triggers(&self) -> &[FiredTrigger] {
        &self.triggers
    }

    pub fn take_triggers(&mut self) -> Vec<FiredTrigger> {
        std::mem::take(&mut self.triggers)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // ===== Internals =====

    fn destroy(&mut self, object: ObjectHandle) {
        if let Some(entry) = self.objects.remove(&object) {
            self.guids.remove(&entry.guid);
            debug!(target: "miniscroll::sim", "Destroyed {}", object);
        }
    }

    fn instance_object(&self, section: &str) -> Option<&SimObject> {
        let guid = Guid::parse(section)?;
        let handle = self.guids.get(&guid)?;
        self.objects.get(handle)
    }

    fn own_value(&self, section: &str, key: &str) -> Option<&str> {
        if let Some(def) = self.sections.get(section) {
            return def.values.get(key).map(String::as_str);
        }
        self.instance_object(section)?
            .overrides
            .get(key)
            .map(String::as_str)
    }

    fn parent_of(&self, section: &str) -> Option<&str> {
        if let Some(def) = self.sections.get(section) {
            return def.parent.as_deref();
        }
        self.instance_object(section).map(|o| o.section.as_str())
    }

    /// Value of `key` in `section` or the nearest ancestor that has it
    fn lookup(&self, section: &str, key: &str) -> Option<&str> {
        let mut visited = HashSet::new();
        let mut current = Some(section);
        while let Some(name) = current {
            if !visited.insert(name) {
                warn!(target: "miniscroll::sim", "Inheritance cycle through '{}'", name);
                return None;
            }
            if let Some(value) = self.own_value(name, key) {
                return Some(value);
            }
            current = self.parent_of(name);
        }
        None
    }

    fn active_lookup(&self, key: &str) -> Option<&str> {
        self.lookup(self.active_section()?, key)
    }
}

impl Engine for SimEngine {
    fn object_section(&self, object: ObjectHandle) -> Option<String> {
        self.objects.get(&object).map(|o| o.section.clone())
    }

    fn object_guid(&self, object: ObjectHandle) -> Option<Guid> {
        self.objects.get(&object).map(|o| o.guid)
    }

    fn object_from_guid(&self, guid: Guid) -> Option<ObjectHandle> {
        self.guids.get(&guid).copied()
    }

    fn create_object(&mut self, section: &str) -> Option<ObjectHandle> {
        match self.spawn(section) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(target: "miniscroll::sim", "Cannot create object: {}", e);
                None
            }
        }
    }

    fn fire_trigger(&mut self, object: ObjectHandle, event: &str, refinements: &[&str]) {
        trace!(target: "miniscroll::sim", "Trigger '{}' {:?} on {}", event, refinements, object);
        self.triggers.push(FiredTrigger {
            object,
            event: event.to_string(),
            refinements: refinements.iter().map(|r| r.to_string()).collect(),
        });
    }

    fn parent_section(&self, section: &str) -> Option<String> {
        self.parent_of(section).map(str::to_string)
    }

    fn has_value(&self, key: &str) -> bool {
        self.active_lookup(key).is_some()
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.active_lookup(key).map(str::to_string)
    }

    fn get_guid(&self, key: &str) -> Option<Guid> {
        self.active_lookup(key).and_then(Guid::parse)
    }

    fn push_section(&mut self, section: &str) {
        self.section_stack.push(section.to_string());
    }

    fn pop_section(&mut self) {
        if self.section_stack.pop().is_none() {
            warn!(target: "miniscroll::sim", "pop_section with an empty section stack");
            self.unbalanced_pops += 1;
        }
    }

    fn enable_input_set(&mut self, set: &str) {
        self.enabled_sets.insert(set.to_string());
    }

    fn push_input_set(&mut self, set: &str) {
        self.input_stack.push(set.to_string());
    }

    fn pop_input_set(&mut self) {
        if self.input_stack.pop().is_none() {
            warn!(target: "miniscroll::sim", "pop_input_set with an empty input set stack");
            self.unbalanced_pops += 1;
        }
    }

    fn input_actions(&self) -> Vec<String> {
        self.active_input_set()
            .and_then(|set| self.input_sets.get(set))
            .map(|set| set.actions.clone())
            .unwrap_or_default()
    }

    fn has_been_activated(&self, action: &str) -> bool {
        let Some(set) = self.active_input_set() else {
            return false;
        };
        self.enabled_sets.contains(set)
            && self
                .input_sets
                .get(set)
                .is_some_and(|def| def.actions.iter().any(|a| a == action))
            && self.pressed.contains(action)
    }

    fn object_clock(&self, object: ObjectHandle) -> Option<ClockId> {
        self.objects.get(&object)?.clock
    }

    fn compute_dt(&self, clock: ClockId, dt: f32) -> f32 {
        match self.clocks.get(clock.0 as usize) {
            Some(multiplier) => dt * multiplier,
            None => dt,
        }
    }
}
