use std::any::TypeId as RustTypeId;
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::archetype::ColumnId;
use crate::query::AccessSet;
use crate::world::World;

/// Handle assigned to each registered system.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SystemHandle(u32);

impl SystemHandle {
    fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn new_for_test(index: u32) -> Self {
        Self::new(index)
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declares one system's interaction with the world: which columns it reads
/// and writes, and which resources it reads and writes. Drives both the
/// registry's duplicate-writer rejection and the planner's concurrency
/// decisions (§4.10, §5).
#[derive(Clone, Debug, Default)]
pub struct SystemDescriptor {
    name: String,
    columns: AccessSet,
    resource_reads: Vec<RustTypeId>,
    resource_writes: Vec<RustTypeId>,
}

impl SystemDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn reads(mut self, columns: impl IntoIterator<Item = ColumnId>) -> Self {
        self.columns.reads = Self::sanitize(columns);
        self
    }

    pub fn writes(mut self, columns: impl IntoIterator<Item = ColumnId>) -> Self {
        self.columns.writes = Self::sanitize(columns);
        self
    }

    pub fn reads_resource<T: 'static>(mut self) -> Self {
        self.resource_reads.push(RustTypeId::of::<T>());
        self
    }

    pub fn writes_resource<T: 'static>(mut self) -> Self {
        self.resource_writes.push(RustTypeId::of::<T>());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &AccessSet {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.reads.is_empty()
            && self.columns.writes.is_empty()
            && self.resource_reads.is_empty()
            && self.resource_writes.is_empty()
    }

    fn sanitize(columns: impl IntoIterator<Item = ColumnId>) -> Vec<ColumnId> {
        let mut list: Vec<ColumnId> = columns.into_iter().collect();
        list.sort_unstable();
        list.dedup();
        list
    }

    /// True when running both systems at once could race: either touches the
    /// other's write set, in either direction. Used by the planner to decide
    /// where an implicit ordering edge is required (§4.11, §5); conflicting
    /// systems are serialized, not rejected at registration.
    pub fn conflicts_with(&self, other: &SystemDescriptor) -> bool {
        self.columns.conflicts_with(&other.columns)
            || self
                .resource_writes
                .iter()
                .any(|w| other.resource_writes.contains(w) || other.resource_reads.contains(w))
            || other.resource_writes.iter().any(|w| self.resource_reads.contains(w))
    }

    /// True when this single descriptor is self-contradictory: declaring both
    /// a read and a write of the same resource or component column. A system
    /// like this is invalid regardless of what else is registered (§4.10).
    fn is_self_conflicting(&self) -> bool {
        self.resource_reads.iter().any(|r| self.resource_writes.contains(r))
            || self.columns.reads.iter().any(|c| self.columns.writes.contains(c))
    }
}

#[derive(Debug, Error)]
pub enum SystemRegistrationError {
    #[error("system '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("system '{name}' does not access any components or resources")]
    EmptyAccess { name: String },

    #[error("system '{name}' declares both a read and a write of the same resource or component")]
    SelfConflictingAccess { name: String },
}

pub type SystemFn = Box<dyn FnMut(&mut World) + Send + Sync>;

struct RegisteredSystem {
    handle: SystemHandle,
    descriptor: SystemDescriptor,
    run: SystemFn,
}

/// Owns every system registered with a world: their descriptors (for
/// conflict checking and planning) and their runnable closures.
pub struct SystemRegistry {
    systems: Vec<RegisteredSystem>,
    name_lookup: HashMap<String, SystemHandle>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            name_lookup: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        descriptor: SystemDescriptor,
        run: SystemFn,
    ) -> Result<SystemHandle, SystemRegistrationError> {
        if descriptor.is_empty() {
            return Err(SystemRegistrationError::EmptyAccess {
                name: descriptor.name().to_string(),
            });
        }

        if descriptor.is_self_conflicting() {
            return Err(SystemRegistrationError::SelfConflictingAccess {
                name: descriptor.name().to_string(),
            });
        }

        if self.name_lookup.contains_key(descriptor.name()) {
            return Err(SystemRegistrationError::DuplicateName {
                name: descriptor.name().to_string(),
            });
        }

        // Two systems whose declared accesses conflict are still both valid
        // to register: the planner serializes them with an implicit ordering
        // edge (§4.11) instead of rejecting the registration outright.
        let handle = SystemHandle::new(self.systems.len() as u32);
        self.name_lookup.insert(descriptor.name().to_string(), handle);
        self.systems.push(RegisteredSystem {
            handle,
            descriptor,
            run,
        });
        tracing::debug!(system = handle.index(), "system registered");
        Ok(handle)
    }

    pub fn descriptor(&self, handle: SystemHandle) -> Option<&SystemDescriptor> {
        self.systems.get(handle.index() as usize).map(|s| &s.descriptor)
    }

    pub fn run(&mut self, handle: SystemHandle, world: &mut World) {
        if let Some(system) = self.systems.get_mut(handle.index() as usize) {
            (system.run)(world);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SystemHandle, &SystemDescriptor)> {
        self.systems.iter().map(|s| (s.handle, &s.descriptor))
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl Default for SystemRegistry {
    fn default() -> Self {
        Self::new()
    }
}
