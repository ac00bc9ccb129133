use std::fmt;

pub type EntityIndex = u32;
pub type Generation = u32;

/// A generational handle: a dead index is never confused with a live one
/// reusing the same slot, because the generation no longer matches.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    index: EntityIndex,
    generation: Generation,
}

impl Entity {
    /// Sentinel handle that is never alive. Used as a "no entity" placeholder
    /// in relation fields and blueprint cross-references.
    pub const NULL: Entity = Entity {
        index: EntityIndex::MAX,
        generation: 0,
    };

    pub fn index(self) -> EntityIndex {
        self.index
    }

    pub fn generation(self) -> Generation {
        self.generation
    }

    pub fn is_null(self) -> bool {
        self.index == EntityIndex::MAX
    }

    #[cfg(test)]
    pub(crate) fn for_test(index: EntityIndex, generation: Generation) -> Entity {
        Entity { index, generation }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

/// Reflected so a component's `FieldsTrait` can name an `Entity`-typed field,
/// letting blueprint instantiation recognize and rewrite cross-references
/// (§4.12) instead of copying a dangling blueprint-local handle verbatim.
impl ecs_reflect::Reflect for Entity {
    const NAME: &'static str = "Entity";

    fn build_descriptor(id: ecs_reflect::ReflectId) -> ecs_reflect::TypeDescriptor {
        unsafe fn destruct(_ptr: *mut u8) {}
        unsafe fn copy_construct(src: *const u8, dst: *mut u8) {
            std::ptr::copy_nonoverlapping(src, dst, std::mem::size_of::<Entity>());
        }
        ecs_reflect::TypeDescriptor {
            id,
            name: Self::NAME,
            size: std::mem::size_of::<Entity>(),
            align: std::mem::align_of::<Entity>(),
            constructible: Some(ecs_reflect::ConstructibleTrait {
                default_construct: None,
                copy_construct: Some(copy_construct),
                move_construct: None,
                destruct,
            }),
            fields: None,
            array: None,
            dictionary: None,
            string_conversion: None,
            nullable: None,
        }
    }
}

/// Allocates entity indices and tracks their current generation. Does not know
/// about archetypes or rows; that mapping lives in `World`.
#[derive(Default)]
pub struct EntityManager {
    generations: Vec<Generation>,
    alive: Vec<bool>,
    free: Vec<EntityIndex>,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            self.alive[index as usize] = true;
            Entity {
                index,
                generation: self.generations[index as usize],
            }
        } else {
            let index = self.generations.len() as EntityIndex;
            self.generations.push(0);
            self.alive.push(true);
            Entity { index, generation: 0 }
        }
    }

    pub fn alive(&self, e: Entity) -> bool {
        if e.is_null() {
            return false;
        }
        let idx = e.index as usize;
        idx < self.generations.len() && self.alive[idx] && self.generations[idx] == e.generation
    }

    /// Bumps the slot's generation and returns it to the free list. Returns
    /// `false` if `e` was already dead (a no-op, not an error).
    pub fn destroy(&mut self, e: Entity) -> bool {
        if !self.alive(e) {
            return false;
        }
        let idx = e.index as usize;
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free.push(e.index);
        true
    }

    pub fn live_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_destroy_cycle() {
        let mut mgr = EntityManager::new();
        let e = mgr.create();
        assert!(mgr.alive(e));
        assert!(mgr.destroy(e));
        assert!(!mgr.alive(e));
        assert!(!mgr.destroy(e));
    }

    #[test]
    fn reused_index_gets_new_generation() {
        let mut mgr = EntityManager::new();
        let e1 = mgr.create();
        mgr.destroy(e1);
        let e2 = mgr.create();
        assert_eq!(e1.index(), e2.index());
        assert_ne!(e1.generation(), e2.generation());
        assert!(!mgr.alive(e1));
        assert!(mgr.alive(e2));
    }

    #[test]
    fn null_is_never_alive() {
        let mgr = EntityManager::new();
        assert!(!mgr.alive(Entity::NULL));
    }
}
