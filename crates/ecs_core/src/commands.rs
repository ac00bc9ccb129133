use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::blueprint::Blueprint;
use crate::entity::Entity;
use crate::world::World;

/// A handle to an entity that will exist once a `CommandBuffer` is
/// committed. Lets buffered commands reference an entity spawned earlier in
/// the same buffer before it has a real `Entity` id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PendingEntity(u32);

/// Resolves to a blueprint's name -> fresh-entity mapping once the
/// `CommandBuffer` that queued the instantiation has committed (§4.9).
#[derive(Clone)]
pub struct BlueprintInstantiation {
    output: Arc<Mutex<Option<HashMap<String, Entity>>>>,
}

impl BlueprintInstantiation {
    /// Returns the mapping, or `None` if the owning buffer hasn't committed yet.
    pub fn get(&self) -> Option<HashMap<String, Entity>> {
        self.output.lock().unwrap().clone()
    }
}

#[derive(Clone, Copy, Debug)]
enum Target {
    Real(Entity),
    Pending(PendingEntity),
}

impl From<Entity> for Target {
    fn from(e: Entity) -> Self {
        Target::Real(e)
    }
}

impl From<PendingEntity> for Target {
    fn from(p: PendingEntity) -> Self {
        Target::Pending(p)
    }
}

fn resolve(target: Target, map: &HashMap<PendingEntity, Entity>) -> Option<Entity> {
    match target {
        Target::Real(e) => Some(e),
        Target::Pending(p) => map.get(&p).copied(),
    }
}

type DynOp = Box<dyn FnOnce(&mut World, &HashMap<PendingEntity, Entity>) + Send>;

/// Queues structural mutations for later, atomic application via `commit`.
/// A system only ever sees a shared view of the world while it runs, so it
/// buffers spawns/adds/removes/relations/destroys here instead of applying
/// them immediately; `commit` replays them against a live `&mut World`,
/// firing observers along the way. A command whose target entity died
/// before commit is dropped with a warning rather than erroring the whole
/// batch (§4.9).
#[derive(Default)]
pub struct CommandBuffer {
    next_pending: u32,
    spawns: Vec<PendingEntity>,
    ops: Vec<DynOp>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a placeholder for an entity that will be created on commit.
    pub fn spawn(&mut self) -> PendingEntity {
        let pending = PendingEntity(self.next_pending);
        self.next_pending += 1;
        self.spawns.push(pending);
        pending
    }

    pub fn add<T, E>(&mut self, target: E, value: T)
    where
        T: ecs_reflect::Reflect + Send + 'static,
        E: Into<Target>,
    {
        let target = target.into();
        self.ops.push(Box::new(move |world, map| {
            let Some(entity) = resolve(target, map) else {
                tracing::warn!("dropping buffered add: pending entity never spawned");
                return;
            };
            if world.is_alive(entity) {
                let _ = world.add(entity, value);
            } else {
                tracing::warn!(?entity, "dropping buffered add: target died before commit");
            }
        }));
    }

    pub fn remove<T, E>(&mut self, target: E)
    where
        T: ecs_reflect::Reflect + Send + 'static,
        E: Into<Target>,
    {
        let target = target.into();
        self.ops.push(Box::new(move |world, map| {
            let Some(entity) = resolve(target, map) else {
                return;
            };
            if world.is_alive(entity) {
                let _ = world.remove::<T>(entity);
            } else {
                tracing::warn!(?entity, "dropping buffered remove: target died before commit");
            }
        }));
    }

    pub fn destroy<E>(&mut self, target: E)
    where
        E: Into<Target>,
    {
        let target = target.into();
        self.ops.push(Box::new(move |world, map| {
            let Some(entity) = resolve(target, map) else {
                return;
            };
            if world.destroy(entity).is_err() {
                tracing::warn!(?entity, "dropping buffered destroy: target already dead");
            }
        }));
    }

    pub fn relate<T, E>(&mut self, from: E, to: E, value: T)
    where
        T: ecs_reflect::Reflect + Send + 'static,
        E: Into<Target>,
    {
        let from = from.into();
        let to = to.into();
        self.ops.push(Box::new(move |world, map| {
            let (Some(from), Some(to)) = (resolve(from, map), resolve(to, map)) else {
                tracing::warn!("dropping buffered relate: an endpoint never spawned");
                return;
            };
            if world.is_alive(from) && world.is_alive(to) {
                if let Err(err) = world.relate(from, to, value) {
                    tracing::warn!(?err, "buffered relate rejected at commit");
                }
            } else {
                tracing::warn!(?from, ?to, "dropping buffered relate: an endpoint died before commit");
            }
        }));
    }

    pub fn unrelate<T, E>(&mut self, from: E, to: E)
    where
        T: ecs_reflect::Reflect + Send + 'static,
        E: Into<Target>,
    {
        let from = from.into();
        let to = to.into();
        self.ops.push(Box::new(move |world, map| {
            let (Some(from), Some(to)) = (resolve(from, map), resolve(to, map)) else {
                return;
            };
            let _ = world.unrelate::<T>(from, to);
        }));
    }

    /// Queues `blueprint`'s instantiation against the world at commit time
    /// (§4.9). The returned handle resolves to the name -> fresh-entity
    /// mapping once this buffer has been committed; reading it before that
    /// yields `None`.
    pub fn instantiate(&mut self, blueprint: Arc<Blueprint>) -> BlueprintInstantiation {
        let output = Arc::new(Mutex::new(None));
        let handle = BlueprintInstantiation {
            output: output.clone(),
        };
        self.ops.push(Box::new(move |world, _map| {
            let mapping = blueprint.instantiate(world);
            *output.lock().unwrap() = Some(mapping);
        }));
        handle
    }

    /// Discards every buffered command without applying any of them.
    pub fn abort(&mut self) {
        self.spawns.clear();
        self.ops.clear();
    }

    /// Applies every buffered spawn (in reservation order) and then every
    /// other op (in call order) to `world`, returning the real entities that
    /// back each `PendingEntity`, indexed by reservation order.
    pub fn commit(&mut self, world: &mut World) -> Vec<Entity> {
        let mut map = HashMap::new();
        let mut created = Vec::with_capacity(self.spawns.len());
        for pending in self.spawns.drain(..) {
            let entity = world.create();
            map.insert(pending, entity);
            created.push(entity);
        }
        for op in self.ops.drain(..) {
            op(world, &map);
        }
        created
    }
}
