use crate::query::AccessSet;
use crate::resource::{ResourceReadGuard, ResourceWriteGuard};
use crate::world::World;

/// One system parameter kind's fetch lifecycle, split into the three hooks
/// the original engine's `SystemFetcher` used: `plan` runs once at
/// registration and produces whatever the other two hooks need, `declare
/// _access` folds the parameter's reads/writes into the system's `AccessSet`
/// for conflict checking, and `prepare` runs once per schedule tick to borrow
/// the actual value (§4.10).
pub trait SystemParam {
    type Plan;
    type Prepared<'w>;

    fn plan() -> Self::Plan;
    fn declare_access(plan: &Self::Plan, access: &mut AccessSet);
    fn prepare<'w>(world: &'w World, plan: &Self::Plan) -> Self::Prepared<'w>;
}

pub struct Res<'w, T> {
    guard: ResourceReadGuard<'w, T>,
}

impl<T> std::ops::Deref for Res<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: std::any::Any + Send + Sync> SystemParam for Res<'_, T> {
    type Plan = ();
    type Prepared<'w> = Res<'w, T>;

    fn plan() {}

    fn declare_access(_plan: &(), _access: &mut AccessSet) {}

    fn prepare<'w>(world: &'w World, _plan: &()) -> Res<'w, T> {
        Res {
            guard: world
                .resources()
                .read::<T>()
                .unwrap_or_else(|| panic!("resource {} not present", std::any::type_name::<T>())),
        }
    }
}

pub struct ResMut<'w, T> {
    guard: ResourceWriteGuard<'w, T>,
}

impl<T> std::ops::Deref for ResMut<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> std::ops::DerefMut for ResMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T: std::any::Any + Send + Sync> SystemParam for ResMut<'_, T> {
    type Plan = ();
    type Prepared<'w> = ResMut<'w, T>;

    fn plan() {}

    fn declare_access(_plan: &(), _access: &mut AccessSet) {}

    fn prepare<'w>(world: &'w World, _plan: &()) -> ResMut<'w, T> {
        ResMut {
            guard: world
                .resources()
                .write::<T>()
                .unwrap_or_else(|| panic!("resource {} not present", std::any::type_name::<T>())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;

    #[derive(Debug, PartialEq)]
    struct Score(u32);

    #[test]
    fn res_and_res_mut_prepare_against_the_same_resource_slot() {
        let mut world = World::new(WorldConfig::default());
        world.resources_mut().insert(Score(0));

        {
            let mut score = ResMut::<Score>::prepare(&world, &ResMut::<Score>::plan());
            score.0 += 5;
        }

        let score = Res::<Score>::prepare(&world, &Res::<Score>::plan());
        assert_eq!(*score, Score(5));
    }
}
