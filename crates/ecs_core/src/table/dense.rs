use std::collections::HashMap;

use crate::archetype::{Archetype, ColumnId};
use crate::entity::Entity;
use crate::type_registry::{registry, TypeId};

/// One column's worth of raw, tightly packed element bytes, plus enough
/// reflection info to (de)construct a row without knowing its Rust type.
struct Column {
    type_id: TypeId,
    elem_size: usize,
    bytes: Vec<u8>,
}

impl Column {
    fn new(type_id: TypeId, elem_size: usize) -> Self {
        Self {
            type_id,
            elem_size,
            bytes: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        if self.elem_size == 0 {
            0
        } else {
            self.bytes.len() / self.elem_size
        }
    }

    fn grow_one(&mut self) {
        let target = self.bytes.len() + self.elem_size;
        self.bytes.resize(target, 0);
    }

    fn ptr(&self, row: usize) -> *const u8 {
        unsafe { self.bytes.as_ptr().add(row * self.elem_size) }
    }

    fn ptr_mut(&mut self, row: usize) -> *mut u8 {
        unsafe { self.bytes.as_mut_ptr().add(row * self.elem_size) }
    }
}

/// One archetype's worth of component storage: parallel columns (one per
/// column id in the archetype), plus the entity each row belongs to. Rows are
/// contiguous and deletion swap-removes with the last row (§3, §4.4).
pub struct DenseTable {
    columns: HashMap<ColumnId, Column>,
    entities: Vec<Entity>,
    row_of: HashMap<Entity, usize>,
}

impl DenseTable {
    pub fn new(archetype: &Archetype) -> Self {
        let mut columns = HashMap::new();
        for &c in &archetype.columns {
            let descriptor = registry()
                .descriptor(c.type_id)
                .expect("archetype column references an unregistered type");
            columns.insert(c, Column::new(c.type_id, descriptor.size));
        }
        Self {
            columns,
            entities: Vec::new(),
            row_of: HashMap::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.entities.len()
    }

    pub fn entity(&self, row: usize) -> Entity {
        self.entities[row]
    }

    pub fn row_of(&self, entity: Entity) -> Option<usize> {
        self.row_of.get(&entity).copied()
    }

    /// Allocates a new row for `entity`, default-constructing every column.
    pub fn push(&mut self, entity: Entity) -> usize {
        let row = self.entities.len();
        for (&col, column) in self.columns.iter_mut() {
            column.grow_one();
            let descriptor = registry()
                .descriptor(col.type_id)
                .expect("column type disappeared from registry");
            unsafe {
                descriptor.construct_default(column.ptr_mut(row));
            }
        }
        self.entities.push(entity);
        self.row_of.insert(entity, row);
        row
    }

    /// Allocates a new row without constructing any column. Used by
    /// cross-archetype moves, where every column is about to be explicitly
    /// move/copy/default-constructed by the caller (`World::move_entity`).
    pub fn push_uninit(&mut self, entity: Entity) -> usize {
        let row = self.entities.len();
        for column in self.columns.values_mut() {
            column.grow_one();
        }
        self.entities.push(entity);
        self.row_of.insert(entity, row);
        row
    }

    /// Swap-removes `row`, destructing its values and, if another row moved
    /// into its place, returning `(moved_entity, new_row)`.
    pub fn swap_erase(&mut self, row: usize) -> Option<(Entity, usize)> {
        self.swap_erase_impl(row, true)
    }

    /// Like `swap_erase`, but skips running destructors on the removed row's
    /// columns, because they were already moved out into another table by the
    /// caller (`World::move_entity`) and re-destructing them would be a
    /// double-free for non-trivial types.
    pub fn remove_row_moved_out(&mut self, row: usize) -> Option<(Entity, usize)> {
        self.swap_erase_impl(row, false)
    }

    fn swap_erase_impl(&mut self, row: usize, destruct: bool) -> Option<(Entity, usize)> {
        let last = self.entities.len() - 1;
        for (&col, column) in self.columns.iter_mut() {
            if destruct {
                let descriptor = registry()
                    .descriptor(col.type_id)
                    .expect("column type disappeared from registry");
                unsafe {
                    descriptor.destruct(column.ptr_mut(row));
                }
            }
            if row != last {
                unsafe {
                    let src = column.ptr(last);
                    let dst = column.ptr_mut(row);
                    std::ptr::copy_nonoverlapping(src, dst, column.elem_size);
                }
            }
            column.bytes.truncate(column.bytes.len() - column.elem_size);
        }

        let removed_entity = self.entities[row];
        self.row_of.remove(&removed_entity);
        if row != last {
            self.entities[row] = self.entities[last];
            self.entities.pop();
            self.row_of.insert(self.entities[row], row);
            Some((self.entities[row], row))
        } else {
            self.entities.pop();
            None
        }
    }

    pub fn column_ptr(&self, col: ColumnId, row: usize) -> Option<*const u8> {
        self.columns.get(&col).map(|c| c.ptr(row))
    }

    pub fn column_ptr_mut(&mut self, col: ColumnId, row: usize) -> Option<*mut u8> {
        self.columns.get_mut(&col).map(|c| c.ptr_mut(row))
    }

    /// Moves the value at `(col, src_row)` out of `self` into `(col, dst_row)`
    /// of `dest`, using the reflected move constructor when available and a
    /// raw byte copy otherwise (the table storage is plain-old-data unless a
    /// type reflects otherwise, matching the original engine's column
    /// assumption). `self`'s slot is left logically moved-from; the caller is
    /// responsible for not destructing it again.
    pub fn move_column_into(&self, col: ColumnId, src_row: usize, dest: &mut DenseTable, dst_row: usize) {
        let Some(src_column) = self.columns.get(&col) else {
            return;
        };
        let Some(dst_column) = dest.columns.get_mut(&col) else {
            return;
        };
        let descriptor = registry()
            .descriptor(col.type_id)
            .expect("column type disappeared from registry");
        unsafe {
            let src_ptr = src_column.ptr(src_row) as *mut u8;
            let dst_ptr = dst_column.ptr_mut(dst_row);
            if !descriptor.construct_move(src_ptr, dst_ptr) {
                std::ptr::copy_nonoverlapping(src_ptr, dst_ptr, src_column.elem_size);
            }
        }
    }

    pub fn destruct_column(&mut self, col: ColumnId, row: usize) {
        if let Some(column) = self.columns.get_mut(&col) {
            let descriptor = registry()
                .descriptor(col.type_id)
                .expect("column type disappeared from registry");
            unsafe {
                descriptor.destruct(column.ptr_mut(row));
            }
        }
    }

    pub fn has_column(&self, col: ColumnId) -> bool {
        self.columns.contains_key(&col)
    }
}
