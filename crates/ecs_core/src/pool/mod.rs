mod page;

use page::Page;

/// A paged array allocator: grows one fixed-size page at a time instead of
/// reallocating a single buffer, so existing element addresses survive
/// further growth. Used for dense-table columns and sparse relation row
/// storage, both of which hand out addresses that must stay valid across
/// later insertions elsewhere in the same table.
pub struct PagedPool<T> {
    rows_per_page: usize,
    shift: u32,
    mask: usize,
    pages: Vec<Page<T>>,
    len: usize,
}

impl<T> PagedPool<T> {
    pub fn with_rows_per_page(rows_per_page: usize) -> Self {
        assert!(rows_per_page.is_power_of_two() && rows_per_page > 0);
        Self {
            rows_per_page,
            shift: rows_per_page.trailing_zeros(),
            mask: rows_per_page - 1,
            pages: Vec::new(),
            len: 0,
        }
    }

    #[inline]
    fn page_of(&self, gidx: usize) -> usize {
        gidx >> self.shift
    }

    #[inline]
    fn local_of(&self, gidx: usize) -> usize {
        gidx & self.mask
    }

    /// Live row count, tracked independently of per-page occupancy: a
    /// page-local swap (`Page::free_one`) can leave a non-last page
    /// non-full, so "trailing pages are full" can't be used to derive this.
    pub fn len_total(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len_total() == 0
    }

    fn ensure_page_with_space(&mut self) -> usize {
        if let Some((idx, _)) = self
            .pages
            .iter()
            .enumerate()
            .rev()
            .find(|(_, p)| !p.is_full())
        {
            idx
        } else {
            let idx = self.pages.len();
            self.pages.push(Page::with_rows(self.rows_per_page));
            idx
        }
    }

    pub fn alloc_one(&mut self) -> usize {
        let pid = self.ensure_page_with_space();
        let local = self.pages[pid]
            .alloc_one()
            .expect("page should have capacity");
        self.len += 1;
        (pid << self.shift) | local
    }

    #[inline]
    pub fn write_at(&mut self, gidx: usize, value: T) {
        let pid = self.page_of(gidx);
        let loc = self.local_of(gidx);
        self.pages[pid].write_at(loc, value);
    }

    pub fn get(&self, gidx: usize) -> &T {
        let pid = self.page_of(gidx);
        let loc = self.local_of(gidx);
        self.pages[pid].get(loc)
    }

    pub fn get_mut(&mut self, gidx: usize) -> &mut T {
        let pid = self.page_of(gidx);
        let loc = self.local_of(gidx);
        self.pages[pid].get_mut(loc)
    }

    pub fn slice_page(&self, page: usize) -> &[T] {
        let len = self.pages[page].len();
        self.pages[page].slice(0..len)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    /// Swap-removes `gidx`, invoking `fix_index(from, to)` when another row
    /// moved to take its place so the caller can repoint whatever external
    /// index referenced `from`.
    pub fn free_one_swap_remove(&mut self, gidx: usize, mut fix_index: impl FnMut(usize, usize)) {
        let page_idx = self.page_of(gidx);
        let local = self.local_of(gidx);
        if let Some((from_local, to_local)) = self.pages[page_idx].free_one(local) {
            let from_g = (page_idx << self.shift) | from_local;
            let to_g = (page_idx << self.shift) | to_local;
            fix_index(from_g, to_g);
        }
        self.len -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_write_read_round_trip() {
        let mut pool: PagedPool<u64> = PagedPool::with_rows_per_page(4);
        let a = pool.alloc_one();
        pool.write_at(a, 42);
        assert_eq!(*pool.get(a), 42);
    }

    #[test]
    fn grows_across_pages() {
        let mut pool: PagedPool<u64> = PagedPool::with_rows_per_page(2);
        let idxs: Vec<_> = (0..5)
            .map(|i| {
                let a = pool.alloc_one();
                pool.write_at(a, i);
                a
            })
            .collect();
        assert_eq!(pool.page_count(), 3);
        for (i, &idx) in idxs.iter().enumerate() {
            assert_eq!(*pool.get(idx), i as u64);
        }
    }

    #[test]
    fn len_total_survives_a_swap_in_a_non_last_page() {
        let mut pool: PagedPool<u64> = PagedPool::with_rows_per_page(4);
        let idxs: Vec<_> = (0..6)
            .map(|i| {
                let a = pool.alloc_one();
                pool.write_at(a, i);
                a
            })
            .collect();
        assert_eq!(pool.page_count(), 2);
        assert_eq!(pool.len_total(), 6);

        // idxs[0] lives in the first (non-last) page; freeing it swaps in
        // that same page's own last occupied row, not a row from page two.
        pool.free_one_swap_remove(idxs[0], |_, _| {});
        assert_eq!(pool.len_total(), 5);
    }

    #[test]
    fn swap_remove_fixes_moved_index() {
        let mut pool: PagedPool<u64> = PagedPool::with_rows_per_page(4);
        let a = pool.alloc_one();
        pool.write_at(a, 1);
        let b = pool.alloc_one();
        pool.write_at(b, 2);
        let c = pool.alloc_one();
        pool.write_at(c, 3);

        let mut moved_from = None;
        let mut moved_to = None;
        pool.free_one_swap_remove(a, |from, to| {
            moved_from = Some(from);
            moved_to = Some(to);
        });
        assert_eq!(moved_from, Some(c));
        assert_eq!(moved_to, Some(a));
        assert_eq!(*pool.get(a), 3);
    }
}
