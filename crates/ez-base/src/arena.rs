//! Arena allocation for stable AST references.
//!
//! Bump allocation keeps AST nodes valid for the lifetime of the arena,
//! avoiding reference counting while letting expressions and statements
//! hold plain borrowed references to each other. A module's AST and its
//! arena are cached together for the lifetime of an interpreter run (see
//! `ez_check::module`), since the type checker's registration pass and the
//! evaluator both walk the same tree.

use bumpalo::Bump;

/// A bump allocator for stable, arena-allocated references.
///
/// Values allocated in an arena live until the arena is dropped or reset.
/// References remain valid across subsequent allocations, making this ideal
/// for AST nodes that reference each other.
pub struct Arena<T> {
    bump: Bump,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Arena {
            bump: Bump::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Allocates a value and returns a reference valid for the arena's lifetime.
    pub fn alloc(&self, value: T) -> &T {
        self.bump.alloc(value)
    }

    /// Allocates a slice from an iterator. The item type `U` need not be
    /// `T` — an `Arena<Expr<'a>>` allocates both `Expr` nodes themselves
    /// (via `alloc`) and the `&'a [&'a Expr<'a>]` reference slices their
    /// `Call`/`ArrayLit` variants hold, out of the same underlying bump
    /// region, since a bump allocator has no notion of a fixed element type.
    pub fn alloc_slice<U, I>(&self, items: I) -> &[U]
    where
        I: IntoIterator<Item = U>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_fill_iter(items)
    }

    /// Resets the arena, invalidating all references but keeping capacity.
    pub fn reset(&mut self) {
        self.bump.reset();
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_stable_reference() {
        let arena: Arena<i32> = Arena::new();
        let r1 = arena.alloc(42);
        let r2 = arena.alloc(100);
        assert_eq!(*r1, 42);
        assert_eq!(*r2, 100);
    }

    #[test]
    fn references_remain_valid_after_many_allocations() {
        let arena: Arena<i32> = Arena::new();
        let refs: Vec<&i32> = (0..1000).map(|i| arena.alloc(i)).collect();
        for (i, r) in refs.iter().enumerate() {
            assert_eq!(**r, i as i32);
        }
    }

    #[test]
    fn alloc_slice_works() {
        let arena: Arena<i32> = Arena::new();
        let slice = arena.alloc_slice([1, 2, 3]);
        assert_eq!(slice, &[1, 2, 3]);
    }
}
