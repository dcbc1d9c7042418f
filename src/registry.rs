//! Callback lists keyed by animation name.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::selector::AnimationId;

/// A shared callback receiving the inserted element. Clones compare equal
/// under [`Callback::ptr_eq`]; separately created callbacks never do.
pub struct Callback<E>(Rc<dyn Fn(&E)>);

impl<E> Callback<E> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&E) + 'static,
    {
        Callback(Rc::new(f))
    }

    pub fn call(&self, element: &E) {
        (self.0)(element)
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Callback<E>) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.0) as *const (),
            Rc::as_ptr(&other.0) as *const (),
        )
    }
}

impl<E> Clone for Callback<E> {
    fn clone(&self) -> Self {
        Callback(Rc::clone(&self.0))
    }
}

impl<E> fmt::Debug for Callback<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Ordered callback lists, one per animation name.
pub struct CallbackRegistry<E> {
    lists: HashMap<AnimationId, Vec<Callback<E>>>,
}

impl<E> Default for CallbackRegistry<E> {
    fn default() -> Self {
        Self {
            lists: HashMap::new(),
        }
    }
}

impl<E> CallbackRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `callback` to the end of `id`'s list.
    pub fn append(&mut self, id: &AnimationId, callback: Callback<E>) {
        self.lists.entry(id.clone()).or_default().push(callback);
    }

    /// Remove every entry identical to `callback`, or the whole list when
    /// `callback` is `None`. Returns whether `id` is left with no callbacks;
    /// an emptied list is dropped.
    pub fn remove(&mut self, id: &AnimationId, callback: Option<&Callback<E>>) -> bool {
        let now_empty = match (self.lists.get_mut(id), callback) {
            (Some(list), Some(cb)) => {
                list.retain(|c| !c.ptr_eq(cb));
                list.is_empty()
            }
            _ => true,
        };
        if now_empty {
            self.lists.remove(id);
        }
        now_empty
    }

    pub fn clear_all(&mut self) {
        self.lists.clear();
    }

    /// Copy of `id`'s list, for invoking without holding a borrow.
    pub fn snapshot(&self, id: &str) -> Vec<Callback<E>> {
        self.lists.get(id).cloned().unwrap_or_default()
    }

    pub fn count(&self, id: &AnimationId) -> usize {
        self.lists.get(id).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}
