//! Observable state containers.
//!
//! Each module owns one `Store` for its bindable state. Handles are cheap to clone and
//! share the same cell; subscribers run after every `update`, in registration order.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Listener<T> = Rc<dyn Fn(&T)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct Store<T> {
    inner: Rc<StoreInner<T>>,
}

struct StoreInner<T> {
    value: RefCell<T>,
    listeners: RefCell<Vec<(SubscriptionId, Listener<T>)>>,
    next_id: Cell<u64>,
    version: Cell<u64>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Store<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                value: RefCell::new(value),
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                version: Cell::new(0),
            }),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .listeners
            .borrow_mut()
            .retain(|(existing, _)| *existing != id);
    }
}

impl<T: Clone> Store<T> {
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Mutate the value, then notify subscribers with the new state.
    ///
    /// Listeners receive a snapshot, so they may read or update this store themselves.
    /// A nested update notifies everyone with the newer state and the outer round stops.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let (out, snapshot) = {
            let mut value = self.inner.value.borrow_mut();
            let out = f(&mut value);
            (out, value.clone())
        };
        let version = self.inner.version.get().wrapping_add(1);
        self.inner.version.set(version);
        self.notify(&snapshot, version);
        out
    }

    fn notify(&self, snapshot: &T, version: u64) {
        let listeners: Vec<Listener<T>> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            if self.inner.version.get() != version {
                break;
            }
            listener(snapshot);
        }
    }
}

/// Monotonic request counter. A response is applied only if its ticket is still current.
#[derive(Clone, Default)]
pub struct Generation(Rc<Cell<u64>>);

impl Generation {
    pub fn next(&self) -> u64 {
        let ticket = self.0.get().wrapping_add(1);
        self.0.set(ticket);
        ticket
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.0.get() == ticket
    }
}
