//! The wrapper registry.
//!
//! A registry owns a [`Driver`] and guarantees at most one live wrapper
//! object per native handle. Wrapping a handle that is already wrapped
//! hands back the existing object, so host-side identity follows native
//! identity. The registry also keeps create/drop tallies for end-of-run
//! leak accounting.
//!
//! Registries are cheap clonable handles onto shared state; every wrapper
//! carries one, so no ambient global is required (one is still provided
//! for the `opencl` feature as a convenience).

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use log::{trace, warn};

use crate::driver::{Driver, Handle};
use crate::error::Result;
use crate::types::Kind;
use crate::wrap::Obj;

struct RegistryInner {
    driver: Arc<dyn Driver>,
    map: Mutex<HashMap<Handle, Weak<Obj>>>,
    created: AtomicUsize,
    dropped: AtomicUsize,
}

/// Shared handle onto a wrapper registry.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    pub fn new(driver: Arc<dyn Driver>) -> Registry {
        Registry {
            inner: Arc::new(RegistryInner {
                driver,
                map: Mutex::new(HashMap::new()),
                created: AtomicUsize::new(0),
                dropped: AtomicUsize::new(0),
            }),
        }
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.inner.driver
    }

    /// Wraps a handle whose native reference the caller transfers to the
    /// registry (a freshly created object, typically).
    ///
    /// If the handle is already wrapped, the transferred reference is
    /// surplus: it is released and the existing object returned.
    pub fn adopt(
        &self,
        kind: Kind,
        handle: Handle,
        deps: Vec<Arc<Obj>>,
        origin: Option<Weak<Obj>>,
    ) -> Result<Arc<Obj>> {
        self.wrap(kind, handle, deps, origin, true)
    }

    /// Wraps a handle the caller does not own, such as one copied out of an
    /// information query. A native reference is acquired first when this
    /// creates a new wrapper.
    pub fn adopt_retained(
        &self,
        kind: Kind,
        handle: Handle,
        deps: Vec<Arc<Obj>>,
        origin: Option<Weak<Obj>>,
    ) -> Result<Arc<Obj>> {
        self.wrap(kind, handle, deps, origin, false)
    }

    fn wrap(
        &self,
        kind: Kind,
        handle: Handle,
        deps: Vec<Arc<Obj>>,
        origin: Option<Weak<Obj>>,
        owned: bool,
    ) -> Result<Arc<Obj>> {
        if handle.is_null() {
            return Err(crate::error::Error::Args("cannot wrap a null handle"));
        }

        // Dependency arcs dropped on the duplicate path must outlive the
        // map lock: dropping the last one runs Obj::drop, which locks the
        // same map.
        let mut surplus_deps = Vec::new();
        let existing: Arc<Obj> = {
            let mut map = self.lock_map();
            match map.get(&handle).and_then(Weak::upgrade) {
                Some(obj) => {
                    surplus_deps = deps;
                    obj
                }
                None => {
                    if !owned {
                        self.inner.driver.retain(kind, handle)?;
                    }
                    let obj = Obj::new(kind, handle, self.clone(), deps, origin);
                    map.insert(handle, Arc::downgrade(&obj));
                    self.inner.created.fetch_add(1, Ordering::SeqCst);
                    trace!("registry: wrapped {:?} {:?}", kind, handle);
                    return Ok(obj);
                }
            }
        };
        if existing.kind() != kind {
            drop(surplus_deps);
            return Err(crate::error::Error::Args(
                "handle already wrapped with a different kind",
            ));
        }
        if owned {
            // The caller's reference is redundant with the one the live
            // wrapper already holds.
            self.inner.driver.release(kind, handle)?;
        }
        drop(surplus_deps);
        Ok(existing)
    }

    /// Looks up the live wrapper for a handle, if any.
    pub fn get(&self, handle: Handle) -> Option<Arc<Obj>> {
        self.lock_map().get(&handle).and_then(Weak::upgrade)
    }

    /// Removes a map entry during wrapper teardown. The entry is kept when
    /// it has already been replaced by a fresh wrapper for the same handle.
    pub(crate) fn evict(&self, handle: Handle) {
        let mut map = self.lock_map();
        if let Some(weak) = map.get(&handle) {
            if weak.upgrade().is_none() {
                map.remove(&handle);
            }
        }
        self.inner.dropped.fetch_add(1, Ordering::SeqCst);
    }

    /// Wrappers created over this registry's lifetime.
    pub fn created(&self) -> usize {
        self.inner.created.load(Ordering::SeqCst)
    }

    /// Wrappers fully dropped so far.
    pub fn dropped(&self) -> usize {
        self.inner.dropped.load(Ordering::SeqCst)
    }

    /// Live wrapper count.
    pub fn live(&self) -> usize {
        self.lock_map().values().filter(|w| w.upgrade().is_some()).count()
    }

    /// End-of-run leak check: returns `true` when every wrapper ever
    /// created has been dropped, logging one warning per leaked wrapper
    /// otherwise.
    pub fn memcheck(&self) -> bool {
        let leaked: Vec<(Kind, Handle)> = {
            let mut map = self.lock_map();
            map.retain(|_, weak| weak.upgrade().is_some());
            map.iter()
                .filter_map(|(h, weak)| weak.upgrade().map(|obj| (obj.kind(), *h)))
                .collect()
        };
        for (kind, handle) in &leaked {
            warn!("memcheck: leaked wrapper {:?} {:?}", kind, handle);
        }
        leaked.is_empty() && self.created() == self.dropped()
    }

    fn lock_map(&self) -> std::sync::MutexGuard<HashMap<Handle, Weak<Obj>>> {
        self.inner.map.lock().expect("registry map mutex poisoned")
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Registry")
            .field("created", &self.created())
            .field("dropped", &self.dropped())
            .field("live", &self.live())
            .finish()
    }
}

#[cfg(feature = "opencl")]
mod global {
    use super::Registry;
    use crate::driver::ClDriver;
    use std::sync::Arc;

    lazy_static::lazy_static! {
        static ref GLOBAL: Registry = Registry::new(Arc::new(ClDriver::new()));
    }

    impl Registry {
        /// Process-wide registry over the installed OpenCL runtime.
        pub fn global() -> &'static Registry {
            &GLOBAL
        }
    }
}
