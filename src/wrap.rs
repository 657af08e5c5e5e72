//! The generic wrapper object and the trait shared by every typed wrapper.
//!
//! An [`Obj`] pairs a native handle with exactly one native reference,
//! held from wrap to drop. Host-side sharing is plain `Arc` cloning, so a
//! wrapper's reference count is its `Arc` strong count. Each object also
//! carries a per-handle information cache of raw query results.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use log::{error, trace};

use crate::driver::Handle;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::types::{ClPrm, InfoQuery, Kind};
use crate::util;

/// A wrapped native object.
///
/// Holds strong references to the wrappers it depends on (a queue keeps
/// its context and device alive) and, for memory objects, a non-owning
/// back reference to the context that created it.
pub struct Obj {
    kind: Kind,
    handle: Handle,
    reg: Registry,
    deps: Vec<Arc<Obj>>,
    origin: Option<Weak<Obj>>,
    cache: Mutex<HashMap<InfoQuery, Arc<[u8]>>>,
}

impl Obj {
    pub(crate) fn new(
        kind: Kind,
        handle: Handle,
        reg: Registry,
        deps: Vec<Arc<Obj>>,
        origin: Option<Weak<Obj>>,
    ) -> Arc<Obj> {
        Arc::new(Obj {
            kind,
            handle,
            reg,
            deps,
            origin,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn registry(&self) -> &Registry {
        &self.reg
    }

    /// First dependency of the given kind, if held.
    pub(crate) fn dep_of_kind(&self, kind: Kind) -> Option<Arc<Obj>> {
        self.deps.iter().find(|d| d.kind() == kind).cloned()
    }

    pub(crate) fn origin(&self) -> Option<Arc<Obj>> {
        self.origin.as_ref().and_then(Weak::upgrade)
    }

    /// Raw bytes for an information query, read through the cache.
    ///
    /// Queries for mutable attributes (reference counts, event status, map
    /// counts) always hit the native API. An empty native result maps to
    /// `Error::InfoUnavailable`.
    pub fn info_raw<Q: Into<InfoQuery>>(&self, query: Q) -> Result<Arc<[u8]>> {
        let query = query.into();
        if !query.applies_to(self.kind) {
            return Err(Error::Args("information query does not apply to this object"));
        }
        if query.cacheable() {
            if let Some(bytes) = self.lock_cache().get(&query) {
                trace!("info cache hit: {:?} on {:?}", query, self.handle);
                return Ok(bytes.clone());
            }
        }
        let bytes = self.reg.driver().info(query, self.handle)?;
        if bytes.is_empty() {
            return Err(Error::InfoUnavailable(query));
        }
        let bytes: Arc<[u8]> = Arc::from(bytes);
        if query.cacheable() {
            self.lock_cache().insert(query, bytes.clone());
        }
        Ok(bytes)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<HashMap<InfoQuery, Arc<[u8]>>> {
        self.cache.lock().expect("info cache mutex poisoned")
    }
}

impl Drop for Obj {
    fn drop(&mut self) {
        self.reg.evict(self.handle);
        // Owned dependencies go before the native handle, so a dependent
        // object never outlives what it depends on at the native level.
        drop(std::mem::take(&mut self.deps));
        if let Err(err) = self.reg.driver().release(self.kind, self.handle) {
            error!("release failed for {:?} {:?}: {}", self.kind, self.handle, err);
        }
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Obj")
            .field("kind", &self.kind)
            .field("handle", &self.handle)
            .field("deps", &self.deps.len())
            .finish()
    }
}

/// Operations common to every typed wrapper.
///
/// Cloning a typed wrapper clones its `Arc`, so [`ref_count`] reports the
/// number of host-side co-owners of the underlying object.
///
/// [`ref_count`]: Wrapper::ref_count
pub trait Wrapper {
    fn obj(&self) -> &Arc<Obj>;

    fn handle(&self) -> Handle {
        self.obj().handle()
    }

    fn kind(&self) -> Kind {
        self.obj().kind()
    }

    fn registry(&self) -> &Registry {
        self.obj().registry()
    }

    fn ref_count(&self) -> usize {
        Arc::strong_count(self.obj())
    }

    fn info_raw<Q: Into<InfoQuery>>(&self, query: Q) -> Result<Arc<[u8]>> {
        self.obj().info_raw(query)
    }

    /// Byte size of an attribute's value, without decoding it.
    fn info_size<Q: Into<InfoQuery>>(&self, query: Q) -> Result<usize> {
        Ok(self.info_raw(query)?.len())
    }

    fn info_scalar<T: ClPrm, Q: Into<InfoQuery>>(&self, query: Q) -> Result<T> {
        util::scalar_from_bytes(&self.info_raw(query)?)
    }

    fn info_vec<T: ClPrm, Q: Into<InfoQuery>>(&self, query: Q) -> Result<Vec<T>> {
        util::vec_from_bytes(&self.info_raw(query)?)
    }

    fn info_string<Q: Into<InfoQuery>>(&self, query: Q) -> Result<String> {
        util::string_from_bytes(&self.info_raw(query)?)
    }
}
