//! Resolution session cache for avoiding redundant registry lookups.
//!
//! Backtracking asks for the same version lists and release metadata many
//! times. Each distinct query reaches the underlying registry at most once
//! per session. Not-found answers are remembered too.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use poise_core::name::PackageName;
use poise_core::version::Version;
use poise_registry::{PackageRelease, Registry};
use poise_util::errors::PoiseError;

/// A memoizing wrapper around a [`Registry`]. Not `Sync`.
pub struct RegistryCache<'a> {
    registry: &'a dyn Registry,
    versions: RefCell<HashMap<PackageName, Rc<Vec<Version>>>>,
    releases: RefCell<HashMap<(PackageName, Version), Rc<PackageRelease>>>,
    /// NotFound messages, keyed by package and optionally version.
    absent: RefCell<HashMap<(PackageName, Option<Version>), String>>,
    misses: Cell<usize>,
}

impl<'a> RegistryCache<'a> {
    pub fn new(registry: &'a dyn Registry) -> Self {
        Self {
            registry,
            versions: RefCell::new(HashMap::new()),
            releases: RefCell::new(HashMap::new()),
            absent: RefCell::new(HashMap::new()),
            misses: Cell::new(0),
        }
    }

    /// All versions of `name`, oldest first.
    pub fn versions(&self, name: &PackageName) -> Result<Rc<Vec<Version>>, PoiseError> {
        if let Some(hit) = self.versions.borrow().get(name) {
            return Ok(Rc::clone(hit));
        }
        let key = (name.clone(), None);
        self.known_absent(&key)?;
        self.misses.set(self.misses.get() + 1);
        let mut versions = self.remember_absent(key, self.registry.versions(name))?;
        versions.sort();
        versions.dedup();
        let versions = Rc::new(versions);
        self.versions
            .borrow_mut()
            .insert(name.clone(), Rc::clone(&versions));
        Ok(versions)
    }

    pub fn release(&self, name: &PackageName, version: &Version) -> Result<Rc<PackageRelease>, PoiseError> {
        let key = (name.clone(), version.clone());
        if let Some(hit) = self.releases.borrow().get(&key) {
            return Ok(Rc::clone(hit));
        }
        let absent_key = (name.clone(), Some(version.clone()));
        self.known_absent(&absent_key)?;
        self.misses.set(self.misses.get() + 1);
        let release = Rc::new(self.remember_absent(absent_key, self.registry.metadata(name, version))?);
        self.releases.borrow_mut().insert(key, Rc::clone(&release));
        Ok(release)
    }

    fn known_absent(&self, key: &(PackageName, Option<Version>)) -> Result<(), PoiseError> {
        match self.absent.borrow().get(key) {
            Some(message) => Err(PoiseError::NotFound {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn remember_absent<T>(
        &self,
        key: (PackageName, Option<Version>),
        result: Result<T, PoiseError>,
    ) -> Result<T, PoiseError> {
        if let Err(PoiseError::NotFound { message }) = &result {
            self.absent.borrow_mut().insert(key, message.clone());
        }
        result
    }

    /// Number of queries that reached the underlying registry.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }
}
