//! Memoized renderable resources.
//!
//! Geometry and materials are shared by many scene objects at once, so a
//! handle is never edited after creation. Objects change color by swapping
//! to another handle. The cache never evicts: its key space is a handful of
//! shapes and palette colors and lives for the whole process.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};

use crate::{ArcadeError, Result};

/// Primitive shapes the rendering backend knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Box,
    Sphere,
    /// Cone used as an arrow head.
    Arrow,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Box => "box",
            Self::Sphere => "sphere",
            Self::Arrow => "arrow",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub kind: GeometryKind,
    pub params: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub color: u32,
    pub transparent: bool,
    pub opacity: f32,
    pub roughness: f32,
    pub metalness: f32,
}

impl Material {
    fn new(color: u32, transparent: bool) -> Self {
        Self {
            color,
            transparent,
            opacity: if transparent { 0.5 } else { 1.0 },
            roughness: 0.3,
            metalness: 0.6,
        }
    }
}

pub type GeometryHandle = Arc<Geometry>;
pub type MaterialHandle = Arc<Material>;

#[derive(Default)]
struct CacheState {
    geometries: HashMap<String, GeometryHandle>,
    materials: HashMap<String, MaterialHandle>,
    allocations: usize,
}

/// Process-wide resource cache. Clones share the same storage.
#[derive(Clone, Default)]
pub struct ResourceCache {
    state: Arc<Mutex<CacheState>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared geometry for `(kind, params)`, building it on first
    /// request.
    pub fn geometry(&self, kind: GeometryKind, params: &[f32]) -> Result<GeometryHandle> {
        let key = format!("{kind}_{}", serde_json::to_string(params)?);
        let mut state = self.lock()?;
        if let Some(handle) = state.geometries.get(&key) {
            return Ok(handle.clone());
        }

        tracing::debug!(%key, "allocating geometry");
        let handle = Arc::new(Geometry {
            kind,
            params: params.to_vec(),
        });
        state.geometries.insert(key, handle.clone());
        state.allocations += 1;
        Ok(handle)
    }

    /// Returns the shared material for `(color, transparent)`.
    pub fn material(&self, color: u32, transparent: bool) -> Result<MaterialHandle> {
        let key = format!("{color}_{transparent}");
        let mut state = self.lock()?;
        if let Some(handle) = state.materials.get(&key) {
            return Ok(handle.clone());
        }

        tracing::debug!(%key, "allocating material");
        let handle = Arc::new(Material::new(color, transparent));
        state.materials.insert(key, handle.clone());
        state.allocations += 1;
        Ok(handle)
    }

    /// Opaque material shorthand used by most modules.
    pub fn solid(&self, color: u32) -> Result<MaterialHandle> {
        self.material(color, false)
    }

    pub fn geometry_count(&self) -> Result<usize> {
        Ok(self.lock()?.geometries.len())
    }

    pub fn material_count(&self) -> Result<usize> {
        Ok(self.lock()?.materials.len())
    }

    /// Number of backend resources created so far.
    pub fn allocations(&self) -> Result<usize> {
        Ok(self.lock()?.allocations)
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheState>> {
        self.state
            .lock()
            .map_err(|_| ArcadeError::msg("resource cache has been poisoned"))
    }
}

impl fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("ResourceCache");
        if let Ok(state) = self.state.lock() {
            out.field("geometries", &state.geometries.len())
                .field("materials", &state.materials.len());
        }
        out.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_keys_share_one_handle() {
        let cache = ResourceCache::new();
        let first = cache.geometry(GeometryKind::Box, &[1.2, 1.0, 1.2]).unwrap();
        let second = cache.geometry(GeometryKind::Box, &[1.2, 1.0, 1.2]).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.allocations().unwrap(), 1);
    }

    #[test]
    fn differing_params_yield_distinct_handles() {
        let cache = ResourceCache::new();
        let small = cache.geometry(GeometryKind::Box, &[1.0, 1.0, 1.0]).unwrap();
        let tall = cache.geometry(GeometryKind::Box, &[1.0, 4.0, 1.0]).unwrap();
        let sphere = cache.geometry(GeometryKind::Sphere, &[1.0, 1.0, 1.0]).unwrap();

        assert!(!Arc::ptr_eq(&small, &tall));
        assert!(!Arc::ptr_eq(&small, &sphere));
        assert_eq!(cache.geometry_count().unwrap(), 3);
    }

    #[test]
    fn materials_are_keyed_by_color_and_transparency() {
        let cache = ResourceCache::new();
        let solid = cache.solid(0x38bdf8).unwrap();
        let again = cache.material(0x38bdf8, false).unwrap();
        let faded = cache.material(0x38bdf8, true).unwrap();

        assert!(Arc::ptr_eq(&solid, &again));
        assert!(!Arc::ptr_eq(&solid, &faded));
        assert_eq!(faded.opacity, 0.5);
        assert_eq!(solid.opacity, 1.0);
    }

    #[test]
    fn clones_share_storage() {
        let cache = ResourceCache::new();
        let other = cache.clone();
        let a = cache.solid(0xff0000).unwrap();
        let b = other.solid(0xff0000).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(other.material_count().unwrap(), 1);
    }
}
