use std::fmt;

use crate::{
    scene::{Camera, ClickBinding, ObjectId, Overlay, SceneHandle, SceneRegistry, ScreenPoint, Vec3},
    Result,
};

/// Rendering backend abstraction. Real backends own the GPU scene, camera
/// controls and raycasting; the runtime only needs these hooks.
pub trait RenderBackend: Send {
    /// Overlay regions (labels layer, context menu) the surface provides.
    fn overlay(&self) -> Overlay;

    /// Topmost tracked object under `pointer`, if any.
    fn pick(&self, pointer: ScreenPoint, scene: &SceneRegistry) -> Option<ObjectId>;

    /// Projects a scene point to the screen. The flag is `true` when the
    /// point is behind the camera.
    fn project(&self, point: Vec3, camera: Camera) -> (ScreenPoint, bool);

    /// Draws the current state of the registry.
    fn present(&mut self, scene: &SceneRegistry) -> Result<()>;
}

/// Drives the per-frame work that keeps hover state and labels in sync with
/// the backend.
pub struct RenderLoop<B> {
    backend: B,
    scene: SceneHandle,
    pointer: ScreenPoint,
}

impl<B: RenderBackend> RenderLoop<B> {
    pub fn new(backend: B, scene: SceneHandle) -> Self {
        Self {
            backend,
            scene,
            pointer: ScreenPoint::default(),
        }
    }

    /// Remembers the latest pointer coordinates; frames read them later.
    pub fn pointer_moved(&mut self, pointer: ScreenPoint) {
        self.pointer = pointer;
    }

    /// One frame: hover cycle, label placement, present.
    pub fn frame(&mut self) -> Result<()> {
        let mut scene = self.scene.lock()?;
        scene.set_pointer(self.pointer);
        let picked = self.backend.pick(self.pointer, &scene);
        scene.sync_hover(picked);

        let camera = scene.camera();
        let backend = &self.backend;
        scene.place_labels(|point| backend.project(point, camera));

        self.backend.present(&scene)
    }

    /// Handles a click at `pointer` and returns the binding to dispatch.
    pub fn click(&mut self, pointer: ScreenPoint) -> Result<Option<ClickBinding>> {
        self.pointer = pointer;
        let mut scene = self.scene.lock()?;
        let picked = self.backend.pick(pointer, &scene);
        Ok(scene.click(picked))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B> fmt::Debug for RenderLoop<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderLoop")
            .field("pointer", &self.pointer)
            .finish()
    }
}

/// Backend without a GPU: orthographic projection around the camera target
/// and nearest-center picking. Used by the CLI and the tests.
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    pub width: f32,
    pub height: f32,
    pub pixels_per_unit: f32,
    pub pick_radius: f32,
    pub overlay: Overlay,
    frames: u64,
    last_object_count: usize,
}

impl HeadlessBackend {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            pixels_per_unit: 40.0,
            pick_radius: 20.0,
            overlay: Overlay::default(),
            frames: 0,
            last_object_count: 0,
        }
    }

    pub fn with_overlay(mut self, overlay: Overlay) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_object_count(&self) -> usize {
        self.last_object_count
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

impl RenderBackend for HeadlessBackend {
    fn overlay(&self) -> Overlay {
        self.overlay
    }

    fn pick(&self, pointer: ScreenPoint, scene: &SceneRegistry) -> Option<ObjectId> {
        let camera = scene.camera();
        scene
            .objects()
            .filter_map(|object| {
                let (screen, behind) = self.project(object.position, camera);
                let dx = screen.x - pointer.x;
                let dy = screen.y - pointer.y;
                let near = (dx * dx + dy * dy).sqrt() <= self.pick_radius;
                if behind || !near {
                    return None;
                }
                Some((object.id()?, object.position.z))
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    fn project(&self, point: Vec3, camera: Camera) -> (ScreenPoint, bool) {
        let x = (point.x - camera.look_at.x) * self.pixels_per_unit + self.width / 2.0;
        let y = -(point.y - camera.look_at.y) * self.pixels_per_unit + self.height / 2.0;
        (ScreenPoint::new(x, y), point.z > camera.position.z)
    }

    fn present(&mut self, scene: &SceneRegistry) -> Result<()> {
        self.frames += 1;
        self.last_object_count = scene.object_count();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::GeometryKind,
        scene::{SceneRegistry, VisualObject},
        NoticeLog, ResourceCache,
    };

    fn setup() -> (SceneHandle, ResourceCache) {
        let cache = ResourceCache::new();
        let scene = SceneHandle::new(SceneRegistry::new(
            cache.solid(0xfacc15).unwrap(),
            NoticeLog::new(),
        ));
        (scene, cache)
    }

    #[test]
    fn services_take_the_overlay_the_backend_provides() {
        let backend = HeadlessBackend::default().with_overlay(Overlay {
            labels_layer: false,
            context_menu: true,
        });
        let services =
            crate::Services::from_config(&crate::ArcadeConfig::default(), backend.overlay())
                .unwrap();
        assert_eq!(services.scene.lock().unwrap().overlay(), backend.overlay());
        assert!(!services.scene.lock().unwrap().overlay().labels_layer);
    }

    #[test]
    fn frame_hovers_the_object_under_the_pointer() {
        let (scene, cache) = setup();
        let id = scene.lock().unwrap().add_labeled(
            VisualObject::new(
                cache.geometry(GeometryKind::Box, &[1.0, 1.0, 1.0]).unwrap(),
                cache.solid(0x38bdf8).unwrap(),
            )
            .with_hover("Value: 4"),
            4,
        );

        let mut render = RenderLoop::new(HeadlessBackend::default(), scene.clone());
        render.pointer_moved(ScreenPoint::new(640.0, 360.0));
        render.frame().unwrap();

        let registry = scene.lock().unwrap();
        assert_eq!(registry.hovered(), Some(id));
        assert_eq!(registry.tooltip().text, "Value: 4");
        assert!(registry.labels()[0].screen.is_some());
        drop(registry);
        assert_eq!(render.backend().frames(), 1);
        assert_eq!(render.backend().last_object_count(), 1);

        render.pointer_moved(ScreenPoint::new(0.0, 0.0));
        render.frame().unwrap();
        assert_eq!(scene.lock().unwrap().hovered(), None);
    }

    #[test]
    fn pick_prefers_the_object_closest_to_the_camera() {
        let (scene, cache) = setup();
        let geometry = cache.geometry(GeometryKind::Sphere, &[0.6, 32.0, 32.0]).unwrap();
        let material = cache.solid(1).unwrap();
        let mut registry = scene.lock().unwrap();
        registry.add(VisualObject::new(geometry.clone(), material.clone()), None, None);
        let front = registry.add(
            VisualObject::new(geometry, material).at(Vec3::new(0.0, 0.0, 1.0)),
            None,
            None,
        );

        let backend = HeadlessBackend::default();
        assert_eq!(backend.pick(ScreenPoint::new(640.0, 360.0), &registry), Some(front));
    }
}
