//! Registry of everything currently drawn for the active module.
//!
//! The registry is the single source of truth for objects, their labels and
//! the connector decorations between them. Modules hold [`ObjectId`]s, never
//! references, so a stale id after [`SceneRegistry::remove`] or
//! [`SceneRegistry::clear`] simply stops matching anything.

use std::{
    fmt,
    ops::{Add, Sub},
    sync::{Arc, Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};

use crate::{
    assets::{GeometryHandle, MaterialHandle},
    notice::NoticeLog,
    ArcadeError, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Linear interpolation, `alpha` clamped to `[0, 1]`.
    pub fn lerp(self, to: Vec3, alpha: f32) -> Vec3 {
        let t = alpha.clamp(0.0, 1.0);
        self + (to - self) * t
    }

    pub fn with_x(self, x: f32) -> Self {
        Self { x, ..self }
    }

    pub fn with_y(self, y: f32) -> Self {
        Self { y, ..self }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Pointer or label coordinates in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Action dispatched when the object is picked with a click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickBinding {
    pub action: String,
    pub aux: Option<String>,
}

impl ClickBinding {
    pub fn new(action: impl Into<String>, aux: Option<String>) -> Self {
        Self {
            action: action.into(),
            aux,
        }
    }
}

/// A renderable instance. Build one with [`VisualObject::new`] and hand it to
/// [`SceneRegistry::add`].
#[derive(Debug, Clone)]
pub struct VisualObject {
    pub position: Vec3,
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
    pub hover_text: Option<String>,
    pub on_click: Option<ClickBinding>,
    id: Option<ObjectId>,
    name: Option<String>,
    original_material: Option<MaterialHandle>,
}

impl VisualObject {
    pub fn new(geometry: GeometryHandle, material: MaterialHandle) -> Self {
        Self {
            position: Vec3::ZERO,
            geometry,
            material,
            hover_text: None,
            on_click: None,
            id: None,
            name: None,
            original_material: None,
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_hover(mut self, text: impl Into<String>) -> Self {
        self.hover_text = Some(text.into());
        self
    }

    pub fn with_click(mut self, binding: ClickBinding) -> Self {
        self.on_click = Some(binding);
        self
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Appearance restored when hover leaves the object.
    pub fn original_material(&self) -> Option<&MaterialHandle> {
        self.original_material.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Anchor {
    Object(ObjectId),
    Point(Vec3),
}

#[derive(Debug, Clone)]
pub struct Label {
    /// Set for floating labels so they can be replaced or removed by key.
    pub key: Option<String>,
    pub text: String,
    pub anchor: Anchor,
    pub screen: Option<ScreenPoint>,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct Connector {
    pub from: Vec3,
    pub to: Vec3,
    pub color: u32,
    pub name: Option<String>,
    pub length: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tooltip {
    pub text: String,
    pub visible: bool,
    pub position: ScreenPoint,
}

/// Where the backend should look from. Modules reposition it on load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec3,
    pub look_at: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 10.0),
            look_at: Vec3::ZERO,
        }
    }
}

/// Which overlay regions the UI surface actually provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub labels_layer: bool,
    pub context_menu: bool,
}

impl Default for Overlay {
    fn default() -> Self {
        Self {
            labels_layer: true,
            context_menu: true,
        }
    }
}

const TOOLTIP_OFFSET: f32 = 10.0;
const LABEL_LIFT: f32 = 0.6;
const CONNECTOR_TRIM: f32 = 1.2;

pub struct SceneRegistry {
    objects: Vec<VisualObject>,
    labels: Vec<Label>,
    connectors: Vec<Connector>,
    next_id: u64,
    hovered: Option<ObjectId>,
    tooltip: Tooltip,
    pointer: ScreenPoint,
    context_menu_open: bool,
    camera: Camera,
    highlight: MaterialHandle,
    overlay: Overlay,
    notices: NoticeLog,
    revision: u64,
}

impl SceneRegistry {
    /// `highlight` is applied to whatever object the pointer rests on.
    pub fn new(highlight: MaterialHandle, notices: NoticeLog) -> Self {
        Self::with_overlay(highlight, notices, Overlay::default())
    }

    pub fn with_overlay(highlight: MaterialHandle, notices: NoticeLog, overlay: Overlay) -> Self {
        Self {
            objects: Vec::new(),
            labels: Vec::new(),
            connectors: Vec::new(),
            next_id: 0,
            hovered: None,
            tooltip: Tooltip::default(),
            pointer: ScreenPoint::default(),
            context_menu_open: false,
            camera: Camera::default(),
            highlight,
            overlay,
            notices,
            revision: 0,
        }
    }

    /// Registers `object`, optionally labelling and naming it.
    pub fn add(
        &mut self,
        mut object: VisualObject,
        label: Option<String>,
        name: Option<&str>,
    ) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;

        object.id = Some(id);
        object.name = name.map(str::to_string);
        object.original_material = Some(object.material.clone());
        self.objects.push(object);

        if let Some(text) = label {
            if self.overlay.labels_layer {
                self.labels.push(Label {
                    key: None,
                    text,
                    anchor: Anchor::Object(id),
                    screen: None,
                    visible: true,
                });
            } else {
                self.notices
                    .error("Error: label layer not found for adding label.");
            }
        }

        self.touch();
        id
    }

    pub fn add_labeled(&mut self, object: VisualObject, label: impl fmt::Display) -> ObjectId {
        self.add(object, Some(label.to_string()), None)
    }

    /// Removes an object together with its label. Returns `false` when the id
    /// is no longer tracked.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };

        self.objects.remove(index);
        self.labels
            .retain(|label| label.anchor != Anchor::Object(id));
        if self.hovered == Some(id) {
            self.hovered = None;
            self.tooltip.visible = false;
        }

        self.touch();
        true
    }

    /// Removes the first object registered under `name`.
    pub fn remove_named(&mut self, name: &str) -> bool {
        match self.find_named(name) {
            Some(id) => self.remove(id),
            None => false,
        }
    }

    /// Drops every object, label and connector and resets the hover, tooltip
    /// and context menu state.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.connectors.clear();

        if !self.overlay.labels_layer {
            self.notices.error("Error: label layer not found.");
        }
        self.labels.clear();

        self.hovered = None;
        self.tooltip.visible = false;
        self.close_context_menu();
        self.touch();
    }

    pub fn find_named(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|object| object.name() == Some(name))
            .and_then(VisualObject::id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&VisualObject> {
        self.objects.iter().find(|object| object.id == Some(id))
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn position(&self, id: ObjectId) -> Option<Vec3> {
        self.get(id).map(|object| object.position)
    }

    pub fn set_position(&mut self, id: ObjectId, position: Vec3) -> bool {
        let Some(object) = self.object_mut(id) else {
            return false;
        };
        object.position = position;
        self.touch();
        true
    }

    /// Swaps the object's material. While the object is hovered the swap is
    /// recorded as its original so the highlight stays until hover leaves.
    pub fn set_material(&mut self, id: ObjectId, material: MaterialHandle) -> bool {
        let hovered = self.hovered == Some(id);
        let Some(object) = self.object_mut(id) else {
            return false;
        };
        if hovered {
            object.original_material = Some(material);
        } else {
            object.original_material = Some(material.clone());
            object.material = material;
        }
        self.touch();
        true
    }

    pub fn set_hover_text(&mut self, id: ObjectId, text: impl Into<String>) -> bool {
        let Some(object) = self.object_mut(id) else {
            return false;
        };
        object.hover_text = Some(text.into());
        self.touch();
        true
    }

    pub fn set_label_text(&mut self, id: ObjectId, text: impl Into<String>) -> bool {
        let text = text.into();
        let mut found = false;
        for label in self
            .labels
            .iter_mut()
            .filter(|label| label.anchor == Anchor::Object(id))
        {
            label.text = text.clone();
            found = true;
        }
        if found {
            self.touch();
        }
        found
    }

    pub fn label_text(&self, id: ObjectId) -> Option<&str> {
        self.labels
            .iter()
            .find(|label| label.anchor == Anchor::Object(id))
            .map(|label| label.text.as_str())
    }

    /// Adds or replaces a label pinned to a scene point rather than an object.
    pub fn set_floating_label(&mut self, key: &str, text: impl Into<String>, at: Vec3) {
        if !self.overlay.labels_layer {
            self.notices
                .error("Error: label layer not found for adding label.");
            return;
        }
        self.labels
            .retain(|label| label.key.as_deref() != Some(key));
        self.labels.push(Label {
            key: Some(key.to_string()),
            text: text.into(),
            anchor: Anchor::Point(at),
            screen: None,
            visible: true,
        });
        self.touch();
    }

    pub fn remove_floating_label(&mut self, key: &str) -> bool {
        let before = self.labels.len();
        self.labels
            .retain(|label| label.key.as_deref() != Some(key));
        let removed = self.labels.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn floating_label(&self, key: &str) -> Option<&Label> {
        self.labels
            .iter()
            .find(|label| label.key.as_deref() == Some(key))
    }

    pub fn add_connector(&mut self, from: Vec3, to: Vec3, color: u32, name: Option<&str>) {
        let length = ((to - from).length() - CONNECTOR_TRIM).max(0.1);
        self.connectors.push(Connector {
            from,
            to,
            color,
            name: name.map(str::to_string),
            length,
        });
        self.touch();
    }

    /// Removes every connector whose name is listed in `names`.
    pub fn clear_connectors_named(&mut self, names: &[&str]) {
        self.connectors.retain(|connector| {
            !connector
                .name
                .as_deref()
                .is_some_and(|name| names.contains(&name))
        });
        self.touch();
    }

    /// Removes every connector, named or not.
    pub fn clear_connectors(&mut self) {
        self.connectors.clear();
        self.touch();
    }

    pub fn objects(&self) -> impl Iterator<Item = &VisualObject> {
        self.objects.iter()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Monotonic counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn set_camera(&mut self, position: Vec3, look_at: Vec3) {
        self.camera = Camera { position, look_at };
    }

    pub fn overlay(&self) -> Overlay {
        self.overlay
    }

    /// Records the last known pointer position. Tooltip placement always reads
    /// from here.
    pub fn set_pointer(&mut self, pointer: ScreenPoint) {
        self.pointer = pointer;
    }

    pub fn hovered(&self) -> Option<ObjectId> {
        self.hovered
    }

    pub fn tooltip(&self) -> &Tooltip {
        &self.tooltip
    }

    /// Runs one hover cycle for the object the backend picked under the
    /// pointer. Ids that are not tracked count as "nothing picked".
    pub fn sync_hover(&mut self, picked: Option<ObjectId>) {
        let picked = picked.filter(|id| self.contains(*id));

        match picked {
            Some(id) if self.hovered == Some(id) => {
                if self.tooltip.visible {
                    self.tooltip.position = self.tooltip_position();
                }
            }
            Some(id) => {
                self.restore_hovered();
                let highlight = self.highlight.clone();
                let position = self.tooltip_position();
                let Some(object) = self.object_mut(id) else {
                    return;
                };
                object.original_material = Some(object.material.clone());
                object.material = highlight;
                let text = object.hover_text.clone();

                self.hovered = Some(id);
                match text {
                    Some(text) => {
                        self.tooltip = Tooltip {
                            text,
                            visible: true,
                            position,
                        };
                    }
                    None => self.tooltip.visible = false,
                }
            }
            None => {
                self.restore_hovered();
                self.hovered = None;
                self.tooltip.visible = false;
            }
        }
    }

    /// Handles a click on whatever the backend picked. Returns the object's
    /// click binding; clicking empty space closes the context menu.
    pub fn click(&mut self, picked: Option<ObjectId>) -> Option<ClickBinding> {
        match picked.and_then(|id| self.get(id)) {
            Some(object) => object.on_click.clone(),
            None => {
                self.close_context_menu();
                None
            }
        }
    }

    pub fn open_context_menu(&mut self) {
        if self.overlay.context_menu {
            self.context_menu_open = true;
        } else {
            self.notices.error("Error: context menu element not found.");
        }
    }

    pub fn context_menu_open(&self) -> bool {
        self.context_menu_open
    }

    /// Positions every label with `project`, which maps a scene point to the
    /// screen and reports whether it lies behind the camera.
    pub fn place_labels<F>(&mut self, project: F)
    where
        F: Fn(Vec3) -> (ScreenPoint, bool),
    {
        for index in 0..self.labels.len() {
            let anchor = match &self.labels[index].anchor {
                Anchor::Object(id) => match self.position(*id) {
                    Some(position) => position + Vec3::new(0.0, LABEL_LIFT, 0.0),
                    None => continue,
                },
                Anchor::Point(point) => *point,
            };
            let (screen, behind) = project(anchor);
            let label = &mut self.labels[index];
            label.screen = Some(screen);
            label.visible = !behind;
        }
    }

    fn close_context_menu(&mut self) {
        if !self.overlay.context_menu {
            self.notices.error("Error: context menu element not found.");
        }
        self.context_menu_open = false;
    }

    fn restore_hovered(&mut self) {
        if let Some(previous) = self.hovered {
            if let Some(object) = self.object_mut(previous) {
                if let Some(original) = object.original_material.clone() {
                    object.material = original;
                }
            }
        }
    }

    fn tooltip_position(&self) -> ScreenPoint {
        ScreenPoint::new(self.pointer.x + TOOLTIP_OFFSET, self.pointer.y + TOOLTIP_OFFSET)
    }

    fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|object| object.id == Some(id))
    }

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut VisualObject> {
        self.objects.iter_mut().find(|object| object.id == Some(id))
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

impl fmt::Debug for SceneRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneRegistry")
            .field("objects", &self.objects.len())
            .field("labels", &self.labels.len())
            .field("connectors", &self.connectors.len())
            .field("hovered", &self.hovered)
            .field("revision", &self.revision)
            .finish()
    }
}

/// Shared, thread-safe view over the [`SceneRegistry`]. Guards must be
/// dropped before a step sequence suspends.
#[derive(Clone)]
pub struct SceneHandle {
    shared: Arc<Mutex<SceneRegistry>>,
}

impl SceneHandle {
    pub fn new(registry: SceneRegistry) -> Self {
        Self {
            shared: Arc::new(Mutex::new(registry)),
        }
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, SceneRegistry>> {
        self.shared
            .lock()
            .map_err(|_| ArcadeError::msg("scene registry has been poisoned"))
    }
}

impl fmt::Debug for SceneHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneHandle").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assets::GeometryKind, notice::Severity, ResourceCache};

    fn registry_with(overlay: Overlay) -> (SceneRegistry, ResourceCache, NoticeLog) {
        let cache = ResourceCache::new();
        let notices = NoticeLog::new();
        let highlight = cache.solid(0xfacc15).unwrap();
        (
            SceneRegistry::with_overlay(highlight, notices.clone(), overlay),
            cache,
            notices,
        )
    }

    fn cube(cache: &ResourceCache, color: u32) -> VisualObject {
        VisualObject::new(
            cache.geometry(GeometryKind::Box, &[1.0, 1.0, 1.0]).unwrap(),
            cache.solid(color).unwrap(),
        )
    }

    #[test]
    fn clear_resets_every_collection() {
        let (mut scene, cache, _) = registry_with(Overlay::default());
        let id = scene.add(cube(&cache, 1).with_hover("hi"), Some("a".into()), Some("first"));
        scene.add_labeled(cube(&cache, 2), 7);
        scene.add_connector(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0), 0xffffff, Some("headArrow"));
        scene.set_floating_label("head", "HEAD", Vec3::ZERO);
        scene.sync_hover(Some(id));
        scene.open_context_menu();

        scene.clear();
        assert_eq!(scene.object_count(), 0);
        assert_eq!(scene.label_count(), 0);
        assert_eq!(scene.connector_count(), 0);
        assert_eq!(scene.hovered(), None);
        assert!(!scene.tooltip().visible);
        assert!(!scene.context_menu_open());

        scene.clear();
        assert_eq!(scene.object_count(), 0);
    }

    #[test]
    fn remove_by_name_drops_label_and_hover() {
        let (mut scene, cache, _) = registry_with(Overlay::default());
        let id = scene.add(cube(&cache, 1).with_hover("null"), Some("NULL".into()), Some("nullNextMesh"));
        scene.sync_hover(Some(id));
        assert!(scene.tooltip().visible);

        assert!(scene.remove_named("nullNextMesh"));
        assert_eq!(scene.label_count(), 0);
        assert_eq!(scene.hovered(), None);
        assert!(!scene.tooltip().visible);
        assert!(!scene.remove_named("nullNextMesh"));
        assert!(!scene.set_position(id, Vec3::ZERO));
    }

    #[test]
    fn hover_highlights_and_restores() {
        let (mut scene, cache, _) = registry_with(Overlay::default());
        let base = cache.solid(1).unwrap();
        let a = scene.add(cube(&cache, 1), None, None);
        let b = scene.add(cube(&cache, 2), None, None);
        scene.set_pointer(ScreenPoint::new(100.0, 50.0));

        scene.sync_hover(Some(a));
        assert_eq!(scene.get(a).unwrap().material.color, 0xfacc15);

        scene.sync_hover(Some(b));
        assert!(Arc::ptr_eq(&scene.get(a).unwrap().material, &base));
        assert_eq!(scene.get(b).unwrap().material.color, 0xfacc15);

        scene.sync_hover(None);
        assert_eq!(scene.get(b).unwrap().material.color, 2);
        assert_eq!(scene.hovered(), None);
    }

    #[test]
    fn material_swap_while_hovered_lands_after_hover() {
        let (mut scene, cache, _) = registry_with(Overlay::default());
        let a = scene.add(cube(&cache, 1), None, None);
        scene.sync_hover(Some(a));
        scene.set_material(a, cache.solid(0xef4444).unwrap());
        assert_eq!(scene.get(a).unwrap().material.color, 0xfacc15);

        scene.sync_hover(None);
        assert_eq!(scene.get(a).unwrap().material.color, 0xef4444);
    }

    #[test]
    fn tooltip_follows_last_pointer() {
        let (mut scene, cache, _) = registry_with(Overlay::default());
        let a = scene.add(cube(&cache, 1).with_hover("Index: 0"), None, None);
        scene.set_pointer(ScreenPoint::new(20.0, 30.0));
        scene.sync_hover(Some(a));
        assert_eq!(scene.tooltip().position, ScreenPoint::new(30.0, 40.0));

        scene.set_pointer(ScreenPoint::new(40.0, 30.0));
        scene.sync_hover(Some(a));
        assert_eq!(scene.tooltip().position, ScreenPoint::new(50.0, 40.0));
        assert_eq!(scene.tooltip().text, "Index: 0");
    }

    #[test]
    fn hover_ignores_untracked_ids() {
        let (mut scene, cache, _) = registry_with(Overlay::default());
        let a = scene.add(cube(&cache, 1), None, None);
        scene.remove(a);
        scene.sync_hover(Some(a));
        assert_eq!(scene.hovered(), None);
    }

    #[test]
    fn named_connectors_are_cleared_in_bulk() {
        let (mut scene, _, _) = registry_with(Overlay::default());
        scene.add_connector(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 1, Some("headArrow"));
        scene.add_connector(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 1, Some("tailArrow"));
        scene.add_connector(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 1, None);

        scene.clear_connectors_named(&["headArrow", "tailArrow"]);
        assert_eq!(scene.connector_count(), 1);
        assert!((scene.connectors()[0].length - 3.8).abs() < 1e-5);
    }

    #[test]
    fn click_returns_binding_or_closes_menu() {
        let (mut scene, cache, _) = registry_with(Overlay::default());
        let node = scene.add(
            cube(&cache, 1).with_click(ClickBinding::new("setStartNode", Some("A".into()))),
            None,
            None,
        );
        scene.open_context_menu();

        let binding = scene.click(Some(node)).expect("binding");
        assert_eq!(binding.action, "setStartNode");
        assert!(scene.context_menu_open());

        assert!(scene.click(None).is_none());
        assert!(!scene.context_menu_open());
    }

    #[test]
    fn missing_label_layer_degrades_with_error() {
        let overlay = Overlay {
            labels_layer: false,
            context_menu: true,
        };
        let (mut scene, cache, notices) = registry_with(overlay);
        let id = scene.add_labeled(cube(&cache, 1), "x");

        assert!(scene.contains(id));
        assert_eq!(scene.label_count(), 0);
        assert!(notices.contains(Severity::Error, "label layer"));
    }

    #[test]
    fn labels_track_their_object() {
        let (mut scene, cache, _) = registry_with(Overlay::default());
        let id = scene.add_labeled(cube(&cache, 1).at(Vec3::new(2.0, 0.0, 0.0)), 5);
        scene.place_labels(|p| (ScreenPoint::new(p.x * 10.0, p.y * 10.0), p.z > 1.0));

        let label = &scene.labels()[0];
        let screen = label.screen.expect("label placed");
        assert!((screen.x - 20.0).abs() < 1e-4);
        assert!((screen.y - 6.0).abs() < 1e-4);
        assert!(label.visible);
        assert_eq!(scene.label_text(id), Some("5"));
    }
}
