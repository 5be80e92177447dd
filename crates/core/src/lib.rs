//! Core library for the DSA Arcade visualization runtime.
//!
//! Each module owns one subsystem: the shared resource cache, the scene
//! registry, step pacing, the module host and the action dispatcher. The
//! algorithm families themselves live under [`modules`] and only talk to the
//! rest of the runtime through their capability tables.

pub mod assets;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod modules;
pub mod notice;
pub mod render;
pub mod scene;
pub mod timeline;

pub use assets::{GeometryHandle, GeometryKind, MaterialHandle, ResourceCache};
pub use config::{AnimationConfig, ArcadeConfig, Palette};
pub use dispatch::{ActionDispatcher, ActionTicket, ControlId, ControlPanel, Outcome};
pub use error::{ArcadeError, Result};
pub use host::ModuleHost;
pub use modules::{AlgorithmModule, CapabilitySet, ModuleKind, Services};
pub use notice::{Notice, NoticeLog, Severity};
pub use render::{HeadlessBackend, RenderBackend, RenderLoop};
pub use scene::{ClickBinding, ObjectId, Overlay, SceneHandle, SceneRegistry, ScreenPoint, Vec3};
pub use timeline::{Pacer, SpeedControl};
