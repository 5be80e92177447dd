//! Algorithm modules and the capability interface they share.
//!
//! A module is a visualization session for one algorithm family. It exposes
//! a table of named operations (its [`CapabilitySet`]), a cancel signal and a
//! teardown hook; the host and dispatcher never look at anything else.

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    ops::Range,
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard},
};

use futures::future::{BoxFuture, FutureExt};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::{
    assets::{GeometryHandle, GeometryKind, MaterialHandle},
    config::{ArcadeConfig, Palette},
    dispatch::ControlId,
    notice::NoticeLog,
    scene::{Overlay, SceneHandle, SceneRegistry},
    timeline::{Pacer, SpeedControl},
    ArcadeError, ResourceCache, Result,
};

pub mod array;
pub mod big_o;
pub mod bst;
pub mod graph;
pub mod linked_list;
pub mod queue;
pub mod recursion;
pub mod sorting;
pub mod stack;
pub mod tutorial;

pub use sorting::SortAlgorithm;

/// A step sequence produced by a module operation.
pub type StepFuture = BoxFuture<'static, Result<()>>;

/// What the UI surface passes along with an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub control: ControlId,
    pub aux: Option<String>,
}

impl ActionRequest {
    pub fn new(control: ControlId, aux: Option<String>) -> Self {
        Self { control, aux }
    }

    /// Parses the auxiliary value, falling back to `default` when it is
    /// absent or malformed.
    pub fn aux_or<T: FromStr>(&self, default: T) -> T {
        self.aux
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(default)
    }
}

pub type Handler = Arc<dyn Fn(ActionRequest) -> StepFuture + Send + Sync>;

/// Builds a [`Handler`] that calls `op` on a shared module.
pub fn handler<M, F, Fut>(module: &Arc<M>, op: F) -> Handler
where
    M: Send + Sync + 'static,
    F: Fn(Arc<M>, ActionRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let module = module.clone();
    Arc::new(move |request| op(module.clone(), request).boxed())
}

/// Dispatch table of a module: action name to operation.
#[derive(Clone, Default)]
pub struct CapabilitySet {
    handlers: HashMap<String, Handler>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, handler: Handler) -> Self {
        self.handlers.insert(name.to_string(), handler);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Action names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Direction of tutorial navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Previous,
    Next,
}

/// Result of a tutorial navigation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Stay,
    /// Navigation ran off the end and wants another module loaded.
    Load(String),
}

/// Capability interface every algorithm family implements.
pub trait AlgorithmModule: Send + Sync {
    fn id(&self) -> &str;

    fn title(&self) -> &str;

    /// Builds the module's dispatch table.
    fn capabilities(self: Arc<Self>) -> CapabilitySet;

    /// Step sequence run right after construction, if any.
    fn intro(self: Arc<Self>) -> Option<StepFuture> {
        None
    }

    /// Tutorial navigation hook. `None` means the module has no pages.
    fn step(&self, _direction: StepDirection) -> Option<StepOutcome> {
        None
    }

    /// Raises the cancel flag; pending step sequences unwind at their next
    /// suspension.
    fn teardown(&self);
}

/// Services shared by the host, the dispatcher and every module. Cloning
/// hands out more handles onto the same process-wide state.
#[derive(Clone)]
pub struct Services {
    pub scene: SceneHandle,
    pub resources: ResourceCache,
    pub notices: NoticeLog,
    pub speed: SpeedControl,
    pub palette: Palette,
    pub frame_ms: u64,
    rng: Arc<Mutex<StdRng>>,
}

impl Services {
    pub fn from_config(config: &ArcadeConfig, overlay: Overlay) -> Result<Self> {
        let resources = ResourceCache::new();
        let notices = NoticeLog::new();
        let highlight = resources.solid(config.palette.highlight)?;
        let scene = SceneHandle::new(SceneRegistry::with_overlay(
            highlight,
            notices.clone(),
            overlay,
        ));
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            scene,
            resources,
            notices,
            speed: SpeedControl::new(config.animation.speed)?,
            palette: config.palette,
            frame_ms: config.animation.frame_ms,
            rng: Arc::new(Mutex::new(rng)),
        })
    }

    /// Default configuration with a fixed seed; handy for tests and demos.
    pub fn seeded(seed: u64) -> Result<Self> {
        let config = ArcadeConfig {
            seed: Some(seed),
            ..ArcadeConfig::default()
        };
        Self::from_config(&config, Overlay::default())
    }

    /// Draws a value from `range`.
    pub fn random(&self, range: Range<i64>) -> Result<i64> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| ArcadeError::msg("value generator has been poisoned"))?;
        Ok(rng.random_range(range))
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("speed", &self.speed)
            .field("frame_ms", &self.frame_ms)
            .finish()
    }
}

/// Per-module runtime: the shared services plus this module's cancel token
/// and the pacer bound to it.
///
/// Operations that must give way to a reset pace themselves through
/// [`ModuleContext::operation`]; the reset calls
/// [`ModuleContext::interrupt`], which cancels all of them at their next
/// suspension.
pub struct ModuleContext {
    pub services: Services,
    pub pacer: Pacer,
    cancel: CancellationToken,
    operations: Mutex<CancellationToken>,
}

impl ModuleContext {
    pub fn new(services: Services) -> Self {
        let cancel = CancellationToken::new();
        let pacer = Pacer::new(services.speed.clone(), cancel.clone(), services.frame_ms);
        let operations = Mutex::new(cancel.child_token());
        Self {
            services,
            pacer,
            cancel,
            operations,
        }
    }

    /// Raises the module cancel flag. Every operation pacer is a child of it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Pacer for a new operation, cancelled by teardown or by the next
    /// [`ModuleContext::interrupt`].
    pub fn operation(&self) -> Result<Pacer> {
        let token = lock_state(&self.operations)?.clone();
        Ok(self.pacer.rebind(token))
    }

    /// Cancels every operation started so far and returns a pacer for the
    /// caller, which starts the next generation.
    pub fn interrupt(&self) -> Result<Pacer> {
        let token = {
            let mut operations = lock_state(&self.operations)?;
            operations.cancel();
            *operations = self.cancel.child_token();
            operations.clone()
        };
        Ok(self.pacer.rebind(token))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn scene(&self) -> Result<MutexGuard<'_, SceneRegistry>> {
        self.services.scene.lock()
    }

    pub fn notices(&self) -> &NoticeLog {
        &self.services.notices
    }

    pub fn palette(&self) -> Palette {
        self.services.palette
    }

    pub fn cube(&self, width: f32, height: f32, depth: f32) -> Result<GeometryHandle> {
        self.services
            .resources
            .geometry(GeometryKind::Box, &[width, height, depth])
    }

    pub fn sphere(&self, radius: f32) -> Result<GeometryHandle> {
        self.services
            .resources
            .geometry(GeometryKind::Sphere, &[radius, 32.0, 32.0])
    }

    pub fn solid(&self, color: u32) -> Result<MaterialHandle> {
        self.services.resources.solid(color)
    }

    pub fn faded(&self, color: u32) -> Result<MaterialHandle> {
        self.services.resources.material(color, true)
    }

    /// Random display value in `0..99`.
    pub fn random_value(&self) -> Result<i64> {
        self.services.random(0..99)
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Locks a module's domain state.
pub(crate) fn lock_state<T>(state: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    state
        .lock()
        .map_err(|_| ArcadeError::msg("module state has been poisoned"))
}

/// Identifier vocabulary for the module registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Tutorial,
    BigO,
    Array,
    Stack,
    Queue,
    SinglyLinkedList,
    DoublyLinkedList,
    Bst,
    Recursion,
    Sort(SortAlgorithm),
    Graph,
}

impl ModuleKind {
    pub fn all() -> Vec<ModuleKind> {
        let mut kinds = vec![
            Self::Tutorial,
            Self::BigO,
            Self::Array,
            Self::Stack,
            Self::Queue,
            Self::SinglyLinkedList,
            Self::DoublyLinkedList,
            Self::Bst,
            Self::Recursion,
        ];
        kinds.extend(SortAlgorithm::ALL.into_iter().map(Self::Sort));
        kinds.push(Self::Graph);
        kinds
    }

    pub fn id(&self) -> String {
        match self {
            Self::Tutorial => "tutorial".into(),
            Self::BigO => "bigO".into(),
            Self::Array => "array".into(),
            Self::Stack => "stack".into(),
            Self::Queue => "queue".into(),
            Self::SinglyLinkedList => "sll".into(),
            Self::DoublyLinkedList => "dll".into(),
            Self::Bst => "bst".into(),
            Self::Recursion => "recursion".into(),
            Self::Sort(algorithm) => format!("sort_{}", algorithm.key()),
            Self::Graph => "graph".into(),
        }
    }

    /// Constructs the module. Initial scene population happens here.
    pub fn build(self, services: Services) -> Result<Arc<dyn AlgorithmModule>> {
        let module: Arc<dyn AlgorithmModule> = match self {
            Self::Tutorial => tutorial::TutorialModule::new(services)?,
            Self::BigO => big_o::BigOModule::new(services)?,
            Self::Array => array::ArrayModule::new(services)?,
            Self::Stack => stack::StackModule::new(services)?,
            Self::Queue => queue::QueueModule::new(services)?,
            Self::SinglyLinkedList => linked_list::LinkedListModule::new(services, false)?,
            Self::DoublyLinkedList => linked_list::LinkedListModule::new(services, true)?,
            Self::Bst => bst::BstModule::new(services)?,
            Self::Recursion => recursion::RecursionModule::new(services)?,
            Self::Sort(algorithm) => sorting::SortingModule::new(services, algorithm)?,
            Self::Graph => graph::GraphModule::new(services)?,
        };
        Ok(module)
    }
}

impl FromStr for ModuleKind {
    type Err = ArcadeError;

    fn from_str(id: &str) -> Result<Self> {
        let kind = match id {
            "tutorial" => Self::Tutorial,
            "bigO" => Self::BigO,
            "array" => Self::Array,
            "stack" => Self::Stack,
            "queue" => Self::Queue,
            "sll" => Self::SinglyLinkedList,
            "dll" => Self::DoublyLinkedList,
            "bst" => Self::Bst,
            "recursion" => Self::Recursion,
            "graph" => Self::Graph,
            other => match other.strip_prefix("sort_") {
                Some(key) => Self::Sort(key.parse()?),
                None => return Err(ArcadeError::UnknownModule(other.to_string())),
            },
        };
        Ok(kind)
    }
}
