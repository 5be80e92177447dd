use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt};

use crate::{
    modules::{handler, lock_state, AlgorithmModule, CapabilitySet, ModuleContext, Services},
    scene::{ObjectId, Vec3, VisualObject},
    timeline::Pacer,
    Result,
};

pub const MAX_N: u64 = 10;
const DEFAULT_N: u64 = 3;
const FRAME_HEIGHT: f32 = 0.8;
const FRAME_GAP: f32 = 0.2;
const DROP_STEP: f32 = 0.2;
const EXIT_STEP: f32 = 0.3;
const PAUSE_MS: u64 = 800;

#[derive(Debug, Default)]
struct CallStack {
    frames: Vec<ObjectId>,
    deepest: usize,
}

/// Factorial drawn as a call stack: one box per active call.
pub struct RecursionModule {
    ctx: ModuleContext,
    stack: Mutex<CallStack>,
}

impl RecursionModule {
    pub fn new(services: Services) -> Result<Arc<Self>> {
        let module = Arc::new(Self {
            ctx: ModuleContext::new(services),
            stack: Mutex::new(CallStack::default()),
        });
        module
            .ctx
            .scene()?
            .set_camera(Vec3::new(10.0, 10.0, 10.0), Vec3::new(0.0, 5.0, 0.0));

        let notices = module.ctx.notices();
        notices.info("Welcome to the Recursion Visualizer!");
        notices.info("This module demonstrates how recursion uses the Call Stack. We'll visualize factorial(n).");
        Ok(module)
    }

    /// Animates factorial(n). A run already in progress is stopped and its
    /// frames cleared first.
    pub async fn run(&self, n: u64) -> Result<u64> {
        if n > MAX_N {
            self.ctx
                .notices()
                .warning(format!("Please choose n between 0 and {MAX_N}."));
            return Ok(0);
        }
        let pacer = self.ctx.interrupt()?;

        let leftovers = {
            let mut stack = lock_state(&self.stack)?;
            stack.deepest = 0;
            std::mem::take(&mut stack.frames)
        };
        {
            let mut scene = self.ctx.scene()?;
            for id in leftovers {
                scene.remove(id);
            }
        }

        let notices = self.ctx.notices();
        notices.clear();
        notices.highlight(format!("Starting calculation for factorial({n})..."));
        let result = self.factorial(&pacer, n).await?;
        notices.success(format!("Final result of factorial({n}) is {result}."));
        Ok(result)
    }

    /// Deepest call stack reached by the last run.
    pub fn deepest(&self) -> Result<usize> {
        Ok(lock_state(&self.stack)?.deepest)
    }

    pub fn depth(&self) -> Result<usize> {
        Ok(lock_state(&self.stack)?.frames.len())
    }

    fn factorial<'a>(&'a self, pacer: &'a Pacer, n: u64) -> BoxFuture<'a, Result<u64>> {
        async move {
            let palette = self.ctx.palette();
            self.ctx.notices().info(format!(
                "Calling factorial({n}). Pushing new frame to the Call Stack."
            ));

            let frame = self.push_frame(pacer, n).await?;
            pacer.suspend(PAUSE_MS).await?;

            let result = if n <= 1 {
                self.ctx
                    .notices()
                    .success("Base case (n <= 1) reached. Returning 1.");
                1
            } else {
                self.ctx.notices().info(format!(
                    "factorial({n}) needs to compute {n} * factorial({below}). Calling factorial({below})...",
                    below = n - 1
                ));
                {
                    let mut scene = self.ctx.scene()?;
                    scene.set_material(frame, self.ctx.solid(palette.warning)?);
                    scene.set_hover_text(
                        frame,
                        format!("Call: factorial({n})\nState: Waiting for factorial({})", n - 1),
                    );
                }

                let below = self.factorial(pacer, n - 1).await?;
                let result = n * below;
                self.ctx.notices().success(format!(
                    "factorial({}) returned {below}. Now computing {n} * {below} = {result}.",
                    n - 1
                ));
                result
            };

            {
                let mut scene = self.ctx.scene()?;
                scene.set_material(frame, self.ctx.solid(palette.success)?);
                scene.set_hover_text(frame, format!("Call: factorial({n})\nState: Returning {result}"));
            }
            pacer.suspend(PAUSE_MS).await?;
            self.pop_frame(pacer, frame).await?;
            Ok(result)
        }
        .boxed()
    }

    async fn push_frame(&self, pacer: &Pacer, n: u64) -> Result<ObjectId> {
        let (id, target) = {
            let mut stack = lock_state(&self.stack)?;
            let object = VisualObject::new(
                self.ctx.cube(3.0, FRAME_HEIGHT, 3.0)?,
                self.ctx.solid(self.ctx.palette().primary)?,
            )
            .at(Vec3::new(0.0, stack.frames.len() as f32 + 5.0, 0.0))
            .with_hover(format!("Call: factorial({n})\nState: Executing"));
            let id = self
                .ctx
                .scene()?
                .add(object, Some(format!("fact({n})")), None);

            stack.frames.push(id);
            stack.deepest = stack.deepest.max(stack.frames.len());
            let target = (stack.frames.len() - 1) as f32 * (FRAME_HEIGHT + FRAME_GAP);
            (id, target)
        };

        let from = self.ctx.scene()?.position(id).unwrap_or_default();
        let fall = pacer.duration_for(from.y - target, DROP_STEP);
        pacer
            .glide(&self.ctx.services.scene, id, from.with_y(target), fall)
            .await?;
        Ok(id)
    }

    /// Takes `id` off the call stack, slides it off to the left and removes
    /// it.
    async fn pop_frame(&self, pacer: &Pacer, id: ObjectId) -> Result<()> {
        {
            let mut stack = lock_state(&self.stack)?;
            let Some(at) = stack.frames.iter().rposition(|frame| *frame == id) else {
                return Ok(());
            };
            stack.frames.remove(at);
        }

        let from = {
            let mut scene = self.ctx.scene()?;
            scene.set_material(id, self.ctx.faded(self.ctx.palette().success)?);
            scene.position(id).unwrap_or_default()
        };
        let slide = pacer.duration_for(from.x + 10.0, EXIT_STEP);
        pacer
            .glide(&self.ctx.services.scene, id, from.with_x(-10.0), slide)
            .await?;
        self.ctx.scene()?.remove(id);
        Ok(())
    }
}

impl AlgorithmModule for RecursionModule {
    fn id(&self) -> &str {
        "recursion"
    }

    fn title(&self) -> &str {
        "Recursion Visualizer"
    }

    fn capabilities(self: Arc<Self>) -> CapabilitySet {
        CapabilitySet::new().with(
            "runFact",
            handler(&self, |module, request| async move {
                module.run(request.aux_or(DEFAULT_N)).await.map(|_| ())
            }),
        )
    }

    fn teardown(&self) {
        self.ctx.cancel();
    }
}
