use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use crate::{
    modules::{handler, lock_state, AlgorithmModule, CapabilitySet, ModuleContext, Services},
    scene::{ObjectId, Vec3, VisualObject},
    Result,
};

pub const CAPACITY: usize = 8;
const LANE_Y: f32 = 0.5;
const SPACING: f32 = 1.5;
const SHIFT_MS: u64 = 200;

#[derive(Debug, Clone, Copy)]
struct Slot {
    value: i64,
    id: ObjectId,
}

/// FIFO queue: values enter on the right and leave on the left.
pub struct QueueModule {
    ctx: ModuleContext,
    slots: Mutex<VecDeque<Slot>>,
}

impl QueueModule {
    pub fn new(services: Services) -> Result<Arc<Self>> {
        let module = Arc::new(Self {
            ctx: ModuleContext::new(services),
            slots: Mutex::new(VecDeque::new()),
        });

        let ctx = &module.ctx;
        let lane = VisualObject::new(
            ctx.cube((CAPACITY as f32 + 1.0) * SPACING, 0.2, 2.0)?,
            ctx.solid(ctx.palette().base)?,
        )
        .at(Vec3::new(
            -(CAPACITY as f32 * SPACING) / 2.0 + SPACING / 2.0,
            LANE_Y - 0.5,
            0.0,
        ));
        {
            let mut scene = ctx.scene()?;
            scene.add(lane, Some("Queue Path".into()), Some("queue-path"));
            scene.set_camera(Vec3::new(0.0, 5.0, 15.0), Vec3::new(0.0, LANE_Y, 0.0));
        }

        ctx.notices().info(
            "Welcome to the Queue Module! This demonstrates FIFO (First-In First-Out) behavior.",
        );
        ctx.notices().info(
            "Elements (nodes) enter at the rear and leave from the front, just like a waiting line.",
        );
        Ok(module)
    }

    pub async fn enqueue(&self) -> Result<()> {
        let value = {
            let mut slots = lock_state(&self.slots)?;
            if slots.len() >= CAPACITY {
                self.ctx
                    .notices()
                    .error("Error: Queue is full (Overflow)! Cannot enqueue more items.");
                return Ok(());
            }

            let value = self.ctx.random_value()?;
            self.ctx
                .notices()
                .info(format!("Enqueuing value: {value} (entering from the rear)..."));
            let entry = VisualObject::new(
                self.ctx.cube(1.2, 1.0, 1.2)?,
                self.ctx.solid(self.ctx.palette().primary)?,
            )
            .at(Vec3::new(
                CAPACITY as f32 / 2.0 * SPACING + 5.0,
                LANE_Y,
                0.0,
            ))
            .with_hover(format!("Value: {value}\nPosition: Enqueueing"));
            let id = self.ctx.scene()?.add_labeled(entry, value);
            slots.push_back(Slot { value, id });
            value
        };

        self.reposition().await?;
        let size = self.len()?;
        self.ctx.notices().success(format!(
            "Successfully enqueued {value}. Queue size: {size}"
        ));
        Ok(())
    }

    pub async fn dequeue(&self) -> Result<()> {
        let front = lock_state(&self.slots)?.pop_front();
        let Some(front) = front else {
            self.ctx
                .notices()
                .error("Error: Queue is empty (Underflow)! Nothing to dequeue.");
            return Ok(());
        };

        self.ctx.notices().info(format!(
            "Dequeuing front value: {} (leaving from the front)...",
            front.value
        ));
        let from = {
            let mut scene = self.ctx.scene()?;
            scene.set_material(front.id, self.ctx.solid(self.ctx.palette().error)?);
            scene.position(front.id)
        };
        self.ctx.pacer.suspend(SHIFT_MS).await?;

        if let Some(from) = from {
            let exit = from.with_x(-(CAPACITY as f32 / 2.0 * SPACING) - 5.0);
            self.ctx
                .pacer
                .glide(&self.ctx.services.scene, front.id, exit, SHIFT_MS)
                .await?;
        }
        self.ctx.scene()?.remove(front.id);

        self.reposition().await?;
        let size = self.len()?;
        self.ctx.notices().success(format!(
            "Successfully dequeued {}. Queue size: {size}",
            front.value
        ));
        Ok(())
    }

    pub async fn peek(&self) -> Result<()> {
        let front = lock_state(&self.slots)?.front().copied();
        let Some(front) = front else {
            self.ctx
                .notices()
                .warning("Warning: Queue is empty. Nothing to peek at.");
            return Ok(());
        };

        self.ctx.notices().info(format!(
            "Peeking at the front element: {}...",
            front.value
        ));
        let lifted = {
            let mut scene = self.ctx.scene()?;
            let original = scene
                .get(front.id)
                .and_then(|object| object.original_material().cloned());
            scene.set_material(front.id, self.ctx.solid(self.ctx.palette().highlight)?);
            let resting = scene.position(front.id);
            if let Some(resting) = resting {
                scene.set_position(front.id, resting + Vec3::new(0.0, 0.5, 0.0));
            }
            resting.zip(original)
        };

        self.ctx.pacer.suspend(1000).await?;

        if let Some((resting, original)) = lifted {
            let mut scene = self.ctx.scene()?;
            scene.set_position(front.id, resting);
            scene.set_material(front.id, original);
        }
        self.ctx.notices().success(format!(
            "Front element is {}. (No change to queue).",
            front.value
        ));
        Ok(())
    }

    /// Slides every element to its slot, front first, keeping the line
    /// centered.
    async fn reposition(&self) -> Result<()> {
        let slots: Vec<Slot> = lock_state(&self.slots)?.iter().copied().collect();
        let start = -(slots.len() as f32 * SPACING) / 2.0 + SPACING / 2.0;

        for (index, slot) in slots.iter().enumerate() {
            let target = Vec3::new(start + index as f32 * SPACING, LANE_Y, 0.0);
            self.ctx
                .pacer
                .glide(&self.ctx.services.scene, slot.id, target, SHIFT_MS)
                .await?;

            let mut scene = self.ctx.scene()?;
            scene.set_position(slot.id, target);
            scene.set_hover_text(slot.id, format!("Position: {index}\nValue: {}", slot.value));
        }
        self.snap()
    }

    /// Places every element exactly at its slot for the line as it is now.
    /// An overlapping enqueue or dequeue may have changed it mid-slide.
    fn snap(&self) -> Result<()> {
        let slots = lock_state(&self.slots)?;
        let start = -(slots.len() as f32 * SPACING) / 2.0 + SPACING / 2.0;
        let mut scene = self.ctx.scene()?;
        for (index, slot) in slots.iter().enumerate() {
            scene.set_position(slot.id, Vec3::new(start + index as f32 * SPACING, LANE_Y, 0.0));
            scene.set_hover_text(slot.id, format!("Position: {index}\nValue: {}", slot.value));
        }
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(lock_state(&self.slots)?.len())
    }

    pub fn values(&self) -> Result<Vec<i64>> {
        Ok(lock_state(&self.slots)?.iter().map(|slot| slot.value).collect())
    }
}

impl AlgorithmModule for QueueModule {
    fn id(&self) -> &str {
        "queue"
    }

    fn title(&self) -> &str {
        "Queue Operations"
    }

    fn capabilities(self: Arc<Self>) -> CapabilitySet {
        CapabilitySet::new()
            .with(
                "enqueue",
                handler(&self, |module, _| async move { module.enqueue().await }),
            )
            .with(
                "dequeue",
                handler(&self, |module, _| async move { module.dequeue().await }),
            )
            .with("peek", handler(&self, |module, _| async move { module.peek().await }))
    }

    fn teardown(&self) {
        self.ctx.cancel();
    }
}
