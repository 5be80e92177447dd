use std::sync::{Arc, Mutex};

use crate::{
    modules::{handler, lock_state, AlgorithmModule, CapabilitySet, ModuleContext, Services},
    scene::{ObjectId, Vec3, VisualObject},
    timeline::Pacer,
    Result,
};

pub const CAPACITY: usize = 5;
const GAP: f32 = 0.2;
const DROP_HEIGHT: f32 = 8.0;
const STEP: f32 = 0.2;
const BASE_LABEL: &str = "Stack Base";

#[derive(Debug, Clone, Copy)]
struct Plate {
    value: i64,
    id: ObjectId,
}

/// LIFO stack drawn as plates falling onto a base.
pub struct StackModule {
    ctx: ModuleContext,
    plates: Mutex<Vec<Plate>>,
}

impl StackModule {
    pub fn new(services: Services) -> Result<Arc<Self>> {
        let module = Arc::new(Self {
            ctx: ModuleContext::new(services),
            plates: Mutex::new(Vec::new()),
        });
        module.place_base()?;
        module
            .ctx
            .scene()?
            .set_camera(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO);

        let notices = module.ctx.notices();
        notices.info(
            "Welcome to the Stack Module! This demonstrates LIFO (Last-In First-Out) behavior.",
        );
        notices.info(
            "Elements are added and removed only from the top. Think of a stack of plates!",
        );
        notices.info("Use 'Push' to add elements, 'Pop' to remove the top element, and 'Peek' to view the top without removing it.");
        Ok(module)
    }

    fn place_base(&self) -> Result<ObjectId> {
        let base = VisualObject::new(
            self.ctx.cube(4.0, 0.2, 4.0)?,
            self.ctx.solid(self.ctx.palette().base)?,
        )
        .at(Vec3::new(0.0, -0.5, 0.0));
        Ok(self
            .ctx
            .scene()?
            .add(base, Some(BASE_LABEL.into()), Some(BASE_LABEL)))
    }

    fn slot_height(depth: usize) -> f32 {
        depth as f32 * (1.0 + GAP) + 0.5
    }

    /// Pushes a random value. The plate is on the stack from the moment it
    /// appears; the drop animation only follows.
    pub async fn push(&self) -> Result<()> {
        let pacer = self.ctx.operation()?;
        let palette = self.ctx.palette();
        let value = self.ctx.random_value()?;

        let reserved = {
            let mut plates = lock_state(&self.plates)?;
            let depth = plates.len();
            if depth >= CAPACITY {
                Err(Self::slot_height(depth))
            } else {
                let plate = VisualObject::new(
                    self.ctx.cube(1.5, 1.0, 1.5)?,
                    self.ctx.solid(palette.primary)?,
                )
                .at(Vec3::new(0.0, DROP_HEIGHT, 0.0))
                .with_hover(format!("Value: {value}\nIndex: {depth} (Current Top)"));
                let id = self.ctx.scene()?.add_labeled(plate, value);
                plates.push(Plate { value, id });
                Ok((id, Self::slot_height(depth), plates.len()))
            }
        };
        let (id, target, size) = match reserved {
            Ok(slot) => slot,
            Err(target) => return self.reject_push(&pacer, value, target).await,
        };

        self.ctx.notices().info(format!(
            "Pushing value: {value} onto the stack. This element will be at the top and the first to be removed."
        ));
        let fall = pacer.duration_for(DROP_HEIGHT - target, STEP);
        pacer
            .glide(&self.ctx.services.scene, id, Vec3::new(0.0, target, 0.0), fall)
            .await?;

        self.ctx.notices().success(format!(
            "Successfully pushed {value}. Stack size: {size}. New top value: {value}"
        ));
        Ok(())
    }

    async fn reject_push(&self, pacer: &Pacer, value: i64, target: f32) -> Result<()> {
        let palette = self.ctx.palette();
        self.ctx
            .notices()
            .info(format!("Attempting to push {value}..."));

        let ghost = VisualObject::new(self.ctx.cube(1.5, 1.0, 1.5)?, self.ctx.faded(palette.error)?)
            .at(Vec3::new(0.0, target + 1.5, 0.0))
            .with_hover(format!("Value: {value}\nState: Rejected (Stack Full)"));
        let id = self.ctx.scene()?.add_labeled(ghost, value);

        pacer.suspend(500).await?;
        self.ctx
            .notices()
            .error("Error: Stack Overflow! Max capacity reached.");

        let rise = pacer.duration_for(1.5, STEP);
        pacer
            .glide(&self.ctx.services.scene, id, Vec3::new(0.0, target + 3.0, 0.0), rise)
            .await?;
        self.ctx.scene()?.remove(id);
        Ok(())
    }

    pub async fn pop(&self) -> Result<()> {
        let pacer = self.ctx.operation()?;
        let popped = lock_state(&self.plates)?.pop();
        let Some(plate) = popped else {
            self.ctx
                .notices()
                .info("Attempting to Pop from an empty stack...");
            self.flash_base(&pacer, self.ctx.palette().error, 500).await?;
            self.ctx
                .notices()
                .error("Error: Stack Underflow! Cannot pop from an empty stack.");
            return Ok(());
        };

        self.ctx.notices().info(format!(
            "Popping value: {} from the stack. It was the last element pushed.",
            plate.value
        ));
        let from = {
            let mut scene = self.ctx.scene()?;
            scene.set_material(plate.id, self.ctx.solid(self.ctx.palette().error)?);
            scene.position(plate.id)
        };

        if let Some(from) = from {
            let rise = pacer.duration_for(DROP_HEIGHT - from.y, STEP);
            pacer
                .glide(&self.ctx.services.scene, plate.id, from.with_y(DROP_HEIGHT), rise)
                .await?;
        }
        self.ctx.scene()?.remove(plate.id);

        let top = lock_state(&self.plates)?.last().copied();
        let size = self.len()?;
        let notices = self.ctx.notices();
        notices.success(format!(
            "Successfully popped {}. Stack size: {size}.",
            plate.value
        ));
        match top {
            Some(top) => notices.success(format!("New top value: {}.", top.value)),
            None => notices.warning("Stack is now empty."),
        }
        Ok(())
    }

    pub async fn peek(&self) -> Result<()> {
        let pacer = self.ctx.operation()?;
        let top = lock_state(&self.plates)?.last().copied();
        let Some(top) = top else {
            self.ctx
                .notices()
                .info("Attempting to Peek at an empty stack...");
            self.flash_base(&pacer, self.ctx.palette().warning, 500).await?;
            self.ctx
                .notices()
                .warning("Warning: Stack is empty. Nothing to peek at.");
            return Ok(());
        };

        self.ctx.notices().info(format!(
            "Peeking at the top element: {}. This allows you to view the top without removing it.",
            top.value
        ));
        let lifted = {
            let mut scene = self.ctx.scene()?;
            let original = scene.get(top.id).and_then(|object| object.original_material().cloned());
            scene.set_material(top.id, self.ctx.solid(self.ctx.palette().highlight)?);
            let resting = scene.position(top.id);
            if let Some(resting) = resting {
                scene.set_position(top.id, resting + Vec3::new(0.0, 0.5, 0.0));
            }
            resting.zip(original)
        };

        pacer.suspend(1000).await?;

        if let Some((resting, original)) = lifted {
            let mut scene = self.ctx.scene()?;
            scene.set_position(top.id, resting);
            scene.set_material(top.id, original);
        }
        self.ctx.notices().success(format!(
            "Top element is {}. Stack remains unchanged.",
            top.value
        ));
        Ok(())
    }

    /// Stops every running push, pop or peek and empties the stack.
    pub fn reset(&self) -> Result<()> {
        self.ctx.interrupt()?;
        self.ctx.notices().info("Resetting stack...");
        self.ctx.scene()?.clear();
        lock_state(&self.plates)?.clear();
        self.place_base()?;
        self.ctx.notices().success("Stack has been reset to empty.");
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(lock_state(&self.plates)?.len())
    }

    pub fn values(&self) -> Result<Vec<i64>> {
        Ok(lock_state(&self.plates)?.iter().map(|plate| plate.value).collect())
    }

    async fn flash_base(&self, pacer: &Pacer, color: u32, ms: u64) -> Result<()> {
        let original = {
            let mut scene = self.ctx.scene()?;
            let Some(base) = scene.find_named(BASE_LABEL) else {
                return Ok(());
            };
            let original = scene.get(base).and_then(|object| object.original_material().cloned());
            scene.set_material(base, self.ctx.solid(color)?);
            original.map(|material| (base, material))
        };

        pacer.suspend(ms).await?;

        if let Some((base, material)) = original {
            self.ctx.scene()?.set_material(base, material);
        }
        Ok(())
    }
}

impl AlgorithmModule for StackModule {
    fn id(&self) -> &str {
        "stack"
    }

    fn title(&self) -> &str {
        "Stack Operations"
    }

    fn capabilities(self: Arc<Self>) -> CapabilitySet {
        CapabilitySet::new()
            .with("push", handler(&self, |module, _| async move { module.push().await }))
            .with("pop", handler(&self, |module, _| async move { module.pop().await }))
            .with("peek", handler(&self, |module, _| async move { module.peek().await }))
            .with(
                "resetStack",
                handler(&self, |module, _| async move { module.reset() }),
            )
    }

    fn teardown(&self) {
        self.ctx.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::Severity;

    fn stack() -> (Arc<StackModule>, Services) {
        let services = Services::seeded(11).unwrap();
        (StackModule::new(services.clone()).unwrap(), services)
    }

    #[tokio::test(start_paused = true)]
    async fn push_and_pop_follow_lifo_order() {
        let (stack, services) = stack();
        stack.push().await.unwrap();
        stack.push().await.unwrap();
        let pushed = stack.values().unwrap();

        stack.pop().await.unwrap();
        assert_eq!(stack.values().unwrap(), pushed[..1].to_vec());
        // base plus the remaining plate
        assert_eq!(services.scene.lock().unwrap().object_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn overflow_keeps_size_and_removes_the_ghost() {
        let (stack, services) = stack();
        for _ in 0..CAPACITY {
            stack.push().await.unwrap();
        }
        let before = services.scene.lock().unwrap().object_count();

        stack.push().await.unwrap();
        assert_eq!(stack.len().unwrap(), CAPACITY);
        assert_eq!(services.scene.lock().unwrap().object_count(), before);
        assert!(services
            .notices
            .contains(Severity::Error, "Error: Stack Overflow! Max capacity reached."));
    }

    #[tokio::test(start_paused = true)]
    async fn underflow_keeps_size_and_restores_the_base() {
        let (stack, services) = stack();
        stack.pop().await.unwrap();

        assert_eq!(stack.len().unwrap(), 0);
        assert!(services
            .notices
            .contains(Severity::Error, "Error: Stack Underflow!"));

        let base_material = services.resources.solid(services.palette.base).unwrap();
        let scene = services.scene.lock().unwrap();
        let base = scene.find_named(BASE_LABEL).unwrap();
        assert!(Arc::ptr_eq(&scene.get(base).unwrap().material, &base_material));
    }

    #[tokio::test(start_paused = true)]
    async fn peek_leaves_the_top_in_place() {
        let (stack, services) = stack();
        stack.push().await.unwrap();
        let top = stack.values().unwrap()[0];
        let before: Vec<_> = services
            .scene
            .lock()
            .unwrap()
            .objects()
            .map(|object| object.position)
            .collect();

        stack.peek().await.unwrap();
        let after: Vec<_> = services
            .scene
            .lock()
            .unwrap()
            .objects()
            .map(|object| object.position)
            .collect();
        assert_eq!(before, after);
        assert!(services
            .notices
            .contains(Severity::Success, &format!("Top element is {top}.")));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_leaves_only_the_base() {
        let (stack, services) = stack();
        stack.push().await.unwrap();
        stack.reset().unwrap();

        assert_eq!(stack.len().unwrap(), 0);
        let scene = services.scene.lock().unwrap();
        assert_eq!(scene.object_count(), 1);
        assert!(scene.find_named(BASE_LABEL).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_mid_push_stops_the_drop() {
        let (stack, services) = stack();
        let pushing = stack.clone();
        let task = tokio::spawn(async move { pushing.push().await });

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        stack.reset().unwrap();
        assert!(task.await.unwrap().unwrap_err().is_cancelled());

        assert_eq!(stack.len().unwrap(), 0);
        let scene = services.scene.lock().unwrap();
        assert_eq!(scene.object_count(), 1);
        assert!(scene.find_named(BASE_LABEL).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_pushes_never_exceed_capacity() {
        let (stack, services) = stack();
        for _ in 0..CAPACITY - 1 {
            stack.push().await.unwrap();
        }

        let (first, second) = tokio::join!(stack.push(), stack.push());
        first.unwrap();
        second.unwrap();

        assert_eq!(stack.len().unwrap(), CAPACITY);
        let scene = services.scene.lock().unwrap();
        assert_eq!(scene.object_count(), CAPACITY + 1);
        let plates = lock_state(&stack.plates).unwrap();
        assert!(plates.iter().all(|plate| scene.contains(plate.id)));
        drop(plates);
        drop(scene);
        assert!(services
            .notices
            .contains(Severity::Error, "Error: Stack Overflow!"));
    }
}
