use std::sync::{Arc, Mutex};

use crate::{
    modules::{handler, lock_state, AlgorithmModule, CapabilitySet, ModuleContext, Services},
    scene::{ObjectId, Vec3, VisualObject},
    Result,
};

pub const CAPACITY: usize = 8;
const SPACING: f32 = 1.5;
const INITIAL_SIZE: usize = 5;

#[derive(Debug, Clone, Copy)]
struct Cell {
    value: i64,
    id: ObjectId,
}

/// Fixed-capacity array with append and remove-from-end.
pub struct ArrayModule {
    ctx: ModuleContext,
    cells: Mutex<Vec<Cell>>,
}

impl ArrayModule {
    pub fn new(services: Services) -> Result<Arc<Self>> {
        let module = Arc::new(Self {
            ctx: ModuleContext::new(services),
            cells: Mutex::new(Vec::new()),
        });
        module
            .ctx
            .scene()?
            .set_camera(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO);
        module.generate(INITIAL_SIZE)?;
        Ok(module)
    }

    /// Stops any running insert, clears the scene and lays out `size` random
    /// values. Sizes above the capacity are clamped.
    pub fn generate(&self, size: usize) -> Result<()> {
        self.ctx.interrupt()?;
        let size = size.min(CAPACITY);
        self.ctx.scene()?.clear();
        let mut cells = Vec::with_capacity(size);
        for index in 0..size {
            let value = self.ctx.random_value()?;
            let id = self.spawn_cell(index, value, self.ctx.palette().primary)?;
            cells.push(Cell { value, id });
        }
        *lock_state(&self.cells)? = cells;
        self.ctx
            .notices()
            .info(format!("Generated array of size {size}"));
        Ok(())
    }

    pub async fn add_value(&self) -> Result<()> {
        let pacer = self.ctx.operation()?;
        let palette = self.ctx.palette();
        let (value, index, id) = {
            let mut cells = lock_state(&self.cells)?;
            if cells.len() >= CAPACITY {
                self.ctx
                    .notices()
                    .warning("Array is full. Cannot add more elements.");
                return Ok(());
            }
            let value = self.ctx.random_value()?;
            let index = cells.len();
            let id = self.spawn_cell(index, value, palette.success)?;
            cells.push(Cell { value, id });
            (value, index, id)
        };

        self.ctx
            .notices()
            .success(format!("Added value: {value} at index {index}."));
        pacer.suspend(500).await?;
        self.ctx
            .scene()?
            .set_material(id, self.ctx.solid(palette.primary)?);
        Ok(())
    }

    pub fn remove_value(&self) -> Result<()> {
        let Some(removed) = lock_state(&self.cells)?.pop() else {
            self.ctx
                .notices()
                .warning("Array is already empty! Cannot remove.");
            return Ok(());
        };

        self.ctx.scene()?.remove(removed.id);
        self.ctx.notices().success(format!(
            "Removed value: {} from the end of the array.",
            removed.value
        ));
        Ok(())
    }

    pub fn values(&self) -> Result<Vec<i64>> {
        Ok(lock_state(&self.cells)?.iter().map(|cell| cell.value).collect())
    }

    fn spawn_cell(&self, index: usize, value: i64, color: u32) -> Result<ObjectId> {
        let start = -(CAPACITY as f32 * SPACING) / 2.0 + 0.75;
        let object = VisualObject::new(self.ctx.cube(1.2, 1.0, 1.2)?, self.ctx.solid(color)?)
            .at(Vec3::new(start + index as f32 * SPACING, 0.0, 0.0))
            .with_hover(format!("Index: {index}\nValue: {value}"));
        Ok(self.ctx.scene()?.add_labeled(object, value))
    }
}

impl AlgorithmModule for ArrayModule {
    fn id(&self) -> &str {
        "array"
    }

    fn title(&self) -> &str {
        "Array Operations"
    }

    fn capabilities(self: Arc<Self>) -> CapabilitySet {
        CapabilitySet::new()
            .with(
                "addValue",
                handler(&self, |module, _| async move { module.add_value().await }),
            )
            .with(
                "removeValue",
                handler(&self, |module, _| async move { module.remove_value() }),
            )
            .with(
                "generateArray",
                handler(&self, |module, request| async move {
                    module.generate(request.aux_or(INITIAL_SIZE))
                }),
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

    #[tokio::test(start_paused = true)]
    async fn starts_with_five_values() {
        let services = Services::seeded(1).unwrap();
        let module = ArrayModule::new(services.clone()).unwrap();
        assert_eq!(module.values().unwrap().len(), INITIAL_SIZE);
        assert_eq!(services.scene.lock().unwrap().object_count(), INITIAL_SIZE);
        assert!(module
            .values()
            .unwrap()
            .iter()
            .all(|value| (0..99).contains(value)));
    }

    #[tokio::test(start_paused = true)]
    async fn add_past_capacity_is_rejected() {
        let services = Services::seeded(1).unwrap();
        let module = ArrayModule::new(services.clone()).unwrap();
        for _ in INITIAL_SIZE..CAPACITY {
            module.add_value().await.unwrap();
        }
        assert_eq!(module.values().unwrap().len(), CAPACITY);

        module.add_value().await.unwrap();
        assert_eq!(module.values().unwrap().len(), CAPACITY);
        assert_eq!(services.scene.lock().unwrap().object_count(), CAPACITY);
        assert!(services
            .notices
            .contains(Severity::Warning, "Array is full"));
    }

    #[tokio::test(start_paused = true)]
    async fn remove_from_empty_warns() {
        let services = Services::seeded(1).unwrap();
        let module = ArrayModule::new(services.clone()).unwrap();
        for _ in 0..INITIAL_SIZE {
            module.remove_value().unwrap();
        }
        module.remove_value().unwrap();

        assert!(module.values().unwrap().is_empty());
        assert_eq!(services.scene.lock().unwrap().object_count(), 0);
        assert!(services
            .notices
            .contains(Severity::Warning, "Array is already empty"));
    }

    #[tokio::test(start_paused = true)]
    async fn added_cell_settles_back_to_primary() {
        let services = Services::seeded(1).unwrap();
        let module = ArrayModule::new(services.clone()).unwrap();
        module.add_value().await.unwrap();

        let primary = services.resources.solid(services.palette.primary).unwrap();
        let scene = services.scene.lock().unwrap();
        assert!(scene
            .objects()
            .all(|object| Arc::ptr_eq(&object.material, &primary)));
    }

    #[tokio::test(start_paused = true)]
    async fn regenerating_mid_insert_cancels_the_insert() {
        let services = Services::seeded(1).unwrap();
        let module = ArrayModule::new(services.clone()).unwrap();
        let adding = module.clone();
        let task = tokio::spawn(async move { adding.add_value().await });

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        module.generate(3).unwrap();
        assert!(task.await.unwrap().unwrap_err().is_cancelled());

        let primary = services.resources.solid(services.palette.primary).unwrap();
        assert_eq!(module.values().unwrap().len(), 3);
        let scene = services.scene.lock().unwrap();
        assert_eq!(scene.object_count(), 3);
        assert!(scene
            .objects()
            .all(|object| Arc::ptr_eq(&object.material, &primary)));
    }
}
