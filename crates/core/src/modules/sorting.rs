use std::{
    fmt,
    str::FromStr,
    sync::{Arc, Mutex},
};

use crate::{
    modules::{handler, lock_state, AlgorithmModule, CapabilitySet, ModuleContext, Services},
    scene::{ObjectId, Vec3, VisualObject},
    timeline::Pacer,
    ArcadeError, Result,
};

const BAR_COUNT: usize = 10;
const SPACING: f32 = 1.5;
const LEFT_EDGE: f32 = -7.0;
const LIFT_Z: f32 = 2.0;
const PIVOT: u32 = 0xff00ff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortAlgorithm {
    Bubble,
    Selection,
    Insertion,
    Quick,
}

impl SortAlgorithm {
    pub const ALL: [SortAlgorithm; 4] = [
        SortAlgorithm::Bubble,
        SortAlgorithm::Selection,
        SortAlgorithm::Insertion,
        SortAlgorithm::Quick,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Bubble => "bubble",
            Self::Selection => "selection",
            Self::Insertion => "insertion",
            Self::Quick => "quick",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Bubble => "Bubble Sort",
            Self::Selection => "Selection Sort",
            Self::Insertion => "Insertion Sort",
            Self::Quick => "Quick Sort",
        }
    }

    pub fn complexity(&self) -> &'static str {
        match self {
            Self::Quick => "O(n log n)",
            _ => "O(n²)",
        }
    }
}

impl FromStr for SortAlgorithm {
    type Err = ArcadeError;

    fn from_str(key: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.key() == key)
            .ok_or_else(|| ArcadeError::UnknownModule(format!("sort_{key}")))
    }
}

impl fmt::Display for SortAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy)]
struct Bar {
    value: i64,
    id: ObjectId,
}

fn slot_x(index: usize) -> f32 {
    index as f32 * SPACING + LEFT_EDGE
}

/// Bars whose heights are the values being sorted. Every comparison and
/// swap is its own visible step.
pub struct SortingModule {
    ctx: ModuleContext,
    algorithm: SortAlgorithm,
    id: String,
    bars: Mutex<Vec<Bar>>,
}

impl SortingModule {
    pub fn new(services: Services, algorithm: SortAlgorithm) -> Result<Arc<Self>> {
        let module = Arc::new(Self {
            ctx: ModuleContext::new(services),
            algorithm,
            id: format!("sort_{}", algorithm.key()),
            bars: Mutex::new(Vec::new()),
        });
        module.generate()?;
        Ok(module)
    }

    /// Replaces the bars with fresh random heights in `1..=8`.
    pub fn generate(&self) -> Result<()> {
        let values = (0..BAR_COUNT)
            .map(|_| self.ctx.services.random(1..9))
            .collect::<Result<Vec<_>>>()?;
        self.load(&values)
    }

    /// Stops a running sort, clears the scene and lays out one bar per
    /// value.
    pub fn load(&self, values: &[i64]) -> Result<()> {
        self.ctx.interrupt()?;
        let mut bars = lock_state(&self.bars)?;
        let mut scene = self.ctx.scene()?;
        scene.clear();
        bars.clear();

        let neutral = self.ctx.solid(self.ctx.palette().neutral)?;
        for (index, value) in values.iter().copied().enumerate() {
            let height = value as f32;
            let bar = VisualObject::new(self.ctx.cube(1.0, height, 1.0)?, neutral.clone())
                .at(Vec3::new(slot_x(index), height / 2.0, 0.0))
                .with_hover(format!("Value: {value}"));
            let id = scene.add_labeled(bar, value);
            bars.push(Bar { value, id });
        }
        Ok(())
    }

    pub fn values(&self) -> Result<Vec<i64>> {
        Ok(lock_state(&self.bars)?.iter().map(|bar| bar.value).collect())
    }

    /// Sorts the bars in place. Starting a run stops one already in
    /// progress.
    pub async fn run(&self) -> Result<()> {
        let pacer = self.ctx.interrupt()?;
        match self.algorithm {
            SortAlgorithm::Bubble => self.bubble(&pacer).await?,
            SortAlgorithm::Selection => self.selection(&pacer).await?,
            SortAlgorithm::Insertion => self.insertion(&pacer).await?,
            SortAlgorithm::Quick => self.quick(&pacer).await?,
        }
        self.ctx.notices().success("Array Sorted!");
        Ok(())
    }

    async fn bubble(&self, pacer: &Pacer) -> Result<()> {
        let palette = self.ctx.palette();
        let n = lock_state(&self.bars)?.len();
        for i in 0..n {
            for j in 0..n - i - 1 {
                self.paint(j, palette.highlight)?;
                self.paint(j + 1, palette.highlight)?;
                pacer.suspend(200).await?;
                if self.value(j)? > self.value(j + 1)? {
                    self.swap(pacer, j, j + 1).await?;
                }
                self.paint(j, palette.neutral)?;
                self.paint(j + 1, palette.neutral)?;
            }
            self.paint(n - 1 - i, palette.success)?;
        }
        Ok(())
    }

    async fn selection(&self, pacer: &Pacer) -> Result<()> {
        let palette = self.ctx.palette();
        let n = lock_state(&self.bars)?.len();
        for i in 0..n {
            let mut min = i;
            self.paint(i, palette.primary)?;

            for j in i + 1..n {
                self.paint(j, palette.highlight)?;
                pacer.suspend(100).await?;
                if self.value(j)? < self.value(min)? {
                    if min != i {
                        self.paint(min, palette.neutral)?;
                    }
                    min = j;
                    self.paint(min, palette.error)?;
                } else {
                    self.paint(j, palette.neutral)?;
                }
            }

            if min != i {
                self.swap(pacer, i, min).await?;
                self.paint(min, palette.neutral)?;
            }
            self.paint(i, palette.success)?;
        }
        Ok(())
    }

    /// The key is pulled forward and walked left one adjacent exchange at a
    /// time, so the bars always hold the original values.
    async fn insertion(&self, pacer: &Pacer) -> Result<()> {
        let palette = self.ctx.palette();
        let n = lock_state(&self.bars)?.len();
        if n == 0 {
            return Ok(());
        }
        self.paint(0, palette.success)?;

        for i in 1..n {
            let key = self.value(i)?;
            self.shift(i, |position| Vec3::new(position.x, position.y, LIFT_Z))?;
            self.paint(i, palette.error)?;
            pacer.suspend(400).await?;

            let mut at = i;
            while at > 0 && self.value(at - 1)? > key {
                self.paint(at - 1, palette.highlight)?;
                pacer.suspend(200).await?;
                self.shift(at - 1, |position| position.with_x(position.x + SPACING))?;
                lock_state(&self.bars)?.swap(at - 1, at);
                self.paint(at, palette.neutral)?;
                at -= 1;
            }

            self.shift(at, |position| Vec3::new(slot_x(at), position.y, 0.0))?;
            for sorted in 0..=i {
                self.paint(sorted, palette.success)?;
            }
        }
        Ok(())
    }

    async fn quick(&self, pacer: &Pacer) -> Result<()> {
        let n = lock_state(&self.bars)?.len();
        let mut ranges = Vec::new();
        if n > 1 {
            ranges.push((0, n - 1));
        }

        // Left partitions are finished before right ones, as recursion would.
        while let Some((low, high)) = ranges.pop() {
            if low >= high {
                continue;
            }
            let pivot = self.partition(pacer, low, high).await?;
            ranges.push((pivot + 1, high));
            if pivot > 0 {
                ranges.push((low, pivot - 1));
            }
        }
        Ok(())
    }

    async fn partition(&self, pacer: &Pacer, low: usize, high: usize) -> Result<usize> {
        let palette = self.ctx.palette();
        let pivot = self.value(high)?;
        self.paint(high, PIVOT)?;

        let mut store = low;
        for j in low..high {
            self.paint(j, palette.highlight)?;
            pacer.suspend(100).await?;
            if self.value(j)? < pivot {
                self.swap(pacer, store, j).await?;
                store += 1;
            }
            self.paint(j, palette.neutral)?;
        }
        self.swap(pacer, store, high).await?;
        Ok(store)
    }

    fn bar(&self, index: usize) -> Result<Bar> {
        lock_state(&self.bars)?
            .get(index)
            .copied()
            .ok_or_else(|| ArcadeError::msg("bars were regenerated while sorting"))
    }

    fn value(&self, index: usize) -> Result<i64> {
        Ok(self.bar(index)?.value)
    }

    fn paint(&self, index: usize, color: u32) -> Result<()> {
        let bar = self.bar(index)?;
        self.ctx
            .scene()?
            .set_material(bar.id, self.ctx.solid(color)?);
        Ok(())
    }

    fn shift(&self, index: usize, to: impl FnOnce(Vec3) -> Vec3) -> Result<()> {
        let bar = self.bar(index)?;
        let mut scene = self.ctx.scene()?;
        if let Some(position) = scene.position(bar.id) {
            scene.set_position(bar.id, to(position));
        }
        Ok(())
    }

    /// Exchanges two bars in place and on screen.
    async fn swap(&self, pacer: &Pacer, a: usize, b: usize) -> Result<()> {
        {
            let mut bars = lock_state(&self.bars)?;
            if a.max(b) >= bars.len() {
                return Err(ArcadeError::msg("bars were regenerated while sorting"));
            }
            let mut scene = self.ctx.scene()?;
            let (left, right) = (bars[a].id, bars[b].id);
            if let (Some(p), Some(q)) = (scene.position(left), scene.position(right)) {
                scene.set_position(left, p.with_x(q.x));
                scene.set_position(right, q.with_x(p.x));
            }
            bars.swap(a, b);
        }
        pacer.suspend(200).await
    }
}

impl AlgorithmModule for SortingModule {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        self.algorithm.title()
    }

    fn capabilities(self: Arc<Self>) -> CapabilitySet {
        CapabilitySet::new()
            .with(
                "generate",
                handler(&self, |module, _| async move { module.generate() }),
            )
            .with("run", handler(&self, |module, _| async move { module.run().await }))
    }

    fn teardown(&self) {
        self.ctx.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::Severity;
    use std::time::Duration;

    const INPUT: [i64; 6] = [5, 3, 8, 1, 9, 2];

    fn sorted(mut values: Vec<i64>) -> Vec<i64> {
        values.sort_unstable();
        values
    }

    #[tokio::test(start_paused = true)]
    async fn every_algorithm_sorts_and_keeps_the_multiset() {
        for algorithm in SortAlgorithm::ALL {
            let services = Services::seeded(4).unwrap();
            let module = SortingModule::new(services.clone(), algorithm).unwrap();
            module.load(&INPUT).unwrap();

            let running = module.clone();
            let task = tokio::spawn(async move { running.run().await });
            while !task.is_finished() {
                assert_eq!(
                    sorted(module.values().unwrap()),
                    sorted(INPUT.to_vec()),
                    "{algorithm} lost a value"
                );
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            task.await.unwrap().unwrap();

            assert_eq!(module.values().unwrap(), vec![1, 2, 3, 5, 8, 9], "{algorithm}");
            assert!(services.notices.contains(Severity::Success, "Array Sorted!"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bars_end_in_slot_order() {
        for algorithm in SortAlgorithm::ALL {
            let services = Services::seeded(4).unwrap();
            let module = SortingModule::new(services.clone(), algorithm).unwrap();
            module.load(&INPUT).unwrap();
            module.run().await.unwrap();

            let bars = lock_state(&module.bars).unwrap().clone();
            let scene = services.scene.lock().unwrap();
            for (index, bar) in bars.iter().enumerate() {
                let position = scene.position(bar.id).unwrap();
                assert_eq!(position.x, slot_x(index), "{algorithm} slot {index}");
                assert_eq!(position.z, 0.0);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn generate_draws_ten_bars() {
        let services = Services::seeded(4).unwrap();
        let module = SortingModule::new(services.clone(), SortAlgorithm::Quick).unwrap();
        let values = module.values().unwrap();
        assert_eq!(values.len(), BAR_COUNT);
        assert!(values.iter().all(|value| (1..=8).contains(value)));
        assert_eq!(services.scene.lock().unwrap().object_count(), BAR_COUNT);
    }

    #[tokio::test(start_paused = true)]
    async fn regenerating_mid_sort_stops_the_sort() {
        let services = Services::seeded(4).unwrap();
        let module = SortingModule::new(services.clone(), SortAlgorithm::Bubble).unwrap();
        module.load(&INPUT).unwrap();
        let running = module.clone();
        let task = tokio::spawn(async move { running.run().await });

        tokio::time::sleep(Duration::from_millis(700)).await;
        module.generate().unwrap();
        assert!(task.await.unwrap().unwrap_err().is_cancelled());
        tokio::time::sleep(Duration::from_secs(5)).await;

        let neutral = services.resources.solid(services.palette.neutral).unwrap();
        let bars = lock_state(&module.bars).unwrap().clone();
        assert_eq!(bars.len(), BAR_COUNT);
        let scene = services.scene.lock().unwrap();
        assert_eq!(scene.object_count(), BAR_COUNT);
        for (index, bar) in bars.iter().enumerate() {
            let object = scene.get(bar.id).unwrap();
            assert_eq!(object.position.x, slot_x(index));
            assert!(Arc::ptr_eq(&object.material, &neutral));
        }
        assert!(!services.notices.contains(Severity::Success, "Array Sorted!"));
    }

    #[test]
    fn algorithm_keys_parse() {
        for algorithm in SortAlgorithm::ALL {
            assert_eq!(algorithm.key().parse::<SortAlgorithm>().unwrap(), algorithm);
        }
        assert!("bogo".parse::<SortAlgorithm>().is_err());
    }
}
