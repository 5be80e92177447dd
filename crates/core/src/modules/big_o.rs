use std::{
    fmt,
    sync::{Arc, Mutex},
};

use futures::future::FutureExt;

use crate::{
    modules::{
        handler, lock_state, AlgorithmModule, CapabilitySet, ModuleContext, Services, StepFuture,
    },
    scene::{ObjectId, Vec3, VisualObject},
    timeline::Pacer,
    Result,
};

const SEARCH_TARGET: i64 = 25;
const SEARCH_SIZE: usize = 31;

/// The complexity classes the showcase can demonstrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Constant,
    Logarithmic,
    Linear,
    Quadratic,
    Linearithmic,
}

impl Complexity {
    pub fn notation(self) -> &'static str {
        match self {
            Self::Constant => "O(1)",
            Self::Logarithmic => "O(log n)",
            Self::Linear => "O(n)",
            Self::Quadratic => "O(n²)",
            Self::Linearithmic => "O(n log n)",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Constant => "Constant",
            Self::Logarithmic => "Logarithmic",
            Self::Linear => "Linear",
            Self::Quadratic => "Quadratic",
            Self::Linearithmic => "Linearithmic",
        }
    }

    /// Narration emitted before the demo starts: (message, severity hint).
    fn briefing(self) -> &'static [(&'static str, Tone)] {
        match self {
            Self::Constant => &[
                ("This refers to an operation that always takes the same amount of time to complete, no matter how large the input data (n) becomes.", Tone::Plain),
                ("In this visualization, we have an array of elements. We're directly accessing an element using its index.", Tone::Plain),
                ("No matter if the array has 5, 500, or 5 million elements, finding a specific element by its index is a single, instant step.", Tone::Info),
                ("Pros: Extremely fast and predictable. Ideal for critical operations.", Tone::Pro),
                ("Cons: Not always possible to achieve for complex tasks.", Tone::Con),
                ("Space Complexity: O(1) - Constant Space", Tone::Heading),
                ("An algorithm has O(1) space complexity if it requires a constant amount of memory, regardless of the input size (n).", Tone::Plain),
            ],
            Self::Logarithmic => &[
                ("This means the time to complete an operation grows very slowly as the input size (n) increases. Each clue cuts the search area in half.", Tone::Plain),
                ("The most famous example is Binary Search, where we efficiently find an item in a sorted list.", Tone::Plain),
                ("Each step of a logarithmic algorithm eliminates a large portion of the remaining data.", Tone::Info),
                ("Pros: Extremely efficient for large datasets, especially for searching.", Tone::Pro),
                ("Cons: Requires data to be sorted (for search) or specific data structures (like balanced trees).", Tone::Con),
                ("Space Complexity: O(log n) - Logarithmic Space", Tone::Heading),
                ("Iterative binary search needs O(1) space; the recursive form adds one stack frame per halving, so its stack depth grows logarithmically with n.", Tone::Plain),
            ],
            Self::Linear => &[
                ("This means the time to complete an operation grows directly and proportionally with the input size (n). Double the input, double the time.", Tone::Plain),
                ("A common example is iterating through an array or list to find a specific value, or processing each item once.", Tone::Plain),
                ("We have to potentially look at every single element once in the worst-case scenario.", Tone::Info),
                ("Pros: Often the best achievable if you must process every item. Simple to understand.", Tone::Pro),
                ("Cons: Performance degrades noticeably with very large inputs. Avoid if a logarithmic solution is possible.", Tone::Con),
                ("Space Complexity: O(1) - Constant Space", Tone::Heading),
                ("We only need a few variables to keep track of the current element and whether we found our target.", Tone::Info),
            ],
            Self::Quadratic => &[
                ("This means the time to complete an operation grows with the square of the input size (n). Double the input and the time can quadruple.", Tone::Plain),
                ("This often happens with nested loops: for each item in a collection, you iterate through the entire collection again.", Tone::Plain),
                ("Example: Simple sorting algorithms like Bubble Sort or Selection Sort, where every element is compared with every other element.", Tone::Info),
                ("Pros: Sometimes the most straightforward solution, or the only one known for a specific problem.", Tone::Pro),
                ("Cons: Becomes extremely slow very quickly as n increases. Avoid for large datasets whenever possible.", Tone::Con),
                ("Space Complexity: O(1) - Constant Space (for in-place sorting)", Tone::Heading),
                ("We only need a few extra variables for comparisons and swaps, which doesn't grow with n.", Tone::Info),
            ],
            Self::Linearithmic => &[
                ("This is a very efficient complexity, much better than O(n²), and often the gold standard for sorting algorithms.", Tone::Plain),
                ("Algorithms divide the problem into smaller parts (log n levels) and then process those parts linearly (n per level).", Tone::Plain),
                ("Example: Merge Sort or Quick Sort. They divide the array to sort it and then merge or combine parts.", Tone::Info),
                ("Pros: Highly scalable for large datasets, making them practical for real-world applications.", Tone::Pro),
                ("Cons: More complex to implement than O(n²) algorithms.", Tone::Con),
                ("Space Complexity: O(n) - Linear Space (for Merge Sort)", Tone::Heading),
                ("Merge Sort needs a temporary array proportional to the input to merge elements.", Tone::Info),
            ],
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} Time", self.notation(), self.name())
    }
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Plain,
    Info,
    Pro,
    Con,
    Heading,
}

#[derive(Debug, Default)]
struct Showcase {
    current: Option<Complexity>,
    row: Vec<(ObjectId, i64)>,
}

/// Complexity showcase: one short animated demo per complexity class.
pub struct BigOModule {
    ctx: ModuleContext,
    showcase: Mutex<Showcase>,
}

impl BigOModule {
    pub fn new(services: Services) -> Result<Arc<Self>> {
        let module = Arc::new(Self {
            ctx: ModuleContext::new(services),
            showcase: Mutex::new(Showcase::default()),
        });
        module
            .ctx
            .scene()?
            .set_camera(Vec3::new(0.0, 5.0, 15.0), Vec3::ZERO);
        Ok(module)
    }

    /// Complexity currently on display.
    pub fn current(&self) -> Result<Option<Complexity>> {
        Ok(lock_state(&self.showcase)?.current)
    }

    /// Direct index access: one step regardless of size.
    pub async fn show_constant(&self) -> Result<()> {
        let pacer = self.begin(Complexity::Constant)?;
        let row = self.lay_out(&[0, 1, 2, 3, 4], 1.5, Vec3::new(1.2, 1.0, 1.2), |index, _| {
            format!("Index {index}")
        })?;
        pacer.suspend(1000).await?;

        let notices = self.ctx.notices();
        notices.info("Accessing element at index 2...");
        self.paint(row[2], self.ctx.palette().success)?;
        pacer.suspend(1500).await?;
        self.paint(row[2], self.ctx.palette().base)?;

        notices.success("Operation complete in constant time!");
        Ok(())
    }

    /// Binary search for 25 in 1..=31. Returns the index where it was found
    /// and the number of checks it took.
    pub async fn show_logarithmic(&self) -> Result<(Option<usize>, usize)> {
        let pacer = self.begin(Complexity::Logarithmic)?;
        pacer.suspend(1000).await?;

        let numbers: Vec<i64> = (1..=SEARCH_SIZE as i64).collect();
        let row = self.lay_out(&numbers, 0.8, Vec3::new(0.7, 0.7, 0.7), |_, value| {
            value.to_string()
        })?;
        pacer.suspend(1000).await?;

        let palette = self.ctx.palette();
        let notices = self.ctx.notices();
        notices.info(format!(
            "Searching for {SEARCH_TARGET} using Binary Search..."
        ));

        let (mut low, mut high) = (0usize, numbers.len());
        let mut checks = 0;
        let mut found = None;
        while low < high {
            let mid = low + (high - low) / 2;
            checks += 1;
            {
                let mut scene = self.ctx.scene()?;
                for (index, id) in row.iter().enumerate() {
                    let color = if index == mid {
                        palette.highlight
                    } else if (low..high).contains(&index) {
                        palette.warning
                    } else {
                        palette.base
                    };
                    scene.set_material(*id, self.ctx.solid(color)?);
                }
            }
            notices.info(format!(
                "Checking mid element at index {mid} (value: {})",
                numbers[mid]
            ));
            pacer.suspend(1000).await?;

            match numbers[mid].cmp(&SEARCH_TARGET) {
                std::cmp::Ordering::Equal => {
                    self.paint(row[mid], palette.success)?;
                    notices.success(format!("{SEARCH_TARGET} found at index {mid}!"));
                    found = Some(mid);
                    break;
                }
                std::cmp::Ordering::Less => {
                    notices.info(format!(
                        "{} is too small. Searching right half.",
                        numbers[mid]
                    ));
                    low = mid + 1;
                }
                std::cmp::Ordering::Greater => {
                    notices.info(format!(
                        "{} is too large. Searching left half.",
                        numbers[mid]
                    ));
                    high = mid;
                }
            }
            pacer.suspend(1000).await?;
        }

        if found.is_none() {
            notices.error(format!(
                "{SEARCH_TARGET} not found in the array. Even when not found, the process is quick!"
            ));
        }
        Ok((found, checks))
    }

    /// Linear scan for a random target in 1..=9 over eight random digits.
    pub async fn show_linear(&self) -> Result<Option<usize>> {
        let pacer = self.begin(Complexity::Linear)?;
        let target = self.ctx.services.random(1..10)?;
        let values = self.random_digits(8)?;
        let row = self.lay_out(&values, 1.5, Vec3::new(1.2, 1.0, 1.2), |_, value| {
            value.to_string()
        })?;

        let palette = self.ctx.palette();
        let notices = self.ctx.notices();
        notices.info(format!("Searching for value: {target} in the array..."));
        pacer.suspend(1000).await?;

        for (index, (id, value)) in row.iter().zip(&values).enumerate() {
            self.paint(*id, palette.highlight)?;
            notices.info(format!("Checking element at index {index} (value: {value})"));
            pacer.suspend(500).await?;

            if *value == target {
                self.paint(*id, palette.success)?;
                notices.success(format!("Found {target} at index {index}!"));
                return Ok(Some(index));
            }
            self.paint(*id, palette.base)?;
        }

        notices.error(format!("{target} not found in the array."));
        Ok(None)
    }

    /// Nested loops over five elements. Returns the number of comparisons.
    pub async fn show_quadratic(&self) -> Result<usize> {
        let pacer = self.begin(Complexity::Quadratic)?;
        let values = self.random_digits(5)?;
        let row = self.lay_out(&values, 1.5, Vec3::new(1.2, 1.0, 1.2), |_, value| {
            value.to_string()
        })?;

        let palette = self.ctx.palette();
        let notices = self.ctx.notices();
        notices.info("Simulating a quadratic time operation (nested loops)...");
        pacer.suspend(1000).await?;

        let mut comparisons = 0;
        for (i, outer) in row.iter().enumerate() {
            self.paint(*outer, palette.warning)?;
            notices.info(format!("Outer loop: Element {} at index {i}", values[i]));
            pacer.suspend(500).await?;

            for (j, inner) in row.iter().enumerate() {
                self.paint(*inner, palette.highlight)?;
                notices.info(format!(
                    "  Inner loop: Comparing with {} at index {j}",
                    values[j]
                ));
                comparisons += 1;
                pacer.suspend(200).await?;
                let restore = if i == j { palette.warning } else { palette.base };
                self.paint(*inner, restore)?;
            }
            self.paint(*outer, palette.base)?;
        }

        notices.success("Quadratic operation complete!");
        Ok(comparisons)
    }

    /// Merge-sort style narration: log2(n) passes, each touching every
    /// element once. Returns the number of passes.
    pub async fn show_linearithmic(&self) -> Result<usize> {
        let pacer = self.begin(Complexity::Linearithmic)?;
        let values = self.random_digits(8)?;
        let row = self.lay_out(&values, 1.5, Vec3::new(1.2, 1.0, 1.2), |_, value| {
            value.to_string()
        })?;

        let palette = self.ctx.palette();
        let notices = self.ctx.notices();
        notices.info("Simulating O(n log n) operation (e.g., Merge Sort)...");
        notices.info("Imagine dividing the array in halves (log n steps) and then merging (n steps).");
        pacer.suspend(1000).await?;

        let passes = row.len().next_power_of_two().trailing_zeros() as usize;
        for pass in 1..=passes {
            let width = 1usize << pass;
            notices.info(format!(
                "Pass {pass}: Dividing and conquering... merging runs of {width}."
            ));
            {
                let mut scene = self.ctx.scene()?;
                for id in &row {
                    scene.set_material(*id, self.ctx.solid(palette.warning)?);
                }
            }
            pacer.suspend(500).await?;

            notices.info("Merging sub-arrays...");
            notices.info("  Auxiliary space temporarily increases to O(n) for merging.");
            for id in &row {
                self.paint(*id, palette.highlight)?;
                pacer.suspend(100).await?;
                self.paint(*id, palette.base)?;
            }
            pacer.suspend(500).await?;
        }

        notices.success("O(n log n) operation complete!");
        notices.success("Merge Sort uses O(n) auxiliary space, as it needs temporary arrays proportional to the input size during merging.");
        Ok(passes)
    }

    /// Stops the demo on stage, clears it and narrates the class being
    /// demonstrated. Returns the pacer for the new demo.
    fn begin(&self, complexity: Complexity) -> Result<Pacer> {
        let pacer = self.ctx.interrupt()?;
        {
            let mut showcase = lock_state(&self.showcase)?;
            showcase.current = Some(complexity);
            showcase.row.clear();
        }
        self.ctx.scene()?.clear();

        let notices = self.ctx.notices();
        notices.clear();
        notices.highlight(format!("{complexity} Complexity"));
        for (message, tone) in complexity.briefing() {
            match tone {
                Tone::Plain | Tone::Info => notices.info(*message),
                Tone::Pro => notices.success(*message),
                Tone::Con => notices.warning(*message),
                Tone::Heading => notices.highlight(*message),
            }
        }
        tracing::debug!(complexity = complexity.notation(), "showcase started");
        Ok(pacer)
    }

    /// Centers a row of boxes on the origin and returns their ids.
    fn lay_out<F>(&self, values: &[i64], spacing: f32, size: Vec3, label: F) -> Result<Vec<ObjectId>>
    where
        F: Fn(usize, i64) -> String,
    {
        let geometry = self.ctx.cube(size.x, size.y, size.z)?;
        let material = self.ctx.solid(self.ctx.palette().base)?;
        let start = -(values.len() as f32 * spacing) / 2.0 + spacing / 2.0;

        let mut showcase = lock_state(&self.showcase)?;
        let mut scene = self.ctx.scene()?;
        let ids: Vec<ObjectId> = values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let cell = VisualObject::new(geometry.clone(), material.clone())
                    .at(Vec3::new(start + index as f32 * spacing, 0.0, 0.0))
                    .with_hover(format!("Index: {index}\nValue: {value}"));
                scene.add_labeled(cell, label(index, *value))
            })
            .collect();
        showcase.row = ids.iter().copied().zip(values.iter().copied()).collect();
        Ok(ids)
    }

    fn random_digits(&self, count: usize) -> Result<Vec<i64>> {
        (0..count).map(|_| self.ctx.services.random(0..10)).collect()
    }

    fn paint(&self, id: ObjectId, color: u32) -> Result<()> {
        self.ctx.scene()?.set_material(id, self.ctx.solid(color)?);
        Ok(())
    }
}

impl AlgorithmModule for BigOModule {
    fn id(&self) -> &str {
        "bigO"
    }

    fn title(&self) -> &str {
        "Big O Notation"
    }

    fn capabilities(self: Arc<Self>) -> CapabilitySet {
        CapabilitySet::new()
            .with(
                "showO1",
                handler(&self, |module, _| async move { module.show_constant().await }),
            )
            .with(
                "showLogN",
                handler(&self, |module, _| async move {
                    module.show_logarithmic().await.map(|_| ())
                }),
            )
            .with(
                "showON",
                handler(&self, |module, _| async move {
                    module.show_linear().await.map(|_| ())
                }),
            )
            .with(
                "showON2",
                handler(&self, |module, _| async move {
                    module.show_quadratic().await.map(|_| ())
                }),
            )
            .with(
                "showNLogN",
                handler(&self, |module, _| async move {
                    module.show_linearithmic().await.map(|_| ())
                }),
            )
    }

    fn intro(self: Arc<Self>) -> Option<StepFuture> {
        Some(async move { self.show_constant().await }.boxed())
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
    async fn binary_search_finds_the_target_in_five_checks() {
        let services = Services::seeded(4).unwrap();
        let module = BigOModule::new(services.clone()).unwrap();

        let (found, checks) = module.show_logarithmic().await.unwrap();
        assert_eq!(found, Some(24));
        assert_eq!(checks, 5);
        assert_eq!(services.scene.lock().unwrap().object_count(), SEARCH_SIZE);
        assert!(services
            .notices
            .contains(Severity::Success, "25 found at index 24!"));
        assert_eq!(module.current().unwrap(), Some(Complexity::Logarithmic));
    }

    #[tokio::test(start_paused = true)]
    async fn linear_search_stops_at_the_first_match() {
        let services = Services::seeded(11).unwrap();
        let module = BigOModule::new(services.clone()).unwrap();

        let found = module.show_linear().await.unwrap();
        let row = lock_state(&module.showcase).unwrap().row.clone();
        assert_eq!(row.len(), 8);
        if let Some(index) = found {
            let target = row[index].1;
            assert!(row[..index].iter().all(|(_, value)| *value != target));
            assert!(services.notices.contains(Severity::Success, "Found"));
        } else {
            assert!(services.notices.contains(Severity::Error, "not found"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn nested_loops_compare_every_pair() {
        let services = Services::seeded(4).unwrap();
        let module = BigOModule::new(services.clone()).unwrap();
        assert_eq!(module.show_quadratic().await.unwrap(), 25);

        let base = services.resources.solid(services.palette.base).unwrap();
        let scene = services.scene.lock().unwrap();
        assert!(scene
            .objects()
            .all(|object| Arc::ptr_eq(&object.material, &base)));
    }

    #[tokio::test(start_paused = true)]
    async fn merge_narration_runs_log_n_passes() {
        let services = Services::seeded(4).unwrap();
        let module = BigOModule::new(services.clone()).unwrap();
        assert_eq!(module.show_linearithmic().await.unwrap(), 3);
        assert!(services.notices.contains(Severity::Info, "Pass 3:"));
    }

    #[tokio::test(start_paused = true)]
    async fn each_demo_starts_from_a_clean_stage() {
        let services = Services::seeded(4).unwrap();
        let module = BigOModule::new(services.clone()).unwrap();
        module.show_logarithmic().await.unwrap();
        module.show_constant().await.unwrap();

        assert_eq!(services.scene.lock().unwrap().object_count(), 5);
        assert!(!services.notices.contains(Severity::Info, "Binary Search"));
        assert!(services
            .notices
            .contains(Severity::Highlight, "O(1) - Constant Time Complexity"));
    }

    #[tokio::test(start_paused = true)]
    async fn switching_demos_stops_the_running_one() {
        let services = Services::seeded(4).unwrap();
        let module = BigOModule::new(services.clone()).unwrap();
        let searching = module.clone();
        let task = tokio::spawn(async move { searching.show_logarithmic().await });

        tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
        module.show_constant().await.unwrap();
        assert!(task.await.unwrap().unwrap_err().is_cancelled());

        assert_eq!(module.current().unwrap(), Some(Complexity::Constant));
        assert_eq!(services.scene.lock().unwrap().object_count(), 5);
        assert!(!services.notices.contains(Severity::Info, "Checking mid element"));
    }

    #[tokio::test(start_paused = true)]
    async fn intro_shows_constant_time() {
        let services = Services::seeded(4).unwrap();
        let module = BigOModule::new(services.clone()).unwrap();
        module.clone().intro().unwrap().await.unwrap();
        assert_eq!(module.current().unwrap(), Some(Complexity::Constant));
    }
}
