use std::sync::{Arc, Mutex};

use crate::{
    modules::{
        lock_state, AlgorithmModule, CapabilitySet, ModuleContext, Services, StepDirection,
        StepOutcome,
    },
    scene::Vec3,
    Result,
};

/// Module loaded after the last page.
pub const NEXT_MODULE: &str = "bigO";

struct Page {
    title: &'static str,
    body: &'static [&'static str],
}

const PAGES: [Page; 5] = [
    Page {
        title: "Welcome to DSA Arcade!",
        body: &[
            "Explore Data Structures & Algorithms.",
            "This interactive lab helps you visualize how fundamental Data Structures and Algorithms work. See time and space complexity in action through 3D visualizations.",
        ],
    },
    Page {
        title: "What are Data Structures & Algorithms?",
        body: &[
            "Data Structures are specialized formats for organizing, processing, retrieving, and storing data. Think of them as different ways to arrange your tools in a toolbox.",
            "Algorithms are step-by-step procedures for solving a problem. They are the instruction manuals for using your tools.",
        ],
    },
    Page {
        title: "How to use this app",
        body: &[
            "Select a Module: choose a topic such as Big O Notation, Arrays or Stacks.",
            "Interact with Visualizations: the 3D stage comes alive with interactive models.",
            "Read the Explanations: the execution log gives step-by-step context, pros, and cons.",
            "Adjust Speed: change the animation speed at any time.",
        ],
    },
    Page {
        title: "Your Learning Path",
        body: &[
            "We recommend beginning with \"Big O Notation\" under Fundamentals. It gives you the language to talk about efficiency.",
            "Then explore Level 1: Linear Structures like Arrays, Stacks, and Queues to see basic data organization.",
        ],
    },
    Page {
        title: "Key Insight",
        body: &[
            "Understanding Data Structures and Algorithms isn't about memorizing. It's about seeing the patterns, comprehending tradeoffs, and building intuition for performant software.",
            "Press Next to start learning Big O Notation!",
        ],
    },
];

/// Paged introduction. Navigation is synchronous; running off the last page
/// hands over to the Big O showcase.
pub struct TutorialModule {
    ctx: ModuleContext,
    page: Mutex<usize>,
}

impl TutorialModule {
    pub fn new(services: Services) -> Result<Arc<Self>> {
        let module = Arc::new(Self {
            ctx: ModuleContext::new(services),
            page: Mutex::new(0),
        });
        module
            .ctx
            .scene()?
            .set_camera(Vec3::new(0.0, 10.0, 20.0), Vec3::ZERO);

        let notices = module.ctx.notices();
        notices.clear();
        notices.success("Welcome to DSA Arcade!");
        notices.info("Use the 'Next' and 'Previous' buttons below to navigate the tutorial.");
        module.display(0)?;
        Ok(module)
    }

    /// Zero-based index of the page on display.
    pub fn page(&self) -> Result<usize> {
        Ok(*lock_state(&self.page)?)
    }

    pub fn page_count(&self) -> usize {
        PAGES.len()
    }

    pub fn title_of(&self, index: usize) -> Option<&'static str> {
        PAGES.get(index).map(|page| page.title)
    }

    fn navigate(&self, direction: StepDirection) -> Result<StepOutcome> {
        let current = self.page()?;
        match direction {
            StepDirection::Next if current + 1 < PAGES.len() => self.display(current + 1)?,
            StepDirection::Next => return Ok(StepOutcome::Load(NEXT_MODULE.to_string())),
            StepDirection::Previous if current > 0 => self.display(current - 1)?,
            StepDirection::Previous => {}
        }
        Ok(StepOutcome::Stay)
    }

    fn display(&self, index: usize) -> Result<()> {
        self.ctx.scene()?.clear();
        *lock_state(&self.page)? = index;

        let page = &PAGES[index];
        let notices = self.ctx.notices();
        notices.highlight(format!(
            "Step {} of {}: {}",
            index + 1,
            PAGES.len(),
            page.title
        ));
        for line in page.body {
            notices.info(*line);
        }
        if index + 1 == PAGES.len() {
            notices.success("Start Learning Big O Notation!");
        }
        Ok(())
    }
}

impl AlgorithmModule for TutorialModule {
    fn id(&self) -> &str {
        "tutorial"
    }

    fn title(&self) -> &str {
        "Tutorial"
    }

    /// Navigation goes through [`AlgorithmModule::step`]; there are no other
    /// operations.
    fn capabilities(self: Arc<Self>) -> CapabilitySet {
        CapabilitySet::new()
    }

    fn step(&self, direction: StepDirection) -> Option<StepOutcome> {
        match self.navigate(direction) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                tracing::warn!(%err, "tutorial navigation failed");
                Some(StepOutcome::Stay)
            }
        }
    }

    fn teardown(&self) {
        self.ctx.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::Severity;

    #[test]
    fn opens_on_the_first_page() {
        let services = Services::seeded(1).unwrap();
        let module = TutorialModule::new(services.clone()).unwrap();
        assert_eq!(module.page().unwrap(), 0);
        assert!(services
            .notices
            .contains(Severity::Highlight, "Step 1 of 5: Welcome to DSA Arcade!"));
    }

    #[test]
    fn previous_on_the_first_page_stays_put() {
        let services = Services::seeded(1).unwrap();
        let module = TutorialModule::new(services).unwrap();
        assert_eq!(module.step(StepDirection::Previous), Some(StepOutcome::Stay));
        assert_eq!(module.page().unwrap(), 0);
    }

    #[test]
    fn next_walks_the_pages_then_hands_over() {
        let services = Services::seeded(1).unwrap();
        let module = TutorialModule::new(services.clone()).unwrap();

        for expected in 1..module.page_count() {
            assert_eq!(module.step(StepDirection::Next), Some(StepOutcome::Stay));
            assert_eq!(module.page().unwrap(), expected);
        }
        assert!(services
            .notices
            .contains(Severity::Highlight, "Step 5 of 5: Key Insight"));
        assert_eq!(
            module.step(StepDirection::Next),
            Some(StepOutcome::Load("bigO".into()))
        );
        assert_eq!(module.page().unwrap(), 4);

        assert_eq!(module.step(StepDirection::Previous), Some(StepOutcome::Stay));
        assert_eq!(module.title_of(module.page().unwrap()), Some("Your Learning Path"));
    }
}
