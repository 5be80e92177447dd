use std::sync::{Arc, Mutex};

use futures::future::try_join_all;

use crate::{
    modules::{handler, lock_state, AlgorithmModule, CapabilitySet, ModuleContext, Services},
    scene::{ObjectId, SceneRegistry, Vec3, VisualObject},
    timeline::Pacer,
    Result,
};

const SPACING: f32 = 2.5;
const NODE_Y: f32 = 0.0;
const PREV_LANE_Z: f32 = 0.7;
const ENTRY_X: f32 = 15.0;
const SETTLE_MS: u64 = 300;
const DROP_MS: u64 = 500;

const HEAD_ARROW: &str = "headArrow";
const TAIL_ARROW: &str = "tailArrow";
const NULL_NEXT_ARROW: &str = "nullNextArrow";
const NULL_PREV_ARROW: &str = "nullPrevArrow";
const NULL_NEXT_MESH: &str = "nullNextMesh";
const NULL_PREV_MESH: &str = "nullPrevMesh";

#[derive(Debug, Clone, Copy)]
struct Node {
    value: i64,
    id: ObjectId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Head,
    Tail,
}

/// Singly or doubly linked list. After every change the nodes are re-laid
/// out together and all pointers, captions and NULL sentinels redrawn.
pub struct LinkedListModule {
    ctx: ModuleContext,
    doubly: bool,
    nodes: Mutex<Vec<Node>>,
}

impl LinkedListModule {
    pub fn new(services: Services, doubly: bool) -> Result<Arc<Self>> {
        let module = Arc::new(Self {
            ctx: ModuleContext::new(services),
            doubly,
            nodes: Mutex::new(Vec::new()),
        });

        let notices = module.ctx.notices();
        notices.info(format!(
            "Welcome to the {} Linked List Module!",
            module.kind()
        ));
        notices.info("Linked Lists store elements (nodes) in a linear fashion, but not in contiguous memory locations.");
        notices.info("Each node points to the next (and previous for Doubly) node.");
        Ok(module)
    }

    fn kind(&self) -> &'static str {
        if self.doubly {
            "Doubly"
        } else {
            "Singly"
        }
    }

    pub async fn add_head(&self) -> Result<()> {
        self.insert(End::Head).await
    }

    pub async fn add_tail(&self) -> Result<()> {
        self.insert(End::Tail).await
    }

    async fn insert(&self, end: End) -> Result<()> {
        let pacer = self.ctx.operation()?;
        let value = self.ctx.random_value()?;
        let (side, entry_x) = match end {
            End::Head => ("Head", -ENTRY_X),
            End::Tail => ("Tail", ENTRY_X),
        };
        self.ctx
            .notices()
            .info(format!("Inserting {value} at the {side}..."));

        let node = VisualObject::new(
            self.ctx.cube(1.2, 1.0, 1.2)?,
            self.ctx.solid(self.ctx.palette().primary)?,
        )
        .at(Vec3::new(entry_x, NODE_Y, 0.0))
        .with_hover(format!("Value: {value}\nCurrent: {side}"));

        {
            let mut nodes = lock_state(&self.nodes)?;
            let id = self.ctx.scene()?.add_labeled(node, value);
            match end {
                End::Head => nodes.insert(0, Node { value, id }),
                End::Tail => nodes.push(Node { value, id }),
            }
        }

        self.ctx
            .notices()
            .success(format!("Successfully inserted {value} as the new {side}."));
        self.redraw(&pacer).await
    }

    pub async fn remove_head(&self) -> Result<()> {
        let pacer = self.ctx.operation()?;
        let removed = {
            let mut nodes = lock_state(&self.nodes)?;
            (!nodes.is_empty()).then(|| nodes.remove(0))
        };
        let Some(removed) = removed else {
            self.ctx
                .notices()
                .error("Error: Cannot remove Head from an empty list.");
            return Ok(());
        };

        self.ctx.notices().info(format!(
            "Removing Head node with value: {}...",
            removed.value
        ));
        self.drop_out(&pacer, removed.id).await?;

        let head = lock_state(&self.nodes)?.first().copied();
        let notices = self.ctx.notices();
        notices.success(format!(
            "Successfully removed Head node (Value: {}).",
            removed.value
        ));
        match head {
            Some(head) => notices.success(format!("New Head node has value: {}.", head.value)),
            None => notices.warning("List is now empty."),
        }
        self.redraw(&pacer).await
    }

    pub async fn remove_tail(&self) -> Result<()> {
        let pacer = self.ctx.operation()?;
        let snapshot = self.snapshot()?;
        match snapshot.len() {
            0 => {
                self.ctx
                    .notices()
                    .error("Error: Cannot remove Tail from an empty list.");
                return Ok(());
            }
            1 => return self.remove_head().await,
            _ => {}
        }

        self.ctx.notices().info("Removing Tail node...");
        if self.doubly {
            self.ctx
                .notices()
                .info("DLL: Direct access to Tail (O(1)).");
        } else {
            self.ctx
                .notices()
                .info("SLL: Traversing to find second-to-last node (O(n))...");
            let palette = self.ctx.palette();
            for node in &snapshot[..snapshot.len() - 1] {
                self.ctx
                    .scene()?
                    .set_material(node.id, self.ctx.solid(palette.highlight)?);
                pacer.suspend(100).await?;
                self.ctx
                    .scene()?
                    .set_material(node.id, self.ctx.solid(palette.primary)?);
            }
        }

        let popped = lock_state(&self.nodes)?.pop();
        let Some(removed) = popped else {
            return Ok(());
        };
        self.drop_out(&pacer, removed.id).await?;

        let tail = lock_state(&self.nodes)?.last().copied();
        let notices = self.ctx.notices();
        notices.success(format!(
            "Successfully removed Tail node (Value: {}).",
            removed.value
        ));
        if let Some(tail) = tail {
            notices.success(format!("New Tail node has value: {}.", tail.value));
        }
        self.redraw(&pacer).await
    }

    /// Stops every running insert or removal and empties the list.
    pub async fn reset(&self) -> Result<()> {
        let pacer = self.ctx.interrupt()?;
        self.ctx.notices().info("Resetting Linked List...");
        self.ctx.scene()?.clear();
        lock_state(&self.nodes)?.clear();
        self.ctx
            .notices()
            .success("Linked List has been reset to empty.");
        self.redraw(&pacer).await
    }

    pub fn values(&self) -> Result<Vec<i64>> {
        Ok(self.snapshot()?.iter().map(|node| node.value).collect())
    }

    fn snapshot(&self) -> Result<Vec<Node>> {
        Ok(lock_state(&self.nodes)?.clone())
    }

    /// Paints the node red and lets it fall out of view before removing it.
    async fn drop_out(&self, pacer: &Pacer, id: ObjectId) -> Result<()> {
        let from = {
            let mut scene = self.ctx.scene()?;
            scene.set_material(id, self.ctx.solid(self.ctx.palette().error)?);
            scene.position(id)
        };
        if let Some(from) = from {
            pacer
                .glide(&self.ctx.services.scene, id, from.with_y(-10.0), DROP_MS)
                .await?;
        }
        self.ctx.scene()?.remove(id);
        Ok(())
    }

    /// Slides the nodes into place together, then redraws every decoration
    /// for the list as it stands once the slide is over.
    async fn redraw(&self, pacer: &Pacer) -> Result<()> {
        let nodes = self.snapshot()?;
        let count = nodes.len();
        {
            let mut scene = self.ctx.scene()?;
            scene.clear_connectors();

            let center_x = match (nodes.first(), nodes.last()) {
                (Some(first), Some(last)) => {
                    let first = scene.position(first.id).map_or(0.0, |p| p.x);
                    let last = scene.position(last.id).map_or(0.0, |p| p.x);
                    (first + last) / 2.0
                }
                _ => 0.0,
            };
            let zoom = 15.0 + count.saturating_sub(4) as f32 * 1.5;
            scene.set_camera(
                Vec3::new(center_x, 5.0, zoom),
                Vec3::new(center_x, NODE_Y, 0.0),
            );
        }

        let targets = Self::layout(count);
        let scene = &self.ctx.services.scene;
        try_join_all(
            nodes
                .iter()
                .zip(&targets)
                .map(|(node, target)| pacer.glide(scene, node.id, *target, SETTLE_MS)),
        )
        .await?;

        let palette = self.ctx.palette();
        let nodes = lock_state(&self.nodes)?;
        let count = nodes.len();
        let targets = Self::layout(count);
        let mut scene = self.ctx.scene()?;
        for (index, (node, target)) in nodes.iter().zip(&targets).enumerate() {
            scene.set_position(node.id, *target);
            let mut hover = format!("Value: {}\nIndex: {index}", node.value);
            if index == 0 {
                hover.push_str("\nHEAD");
            }
            if index + 1 == count {
                hover.push_str("\nTAIL");
            }
            scene.set_hover_text(node.id, hover);
        }

        for pair in targets.windows(2) {
            let (here, next) = (pair[0], pair[1]);
            scene.add_connector(
                here.with_x(here.x + SPACING / 2.0 - 0.2),
                next.with_x(next.x - SPACING / 2.0 + 0.2),
                palette.primary,
                None,
            );
            if self.doubly {
                let lane = Vec3::new(0.0, 0.0, PREV_LANE_Z);
                scene.add_connector(
                    next.with_x(next.x - SPACING / 2.0 + 0.2) + lane,
                    here.with_x(here.x + SPACING / 2.0 - 0.2) + lane,
                    palette.success,
                    None,
                );
            }
        }

        self.draw_captions(&mut scene, &targets);
        self.draw_null_sentinels(&mut scene, &targets)
    }

    fn layout(count: usize) -> Vec<Vec3> {
        let start = -(count.saturating_sub(1) as f32 * SPACING) / 2.0;
        (0..count)
            .map(|index| Vec3::new(start + index as f32 * SPACING, NODE_Y, 0.0))
            .collect()
    }

    fn draw_captions(&self, scene: &mut SceneRegistry, targets: &[Vec3]) {
        scene.remove_floating_label("head");
        scene.remove_floating_label("tail");
        scene.clear_connectors_named(&[HEAD_ARROW, TAIL_ARROW]);
        let color = self.ctx.palette().highlight;

        match (targets.first(), targets.last()) {
            (Some(head), Some(tail)) => {
                let head_from = Vec3::new(head.x - SPACING * 1.5, head.y + 2.0, 0.0);
                scene.add_connector(head_from, *head, color, Some(HEAD_ARROW));
                scene.set_floating_label("head", "HEAD", head_from);

                let tail_from = Vec3::new(tail.x + SPACING * 1.5, tail.y + 2.0, 0.0);
                scene.add_connector(tail_from, *tail, color, Some(TAIL_ARROW));
                scene.set_floating_label("tail", "TAIL", tail_from);
            }
            _ => {
                let center = Vec3::new(0.0, NODE_Y + 1.0, 0.0);
                scene.set_floating_label("head", "HEAD", center.with_x(-2.0));
                scene.set_floating_label("tail", "TAIL", center.with_x(2.0));
            }
        }
    }

    fn draw_null_sentinels(&self, scene: &mut SceneRegistry, targets: &[Vec3]) -> Result<()> {
        scene.remove_named(NULL_NEXT_MESH);
        scene.remove_named(NULL_PREV_MESH);
        scene.clear_connectors_named(&[NULL_NEXT_ARROW, NULL_PREV_ARROW]);

        let error = self.ctx.palette().error;
        let sentinel = |at: Vec3| -> Result<VisualObject> {
            Ok(VisualObject::new(self.ctx.cube(1.2, 1.0, 1.2)?, self.ctx.solid(error)?).at(at))
        };

        let (Some(head), Some(tail)) = (targets.first(), targets.last()) else {
            let center = sentinel(Vec3::new(0.0, NODE_Y, 0.0))?;
            scene.add(center, Some("NULL".into()), Some(NULL_NEXT_MESH));
            return Ok(());
        };

        let null_next = tail.with_x(tail.x + SPACING * 1.5);
        scene.add(sentinel(null_next)?, Some("NULL".into()), Some(NULL_NEXT_MESH));
        scene.add_connector(
            tail.with_x(tail.x + SPACING / 2.0 - 0.2),
            null_next.with_x(null_next.x - SPACING / 2.0 + 0.2),
            error,
            Some(NULL_NEXT_ARROW),
        );

        if self.doubly {
            let null_prev = head.with_x(head.x - SPACING * 1.5);
            let lane = Vec3::new(0.0, 0.0, PREV_LANE_Z);
            scene.add(sentinel(null_prev)?, Some("NULL".into()), Some(NULL_PREV_MESH));
            scene.add_connector(
                head.with_x(head.x - SPACING / 2.0 + 0.2) + lane,
                null_prev.with_x(null_prev.x + SPACING / 2.0 - 0.2) + lane,
                error,
                Some(NULL_PREV_ARROW),
            );
        }
        Ok(())
    }
}

impl AlgorithmModule for LinkedListModule {
    fn id(&self) -> &str {
        if self.doubly {
            "dll"
        } else {
            "sll"
        }
    }

    fn title(&self) -> &str {
        if self.doubly {
            "Doubly Linked List"
        } else {
            "Singly Linked List"
        }
    }

    fn capabilities(self: Arc<Self>) -> CapabilitySet {
        CapabilitySet::new()
            .with(
                "addHead",
                handler(&self, |module, _| async move { module.add_head().await }),
            )
            .with(
                "addTail",
                handler(&self, |module, _| async move { module.add_tail().await }),
            )
            .with(
                "removeHead",
                handler(&self, |module, _| async move { module.remove_head().await }),
            )
            .with(
                "removeTail",
                handler(&self, |module, _| async move { module.remove_tail().await }),
            )
            .with(
                "resetList",
                handler(&self, |module, _| async move { module.reset().await }),
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

    fn list(doubly: bool) -> (Arc<LinkedListModule>, Services) {
        let services = Services::seeded(21).unwrap();
        (LinkedListModule::new(services.clone(), doubly).unwrap(), services)
    }

    #[tokio::test(start_paused = true)]
    async fn head_and_tail_inserts_keep_order() {
        let (list, _) = list(false);
        list.add_tail().await.unwrap();
        list.add_tail().await.unwrap();
        list.add_head().await.unwrap();
        let values = list.values().unwrap();

        list.remove_head().await.unwrap();
        assert_eq!(list.values().unwrap(), values[1..].to_vec());
        list.remove_tail().await.unwrap();
        assert_eq!(list.values().unwrap(), values[1..2].to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn singly_redraw_lays_out_pointers_and_sentinel() {
        let (list, services) = list(false);
        for _ in 0..3 {
            list.add_tail().await.unwrap();
        }

        let scene = services.scene.lock().unwrap();
        // two next pointers, HEAD, TAIL and the NULL pointer
        assert_eq!(scene.connector_count(), 5);
        assert_eq!(scene.object_count(), 4);
        assert!(scene.find_named(NULL_NEXT_MESH).is_some());
        assert!(scene.find_named(NULL_PREV_MESH).is_none());
        assert_eq!(scene.floating_label("head").unwrap().text, "HEAD");
        assert_eq!(scene.floating_label("tail").unwrap().text, "TAIL");
    }

    #[tokio::test(start_paused = true)]
    async fn doubly_redraw_adds_prev_pointers() {
        let (list, services) = list(true);
        for _ in 0..3 {
            list.add_head().await.unwrap();
        }

        let scene = services.scene.lock().unwrap();
        assert_eq!(scene.connector_count(), 8);
        assert_eq!(scene.object_count(), 5);
        assert!(scene.find_named(NULL_PREV_MESH).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_list_shows_a_single_null() {
        let (list, services) = list(true);
        list.add_tail().await.unwrap();
        list.reset().await.unwrap();

        let scene = services.scene.lock().unwrap();
        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.connector_count(), 0);
        assert!(scene.find_named(NULL_NEXT_MESH).is_some());
        assert!(scene.floating_label("head").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn removing_from_empty_reports_errors() {
        let (list, services) = list(false);
        list.remove_head().await.unwrap();
        list.remove_tail().await.unwrap();

        assert!(services
            .notices
            .contains(Severity::Error, "Cannot remove Head from an empty list."));
        assert!(services
            .notices
            .contains(Severity::Error, "Cannot remove Tail from an empty list."));
        assert_eq!(services.scene.lock().unwrap().object_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn singly_tail_removal_traverses_and_doubly_does_not() {
        let (singly, singly_services) = list(false);
        let (doubly, doubly_services) = list(true);
        for _ in 0..3 {
            singly.add_tail().await.unwrap();
            doubly.add_tail().await.unwrap();
        }
        singly.remove_tail().await.unwrap();
        doubly.remove_tail().await.unwrap();

        assert!(singly_services
            .notices
            .contains(Severity::Info, "SLL: Traversing"));
        assert!(doubly_services
            .notices
            .contains(Severity::Info, "DLL: Direct access"));
        assert_eq!(singly.values().unwrap().len(), 2);
        assert_eq!(doubly.values().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_mid_insert_leaves_an_empty_list() {
        let (list, services) = list(true);
        list.add_tail().await.unwrap();
        let adding = list.clone();
        let task = tokio::spawn(async move { adding.add_tail().await });

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        list.reset().await.unwrap();
        assert!(task.await.unwrap().unwrap_err().is_cancelled());

        assert!(list.values().unwrap().is_empty());
        let scene = services.scene.lock().unwrap();
        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.connector_count(), 0);
    }
}
