use std::{
    fmt,
    str::FromStr,
    sync::{Arc, Mutex},
};

use crate::{
    modules::{handler, lock_state, AlgorithmModule, CapabilitySet, ModuleContext, Services},
    scene::{ClickBinding, ObjectId, Vec3, VisualObject},
    ArcadeError, Result,
};

const ROOT: Vec3 = Vec3::new(0.0, 5.0, 0.0);
const ROOT_SPREAD: f32 = 8.0;
const LEVEL_DROP: f32 = 2.0;
const DESCEND_MS: u64 = 400;
const VISIT_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    InOrder,
    PreOrder,
}

impl FromStr for Traversal {
    type Err = ArcadeError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim() {
            "inorder" => Ok(Self::InOrder),
            "preorder" => Ok(Self::PreOrder),
            other => Err(ArcadeError::Precondition(format!(
                "unknown traversal \"{other}\""
            ))),
        }
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InOrder => "inorder",
            Self::PreOrder => "preorder",
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct TreeNode {
    value: i64,
    id: ObjectId,
    position: Vec3,
    spread: f32,
    left: Option<usize>,
    right: Option<usize>,
}

/// Nodes live in an arena; children are indices into it.
#[derive(Debug, Default)]
struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    fn root(&self) -> Option<usize> {
        (!self.nodes.is_empty()).then_some(0)
    }

    fn collect(&self, at: Option<usize>, order: Traversal, out: &mut Vec<usize>) {
        let Some(index) = at else {
            return;
        };
        let node = self.nodes[index];
        match order {
            Traversal::InOrder => {
                self.collect(node.left, order, out);
                out.push(index);
                self.collect(node.right, order, out);
            }
            Traversal::PreOrder => {
                out.push(index);
                self.collect(node.left, order, out);
                self.collect(node.right, order, out);
            }
        }
    }
}

/// Binary search tree with animated descent. Equal values go right.
pub struct BstModule {
    ctx: ModuleContext,
    tree: Mutex<Tree>,
}

impl BstModule {
    pub fn new(services: Services) -> Result<Arc<Self>> {
        let module = Arc::new(Self {
            ctx: ModuleContext::new(services),
            tree: Mutex::new(Tree::default()),
        });
        module
            .ctx
            .scene()?
            .set_camera(Vec3::new(0.0, 10.0, 20.0), Vec3::ZERO);
        Ok(module)
    }

    pub async fn insert_random(&self) -> Result<()> {
        let value = self.ctx.random_value()?;
        self.insert(value).await
    }

    pub async fn insert(&self, value: i64) -> Result<()> {
        self.ctx.notices().info(format!("Inserting {value}..."));

        let root = lock_state(&self.tree)?.root();
        let Some(mut current) = root else {
            let id = self.spawn_node(value, ROOT)?;
            lock_state(&self.tree)?.nodes.push(TreeNode {
                value,
                id,
                position: ROOT,
                spread: ROOT_SPREAD,
                left: None,
                right: None,
            });
            self.ctx.notices().success("Created Root");
            return Ok(());
        };

        let palette = self.ctx.palette();
        loop {
            let node = lock_state(&self.tree)?.nodes[current];
            self.ctx
                .scene()?
                .set_material(node.id, self.ctx.solid(palette.highlight)?);
            self.ctx.pacer.suspend(DESCEND_MS).await?;
            self.ctx
                .scene()?
                .set_material(node.id, self.ctx.solid(palette.success)?);

            let goes_left = value < node.value;
            let next = if goes_left { node.left } else { node.right };
            if let Some(child) = next {
                current = child;
                continue;
            }

            let mut tree = lock_state(&self.tree)?;
            // an overlapping insert may have taken the slot during the descent
            let parent = tree.nodes[current];
            let taken = if goes_left { parent.left } else { parent.right };
            if let Some(child) = taken {
                drop(tree);
                current = child;
                continue;
            }

            let half = node.spread / 2.0;
            let offset = if goes_left { -half } else { half };
            let position = node.position + Vec3::new(offset, -LEVEL_DROP, 0.0);
            let id = self.spawn_node(value, position)?;
            self.ctx
                .scene()?
                .add_connector(node.position, position, palette.neutral, None);

            let index = tree.nodes.len();
            tree.nodes.push(TreeNode {
                value,
                id,
                position,
                spread: node.spread / 2.0,
                left: None,
                right: None,
            });
            let parent = &mut tree.nodes[current];
            if goes_left {
                parent.left = Some(index);
            } else {
                parent.right = Some(index);
            }
            break;
        }

        self.ctx
            .notices()
            .success(format!("Inserted {value} into the tree."));
        Ok(())
    }

    /// Visits every node in `order`, highlighting each one, and returns the
    /// values in visit order.
    pub async fn traverse(&self, order: Traversal) -> Result<Vec<i64>> {
        self.ctx
            .notices()
            .highlight(format!("Starting {order} traversal..."));

        let visits: Vec<TreeNode> = {
            let tree = lock_state(&self.tree)?;
            let mut indices = Vec::with_capacity(tree.nodes.len());
            tree.collect(tree.root(), order, &mut indices);
            indices.into_iter().map(|index| tree.nodes[index]).collect()
        };

        let palette = self.ctx.palette();
        for node in &visits {
            self.ctx
                .scene()?
                .set_material(node.id, self.ctx.solid(palette.highlight)?);
            self.ctx.notices().info(format!("Visited: {}", node.value));
            self.ctx.pacer.suspend(VISIT_MS).await?;
            self.ctx
                .scene()?
                .set_material(node.id, self.ctx.solid(palette.success)?);
        }

        self.ctx.notices().info("Traversal Complete.");
        Ok(visits.iter().map(|node| node.value).collect())
    }

    /// Click handler for a node: marks it and opens the context menu.
    pub fn select(&self, value: i64) -> Result<()> {
        let found = lock_state(&self.tree)?
            .nodes
            .iter()
            .find(|node| node.value == value)
            .copied();
        let Some(node) = found else {
            self.ctx
                .notices()
                .warning(format!("Node {value} is not in the tree."));
            return Ok(());
        };

        self.ctx
            .notices()
            .highlight(format!("Selected Node: {value}"));
        let mut scene = self.ctx.scene()?;
        scene.set_material(node.id, self.ctx.solid(self.ctx.palette().error)?);
        scene.open_context_menu();
        Ok(())
    }

    pub fn values(&self) -> Result<Vec<i64>> {
        Ok(lock_state(&self.tree)?
            .nodes
            .iter()
            .map(|node| node.value)
            .collect())
    }

    fn spawn_node(&self, value: i64, position: Vec3) -> Result<ObjectId> {
        let node = VisualObject::new(
            self.ctx.sphere(0.6)?,
            self.ctx.solid(self.ctx.palette().success)?,
        )
        .at(position)
        .with_hover(format!("Value: {value}"))
        .with_click(ClickBinding::new("selectNode", Some(value.to_string())));
        Ok(self.ctx.scene()?.add_labeled(node, value))
    }
}

impl AlgorithmModule for BstModule {
    fn id(&self) -> &str {
        "bst"
    }

    fn title(&self) -> &str {
        "Binary Search Tree"
    }

    fn capabilities(self: Arc<Self>) -> CapabilitySet {
        CapabilitySet::new()
            .with(
                "insertRandom",
                handler(&self, |module, _| async move { module.insert_random().await }),
            )
            .with(
                "insertValue",
                handler(&self, |module, request| async move {
                    match request.aux.as_deref().map(|raw| raw.trim().parse::<i64>()) {
                        Some(Ok(value)) => module.insert(value).await,
                        _ => {
                            module
                                .ctx
                                .notices()
                                .warning("Please provide a whole number to insert.");
                            Ok(())
                        }
                    }
                }),
            )
            .with(
                "traverse",
                handler(&self, |module, request| async move {
                    let order = request.aux.as_deref().unwrap_or("inorder").parse::<Traversal>();
                    match order {
                        Ok(order) => module.traverse(order).await.map(|_| ()),
                        Err(err) => {
                            module.ctx.notices().warning(err.to_string());
                            Ok(())
                        }
                    }
                }),
            )
            .with(
                "selectNode",
                handler(&self, |module, request| async move {
                    match request.aux.as_deref().map(|raw| raw.trim().parse::<i64>()) {
                        Some(Ok(value)) => module.select(value),
                        _ => Ok(()),
                    }
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

    async fn tree_of(values: &[i64]) -> (Arc<BstModule>, Services) {
        let services = Services::seeded(9).unwrap();
        let module = BstModule::new(services.clone()).unwrap();
        for value in values {
            module.insert(*value).await.unwrap();
        }
        (module, services)
    }

    #[tokio::test(start_paused = true)]
    async fn in_order_visits_values_sorted() {
        let (module, services) = tree_of(&[50, 30, 70, 20, 40]).await;
        let visited = module.traverse(Traversal::InOrder).await.unwrap();
        assert_eq!(visited, vec![20, 30, 40, 50, 70]);
        assert!(services.notices.contains(Severity::Info, "Visited: 20"));
    }

    #[tokio::test(start_paused = true)]
    async fn pre_order_visits_parent_first() {
        let (module, _) = tree_of(&[50, 30, 70, 20, 40]).await;
        let visited = module.traverse(Traversal::PreOrder).await.unwrap();
        assert_eq!(visited, vec![50, 30, 20, 40, 70]);
    }

    #[tokio::test(start_paused = true)]
    async fn ties_go_right() {
        let (module, services) = tree_of(&[10, 10]).await;
        let tree = lock_state(&module.tree).unwrap();
        assert_eq!(tree.nodes[0].right, Some(1));
        assert_eq!(tree.nodes[0].left, None);
        assert!(tree.nodes[1].position.x > tree.nodes[0].position.x);
        assert_eq!(services.scene.lock().unwrap().connector_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn visited_nodes_are_restored() {
        let (module, services) = tree_of(&[50, 30, 70]).await;
        module.traverse(Traversal::InOrder).await.unwrap();

        let success = services.resources.solid(services.palette.success).unwrap();
        let scene = services.scene.lock().unwrap();
        assert!(scene
            .objects()
            .all(|object| Arc::ptr_eq(&object.material, &success)));
    }

    #[tokio::test(start_paused = true)]
    async fn clicking_a_node_selects_it() {
        let (module, services) = tree_of(&[50]).await;
        let binding = {
            let scene = services.scene.lock().unwrap();
            let binding = scene.objects().next().unwrap().on_click.clone().unwrap();
            binding
        };
        assert_eq!(binding, ClickBinding::new("selectNode", Some("50".into())));

        module.select(50).unwrap();
        assert!(services
            .notices
            .contains(Severity::Highlight, "Selected Node: 50"));
        assert!(services.scene.lock().unwrap().context_menu_open());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_inserts_keep_every_node_linked() {
        let (module, services) = tree_of(&[50]).await;
        let (left, deeper) = tokio::join!(module.insert(30), module.insert(20));
        left.unwrap();
        deeper.unwrap();

        assert_eq!(module.traverse(Traversal::InOrder).await.unwrap(), vec![20, 30, 50]);
        let scene = services.scene.lock().unwrap();
        assert_eq!(scene.object_count(), 3);
        assert_eq!(scene.connector_count(), 2);
    }

    #[test]
    fn traversal_names_parse() {
        assert_eq!("inorder".parse::<Traversal>().unwrap(), Traversal::InOrder);
        assert_eq!("preorder".parse::<Traversal>().unwrap(), Traversal::PreOrder);
        assert!("levelorder".parse::<Traversal>().is_err());
    }
}
