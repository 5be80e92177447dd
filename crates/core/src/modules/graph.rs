use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use futures::future::{BoxFuture, FutureExt};

use crate::{
    modules::{handler, lock_state, AlgorithmModule, CapabilitySet, ModuleContext, Services},
    scene::{ClickBinding, ObjectId, Vec3, VisualObject},
    timeline::Pacer,
    Result,
};

const NODES: [(&str, Vec3); 7] = [
    ("A", Vec3::new(-6.0, 4.0, 0.0)),
    ("B", Vec3::new(-2.0, 6.0, 0.0)),
    ("C", Vec3::new(2.0, 6.0, 0.0)),
    ("D", Vec3::new(6.0, 4.0, 0.0)),
    ("E", Vec3::new(-4.0, 0.0, 0.0)),
    ("F", Vec3::new(0.0, 2.0, 0.0)),
    ("G", Vec3::new(4.0, 0.0, 0.0)),
];

const EDGES: [(&str, &str); 9] = [
    ("A", "B"),
    ("A", "E"),
    ("B", "C"),
    ("B", "F"),
    ("C", "D"),
    ("C", "F"),
    ("D", "G"),
    ("E", "F"),
    ("F", "G"),
];

const VISIT_MS: u64 = 500;
const DISCOVER_MS: u64 = 300;

fn index_of(name: &str) -> Option<usize> {
    NODES.iter().position(|(label, _)| *label == name)
}

/// Neighbor lists in edge declaration order; both directions are recorded.
fn adjacency() -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); NODES.len()];
    for (from, to) in EDGES {
        if let (Some(a), Some(b)) = (index_of(from), index_of(to)) {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
    }
    adjacency
}

fn names(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|index| NODES[*index].0)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Default)]
struct GraphState {
    ids: Vec<ObjectId>,
    start: Option<usize>,
}

/// Bookkeeping for one depth-first walk.
struct Walk {
    pacer: Pacer,
    start: usize,
    visited: Vec<bool>,
    path: Vec<usize>,
    order: Vec<usize>,
}

/// Fixed undirected graph on A..G with animated BFS and DFS.
pub struct GraphModule {
    ctx: ModuleContext,
    adjacency: Vec<Vec<usize>>,
    state: Mutex<GraphState>,
}

impl GraphModule {
    pub fn new(services: Services) -> Result<Arc<Self>> {
        let module = Arc::new(Self {
            ctx: ModuleContext::new(services),
            adjacency: adjacency(),
            state: Mutex::new(GraphState::default()),
        });
        module
            .ctx
            .scene()?
            .set_camera(Vec3::new(0.0, 10.0, 18.0), Vec3::ZERO);
        module.create()?;

        let notices = module.ctx.notices();
        notices.info("Welcome to the Graph Traversal Module!");
        notices.info("Select a starting node by clicking on it, then choose a traversal algorithm.");
        Ok(module)
    }

    /// Stops a running traversal, rebuilds the graph in the scene and
    /// forgets the start node.
    pub fn create(&self) -> Result<()> {
        self.ctx.interrupt()?;
        let mut state = lock_state(&self.state)?;
        let mut scene = self.ctx.scene()?;
        scene.clear();

        let palette = self.ctx.palette();
        let geometry = self.ctx.cube(1.0, 1.0, 1.0)?;
        let material = self.ctx.solid(palette.primary)?;
        state.ids = NODES
            .iter()
            .map(|(label, position)| {
                let node = VisualObject::new(geometry.clone(), material.clone())
                    .at(*position)
                    .with_hover(format!("Node: {label}"))
                    .with_click(ClickBinding::new("setStartNode", Some(label.to_string())));
                scene.add_labeled(node, label)
            })
            .collect();
        state.start = None;

        for (from, to) in EDGES {
            if let (Some(a), Some(b)) = (index_of(from), index_of(to)) {
                scene.add_connector(NODES[a].1, NODES[b].1, palette.neutral, None);
            }
        }

        self.ctx
            .notices()
            .success("Graph created. Select a start node.");
        Ok(())
    }

    pub fn set_start(&self, name: &str) -> Result<()> {
        let Some(index) = index_of(name.trim()) else {
            self.ctx
                .notices()
                .warning(format!("Unknown node: {}", name.trim()));
            return Ok(());
        };

        let palette = self.ctx.palette();
        {
            let mut state = lock_state(&self.state)?;
            let mut scene = self.ctx.scene()?;
            if let Some(previous) = state.start {
                scene.set_material(state.ids[previous], self.ctx.solid(palette.primary)?);
            }
            scene.set_material(state.ids[index], self.ctx.solid(palette.highlight)?);
            state.start = Some(index);
        }
        self.ctx
            .notices()
            .highlight(format!("Start node set to: {}", NODES[index].0));
        Ok(())
    }

    /// Breadth-first walk from the start node. Returns the visit order.
    pub async fn bfs(&self) -> Result<Vec<&'static str>> {
        let Some((start, pacer)) = self.prepare()? else {
            return Ok(Vec::new());
        };
        let palette = self.ctx.palette();
        let notices = self.ctx.notices();

        let mut queue = VecDeque::from([start]);
        let mut visited = vec![false; NODES.len()];
        visited[start] = true;
        let mut order = Vec::new();

        notices.info(format!("Starting BFS from node {}...", NODES[start].0));
        notices.info(format!("Queue: [{}]", names(&[start])));

        while let Some(current) = queue.pop_front() {
            order.push(current);
            self.paint(current, palette.success)?;
            notices.success(format!(
                "Visiting: {}. Queue: [{}]",
                NODES[current].0,
                names(queue.make_contiguous())
            ));
            pacer.suspend(VISIT_MS).await?;

            for &neighbor in &self.adjacency[current] {
                if visited[neighbor] {
                    continue;
                }
                visited[neighbor] = true;
                queue.push_back(neighbor);
                self.paint(neighbor, palette.warning)?;
                notices.info(format!(
                    "  Found neighbor: {}. Adding to queue. Queue: [{}]",
                    NODES[neighbor].0,
                    names(queue.make_contiguous())
                ));
                pacer.suspend(DISCOVER_MS).await?;
            }
        }

        notices.highlight("BFS Traversal Complete!");
        Ok(order.into_iter().map(|index| NODES[index].0).collect())
    }

    /// Recursive depth-first walk from the start node. Returns the visit
    /// order.
    pub async fn dfs(&self) -> Result<Vec<&'static str>> {
        let Some((start, pacer)) = self.prepare()? else {
            return Ok(Vec::new());
        };
        self.ctx
            .notices()
            .info(format!("Starting DFS from node {}...", NODES[start].0));

        let mut walk = Walk {
            pacer,
            start,
            visited: vec![false; NODES.len()],
            path: Vec::new(),
            order: Vec::new(),
        };
        self.explore(start, &mut walk).await?;

        self.ctx.notices().highlight("DFS Traversal Complete!");
        Ok(walk.order.into_iter().map(|index| NODES[index].0).collect())
    }

    fn explore<'a>(&'a self, node: usize, walk: &'a mut Walk) -> BoxFuture<'a, Result<()>> {
        async move {
            let palette = self.ctx.palette();
            walk.visited[node] = true;
            walk.path.push(node);
            walk.order.push(node);

            self.paint(node, palette.success)?;
            self.ctx.notices().success(format!(
                "Visiting: {}. Stack: [{}]",
                NODES[node].0,
                names(&walk.path)
            ));
            walk.pacer.suspend(VISIT_MS).await?;

            for &neighbor in &self.adjacency[node] {
                if walk.visited[neighbor] {
                    continue;
                }
                self.paint(neighbor, palette.warning)?;
                self.ctx.notices().info(format!(
                    "  Found unvisited neighbor: {}. Exploring...",
                    NODES[neighbor].0
                ));
                walk.pacer.suspend(DISCOVER_MS).await?;
                self.explore(neighbor, walk).await?;
            }

            walk.path.pop();
            if node != walk.start {
                self.paint(node, palette.primary)?;
            }
            Ok(())
        }
        .boxed()
    }

    /// Stops a traversal already in progress, resets colors and marks the
    /// start node. `None` when no start node is selected.
    fn prepare(&self) -> Result<Option<(usize, Pacer)>> {
        let palette = self.ctx.palette();
        let state = lock_state(&self.state)?;
        let Some(start) = state.start else {
            self.ctx
                .notices()
                .error("Error: Please select a starting node first.");
            return Ok(None);
        };
        let pacer = self.ctx.interrupt()?;

        let mut scene = self.ctx.scene()?;
        let primary = self.ctx.solid(palette.primary)?;
        for id in &state.ids {
            scene.set_material(*id, primary.clone());
        }
        scene.set_material(state.ids[start], self.ctx.solid(palette.highlight)?);
        Ok(Some((start, pacer)))
    }

    fn paint(&self, node: usize, color: u32) -> Result<()> {
        let id = lock_state(&self.state)?.ids.get(node).copied();
        if let Some(id) = id {
            self.ctx.scene()?.set_material(id, self.ctx.solid(color)?);
        }
        Ok(())
    }
}

impl AlgorithmModule for GraphModule {
    fn id(&self) -> &str {
        "graph"
    }

    fn title(&self) -> &str {
        "Graph Traversal (BFS & DFS)"
    }

    fn capabilities(self: Arc<Self>) -> CapabilitySet {
        CapabilitySet::new()
            .with(
                "runBFS",
                handler(&self, |module, _| async move { module.bfs().await.map(|_| ()) }),
            )
            .with(
                "runDFS",
                handler(&self, |module, _| async move { module.dfs().await.map(|_| ()) }),
            )
            .with(
                "createGraph",
                handler(&self, |module, _| async move { module.create() }),
            )
            .with(
                "setStartNode",
                handler(&self, |module, request| async move {
                    match request.aux.as_deref() {
                        Some(name) => module.set_start(name),
                        None => Ok(()),
                    }
                }),
            )
    }

    fn teardown(&self) {
        self.ctx.cancel();
    }
}
