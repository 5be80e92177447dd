use std::{fmt, sync::Arc};

use tokio::task::JoinSet;

use crate::{
    modules::{AlgorithmModule, CapabilitySet, ModuleKind, Services},
    ArcadeError, Result,
};

/// Owns the active module. At most one module is active; the outgoing module
/// is always torn down and the scene cleared before the next one is built.
pub struct ModuleHost {
    services: Services,
    active: Option<Arc<dyn AlgorithmModule>>,
    intros: JoinSet<()>,
}

impl ModuleHost {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            active: None,
            intros: JoinSet::new(),
        }
    }

    /// Switches to `id` and returns the new dispatch table. Unknown ids leave
    /// no module active and yield an empty table. Spawns the module's intro
    /// sequence, so it must run inside a tokio runtime.
    pub fn select(&mut self, id: &str) -> Result<CapabilitySet> {
        self.teardown_active();
        self.reap();
        self.services.scene.lock()?.clear();

        let notices = &self.services.notices;
        notices.clear();
        notices.info(format!("Loading module: {id}..."));

        let kind = match id.parse::<ModuleKind>() {
            Ok(kind) => kind,
            Err(ArcadeError::UnknownModule(_)) => {
                notices.warning("Module under construction");
                return Ok(CapabilitySet::new());
            }
            Err(err) => return Err(err),
        };

        let module = kind.build(self.services.clone())?;
        tracing::info!(module = id, "module loaded");

        if let Some(intro) = module.clone().intro() {
            let notices = self.services.notices.clone();
            let name = id.to_string();
            self.intros.spawn(async move {
                match intro.await {
                    Ok(()) | Err(ArcadeError::Cancelled) => {}
                    Err(err) => notices.error(format!("Module \"{name}\" failed to start: {err}")),
                }
            });
        }

        let capabilities = module.clone().capabilities();
        self.active = Some(module);
        Ok(capabilities)
    }

    pub fn active(&self) -> Option<Arc<dyn AlgorithmModule>> {
        self.active.clone()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref().map(|module| module.id())
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Tears down the active module and clears the scene.
    pub fn shutdown(&mut self) -> Result<()> {
        self.teardown_active();
        self.services.scene.lock()?.clear();
        Ok(())
    }

    /// Waits for every intro sequence spawned by [`ModuleHost::select`].
    pub async fn settle(&mut self) {
        while let Some(joined) = self.intros.join_next().await {
            if let Err(err) = joined {
                tracing::warn!(%err, "intro task did not finish cleanly");
            }
        }
    }

    fn reap(&mut self) {
        while let Some(joined) = self.intros.try_join_next() {
            if let Err(err) = joined {
                tracing::warn!(%err, "intro task did not finish cleanly");
            }
        }
    }

    fn teardown_active(&mut self) {
        if let Some(module) = self.active.take() {
            tracing::info!(module = module.id(), "tearing down module");
            module.teardown();
        }
    }
}

impl fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHost")
            .field("active", &self.active_id())
            .field("intros", &self.intros.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::Severity;

    #[tokio::test(start_paused = true)]
    async fn switching_leaves_one_module_and_no_leftovers() {
        let mut host = ModuleHost::new(Services::seeded(3).unwrap());

        host.select("stack").unwrap();
        assert_eq!(host.active_id(), Some("stack"));
        let stack_objects: Vec<_> = host
            .services()
            .scene
            .lock()
            .unwrap()
            .objects()
            .filter_map(|object| object.id())
            .collect();
        assert!(!stack_objects.is_empty());

        let table = host.select("queue").unwrap();
        assert_eq!(host.active_id(), Some("queue"));
        assert!(table.contains("enqueue"));

        let scene = host.services().scene.lock().unwrap();
        assert!(stack_objects.iter().all(|id| !scene.contains(*id)));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_module_reports_and_leaves_nothing_active() {
        let mut host = ModuleHost::new(Services::seeded(3).unwrap());
        host.select("array").unwrap();

        let table = host.select("heap").unwrap();
        assert!(table.is_empty());
        assert_eq!(host.active_id(), None);
        assert_eq!(host.services().scene.lock().unwrap().object_count(), 0);
        assert!(host
            .services()
            .notices
            .contains(Severity::Warning, "Module under construction"));
    }

    #[tokio::test(start_paused = true)]
    async fn settle_waits_for_the_intro() {
        let mut host = ModuleHost::new(Services::seeded(3).unwrap());
        host.select("bigO").unwrap();
        assert!(!host
            .services()
            .notices
            .contains(Severity::Success, "Operation complete in constant time!"));

        host.settle().await;
        assert!(host
            .services()
            .notices
            .contains(Severity::Success, "Operation complete in constant time!"));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_clears_everything() {
        let mut host = ModuleHost::new(Services::seeded(3).unwrap());
        host.select("graph").unwrap();
        host.shutdown().unwrap();

        assert_eq!(host.active_id(), None);
        let scene = host.services().scene.lock().unwrap();
        assert_eq!(scene.object_count(), 0);
        assert_eq!(scene.connector_count(), 0);
    }
}
