//! Current-state inventory of a dependency tree: license and known
//! vulnerabilities of every direct submodule, recursively.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use crate::error::Result;
use crate::plugin::Toolchain;
use crate::types::Dependency;

type VisitFuture<'a> = Pin<Box<dyn Future<Output = Result<Dependency>> + Send + 'a>>;

#[derive(Default)]
struct Memo {
    done: HashMap<String, Dependency>,
    visiting: HashSet<String>,
}

pub struct Surveyor {
    toolchain: Toolchain,
}

impl Surveyor {
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }

    /// Returns `dependency` with license, vulnerabilities and direct
    /// children filled in. Each coordinate is expanded once per call.
    pub async fn survey(&self, dependency: &Dependency) -> Result<Dependency> {
        let mut memo = Memo::default();
        self.visit(dependency.clone(), &mut memo).await
    }

    fn visit<'a>(&'a self, mut dependency: Dependency, memo: &'a mut Memo) -> VisitFuture<'a> {
        Box::pin(async move {
            let key = dependency.coordinate();
            if let Some(done) = memo.done.get(&key) {
                return Ok(done.clone());
            }
            if !memo.visiting.insert(key.clone()) {
                debug!(dependency = %key, "cycle, not expanding again");
                return Ok(dependency);
            }

            if let Err(err) = self.toolchain.materialize(&mut dependency).await {
                warn!(dependency = %key, error = %err, "could not materialize dependency");
                dependency.error = Some(err.to_string());
                memo.visiting.remove(&key);
                return Ok(dependency);
            }

            dependency.license = self.toolchain.find_license(&dependency).await;
            self.toolchain.identify_license(&mut dependency.license).await;
            dependency.vulnerabilities = self.toolchain.vulnerabilities_of(&dependency).await?;

            let children = self.toolchain.children_of(&dependency).await?.unwrap_or_default();
            let mut surveyed = Vec::new();
            for child in children.into_iter().filter(|c| !c.indirect) {
                surveyed.push(self.visit(child, memo).await?);
            }
            dependency.dependencies = surveyed;

            memo.visiting.remove(&key);
            memo.done.insert(key, dependency.clone());
            Ok(dependency)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{dep, indirect, World};
    use crate::severity::DependencyIndex;
    use crate::types::{LicenseType, Severity};

    #[tokio::test]
    async fn test_survey_fills_tree() {
        let (_, toolchain) = World::default()
            .license("root@v1", "r", Some(("MIT", LicenseType::Notice)))
            .children("root@v1", vec![dep("a", "v1"), indirect("hidden", "v1")])
            .children("a@v1", vec![dep("b", "v2")])
            .vulnerable("b@v2", "GO-B", 9.3)
            .toolchain();

        let surveyed = Surveyor::new(toolchain).survey(&dep("root", "v1")).await.unwrap();
        assert_eq!(surveyed.license.display_name(), "MIT");
        assert_eq!(surveyed.dependencies.len(), 1);
        let b = &surveyed.dependencies[0].dependencies[0];
        assert_eq!(b.coordinate(), "b@v2");
        assert_eq!(b.vulnerabilities.len(), 1);

        let index = DependencyIndex::build(&surveyed);
        assert_eq!(index.len(), 2);
        assert_eq!(index.highest_severity(), Some(Severity::Critical));
    }

    #[tokio::test]
    async fn test_shared_and_cyclic_coordinates_expand_once() {
        let (world, toolchain) = World::default()
            .children("root@v1", vec![dep("a", "v1"), dep("b", "v1")])
            .children("a@v1", vec![dep("shared", "v1")])
            .children("b@v1", vec![dep("shared", "v1")])
            .children("shared@v1", vec![dep("root", "v1")])
            .toolchain();

        let surveyed = Surveyor::new(toolchain).survey(&dep("root", "v1")).await.unwrap();
        let resolved = world.resolved.lock().unwrap().clone();
        assert_eq!(resolved.iter().filter(|c| c.as_str() == "shared@v1").count(), 1);
        assert_eq!(resolved.iter().filter(|c| c.as_str() == "root@v1").count(), 1);

        let via_b = &surveyed.dependencies[1].dependencies[0];
        assert_eq!(via_b.coordinate(), "shared@v1");
        assert_eq!(via_b.dependencies[0].coordinate(), "root@v1");
        assert!(via_b.dependencies[0].dependencies.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades() {
        let (_, toolchain) = World::default()
            .children("root@v1", vec![dep("gone", "v1")])
            .unresolvable("gone@v1")
            .toolchain();

        let surveyed = Surveyor::new(toolchain).survey(&dep("root", "v1")).await.unwrap();
        assert!(surveyed.dependencies[0].error.is_some());
    }

    #[tokio::test]
    async fn test_rate_limit_propagates() {
        let (_, toolchain) = World::default()
            .children("root@v1", vec![dep("a", "v1")])
            .rate_limited("a@v1")
            .toolchain();

        let err = Surveyor::new(toolchain).survey(&dep("root", "v1")).await.unwrap_err();
        assert!(err.is_rate_limited());
    }
}
