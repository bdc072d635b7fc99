//! Recursive differencing of a dependency against its proposed update.
//!
//! The walk is sequential inside one top-level dependency: materialize both
//! sides, compare license and vulnerabilities, then align the two child
//! lists by path and descend into every child whose version moved.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info, warn};

use crate::classify;
use crate::error::{DsuError, Result};
use crate::plugin::Toolchain;
use crate::types::{DiffKind, Dependency, Difference, Ledger, License, Severity, VulnerabilitySet};

type WalkFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

impl Toolchain {
    /// Makes sure `dependency.directory` points at an accessible checkout.
    pub(crate) async fn materialize(&self, dependency: &mut Dependency) -> Result<()> {
        if let Some(directory) = dependency.directory.as_deref() {
            if self.materializer.accessible(directory).await {
                return Ok(());
            }
        }

        let directory = self.materializer.resolve(&dependency.coordinate()).await?;
        dependency.directory = Some(directory);
        Ok(())
    }

    pub(crate) async fn find_license(&self, dependency: &Dependency) -> License {
        match dependency.directory.as_deref() {
            Some(directory) => self.license_finder.find(directory).await,
            None => License::default(),
        }
    }

    pub(crate) async fn identify_license(&self, license: &mut License) {
        if !license.found() || license.is_identified() {
            return;
        }
        match self.license_identifier.identify(license).await {
            Some((name, license_type)) => {
                license.name = Some(name);
                license.license_type = Some(license_type);
            }
            None => debug!(path = ?license.path, "license could not be identified"),
        }
    }

    /// Vulnerabilities of one coordinate. Lookup failures other than an
    /// exhausted quota degrade to an empty set.
    pub(crate) async fn vulnerabilities_of(&self, dependency: &Dependency) -> Result<VulnerabilitySet> {
        let coordinate = dependency.coordinate();
        match self.vulnerabilities.lookup(&coordinate).await {
            Ok(found) => Ok(found.into_iter().collect()),
            Err(err) if err.is_rate_limited() => Err(err),
            Err(err) => {
                warn!(%coordinate, error = %err, "vulnerability lookup failed, assuming none");
                Ok(VulnerabilitySet::new())
            }
        }
    }

    /// Direct listing of a materialized dependency's children. `None` when
    /// the listing is unavailable; a corrupt listing is an error.
    pub(crate) async fn children_of(&self, dependency: &Dependency) -> Result<Option<Vec<Dependency>>> {
        let Some(directory) = dependency.directory.as_deref() else {
            return Ok(None);
        };
        match self.children.list_children(directory).await {
            Ok(children) => Ok(Some(children)),
            Err(err @ DsuError::Decode { .. }) => Err(err),
            Err(err) => {
                debug!(dependency = %dependency, error = %err, "children not listed");
                Ok(None)
            }
        }
    }
}

/// The current child `proposed` replaces: the same path if present, else a
/// sibling major with the same version, else any sibling major.
fn counterpart<'a>(current_children: &'a [Dependency], proposed: &Dependency) -> Option<&'a Dependency> {
    if let Some(exact) = current_children.iter().find(|existing| existing.path == proposed.path) {
        return Some(exact);
    }
    let cleaned = proposed.cleaned_path();
    let mut siblings = current_children
        .iter()
        .filter(|existing| existing.cleaned_path() == cleaned)
        .peekable();
    let first = siblings.peek().copied();
    siblings
        .find(|existing| existing.version == proposed.version)
        .or(first)
}

pub struct Differ {
    toolchain: Toolchain,
}

impl Differ {
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }

    /// Findings for one dependency's proposed update. Empty when the
    /// dependency has no update.
    pub async fn analyze_update(&self, dependency: &Dependency) -> Result<Ledger> {
        let mut ledger = Ledger::new();
        let Some((current, proposed)) = dependency.update_pair() else {
            return Ok(ledger);
        };

        info!(from = %current, to = %proposed, "analyzing update");
        self.walk(current.clone(), proposed.clone(), &mut ledger).await?;
        info!(
            dependency = %current,
            findings = ledger.len(),
            highest = %ledger.highest_level(),
            "update analyzed"
        );
        Ok(ledger)
    }

    fn walk<'a>(
        &'a self,
        mut current: Dependency,
        mut proposed: Dependency,
        ledger: &'a mut Ledger,
    ) -> WalkFuture<'a> {
        Box::pin(async move {
            for side in [&mut current, &mut proposed] {
                if let Err(err) = self.toolchain.materialize(side).await {
                    warn!(dependency = %side, error = %err, "could not materialize dependency");
                    ledger.push(Difference::single(Severity::High, DiffKind::ModuleFetchError, side));
                    return Ok(());
                }
            }

            self.compare_licenses(&mut current, &mut proposed, ledger).await;
            self.compare_vulnerabilities(&mut current, &mut proposed, ledger).await?;

            let Some(current_children) = self.toolchain.children_of(&current).await? else {
                return Ok(());
            };
            let Some(proposed_children) = self.toolchain.children_of(&proposed).await? else {
                return Ok(());
            };

            self.align(&current_children, proposed_children, ledger).await
        })
    }

    async fn compare_licenses(&self, current: &mut Dependency, proposed: &mut Dependency, ledger: &mut Ledger) {
        current.license = self.toolchain.find_license(current).await;
        proposed.license = self.toolchain.find_license(proposed).await;

        let verdict = match classify::classify_presence(&current.license, &proposed.license) {
            Some(verdict) => verdict,
            None => {
                self.toolchain.identify_license(&mut current.license).await;
                self.toolchain.identify_license(&mut proposed.license).await;
                classify::classify_identified(&current.license, &proposed.license)
            }
        };

        if let Some((level, kind)) = verdict.finding() {
            debug!(from = %current, to = %proposed, kind = kind.as_str(), "license difference");
            ledger.push(Difference::change(level, kind, current, proposed));
        }
    }

    /// Reports vulnerabilities present in the update but not before it.
    /// Fixed vulnerabilities are not findings.
    async fn compare_vulnerabilities(
        &self,
        current: &mut Dependency,
        proposed: &mut Dependency,
        ledger: &mut Ledger,
    ) -> Result<()> {
        proposed.vulnerabilities = self.toolchain.vulnerabilities_of(proposed).await?;
        if proposed.vulnerabilities.is_empty() {
            return Ok(());
        }
        current.vulnerabilities = self.toolchain.vulnerabilities_of(current).await?;

        for vulnerability in proposed.vulnerabilities.iter() {
            if current.vulnerabilities.contains(&vulnerability.id) {
                continue;
            }
            debug!(dependency = %proposed, id = %vulnerability.id, "new vulnerability");
            ledger.push(Difference::vulnerability(proposed, vulnerability.clone()));
        }
        Ok(())
    }

    async fn align(
        &self,
        current_children: &[Dependency],
        proposed_children: Vec<Dependency>,
        ledger: &mut Ledger,
    ) -> Result<()> {
        for child in proposed_children {
            match counterpart(current_children, &child) {
                Some(existing) if existing.version == child.version => {}
                Some(existing) => self.walk(existing.clone(), child, ledger).await?,
                None if child.indirect => {
                    debug!(dependency = %child, "skipping new indirect dependency");
                }
                None => self.add_new_dependency(child, ledger).await?,
            }
        }
        Ok(())
    }

    async fn add_new_dependency(&self, mut dependency: Dependency, ledger: &mut Ledger) -> Result<()> {
        if let Err(err) = self.toolchain.materialize(&mut dependency).await {
            warn!(dependency = %dependency, error = %err, "could not materialize new dependency");
            ledger.push(Difference::single(Severity::High, DiffKind::ModuleFetchError, &dependency));
            return Ok(());
        }

        dependency.vulnerabilities = self.toolchain.vulnerabilities_of(&dependency).await?;
        for vulnerability in dependency.vulnerabilities.iter() {
            ledger.push(Difference::vulnerability(&dependency, vulnerability.clone()));
        }

        dependency.license = self.toolchain.find_license(&dependency).await;
        self.toolchain.identify_license(&mut dependency.license).await;

        let level = classify::new_dependency_level(&dependency.license);
        debug!(dependency = %dependency, %level, "new dependency");
        ledger.push(Difference::single(level, DiffKind::NewDependency, &dependency));
        Ok(())
    }
}
