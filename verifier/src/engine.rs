use crate::descr::{self, PackageDescr};
use crate::{AnalysisLimits, AnalyticsData, ComponentId, PackageDescrFlattener, VerifierResult};
use tracing::debug;

/// The rule-base analysis engine.
///
/// Owns the analytic graph store and flattens packages into it. Each call flattens
/// under a store checkpoint that is rolled back if any package fails, so a failed
/// call leaves no trace.
#[derive(Debug, Default)]
pub struct Verifier {
    data: AnalyticsData,
    limits: AnalysisLimits,
}

impl Verifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom analysis limits
    pub fn with_limits(limits: AnalysisLimits) -> Self {
        Self {
            data: AnalyticsData::new(),
            limits,
        }
    }

    /// Get the current analysis limits
    pub fn limits(&self) -> &AnalysisLimits {
        &self.limits
    }

    pub fn add_package(&mut self, package: &PackageDescr) -> VerifierResult<ComponentId> {
        let id = self.staged(|data, limits| PackageDescrFlattener::new(data, limits).flatten(package))?;
        debug!(package = %package.name, components = self.data.len(), "package committed");
        Ok(id)
    }

    /// Add packages in order. Either all of them go in or, when one fails, none do.
    pub fn add_packages(&mut self, packages: &[PackageDescr]) -> VerifierResult<Vec<ComponentId>> {
        self.staged(|data, limits| {
            let mut ids = Vec::with_capacity(packages.len());
            for package in packages {
                ids.push(PackageDescrFlattener::new(data, limits).flatten(package)?);
            }
            Ok(ids)
        })
    }

    fn staged<T, F>(&mut self, body: F) -> VerifierResult<T>
    where
        F: FnOnce(&mut AnalyticsData, &AnalysisLimits) -> VerifierResult<T>,
    {
        self.data.begin();
        match body(&mut self.data, &self.limits) {
            Ok(value) => {
                self.data.commit();
                Ok(value)
            }
            Err(err) => {
                self.data.rollback();
                Err(err)
            }
        }
    }

    /// Decode a JSON rule base document (one package or an array of packages) and add
    /// every package in it, all or none
    pub fn add_json(&mut self, json: &str) -> VerifierResult<Vec<ComponentId>> {
        let packages = descr::from_json(json)?;
        self.add_packages(&packages)
    }

    pub fn data(&self) -> &AnalyticsData {
        &self.data
    }

    pub fn into_data(self) -> AnalyticsData {
        self.data
    }
}
