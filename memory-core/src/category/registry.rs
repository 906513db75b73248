//! Category registration and dependency-ordered scheduling.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::types::Category;

/// Holds the set of registered [`Category`] configurations and computes a
/// valid execution order for them.
///
/// Registration is a one-time setup concern, so the internal map is
/// guarded by a plain `RwLock` rather than anything lock-free; ingestion
/// reads the dependency order once per run and does not contend with
/// concurrent registrations in steady state.
#[derive(Debug, Default)]
pub struct CategoryRegistry {
    categories: RwLock<HashMap<String, Category>>,
    /// Names in first-registration order, used to break priority ties
    /// deterministically instead of falling back to name ordering.
    order: RwLock<Vec<String>>,
}

impl CategoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            categories: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Register a category configuration, replacing any prior
    /// registration under the same name. Re-registering an existing name
    /// updates its configuration but does not change its position in
    /// registration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CategoryConfigError`] if the filename is empty or
    /// the category declares itself as its own dependency.
    pub fn register(&self, category: Category) -> Result<()> {
        if category.filename.trim().is_empty() {
            return Err(Error::CategoryConfigError(
                category.name.clone(),
                "filename must not be empty".to_string(),
            ));
        }
        if category.dependencies.iter().any(|dep| dep == &category.name) {
            return Err(Error::CategoryConfigError(
                category.name.clone(),
                "category cannot depend on itself".to_string(),
            ));
        }
        let mut categories = self
            .categories
            .write()
            .expect("CategoryRegistry: categories lock poisoned");
        let mut order = self.order.write().expect("CategoryRegistry: order lock poisoned");
        if !categories.contains_key(&category.name) {
            order.push(category.name.clone());
        }
        categories.insert(category.name.clone(), category);
        Ok(())
    }

    fn registration_index(&self, order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap_or(usize::MAX)
    }

    /// Fetch a registered category by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCategory`] if `name` was never registered.
    pub fn get(&self, name: &str) -> Result<Category> {
        let categories = self
            .categories
            .read()
            .expect("CategoryRegistry: categories lock poisoned");
        categories
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownCategory(name.to_string()))
    }

    /// List all registered categories, sorted by descending `priority`
    /// with ties broken by ascending registration order (the order
    /// [`CategoryRegistry::register`] was first called for each name).
    #[must_use]
    pub fn list_categories(&self) -> Vec<Category> {
        let categories = self
            .categories
            .read()
            .expect("CategoryRegistry: categories lock poisoned");
        let order = self.order.read().expect("CategoryRegistry: order lock poisoned");
        let mut list: Vec<Category> = categories.values().cloned().collect();
        list.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| self.registration_index(&order, &a.name).cmp(&self.registration_index(&order, &b.name)))
        });
        list
    }

    /// Compute a valid ingestion order: every category appears after all
    /// of its dependencies, and among categories with no outstanding
    /// dependency at a given step, higher `priority` runs first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] if the dependency graph is not a
    /// DAG, and [`Error::UnknownCategory`] if a category names a
    /// dependency that was never registered.
    pub fn dependency_order(&self) -> Result<Vec<Category>> {
        let categories = self
            .categories
            .read()
            .expect("CategoryRegistry: categories lock poisoned");
        let order = self.order.read().expect("CategoryRegistry: order lock poisoned");

        for category in categories.values() {
            for dep in &category.dependencies {
                if !categories.contains_key(dep) {
                    return Err(Error::UnknownCategory(dep.clone()));
                }
            }
        }

        let mut remaining: HashSet<String> = categories.keys().cloned().collect();
        let mut ordered = Vec::with_capacity(categories.len());

        while !remaining.is_empty() {
            let mut ready: Vec<&Category> = remaining
                .iter()
                .filter_map(|name| categories.get(name))
                .filter(|category| category.dependencies.iter().all(|dep| !remaining.contains(dep)))
                .collect();

            if ready.is_empty() {
                let mut stuck: Vec<String> = remaining.into_iter().collect();
                stuck.sort();
                return Err(Error::CycleDetected(stuck));
            }

            ready.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then_with(|| self.registration_index(&order, &a.name).cmp(&self.registration_index(&order, &b.name)))
            });
            let next = ready[0].clone();
            remaining.remove(&next.name);
            ordered.push(next);
        }

        Ok(ordered)
    }
}
