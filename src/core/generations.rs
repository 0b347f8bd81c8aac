//! # Generation Scheduler
//!
//! Partitions projects into generations: every link of a project in generation `N`
//! names a project in generations `0..N`. Projects are stored in an arena and
//! dependencies are indices into it. Each round places every project whose
//! dependencies were all placed in earlier rounds; a round that places nothing ends
//! the layering. Whatever is never placed (cycles, self links, links to unknown
//! projects) is reported as missing.

use crate::models::Project;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Cannot calculate generations: multiple projects with the same name [{}]", .0.join(", "))]
    DuplicateNames(Vec<String>),
}

/// Anything that can be scheduled: a unique name plus the names it depends on.
pub trait Linked {
    fn name(&self) -> &str;
    fn links(&self) -> Vec<String>;
}

impl Linked for Project {
    fn name(&self) -> &str {
        Project::name(self)
    }

    fn links(&self) -> Vec<String> {
        self.project_details.links()
    }
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    dependencies: Vec<usize>,
    /// Links naming nothing in the graph. A node with any of these is never placed.
    unknown_links: Vec<String>,
}

/// The dependency graph of one target set.
#[derive(Debug, Clone)]
pub struct ProjectGraph {
    nodes: Vec<Node>,
}

/// Names per generation, plus the names that could not be placed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationPlan {
    pub generations: Vec<Vec<String>>,
    /// Sorted.
    pub missing: Vec<String>,
}

/// The scheduled items themselves, in generation order.
#[derive(Debug)]
pub struct SplitGenerations<'a, T> {
    pub generations: Vec<Vec<&'a T>>,
    pub missing: Vec<&'a T>,
}

impl ProjectGraph {
    /// Fails before any layering if two items share a name.
    pub fn new<T: Linked>(items: &[T]) -> Result<Self, GenerationError> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(items.len());
        let mut duplicates = Vec::new();
        for (i, item) in items.iter().enumerate() {
            if index.insert(item.name(), i).is_some() {
                duplicates.push(item.name().to_string());
            }
        }
        if !duplicates.is_empty() {
            duplicates.sort();
            duplicates.dedup();
            return Err(GenerationError::DuplicateNames(duplicates));
        }

        let nodes = items
            .iter()
            .map(|item| {
                let (known, unknown): (Vec<String>, Vec<String>) = item
                    .links()
                    .into_iter()
                    .partition(|link| index.contains_key(link.as_str()));
                Node {
                    name: item.name().to_string(),
                    dependencies: known
                        .iter()
                        .filter_map(|link| index.get(link.as_str()).copied())
                        .collect(),
                    unknown_links: unknown,
                }
            })
            .collect();
        Ok(Self { nodes })
    }

    /// Repeated-round layering. Each generation's indices are sorted by name.
    pub fn layers(&self) -> Vec<Vec<usize>> {
        let mut placed = vec![false; self.nodes.len()];
        let mut generations = Vec::new();
        loop {
            let mut eligible: Vec<usize> = self
                .nodes
                .iter()
                .enumerate()
                .filter(|(i, node)| {
                    !placed.get(*i).copied().unwrap_or(true)
                        && node.unknown_links.is_empty()
                        && node
                            .dependencies
                            .iter()
                            .all(|d| placed.get(*d).copied().unwrap_or(false))
                })
                .map(|(i, _)| i)
                .collect();
            if eligible.is_empty() {
                break;
            }
            eligible.sort_by(|a, b| self.name_of(*a).cmp(self.name_of(*b)));
            for i in &eligible {
                if let Some(slot) = placed.get_mut(*i) {
                    *slot = true;
                }
            }
            log::trace!(
                "Generation {}: {:?}",
                generations.len(),
                eligible.iter().map(|i| self.name_of(*i)).collect::<Vec<_>>()
            );
            generations.push(eligible);
        }
        generations
    }

    fn name_of(&self, i: usize) -> &str {
        self.nodes.get(i).map_or("", |n| n.name.as_str())
    }

    fn missing_indices(&self, layers: &[Vec<usize>]) -> Vec<usize> {
        let mut placed = vec![false; self.nodes.len()];
        for i in layers.iter().flatten() {
            if let Some(slot) = placed.get_mut(*i) {
                *slot = true;
            }
        }
        let mut missing: Vec<usize> = (0..self.nodes.len())
            .filter(|i| !placed.get(*i).copied().unwrap_or(false))
            .collect();
        missing.sort_by(|a, b| self.name_of(*a).cmp(self.name_of(*b)));
        missing
    }

    pub fn plan(&self) -> GenerationPlan {
        let layers = self.layers();
        let missing = self
            .missing_indices(&layers)
            .into_iter()
            .map(|i| self.name_of(i).to_string())
            .collect();
        let generations = layers
            .iter()
            .map(|g| g.iter().map(|i| self.name_of(*i).to_string()).collect())
            .collect();
        GenerationPlan {
            generations,
            missing,
        }
    }

    /// Links that name nothing in the graph, as `(project, link)` pairs.
    pub fn unknown_links(&self) -> Vec<(String, String)> {
        self.nodes
            .iter()
            .flat_map(|n| n.unknown_links.iter().map(|l| (n.name.clone(), l.clone())))
            .collect()
    }
}

/// Names only: the plan shown by `--generationPlan`.
pub fn calculate_all_generations<T: Linked>(items: &[T]) -> Result<GenerationPlan, GenerationError> {
    Ok(ProjectGraph::new(items)?.plan())
}

/// Groups the items themselves by generation.
pub fn split_generations_by_links<T: Linked>(items: &[T]) -> Result<SplitGenerations<'_, T>, GenerationError> {
    let graph = ProjectGraph::new(items)?;
    let layers = graph.layers();
    let missing = graph
        .missing_indices(&layers)
        .into_iter()
        .filter_map(|i| items.get(i))
        .collect();
    let generations = layers
        .into_iter()
        .map(|g| g.into_iter().filter_map(|i| items.get(i)).collect())
        .collect();
    Ok(SplitGenerations {
        generations,
        missing,
    })
}
