//! Consistency verification and repair
//!
//! `parent` is the authoritative edge. Everything else (`level`, `path`,
//! `children`, `is_leaf`) is recomputed from it:
//!
//! - a `parent` that does not resolve makes the category a root
//! - a parent cycle is broken by making its smallest id a root
//! - `children` becomes the exact inverse of `parent`, keeping the stored
//!   order of entries that are still valid and appending the rest by id
//! - duplicate slugs keep the lowest id unchanged, later ids get `-{id}`
//!
//! Only records that differ from their repaired form are written, so a
//! second run writes nothing.

use super::CategoryTree;
use super::slug::with_id_suffix;
use crate::db::{CategoryFilter, CategorySort};
use crate::error::{TreeError, TreeResult};
use serde::Serialize;
use shared::models::Category;
use shared::util::now_millis;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// A single invariant violation found in stored data
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "fault", rename_all = "snake_case")]
pub enum ConsistencyFault {
    #[error("category {id}: level {stored} should be {expected}")]
    LevelMismatch { id: i64, stored: i32, expected: i32 },

    #[error("category {id}: path {stored:?} should be {expected:?}")]
    PathMismatch {
        id: i64,
        stored: Vec<i64>,
        expected: Vec<i64>,
    },

    #[error("category {id}: parent {parent} does not exist")]
    DanglingParent { id: i64, parent: i64 },

    #[error("category {id}: lists child {child} whose parent is elsewhere")]
    OrphanChildEntry { id: i64, child: i64 },

    #[error("category {id}: child {child} is not listed in children")]
    MissingChildEntry { id: i64, child: i64 },

    #[error("category {id}: child {child} is listed more than once")]
    DuplicateChildEntry { id: i64, child: i64 },

    #[error("category {id}: is_leaf is {stored} with {children} children")]
    LeafFlagMismatch {
        id: i64,
        stored: bool,
        children: usize,
    },

    #[error("parent cycle through {ids:?}")]
    Cycle { ids: Vec<i64> },

    #[error("slug '{slug}' is shared by {ids:?}")]
    DuplicateSlug { slug: String, ids: Vec<i64> },
}

/// Outcome of a repair run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairReport {
    /// Number of categories scanned
    pub scanned: usize,
    /// Ids of categories rewritten
    pub updated: Vec<i64>,
    /// Faults found before repairing
    pub faults: Vec<ConsistencyFault>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Faults plus the repaired form of every record that needs rewriting
#[derive(Debug, Default)]
pub(crate) struct RepairPlan {
    pub faults: Vec<ConsistencyFault>,
    pub changed: Vec<Category>,
}

/// Compute the repaired form of a whole collection
///
/// Pure: the caller decides whether to persist `changed`.
pub(crate) fn plan(categories: &[Category], now: i64) -> RepairPlan {
    let mut faults = Vec::new();
    let by_id: BTreeMap<i64, &Category> = categories.iter().map(|c| (c.id, c)).collect();

    // Effective parent edge: dangling and self references become roots
    let mut parent_of: BTreeMap<i64, Option<i64>> = BTreeMap::new();
    for (&id, category) in &by_id {
        let parent = match category.parent {
            Some(parent) if parent == id => {
                faults.push(ConsistencyFault::Cycle { ids: vec![id] });
                None
            }
            Some(parent) if !by_id.contains_key(&parent) => {
                faults.push(ConsistencyFault::DanglingParent { id, parent });
                None
            }
            parent => parent,
        };
        parent_of.insert(id, parent);
    }

    break_cycles(&mut parent_of, &mut faults);
    let paths = expected_paths(&parent_of);

    let mut children_of: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for (&id, parent) in &parent_of {
        if let Some(parent) = parent {
            children_of.entry(*parent).or_default().push(id);
        }
    }

    let slugs = deduplicated_slugs(&by_id, &mut faults);

    let mut changed = Vec::new();
    for (&id, category) in &by_id {
        let path = paths.get(&id).cloned().unwrap_or_else(|| vec![id]);
        let level = path.len() as i32 - 1;
        let actual_children = children_of.get(&id).map(Vec::as_slice).unwrap_or(&[]);
        let children = reconcile_children(category, actual_children, &parent_of, &mut faults);
        let is_leaf = children.is_empty();

        if category.level != level {
            faults.push(ConsistencyFault::LevelMismatch {
                id,
                stored: category.level,
                expected: level,
            });
        }
        if category.path != path {
            faults.push(ConsistencyFault::PathMismatch {
                id,
                stored: category.path.clone(),
                expected: path.clone(),
            });
        }
        if category.is_leaf != is_leaf {
            faults.push(ConsistencyFault::LeafFlagMismatch {
                id,
                stored: category.is_leaf,
                children: children.len(),
            });
        }

        let mut repaired = (*category).clone();
        repaired.parent = parent_of.get(&id).copied().flatten();
        repaired.level = level;
        repaired.path = path;
        repaired.children = children;
        repaired.is_leaf = is_leaf;
        if let Some(slug) = slugs.get(&id) {
            repaired.slug = slug.clone();
        }
        if repaired != **category {
            repaired.updated_at = now;
            changed.push(repaired);
        }
    }

    RepairPlan { faults, changed }
}

/// Walk every parent chain; on a cycle, cut the edge of its smallest id
fn break_cycles(parent_of: &mut BTreeMap<i64, Option<i64>>, faults: &mut Vec<ConsistencyFault>) {
    let mut done: HashSet<i64> = HashSet::new();
    let ids: Vec<i64> = parent_of.keys().copied().collect();

    for start in ids {
        let mut chain: Vec<i64> = Vec::new();
        let mut on_chain: HashSet<i64> = HashSet::new();
        let mut current = Some(start);

        while let Some(id) = current {
            if done.contains(&id) {
                break;
            }
            if !on_chain.insert(id) {
                let pos = chain.iter().position(|&c| c == id).unwrap_or(0);
                let mut cycle = chain[pos..].to_vec();
                cycle.sort_unstable();
                if let Some(&root) = cycle.first() {
                    parent_of.insert(root, None);
                }
                faults.push(ConsistencyFault::Cycle { ids: cycle });
                break;
            }
            chain.push(id);
            current = parent_of.get(&id).copied().flatten();
        }
        done.extend(chain);
    }
}

/// Root-first path of every category over an acyclic parent map
fn expected_paths(parent_of: &BTreeMap<i64, Option<i64>>) -> HashMap<i64, Vec<i64>> {
    let mut paths: HashMap<i64, Vec<i64>> = HashMap::new();
    for &start in parent_of.keys() {
        let mut chain = Vec::new();
        let mut current = Some(start);
        let mut base = Vec::new();
        while let Some(id) = current {
            if let Some(known) = paths.get(&id) {
                base = known.clone();
                break;
            }
            chain.push(id);
            current = parent_of.get(&id).copied().flatten();
        }
        for id in chain.into_iter().rev() {
            base.push(id);
            paths.insert(id, base.clone());
        }
    }
    paths
}

fn reconcile_children(
    category: &Category,
    actual: &[i64],
    parent_of: &BTreeMap<i64, Option<i64>>,
    faults: &mut Vec<ConsistencyFault>,
) -> Vec<i64> {
    let id = category.id;
    let mut children = Vec::with_capacity(actual.len());
    let mut listed = HashSet::new();

    for &child in &category.children {
        if parent_of.get(&child).copied().flatten() != Some(id) {
            faults.push(ConsistencyFault::OrphanChildEntry { id, child });
        } else if !listed.insert(child) {
            faults.push(ConsistencyFault::DuplicateChildEntry { id, child });
        } else {
            children.push(child);
        }
    }
    for &child in actual {
        if !listed.contains(&child) {
            faults.push(ConsistencyFault::MissingChildEntry { id, child });
            children.push(child);
        }
    }
    children
}

/// New slug for every category that loses a slug collision
fn deduplicated_slugs(
    by_id: &BTreeMap<i64, &Category>,
    faults: &mut Vec<ConsistencyFault>,
) -> HashMap<i64, String> {
    let mut holders: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
    for (&id, category) in by_id {
        holders.entry(category.slug.as_str()).or_default().push(id);
    }

    let mut taken: HashSet<String> = holders.keys().map(|s| s.to_string()).collect();
    let mut renamed = HashMap::new();
    for (slug, ids) in &holders {
        if ids.len() < 2 {
            continue;
        }
        faults.push(ConsistencyFault::DuplicateSlug {
            slug: slug.to_string(),
            ids: ids.clone(),
        });
        for &id in &ids[1..] {
            let mut candidate = with_id_suffix(slug, id);
            while taken.contains(&candidate) {
                candidate = with_id_suffix(&candidate, id);
            }
            taken.insert(candidate.clone());
            renamed.insert(id, candidate);
        }
    }
    renamed
}

impl CategoryTree {
    /// Scan the whole collection and report every invariant violation
    pub async fn verify(&self) -> TreeResult<Vec<ConsistencyFault>> {
        let all = self
            .store
            .find_where(CategoryFilter::All, CategorySort::Unordered)
            .await?;
        let faults = plan(&all, now_millis()).faults;
        tracing::debug!(scanned = all.len(), faults = faults.len(), "Verified category tree");
        Ok(faults)
    }

    /// Fail with [`TreeError::Consistency`] when any fault is present
    pub async fn ensure_consistent(&self) -> TreeResult<()> {
        let faults = self.verify().await?;
        match faults.first() {
            None => Ok(()),
            Some(first) => Err(TreeError::Consistency(format!(
                "{} faults, first: {first}",
                faults.len()
            ))),
        }
    }

    /// Rebuild every derived field from the `parent` links
    pub async fn repair(&self) -> TreeResult<RepairReport> {
        let all = self
            .store
            .find_where(CategoryFilter::All, CategorySort::Unordered)
            .await?;
        let RepairPlan { faults, changed } = plan(&all, now_millis());

        for fault in &faults {
            tracing::warn!(%fault, "Repairing category tree");
        }

        let mut updated = Vec::with_capacity(changed.len());
        for category in changed {
            let id = category.id;
            self.store.save(category).await?;
            updated.push(id);
        }

        tracing::info!(
            scanned = all.len(),
            updated = updated.len(),
            faults = faults.len(),
            "Category tree repaired"
        );
        Ok(RepairReport {
            scanned: all.len(),
            updated,
            faults,
        })
    }
}
