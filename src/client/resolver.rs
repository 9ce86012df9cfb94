// src/client/resolver.rs

//! Dependency resolver over a channel index
//!
//! Greedy and monotone: candidates for each name are pre-sorted by semver
//! descending, and the first entry satisfying every accumulated constraint
//! (and the local SDK API) is final. A later constraint that would
//! invalidate an earlier choice is not repaired; it either happens to be
//! satisfied by the chosen version or resolution fails.

use crate::deps::parse_dep;
use crate::error::{Error, Result};
use crate::manifest::{Index, IndexEntry};
use crate::version::{parse_tolerant, render_constraints, satisfies, Constraint};
use semver::Version;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;

/// Resolve `requested` (names, optionally with constraints) against the
/// index, for one architecture and the local SDK's API version.
///
/// Returns the chosen entry for every name reached transitively.
pub fn resolve(
    index: &Index,
    requested: &[String],
    arch: &str,
    api: &str,
) -> Result<BTreeMap<String, IndexEntry>> {
    // candidates by name, restricted to the target arch, semver descending
    let mut by_name: HashMap<&str, Vec<&IndexEntry>> = HashMap::new();
    for entry in index.packages.iter().filter(|e| e.arch == arch) {
        by_name.entry(&entry.name).or_default().push(entry);
    }
    for list in by_name.values_mut() {
        list.sort_by_cached_key(|e| {
            std::cmp::Reverse(
                parse_tolerant(&e.version).unwrap_or_else(|_| Version::new(0, 0, 0)),
            )
        });
    }

    let mut constraints: HashMap<String, Vec<Constraint>> = HashMap::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    for raw in requested {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let (name, constraint) = parse_dep(raw)
            .map_err(|e| Error::InvalidInput(format!("while resolving '{raw}': {e}")))?;
        match constraints.get_mut(&name) {
            Some(existing) => existing.push(constraint),
            None => {
                constraints.insert(name.clone(), vec![constraint]);
                queue.push_back(name);
            }
        }
    }

    let mut chosen: BTreeMap<String, IndexEntry> = BTreeMap::new();

    while let Some(name) = queue.pop_front() {
        if chosen.contains_key(&name) {
            continue;
        }

        let candidates = by_name.get(name.as_str()).ok_or_else(|| {
            Error::NotFound(format!("dependency '{name}' not found in index"))
        })?;

        let current = constraints.get(&name).cloned().unwrap_or_default();
        let entry = candidates
            .iter()
            .find(|e| satisfies(&e.version, &current) && e.ohos_api == api)
            .ok_or_else(|| Error::Unsatisfiable {
                name: name.clone(),
                constraints: render_constraints(&current),
                api: api.to_string(),
            })?;
        debug!("chose {} {} for '{}'", entry.name, entry.version, name);

        for dep in &entry.depends {
            let (dep_name, dep_constraint) = parse_dep(dep)
                .map_err(|e| Error::InvalidInput(format!("while resolving '{dep}': {e}")))?;
            if !constraints.contains_key(&dep_name) {
                queue.push_back(dep_name.clone());
            }
            constraints.entry(dep_name).or_default().push(dep_constraint);
        }

        chosen.insert(name, (**entry).clone());
    }

    Ok(chosen)
}
