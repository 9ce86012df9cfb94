// src/client/build_order.rs

//! Topological build ordering for cross-compilation
//!
//! Orders packages so each appears after everything it depends on, using
//! Kahn's algorithm over runtime plus build-time dependencies normalized to
//! bare names. Edges only exist toward packages in the input set. A cycle
//! is reconstructed by DFS and rendered edge by edge with the original
//! dependency strings that caused it.

use crate::client::srcinfo::PackageInfo;
use crate::deps::normalize_dep;
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Compute a total build order; packages with no interdependencies come out
/// in name order. Duplicate package names are fatal.
pub fn topological_sort(packages: &[PackageInfo]) -> Result<Vec<String>> {
    let mut by_name: HashMap<&str, &PackageInfo> = HashMap::new();
    for pkg in packages {
        if by_name.insert(&pkg.name, pkg).is_some() {
            return Err(Error::InvalidInput(format!(
                "duplicate package: {}",
                pkg.name
            )));
        }
    }

    // normalized edges, restricted to the input set
    let mut deps: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut in_degree: BTreeMap<String, usize> = BTreeMap::new();
    for pkg in packages {
        deps.insert(pkg.name.clone(), Vec::new());
        in_degree.insert(pkg.name.clone(), 0);
    }
    for pkg in packages {
        let mut all: BTreeSet<String> = BTreeSet::new();
        for dep in pkg.depends.iter().chain(&pkg.build_depends) {
            all.insert(normalize_dep(dep));
        }
        for dep_name in all {
            if by_name.contains_key(dep_name.as_str()) {
                deps.get_mut(&pkg.name).unwrap().push(dep_name);
                *in_degree.get_mut(&pkg.name).unwrap() += 1;
            }
        }
    }

    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for (name, dep_list) in &deps {
        for dep in dep_list {
            dependents
                .entry(dep.as_str())
                .or_default()
                .push(name.as_str());
        }
    }

    let mut queue: VecDeque<String> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| n.clone())
        .collect();
    let mut remaining = in_degree.clone();

    let mut order = Vec::with_capacity(packages.len());
    while let Some(current) = queue.pop_front() {
        order.push(current.clone());
        for dependent in dependents.get(current.as_str()).into_iter().flatten() {
            let d = remaining.get_mut(*dependent).unwrap();
            *d -= 1;
            if *d == 0 {
                queue.push_back(dependent.to_string());
            }
        }
    }

    if order.len() != packages.len() {
        let stuck: HashSet<String> = remaining
            .iter()
            .filter(|(_, d)| **d > 0)
            .map(|(n, _)| n.clone())
            .collect();
        if let Some(cycle) = find_cycle(&deps, &stuck) {
            return Err(Error::Cycle(format_cycle(&cycle, &by_name)));
        }
        return Err(Error::Cycle(
            "dependency cycle detected (unable to determine exact path)".to_string(),
        ));
    }

    Ok(order)
}

/// DFS over the nodes still holding in-degree, tracking the recursion
/// stack; a back-edge closes the cycle, reconstructed via the parent map.
fn find_cycle(
    deps: &BTreeMap<String, Vec<String>>,
    stuck: &HashSet<String>,
) -> Option<Vec<String>> {
    struct State<'a> {
        deps: &'a BTreeMap<String, Vec<String>>,
        stuck: &'a HashSet<String>,
        visited: HashSet<String>,
        stack: HashSet<String>,
        parent: HashMap<String, String>,
    }

    fn dfs(state: &mut State, node: &str) -> Option<Vec<String>> {
        state.visited.insert(node.to_string());
        state.stack.insert(node.to_string());

        for dep in state.deps.get(node).into_iter().flatten() {
            if !state.stuck.contains(dep) {
                continue;
            }
            if !state.visited.contains(dep) {
                state.parent.insert(dep.clone(), node.to_string());
                if let Some(cycle) = dfs(state, dep) {
                    return Some(cycle);
                }
            } else if state.stack.contains(dep) {
                // back-edge: walk parents from node back to dep
                let mut cycle = vec![dep.clone()];
                let mut current = node.to_string();
                while current != *dep {
                    cycle.push(current.clone());
                    current = state.parent[&current].clone();
                }
                cycle.push(dep.clone());
                cycle.reverse();
                return Some(cycle);
            }
        }

        state.stack.remove(node);
        None
    }

    let mut state = State {
        deps,
        stuck,
        visited: HashSet::new(),
        stack: HashSet::new(),
        parent: HashMap::new(),
    };

    let mut starts: Vec<&String> = stuck.iter().collect();
    starts.sort();
    for name in starts {
        if !state.visited.contains(name.as_str()) {
            if let Some(cycle) = dfs(&mut state, name) {
                return Some(cycle);
            }
        }
    }
    None
}

/// Render a cycle path, labeling each edge with the original runtime or
/// build dependency string that caused it.
fn format_cycle(cycle: &[String], by_name: &HashMap<&str, &PackageInfo>) -> String {
    let mut out = String::new();
    for window in cycle.windows(2) {
        let (current, next) = (&window[0], &window[1]);
        let pkg = by_name[current.as_str()];
        out.push_str(&format!("  {} ({})\n", current, pkg.version));

        let mut causes = Vec::new();
        for dep in &pkg.depends {
            if normalize_dep(dep) == *next {
                causes.push(format!("runtime: {dep}"));
            }
        }
        for dep in &pkg.build_depends {
            if normalize_dep(dep) == *next {
                causes.push(format!("build: {dep}"));
            }
        }
        out.push_str(&format!("    └─> depends on [{}]\n", causes.join(", ")));
    }
    if let Some(last) = cycle.last() {
        let pkg = by_name[last.as_str()];
        out.push_str(&format!("  {} ({}) [cycle closes here]\n", last, pkg.version));
    }
    out
}
