//! Provisioning order for a synthesized stack.

use crate::error::SynthError;
use crate::stack::{Declaration, ResourceKind};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub logical_id: String,
    pub path: String,
    pub kind: ResourceKind,
    /// Sorted logical ids this step waits for.
    pub depends_on: Vec<String>,
}

/// Resources in an order the provisioning engine can create them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningPlan {
    pub steps: Vec<PlanStep>,
}

impl ProvisioningPlan {
    /// Topologically orders `declarations`. Among resources that are ready at
    /// the same time, the one declared first goes first, so the order is
    /// stable for identical inputs.
    ///
    /// `dependencies` maps a logical id to the logical ids it needs; every id
    /// in it must belong to `declarations`.
    pub fn order(
        declarations: &[Declaration],
        dependencies: &AHashMap<String, BTreeSet<String>>,
    ) -> Result<Self, SynthError> {
        let position: AHashMap<&str, usize> = declarations
            .iter()
            .enumerate()
            .map(|(idx, d)| (d.logical_id.as_str(), idx))
            .collect();

        let mut pending: Vec<usize> = vec![0; declarations.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); declarations.len()];
        for (idx, declaration) in declarations.iter().enumerate() {
            if let Some(needs) = dependencies.get(&declaration.logical_id) {
                for need in needs {
                    let need_idx = *position.get(need.as_str()).ok_or_else(|| {
                        SynthError::UnresolvedReference {
                            missing_id: need.clone(),
                            referenced_by: declaration.path.clone(),
                        }
                    })?;
                    pending[idx] += 1;
                    dependents[need_idx].push(idx);
                }
            }
        }

        let mut ready: BTreeSet<usize> = (0..declarations.len())
            .filter(|idx| pending[*idx] == 0)
            .collect();
        let mut steps = Vec::with_capacity(declarations.len());

        while let Some(idx) = ready.pop_first() {
            let declaration = &declarations[idx];
            steps.push(PlanStep {
                logical_id: declaration.logical_id.clone(),
                path: declaration.path.clone(),
                kind: declaration.kind,
                depends_on: dependencies
                    .get(&declaration.logical_id)
                    .map(|needs| needs.iter().cloned().collect())
                    .unwrap_or_default(),
            });
            for dependent in &dependents[idx] {
                pending[*dependent] -= 1;
                if pending[*dependent] == 0 {
                    ready.insert(*dependent);
                }
            }
        }

        if steps.len() < declarations.len() {
            let blocked: Vec<usize> = (0..declarations.len())
                .filter(|idx| pending[*idx] > 0)
                .collect();
            return Err(SynthError::DependencyCycle(find_cycle(
                declarations,
                dependencies,
                &position,
                &blocked,
            )));
        }

        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Zero-based position of a resource in the plan.
    pub fn position(&self, logical_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.logical_id == logical_id)
    }
}

/// Follows unsatisfied dependencies from the first blocked resource until a
/// resource repeats, returning the cycle as a list of construct paths.
fn find_cycle(
    declarations: &[Declaration],
    dependencies: &AHashMap<String, BTreeSet<String>>,
    position: &AHashMap<&str, usize>,
    blocked: &[usize],
) -> Vec<String> {
    let blocked_set: HashSet<usize> = blocked.iter().copied().collect();
    let mut trail: Vec<usize> = Vec::new();
    let mut current = match blocked.first() {
        Some(first) => *first,
        None => return Vec::new(),
    };

    loop {
        if let Some(start) = trail.iter().position(|idx| *idx == current) {
            let mut cycle: Vec<String> = trail[start..]
                .iter()
                .map(|idx| declarations[*idx].path.clone())
                .collect();
            cycle.push(declarations[current].path.clone());
            return cycle;
        }
        trail.push(current);
        let next = dependencies
            .get(&declarations[current].logical_id)
            .and_then(|needs| {
                needs
                    .iter()
                    .filter_map(|need| position.get(need.as_str()).copied())
                    .find(|idx| blocked_set.contains(idx))
            });
        match next {
            Some(next) => current = next,
            // unreachable for a blocked node, but keep the trail as the report
            None => {
                return trail
                    .iter()
                    .map(|idx| declarations[*idx].path.clone())
                    .collect();
            }
        }
    }
}

impl fmt::Display for ProvisioningPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            write!(
                f,
                "{:>3}. {:<34} {} ({})",
                idx + 1,
                step.kind.type_name(),
                step.path,
                step.logical_id
            )?;
            if !step.depends_on.is_empty() {
                write!(f, "\n       after: {}", step.depends_on.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
