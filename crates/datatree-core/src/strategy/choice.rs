use std::collections::BTreeMap;

use crate::candidate::CandidateNode;
use crate::errors::{DataTreeError, Result};
use crate::model::{DataNode, InstancePath, PathArg, QName};
use crate::modification::ModificationType;
use crate::schema::CaseSchema;
use crate::tree::MutableTreeNode;

use super::{ApplyStrategy, BuildOptions, MandatoryEnforcer};

/// Choice node: children of all cases, at most one case present
#[derive(Debug)]
pub(crate) struct ChoiceStrategy {
    children: BTreeMap<QName, ApplyStrategy>,
    case_of: BTreeMap<QName, QName>,
    cases: BTreeMap<QName, MandatoryEnforcer>,
}

impl ChoiceStrategy {
    pub(super) fn build(cases: &[CaseSchema], options: BuildOptions) -> Self {
        let mut children = BTreeMap::new();
        let mut case_of = BTreeMap::new();
        let mut enforcers = BTreeMap::new();
        for case in cases {
            for (name, strategy) in ApplyStrategy::children_of(&case.children, options) {
                case_of.insert(name.clone(), case.name.clone());
                children.insert(name, strategy);
            }
            let enforcer = if options.mandatory {
                MandatoryEnforcer::for_children(&case.children, options.config_only)
            } else {
                MandatoryEnforcer::default()
            };
            enforcers.insert(case.name.clone(), enforcer);
        }
        Self {
            children,
            case_of,
            cases: enforcers,
        }
    }

    pub(crate) fn child(&self, name: &QName) -> Option<&ApplyStrategy> {
        self.children.get(name)
    }

    /// Case-mix check of written data, plus the active case's mandatory
    /// descendants when `full` is set
    pub(crate) fn verify_cases(&self, data: &DataNode, path: &InstancePath, full: bool) -> Result<()> {
        let Some(children) = data.children() else {
            return Ok(());
        };
        let mut active: Option<(&PathArg, &QName)> = None;
        for arg in children.keys() {
            let Some(case) = self.case_of.get(arg.name()) else {
                continue;
            };
            match active {
                None => active = Some((arg, case)),
                Some((first, first_case)) if first_case != case => {
                    return Err(case_mix(path, first, first_case, arg, case));
                }
                Some(_) => {}
            }
        }
        match active {
            Some((_, case)) if full => self.enforce_case(case, data, path),
            _ => Ok(()),
        }
    }

    pub(crate) fn enforce_active_case(&self, data: &DataNode, path: &InstancePath) -> Result<()> {
        let active = data
            .children()
            .into_iter()
            .flat_map(|c| c.keys())
            .find_map(|arg| self.case_of.get(arg.name()));
        match active {
            Some(case) => self.enforce_case(case, data, path),
            None => Ok(()),
        }
    }

    fn enforce_case(&self, case: &QName, data: &DataNode, path: &InstancePath) -> Result<()> {
        match self.cases.get(case) {
            Some(enforcer) => enforcer.enforce(data, path),
            None => Ok(()),
        }
    }

    /// Drop children of every case other than the one just modified
    ///
    /// The active case is the case of the children this modification left
    /// present. Removed children are reported as deleted.
    pub(super) fn exclude_other_cases(
        &self,
        mutable: &mut MutableTreeNode,
        candidates: &mut Vec<CandidateNode>,
        path: &InstancePath,
    ) -> Result<()> {
        let mut active: Option<(PathArg, QName)> = None;
        for candidate in candidates.iter() {
            if candidate.is_unmodified() || candidate.data_after().is_none() {
                continue;
            }
            let arg = candidate.identifier()?;
            let Some(case) = self.case_of.get(arg.name()) else {
                continue;
            };
            match &active {
                None => active = Some((arg.clone(), case.clone())),
                Some((first, first_case)) if first_case != case => {
                    return Err(case_mix(path, first, first_case, arg, case));
                }
                Some(_) => {}
            }
        }
        let Some((_, case)) = active else {
            return Ok(());
        };

        let stale: Vec<(PathArg, DataNode)> = mutable
            .data()
            .children()
            .into_iter()
            .flat_map(|c| c.iter())
            .filter(|(arg, _)| self.case_of.get(arg.name()) != Some(&case))
            .map(|(arg, node)| (arg.clone(), node.clone()))
            .collect();
        for (arg, before) in stale {
            mutable.remove_child(&arg);
            let deleted =
                CandidateNode::replaced(arg.clone(), ModificationType::Delete, Some(before), None);
            match candidates
                .iter_mut()
                .find(|c| c.identifier().ok() == Some(&arg))
            {
                Some(slot) => *slot = deleted,
                None => candidates.push(deleted),
            }
        }
        Ok(())
    }
}

fn case_mix(
    path: &InstancePath,
    first: &PathArg,
    first_case: &QName,
    other: &PathArg,
    other_case: &QName,
) -> DataTreeError {
    DataTreeError::schema(
        path,
        format!(
            "Child {} (from case {}) implies non-presence of child {} (from case {}), which is present.",
            other, other_case, first, first_case
        ),
    )
}
