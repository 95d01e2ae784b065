//! Compatibility rules for grouping runs into collections.
//!
//! A run may join a collection when it belongs to the same project, uses the
//! same annotation type and covers exactly the same set of sessions. Subsets
//! and supersets are rejected so that every run in a collection was evaluated
//! against the same data. A source collection may be merged into a target
//! under the same rule, provided it is not the target itself.
//!
//! Every session comparison in the workspace goes through [`set_equals`].

use crate::collection::Collection;
use crate::run::{AnnotationType, Run};
use std::collections::HashSet;

/// Set equality over two lists of ids. Order and repeated ids are ignored.
pub fn set_equals<'a, A, B>(a: A, b: B) -> bool
where
    A: IntoIterator<Item = &'a str>,
    B: IntoIterator<Item = &'a str>,
{
    let left: HashSet<&'a str> = a.into_iter().collect();
    let right: HashSet<&'a str> = b.into_iter().collect();
    left == right
}

/// The first rule a candidate violates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incompatibility {
    Project {
        expected: String,
        found: String,
    },
    AnnotationType {
        expected: AnnotationType,
        found: AnnotationType,
    },
    /// Counts are over distinct session ids.
    Sessions {
        missing: usize,
        unexpected: usize,
    },
    SameCollection,
}

impl std::fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Incompatibility::Project { expected, found } => {
                write!(f, "project '{}' does not match '{}'", found, expected)
            }
            Incompatibility::AnnotationType { expected, found } => {
                write!(f, "annotation type {} does not match {}", found, expected)
            }
            Incompatibility::Sessions {
                missing,
                unexpected,
            } => write!(
                f,
                "sessions differ ({} missing, {} unexpected)",
                missing, unexpected
            ),
            Incompatibility::SameCollection => f.write_str("a collection cannot merge into itself"),
        }
    }
}

fn check_members<'a>(
    project: &str,
    annotation_type: AnnotationType,
    session_ids: impl IntoIterator<Item = &'a str>,
    target: &'a Collection,
) -> Result<(), Incompatibility> {
    if project != target.project {
        return Err(Incompatibility::Project {
            expected: target.project.clone(),
            found: project.to_string(),
        });
    }
    if annotation_type != target.annotation_type {
        return Err(Incompatibility::AnnotationType {
            expected: target.annotation_type,
            found: annotation_type,
        });
    }
    let candidate: Vec<&'a str> = session_ids.into_iter().collect();
    if !set_equals(candidate.iter().copied(), target.sessions.iter().map(String::as_str)) {
        let candidate: HashSet<&str> = candidate.into_iter().collect();
        let expected: HashSet<&str> = target.sessions.iter().map(String::as_str).collect();
        return Err(Incompatibility::Sessions {
            missing: expected.difference(&candidate).count(),
            unexpected: candidate.difference(&expected).count(),
        });
    }
    Ok(())
}

/// Explains why `run` cannot join `collection`, if it cannot.
pub fn check_run(run: &Run, collection: &Collection) -> Result<(), Incompatibility> {
    check_members(
        &run.project,
        run.annotation_type,
        run.session_ids(),
        collection,
    )
}

/// Explains why `source` cannot be merged into `target`, if it cannot.
pub fn check_collection(source: &Collection, target: &Collection) -> Result<(), Incompatibility> {
    if source.id == target.id {
        return Err(Incompatibility::SameCollection);
    }
    check_members(
        &source.project,
        source.annotation_type,
        source.sessions.iter().map(String::as_str),
        target,
    )
}

pub fn is_run_compatible(run: &Run, collection: &Collection) -> bool {
    check_run(run, collection).is_ok()
}

pub fn is_collection_compatible(source: &Collection, target: &Collection) -> bool {
    check_collection(source, target).is_ok()
}
