//! Result grouping
//!
//! Results arrive as a flat list of fully-qualified names
//! (`suite ⇒ nested ⇒ benchmark ⇒ version`). The heading of a result is
//! everything before the *last* separator, so benchmark names may contain
//! the separator while version labels may not.

use crate::analysis::{analyze_group, AnalysisConfig};
use crate::result::ExecutionResult;
use fxhash::FxHashMap;
use rayon::prelude::*;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Separator between name segments
pub const SEPARATOR: &str = " ⇒ ";

/// Strip the trailing ` ⇒ version` segment from a fully-qualified name.
///
/// A name without a separator is its own heading.
pub fn heading_name(name: &str) -> &str {
    match name.rfind(SEPARATOR) {
        Some(pos) => &name[..pos],
        None => name,
    }
}

/// All versions of one benchmark, baseline first
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonGroup {
    /// Benchmark heading (`path ⇒ name`)
    pub heading: String,
    /// Results in registration order
    pub results: Vec<ExecutionResult>,
}

impl ComparisonGroup {
    /// Create an empty group
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            results: Vec::new(),
        }
    }

    /// The baseline (first registered) result
    pub fn baseline(&self) -> Option<&ExecutionResult> {
        self.results.first()
    }

    /// The last-registered result, the one checked for regressions
    pub fn subject(&self) -> Option<&ExecutionResult> {
        self.results.last()
    }

    /// The result flagged fastest by analysis
    pub fn fastest(&self) -> Option<&ExecutionResult> {
        self.results.iter().find(|r| r.fastest)
    }

    /// Number of versions in the group
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the group holds no results
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Ordered collection of comparison groups, as returned by a run
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    groups: Vec<ComparisonGroup>,
    index: FxHashMap<String, usize>,
}

impl ResultSet {
    /// Create an empty result set
    pub fn new() -> Self {
        Self::default()
    }

    /// Group a flat result list by heading, preserving first-seen order
    pub fn from_results(results: impl IntoIterator<Item = ExecutionResult>) -> Self {
        let mut set = Self::new();
        for result in results {
            set.push(result);
        }
        set
    }

    /// Append a result to the group named by its heading
    pub fn push(&mut self, result: ExecutionResult) {
        let heading = result.heading().to_string();
        let idx = match self.index.get(&heading) {
            Some(&idx) => idx,
            None => {
                self.groups.push(ComparisonGroup::new(heading.clone()));
                self.index.insert(heading, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        self.groups[idx].results.push(result);
    }

    /// Run the comparative analysis on every group
    pub fn analyze(&mut self, config: &AnalysisConfig) {
        self.groups
            .par_iter_mut()
            .for_each(|group| analyze_group(group, config));
    }

    /// Groups in registration order
    pub fn groups(&self) -> &[ComparisonGroup] {
        &self.groups
    }

    /// Look up a group by heading
    pub fn get(&self, heading: &str) -> Option<&ComparisonGroup> {
        self.index.get(heading).map(|&idx| &self.groups[idx])
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no benchmark produced results
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Nest the groups under their suite path for presentation
    pub fn tree(&self) -> ReportNode<'_> {
        let mut root = ReportNode::default();
        for group in &self.groups {
            let mut node = &mut root;
            for segment in group.heading.split(SEPARATOR) {
                node = node.child_mut(segment);
            }
            node.group = Some(group);
        }
        root
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            let records: Vec<_> = group.results.iter().map(ExecutionResult::record).collect();
            map.serialize_entry(&group.heading, &records)?;
        }
        map.end()
    }
}

/// Suite-path tree over a [`ResultSet`]
#[derive(Debug, Default)]
pub struct ReportNode<'a> {
    /// Path segment (empty at the root)
    pub name: String,
    /// Nested suites and benchmarks, in registration order
    pub children: Vec<ReportNode<'a>>,
    /// Group whose heading ends at this node
    pub group: Option<&'a ComparisonGroup>,
}

impl<'a> ReportNode<'a> {
    fn child_mut(&mut self, name: &str) -> &mut ReportNode<'a> {
        let idx = match self.children.iter().position(|c| c.name == name) {
            Some(idx) => idx,
            None => {
                self.children.push(ReportNode {
                    name: name.to_string(),
                    ..Default::default()
                });
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }

    /// Depth-first walk yielding `(depth, node)`, root excluded
    pub fn walk(&self) -> Vec<(usize, &ReportNode<'a>)> {
        fn visit<'n, 'a>(node: &'n ReportNode<'a>, depth: usize, out: &mut Vec<(usize, &'n ReportNode<'a>)>) {
            for child in &node.children {
                out.push((depth, child));
                visit(child, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        visit(self, 0, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str) -> ExecutionResult {
        let version = name.rsplit(SEPARATOR).next().unwrap_or(name);
        ExecutionResult::from_samples(name, version, vec![10.0, 12.0], false)
    }

    #[test]
    fn test_heading_name_truncates_last_separator() {
        assert_eq!(heading_name("a ⇒ b"), "a");
        assert_eq!(
            heading_name("example ⇒ suite ⇒ nested ⇒ scenario"),
            "example ⇒ suite ⇒ nested"
        );
    }

    #[test]
    fn test_heading_name_without_separator() {
        assert_eq!(heading_name("standalone"), "standalone");
        // The arrow alone, without surrounding spaces, is ordinary text
        assert_eq!(heading_name("a⇒b"), "a⇒b");
    }

    #[test]
    fn test_grouping_preserves_registration_order() {
        let set = ResultSet::from_results(vec![
            result("s ⇒ first ⇒ v1"),
            result("s ⇒ first ⇒ v2"),
            result("s ⇒ second ⇒ v1"),
            result("s ⇒ first ⇒ v3"),
        ]);

        let headings: Vec<_> = set.groups().iter().map(|g| g.heading.as_str()).collect();
        assert_eq!(headings, vec!["s ⇒ first", "s ⇒ second"]);

        let first = set.get("s ⇒ first").unwrap();
        let versions: Vec<_> = first.results.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["v1", "v2", "v3"]);
        assert_eq!(first.subject().unwrap().version, "v3");
    }

    #[test]
    fn test_tree_nests_suites() {
        let set = ResultSet::from_results(vec![
            result("example ⇒ suite ⇒ nested ⇒ scenario ⇒ v1"),
            result("example ⇒ suite ⇒ flat ⇒ v1"),
            result("other ⇒ v1"),
        ]);
        let tree = set.tree();

        let names: Vec<_> = tree
            .walk()
            .into_iter()
            .map(|(depth, node)| (depth, node.name.as_str(), node.group.is_some()))
            .collect();
        assert_eq!(
            names,
            vec![
                (0, "example", false),
                (1, "suite", false),
                (2, "nested", false),
                (3, "scenario", true),
                (2, "flat", true),
                (0, "other", true),
            ]
        );
    }
}
