//! Benchmark Planner
//!
//! Selects the benchmarks a run will execute. Selection is a regex match on
//! the heading; order is registration order, which is also execution order.

use faceoff_core::Faceoff;
use regex::Regex;

/// One selected benchmark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    /// Benchmark heading
    pub heading: String,
    /// Versions it runs against, baseline first
    pub versions: Vec<String>,
}

/// Execution plan for benchmarks
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Selected benchmarks in execution order
    pub entries: Vec<PlanEntry>,
}

impl ExecutionPlan {
    /// Number of (benchmark, version) executions
    pub fn unit_count(&self) -> usize {
        self.entries.iter().map(|e| e.versions.len()).sum()
    }

    /// Whether nothing was selected
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tree-style listing used by `--list`
    pub fn render(&self) -> String {
        let mut out = String::from("Faceoff Plan:\n");
        for entry in &self.entries {
            out.push_str(&format!("├── {}\n", entry.heading));
            for (i, version) in entry.versions.iter().enumerate() {
                let marker = if i == 0 { " (baseline)" } else { "" };
                out.push_str(&format!("│   ├── {version}{marker}\n"));
            }
        }
        out.push_str(&format!(
            "{} benchmarks, {} executions.\n",
            self.entries.len(),
            self.unit_count()
        ));
        out
    }
}

/// Build an execution plan from the registered benchmarks
pub fn build_plan<M, C>(faceoff: &Faceoff<M, C>, filter: Option<&Regex>) -> ExecutionPlan {
    let entries = faceoff
        .definitions()
        .iter()
        .filter(|def| filter.map_or(true, |re| re.is_match(&def.id)))
        .map(|def| PlanEntry {
            heading: def.id.clone(),
            versions: def.versions.clone(),
        })
        .collect();
    ExecutionPlan { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceoff_core::{Options, VersionSource};

    fn faceoff() -> Faceoff<u32> {
        let mut faceoff = Faceoff::new([
            ("v1", VersionSource::module(1, "/opt/v1")),
            ("v2", VersionSource::module(2, "/opt/v2")),
        ])
        .unwrap();
        faceoff.add("zeta", |_, _| Ok(()), Options::new()).unwrap();
        faceoff
            .suite("parse", Options::new(), |s| {
                s.add("json", |_, _| Ok(()), Options::new())?;
                s.add("toml", |_, _| Ok(()), Options::new().skip(["v1"]))
            })
            .unwrap();
        faceoff
    }

    #[test]
    fn test_no_filter_keeps_registration_order() {
        let plan = build_plan(&faceoff(), None);

        let headings: Vec<_> = plan.entries.iter().map(|e| e.heading.as_str()).collect();
        assert_eq!(headings, ["zeta", "parse ⇒ json", "parse ⇒ toml"]);
        assert_eq!(plan.unit_count(), 5);
    }

    #[test]
    fn test_regex_filter() {
        let re = Regex::new("^parse").unwrap();
        let plan = build_plan(&faceoff(), Some(&re));

        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[1].versions, ["v2"]);
    }

    #[test]
    fn test_render_marks_baseline() {
        let re = Regex::new("toml").unwrap();
        let listing = build_plan(&faceoff(), Some(&re)).render();

        assert!(listing.contains("├── parse ⇒ toml"));
        assert!(listing.contains("│   ├── v2 (baseline)"));
        assert!(listing.ends_with("1 benchmarks, 1 executions.\n"));
    }
}
