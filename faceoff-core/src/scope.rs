//! Config stack
//!
//! One frame per open suite. Frame 0 is the root and holds the run-wide
//! defaults; it is never popped.

use crate::options::Options;
use faceoff_report::SEPARATOR;

/// A suite path plus the defaults merged along it
pub struct SuiteScope<M, C> {
    /// Suite names from the outermost inward
    pub path: Vec<String>,
    /// Defaults in effect inside this scope
    pub defaults: Options<M, C>,
}

impl<M, C> Clone for SuiteScope<M, C> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            defaults: self.defaults.clone(),
        }
    }
}

/// Stack of nested suite scopes
pub struct ConfigStack<M, C> {
    frames: Vec<SuiteScope<M, C>>,
}

impl<M, C> ConfigStack<M, C> {
    /// Stack containing only the root frame
    pub fn new(root_defaults: Options<M, C>) -> Self {
        Self {
            frames: vec![SuiteScope {
                path: Vec::new(),
                defaults: root_defaults,
            }],
        }
    }

    fn top(&self) -> &SuiteScope<M, C> {
        // frames is never empty: leave_scope refuses to pop the root
        &self.frames[self.frames.len() - 1]
    }

    /// Push `(path + [name], merge(defaults, overrides))`
    pub fn enter_scope(&mut self, name: &str, overrides: &Options<M, C>) {
        let parent = self.top();
        let mut path = parent.path.clone();
        path.push(name.to_string());
        let defaults = Options::merge(&parent.defaults, overrides);
        self.frames.push(SuiteScope { path, defaults });
    }

    /// Pop the innermost scope. The root frame stays.
    pub fn leave_scope(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Path of the innermost scope
    pub fn current_path(&self) -> &[String] {
        &self.top().path
    }

    /// Path joined with the separator, empty at the root
    pub fn current_prefix(&self) -> String {
        self.current_path().join(SEPARATOR)
    }

    /// Defaults of the innermost scope
    pub fn current_defaults(&self) -> &Options<M, C> {
        &self.top().defaults
    }

    /// Number of open suites (0 at the root)
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Replace the root defaults, keeping open scopes as they are
    pub(crate) fn set_root_defaults(&mut self, defaults: Options<M, C>) {
        self.frames[0].defaults = defaults;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_and_leave() {
        let mut stack: ConfigStack<(), ()> = ConfigStack::new(Options::new().min_samples(5));
        assert_eq!(stack.depth(), 0);
        assert!(stack.current_path().is_empty());

        stack.enter_scope("group1", &Options::new().min_samples(50));
        stack.enter_scope("nested", &Options::new());
        assert_eq!(stack.current_path(), ["group1", "nested"]);
        assert_eq!(stack.current_prefix(), "group1 ⇒ nested");
        assert_eq!(stack.current_defaults().tuning_overrides().min_samples, Some(50));

        stack.leave_scope();
        stack.leave_scope();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.current_defaults().tuning_overrides().min_samples, Some(5));
    }

    #[test]
    fn test_root_is_never_popped() {
        let mut stack: ConfigStack<(), ()> = ConfigStack::new(Options::new());
        stack.leave_scope();
        stack.leave_scope();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.current_prefix(), "");
    }
}
