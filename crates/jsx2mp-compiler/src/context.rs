use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Ordered set of names; insertion order is first-reference order.
pub type CaptureSet = IndexSet<String>;

/// How names bound by an inner loop flow into the enclosing loop's object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Inner loops' item/index and captures are merged into every enclosing
    /// loop, so nested directives need no scoped data inheritance in the
    /// host runtime.
    #[default]
    Flatten,
    /// Lexical scoping: an enclosing loop only carries names visible in its
    /// own scope.
    Scoped,
}

impl std::str::FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flatten" => Ok(MergePolicy::Flatten),
            "scoped" => Ok(MergePolicy::Scoped),
            other => Err(format!("unknown merge policy `{other}` (expected flatten or scoped)")),
        }
    }
}

/// One enclosing iteration during the walk.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopFrame {
    pub item: String,
    pub index: String,
    /// Names the callback body declares next to its return, visible to the
    /// returned markup.
    pub locals: IndexSet<String>,
    /// Filled in once the frame's body has been analyzed.
    pub captures: CaptureSet,
    /// Item/index names bound by finished inner loops, outermost first.
    pub inner_bindings: IndexSet<String>,
    /// Names finished inner loops captured but do not bind themselves.
    pub inner_captures: CaptureSet,
}

impl LoopFrame {
    pub fn new(item: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            index: index.into(),
            locals: IndexSet::new(),
            captures: CaptureSet::new(),
            inner_bindings: IndexSet::new(),
            inner_captures: CaptureSet::new(),
        }
    }

    /// `true` if `name` is this frame's own item, index or local.
    pub fn binds(&self, name: &str) -> bool {
        self.item == name || self.index == name || self.locals.contains(name)
    }
}

/// Chain of iterations enclosing the node currently being walked.
#[derive(Debug, Default)]
pub struct LoopContextStack {
    frames: Vec<LoopFrame>,
}

impl LoopContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Open a frame and return it so the caller can record its locals.
    pub fn push(&mut self, item: impl Into<String>, index: impl Into<String>) -> &mut LoopFrame {
        self.frames.push(LoopFrame::new(item, index));
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn pop(&mut self) -> Option<LoopFrame> {
        self.frames.pop()
    }

    /// Item, index and local names of every frame on the stack, outermost
    /// first.
    pub fn bindings(&self) -> IndexSet<String> {
        self.frames
            .iter()
            .flat_map(|f| {
                [&f.item, &f.index]
                    .into_iter()
                    .chain(f.locals.iter())
                    .cloned()
            })
            .collect()
    }

    /// Hand a finished frame's bindings and unresolved captures to its
    /// parent, if any.
    pub fn report(&mut self, finished: &LoopFrame) {
        let Some(parent) = self.frames.last_mut() else {
            return;
        };
        parent.inner_bindings.insert(finished.item.clone());
        parent.inner_bindings.insert(finished.index.clone());
        parent
            .inner_bindings
            .extend(finished.inner_bindings.iter().cloned());
        parent.inner_captures.extend(
            finished
                .captures
                .iter()
                .filter(|name| !finished.binds(name))
                .cloned(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> IndexSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bindings_outermost_first_without_duplicates() {
        let mut stack = LoopContextStack::new();
        stack.push("l1", "index");
        stack.push("l2", "index");
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.bindings(), set(&["l1", "index", "l2"]));
    }

    #[test]
    fn test_report_merges_into_parent() {
        let mut stack = LoopContextStack::new();
        stack.push("row", "r");
        stack.push("cell", "c");
        let mut inner = stack.pop().unwrap();
        inner.captures = set(&["cell", "row"]);
        stack.report(&inner);

        let outer = stack.pop().unwrap();
        assert_eq!(outer.inner_bindings, set(&["cell", "c"]));
        assert_eq!(outer.inner_captures, set(&["row"]));
        assert!(outer.binds("row"));
        assert!(!outer.binds("cell"));
    }

    #[test]
    fn test_report_without_parent_is_noop() {
        let mut stack = LoopContextStack::new();
        stack.report(&LoopFrame::new("item", "index"));
        assert_eq!(stack.depth(), 0);
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_locals_bind_but_do_not_travel_outward() {
        let mut stack = LoopContextStack::new();
        stack.push("row", "r");
        stack.push("cell", "c").locals.insert("label".to_string());
        assert_eq!(stack.bindings(), set(&["row", "r", "cell", "c", "label"]));

        let mut inner = stack.pop().unwrap();
        assert!(inner.binds("label"));
        inner.captures = set(&["label", "row"]);
        stack.report(&inner);

        let outer = stack.pop().unwrap();
        assert_eq!(outer.inner_bindings, set(&["cell", "c"]));
        assert_eq!(outer.inner_captures, set(&["row"]));
    }

    #[test]
    fn test_merge_policy_parse() {
        assert_eq!("flatten".parse::<MergePolicy>(), Ok(MergePolicy::Flatten));
        assert_eq!("Scoped".parse::<MergePolicy>(), Ok(MergePolicy::Scoped));
        assert!("deep".parse::<MergePolicy>().is_err());
        assert_eq!(MergePolicy::default(), MergePolicy::Flatten);
    }
}
