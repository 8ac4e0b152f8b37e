//! Text rendering of a transition graph as a state diagram.
//!
//! Output grammar:
//!
//! ```text
//! stateDiagram-v2
//! direction TB
//! [*] --> FSMInit
//! FSMInit --> A
//! A --> B
//! B --> [*]
//! classDef highlight <style>
//! ```

use super::TransitionGraph;
use crate::config::Direction;
use crate::core::{Label, State};
use std::cell::{Cell, RefCell};

pub const DIAGRAM_KIND: &str = "stateDiagram-v2";
pub const HIGHLIGHT_STYLE: &str = "fill:#ffcc00,stroke:#333,stroke-width:2px";

const HIGHLIGHT_CLASS: &str = "highlight";
const MARKER: &str = "[*]";

/// Render `graph` in the given direction.
///
/// Edges out of Init come from the states whose enter set contains Init;
/// every other edge is one `canLeaveTo` entry. Terminate renders as `[*]`.
pub fn render<S: State>(graph: &TransitionGraph<S>, direction: Direction) -> String {
    let mut lines = vec![
        DIAGRAM_KIND.to_string(),
        format!("direction {direction}"),
        format!("{MARKER} --> {}", Label::INIT_NAME),
    ];

    for exit in graph.init_exits() {
        lines.push(format!("{} --> {exit}", Label::INIT_NAME));
    }

    for (name, config) in graph.iter() {
        for target in config.can_leave_to() {
            let to = match target {
                Label::Terminate => MARKER,
                other => other.as_str(),
            };
            lines.push(format!("{name} --> {to}"));
        }
    }

    lines.push(format!("classDef {HIGHLIGHT_CLASS} {HIGHLIGHT_STYLE}"));
    lines.join("\n")
}

/// Flag `label` by appending `:::highlight` to every line that starts
/// with it.
pub fn highlight(definition: &str, label: &str) -> String {
    let prefix = format!("{label} ");
    definition
        .lines()
        .map(|line| match line.strip_prefix(&prefix) {
            Some(rest) => format!("{label}:::{HIGHLIGHT_CLASS} {rest}"),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lazily rendered diagram, invalidated explicitly.
#[derive(Debug, Default)]
pub struct DiagramCache {
    direction: Cell<Direction>,
    cached: RefCell<Option<String>>,
}

impl DiagramCache {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction: Cell::new(direction),
            cached: RefCell::new(None),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction.get()
    }

    /// Change direction; the next read re-renders.
    pub fn set_direction(&self, direction: Direction) {
        self.direction.set(direction);
        self.invalidate();
    }

    pub fn invalidate(&self) {
        self.cached.borrow_mut().take();
    }

    pub fn is_cached(&self) -> bool {
        self.cached.borrow().is_some()
    }

    pub fn definition<S: State>(&self, graph: &TransitionGraph<S>, flagged: Option<&str>) -> String {
        let definition = self
            .cached
            .borrow_mut()
            .get_or_insert_with(|| render(graph, self.direction.get()))
            .clone();

        match flagged {
            Some(label) => highlight(&definition, label),
            None => definition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StateConfig;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        A,
        B,
        C,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::A => "A",
                Self::B => "B",
                Self::C => "C",
            }
        }
    }

    fn graph() -> TransitionGraph<TestState> {
        TransitionGraph::<TestState>::builder()
            .state("A", StateConfig::new().enter_from_init().leave_to("B"))
            .state("B", StateConfig::new().enter_from("A").leave_to("C"))
            .state("C", StateConfig::new().enter_from("B").leave_to_terminate())
            .build()
            .unwrap()
    }

    #[test]
    fn render_emits_exact_grammar() {
        let expected = [
            "stateDiagram-v2",
            "direction TB",
            "[*] --> FSMInit",
            "FSMInit --> A",
            "A --> B",
            "B --> C",
            "C --> [*]",
            "classDef highlight fill:#ffcc00,stroke:#333,stroke-width:2px",
        ]
        .join("\n");

        assert_eq!(render(&graph(), Direction::TB), expected);
    }

    #[test]
    fn highlight_marks_line_start_occurrences_only() {
        let text = highlight(&render(&graph(), Direction::LR), "B");

        assert!(text.contains("direction LR"));
        assert!(text.contains("A --> B\n"));
        assert!(text.contains("B:::highlight --> C"));
    }

    #[test]
    fn highlight_does_not_match_label_prefixes() {
        let text = highlight("AB --> C\nA --> B", "A");
        assert_eq!(text, "AB --> C\nA:::highlight --> B");
    }

    #[test]
    fn cache_is_reused_until_invalidated() {
        let graph = graph();
        let cache = DiagramCache::new(Direction::TB);
        assert!(!cache.is_cached());

        let first = cache.definition(&graph, None);
        assert!(cache.is_cached());
        assert!(first.contains("direction TB"));

        cache.set_direction(Direction::LR);
        assert!(!cache.is_cached());
        let second = cache.definition(&graph, Some("C"));
        assert!(second.contains("direction LR"));
        assert!(second.contains("C:::highlight --> [*]"));

        // highlighting never leaks into the cached text
        assert!(!cache.definition(&graph, None).contains(":::"));
    }
}
