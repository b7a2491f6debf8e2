pub mod annotate;
pub mod highlight;
pub mod io;
pub mod matching;
pub mod rules;
pub mod scan;
pub mod tree;
pub mod watcher;


// Re-export key types for easier usage
pub use annotate::{AnnotatedSpan, Annotator, annotated_spans};
pub use highlight::{Highlighter, ScanStats};
pub use io::*;
pub use matching::{CompiledPattern, Match, resolve_overlaps};
pub use rules::{
    MatchPattern, PatternKind, Rule, RuleError, RuleSet, SpanStyle, applicable_rules, url_matches,
};
pub use scan::{ScanOptions, text_leaves};
pub use tree::{Document, MutationRecord, NodeId, TreeError};
pub use watcher::{ChangeWatcher, EngineOptions, Event, WatcherState, WatcherStats};
