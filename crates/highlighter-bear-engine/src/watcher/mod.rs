//! # Change Watcher
//!
//! Owns the engine lifecycle for one document root and keeps annotations in
//! step with a changing tree.
//!
//! ```text
//!          Start (rules apply)            initial full scan done
//!   Idle ───────────────────► Scanning ─────────────────────────► Watching
//!     │  Start (no rules)                      ▲   RulesChanged       │
//!     └──────────────► Stopped ◄───────────────┼──────────────────────┘
//!                        │   Reload            │   (rules still apply)
//!                        └──► Idle ──► ...     └── clear + rescan
//! ```
//!
//! The watcher is pure state-machine logic: the host delivers [`Event`]s
//! (including the tree's drained mutation records) through
//! [`ChangeWatcher::handle`] and drives timers through
//! [`ChangeWatcher::tick`] with its own notion of "now". Nothing here blocks
//! or spawns; every call runs to completion.
//!
//! ## Batching
//!
//! Added subtrees are not scanned when reported. Their containers go into a
//! pending set and a debounce timer is (re)armed; when it fires, every
//! pending container that is still attached is scanned once. Bursts of
//! mutations therefore cost one scan per quiet period.
//!
//! ## Feedback
//!
//! Annotating a leaf is itself a mutation and comes back as an event. The
//! added nodes are marker-carrying spans and plain text the annotator has
//! recorded as already searched, so none of them is queued and the loop
//! dies out. Full-tree scans discard their own mutation records outright,
//! since the pass already covered the whole tree.

pub mod timers;

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::annotate::Annotator;
use crate::highlight::Highlighter;
use crate::io::RuleSource;
use crate::rules::applicable_rules;
use crate::scan::{ScanOptions, container_for_added};
use crate::tree::{Document, MutationRecord, NodeId};

pub use timers::{TimerKind, TimerQueue};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);
pub const DEFAULT_RETRY_DELAYS: [Duration; 2] =
    [Duration::from_millis(1000), Duration::from_millis(3000)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Quiet period before pending containers are scanned.
    pub debounce: Duration,
    /// Delays after start at which the whole tree is cleared and rescanned.
    pub retry_delays: Vec<Duration>,
    pub scan: ScanOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
            scan: ScanOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Scanning,
    Watching,
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Load rules and perform the initial scan. Only honoured in `Idle`.
    Start,
    /// Child-list changes drained from the tree.
    Mutations(Vec<MutationRecord>),
    /// The stored rule set changed.
    RulesChanged,
    /// Tear down and start over from `Idle`, whatever the current state.
    Reload,
}

/// Running totals, mostly for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherStats {
    pub full_scans: usize,
    pub batch_scans: usize,
    pub containers_scanned: usize,
    pub containers_skipped: usize,
    pub spans_created: usize,
}

pub struct ChangeWatcher {
    location: String,
    options: EngineOptions,
    annotator: Annotator,
    highlighter: Highlighter,
    state: WatcherState,
    observing: bool,
    pending: BTreeSet<NodeId>,
    timers: TimerQueue,
    stats: WatcherStats,
}

impl ChangeWatcher {
    pub fn new(location: &str, options: EngineOptions) -> Self {
        let annotator = Annotator::new(&options.scan.marker_class);
        Self {
            location: location.to_string(),
            options,
            annotator,
            highlighter: Highlighter::default(),
            state: WatcherState::Idle,
            observing: false,
            pending: BTreeSet::new(),
            timers: TimerQueue::default(),
            stats: WatcherStats::default(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Whether mutation events are currently acted upon.
    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> WatcherStats {
        self.stats
    }

    pub fn annotator(&self) -> &Annotator {
        &self.annotator
    }

    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    /// When the host should next call [`Self::tick`], if ever.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn handle(
        &mut self,
        doc: &mut Document,
        rules: &dyn RuleSource,
        event: Event,
        now: Instant,
    ) {
        match event {
            Event::Start => match self.state {
                WatcherState::Idle => self.start(doc, rules, now),
                state => log::debug!("Ignoring start while {state:?}"),
            },
            Event::Mutations(records) => self.on_mutations(doc, &records, now),
            Event::RulesChanged => match self.state {
                WatcherState::Watching | WatcherState::Scanning => self.reload_rules(doc, rules),
                state => log::debug!("Ignoring rule change while {state:?}"),
            },
            Event::Reload => {
                log::info!("Reloading highlighter for {}", self.location);
                self.dispose(doc);
                self.state = WatcherState::Idle;
                self.start(doc, rules, now);
            }
        }
    }

    /// Fires every timer due at `now`. Returns how many fired.
    pub fn tick(&mut self, doc: &mut Document, now: Instant) -> usize {
        let mut fired = 0;
        while let Some(kind) = self.timers.pop_due(now) {
            fired += 1;
            match kind {
                TimerKind::Debounce => self.process_pending(doc),
                TimerKind::Retry(attempt) if self.state == WatcherState::Watching => {
                    log::info!("Rescanning for late content (retry {})", attempt + 1);
                    self.full_scan(doc);
                }
                TimerKind::Retry(_) => {}
            }
        }
        fired
    }

    /// Removes all annotations and stops observing.
    pub fn dispose(&mut self, doc: &mut Document) {
        let root = doc.root();
        let cleared = self.annotator.clear(doc, root);
        log::debug!("Cleared {cleared} annotations");
        self.stop();
    }

    fn start(&mut self, doc: &mut Document, rules: &dyn RuleSource, now: Instant) {
        log::info!("Initializing highlighter for {}", self.location);
        if self.load(rules) == 0 {
            log::info!("No matching rules for {}", self.location);
            self.stop();
            return;
        }
        self.scan_and_watch(doc);
        for (attempt, delay) in self.options.retry_delays.iter().enumerate() {
            self.timers.schedule(TimerKind::Retry(attempt), now + *delay);
        }
    }

    fn reload_rules(&mut self, doc: &mut Document, rules: &dyn RuleSource) {
        log::info!("Rules changed, reapplying");
        self.cancel_batch();
        let root = doc.root();
        self.annotator.clear(doc, root);
        if self.load(rules) == 0 {
            log::info!("No matching rules left for {}", self.location);
            self.stop();
            return;
        }
        self.scan_and_watch(doc);
    }

    /// Loads rules and compiles the applicable ones. Returns how many apply.
    fn load(&mut self, rules: &dyn RuleSource) -> usize {
        let rules = rules.load_rules().unwrap_or_else(|e| {
            log::warn!("Failed to load rules: {e}");
            Vec::new()
        });
        log::debug!("Loaded {} rules", rules.len());
        let applicable = applicable_rules(&self.location, &rules);
        self.highlighter = Highlighter::from_rules(applicable.iter().copied());
        applicable.len()
    }

    fn scan_and_watch(&mut self, doc: &mut Document) {
        self.state = WatcherState::Scanning;
        self.full_scan(doc);
        self.state = WatcherState::Watching;
        if !self.observing {
            self.observing = true;
            log::debug!("Observing mutations under {:?}", doc.root());
        }
    }

    fn full_scan(&mut self, doc: &mut Document) {
        let root = doc.root();
        doc.take_mutations();
        self.cancel_batch();
        self.annotator.clear(doc, root);
        let scan = self.highlighter.highlight_subtree(
            doc,
            root,
            &self.options.scan,
            &mut self.annotator,
        );
        doc.take_mutations();
        self.stats.full_scans += 1;
        self.stats.spans_created += scan.spans_created;
        log::debug!("Full scan created {} spans", scan.spans_created);
    }

    fn on_mutations(&mut self, doc: &Document, records: &[MutationRecord], now: Instant) {
        if !self.observing {
            return;
        }
        let mut queued = false;
        for node in records.iter().flat_map(|r| r.added.iter().copied()) {
            if self.annotator.is_searched(node) {
                continue;
            }
            if let Some(container) = container_for_added(doc, node, &self.options.scan) {
                self.pending.insert(container);
                queued = true;
            }
        }
        if queued {
            self.timers
                .schedule(TimerKind::Debounce, now + self.options.debounce);
        }
    }

    fn process_pending(&mut self, doc: &mut Document) {
        let pending = std::mem::take(&mut self.pending);
        log::debug!("Processing {} pending containers", pending.len());
        for container in pending {
            if !doc.is_attached(container) {
                self.stats.containers_skipped += 1;
                continue;
            }
            let scan = self.highlighter.highlight_subtree(
                doc,
                container,
                &self.options.scan,
                &mut self.annotator,
            );
            self.stats.containers_scanned += 1;
            self.stats.spans_created += scan.spans_created;
        }
        self.stats.batch_scans += 1;
    }

    fn cancel_batch(&mut self) {
        self.timers.cancel(TimerKind::Debounce);
        self.pending.clear();
    }

    fn stop(&mut self) {
        if self.observing {
            log::debug!("Disconnecting mutation observation");
        }
        self.observing = false;
        self.pending.clear();
        self.timers.cancel_all();
        self.state = WatcherState::Stopped;
    }
}
