//! Rule engine processor: keeps the latest event of every sensor as a fact
//! in a [`RuleSession`] and fires the rules on every push.
//!
//! Rule definitions are `*.toml` files in a directory, loaded when the chain
//! starts. Each file is compiled on its own: a file with any error is logged
//! and left out, the valid ones are merged into a single rule base.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use homectl_domain::error::{DeploymentError, HomectlError};
use homectl_domain::event::Event;
use homectl_domain::id::SensorId;
use homectl_domain::rule::{RuleAction, RuleBase, RuleFile};

use crate::commands::CommandFacade;
use crate::ports::{FactHandle, Firing, RuleSession};
use crate::processor::{EventContext, EventProcessor, LifeCycleContext};
use crate::rule_session::InMemoryRuleSession;

/// Extension of rule definition files.
pub const RULE_FILE_EXTENSION: &str = "toml";

/// Builds a session around a compiled rule base.
pub type SessionFactory = Box<dyn Fn(RuleBase) -> Box<dyn RuleSession> + Send + Sync>;

struct Runtime {
    session: Box<dyn RuleSession>,
    sources: HashMap<SensorId, FactHandle>,
    commands: CommandFacade,
}

/// Event processor evaluating rule definitions.
pub struct RuleEngine {
    rules_dir: PathBuf,
    globals: BTreeMap<String, String>,
    factory: SessionFactory,
    runtime: Mutex<Option<Runtime>>,
}

impl RuleEngine {
    /// Engine loading its rules from `rules_dir`, backed by an
    /// [`InMemoryRuleSession`].
    #[must_use]
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
            globals: BTreeMap::new(),
            factory: Box::new(|base: RuleBase| -> Box<dyn RuleSession> {
                Box::new(InMemoryRuleSession::new(base))
            }),
            runtime: Mutex::new(None),
        }
    }

    /// Use another rule session implementation.
    #[must_use]
    pub fn with_session_factory(mut self, factory: SessionFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Global set on every new session.
    #[must_use]
    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.globals.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_globals(mut self, globals: impl IntoIterator<Item = (String, String)>) -> Self {
        self.globals.extend(globals);
        self
    }

    #[must_use]
    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Whether rules are loaded and events are evaluated.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of live facts in the session, zero when idle.
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |runtime| runtime.session.fact_count())
    }

    /// Replace the fact of the event's source and fire the rules.
    ///
    /// Pushing the very same event instance again fires without touching
    /// the facts.
    fn evaluate(&self, event: &Arc<Event>) -> Option<(Vec<Firing>, CommandFacade)> {
        let mut guard = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        let runtime = guard.as_mut()?;
        if !runtime.session.contains(event) {
            let source = event.source_id();
            if let Some(previous) = runtime.sources.remove(&source) {
                runtime.session.retract(previous);
            }
            let handle = runtime.session.insert(Arc::clone(event));
            runtime.sources.insert(source, handle);
        }
        tracing::trace!(facts = runtime.session.fact_count(), "rule facts updated");
        Some((runtime.session.fire_all_rules(), runtime.commands.clone()))
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules_dir", &self.rules_dir)
            .field("globals", &self.globals)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventProcessor for RuleEngine {
    fn name(&self) -> &str {
        "rule-engine"
    }

    async fn start(&self, ctx: &LifeCycleContext) -> Result<(), HomectlError> {
        let commands = ctx.commands().clone();
        let rule_base = load_rule_base(&self.rules_dir, |name| commands.contains(name)).await?;
        let mut guard = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        if rule_base.is_empty() {
            tracing::info!(dir = %self.rules_dir.display(), "no rule definitions, rule engine idle");
            *guard = None;
            return Ok(());
        }
        let rules = rule_base.len();
        let mut session = (self.factory)(rule_base);
        for (name, value) in &self.globals {
            session.set_global(name, value.clone());
        }
        *guard = Some(Runtime {
            session,
            sources: HashMap::new(),
            commands,
        });
        tracing::info!(rules, globals = self.globals.len(), "rule engine ready");
        Ok(())
    }

    async fn push(&self, ctx: &mut EventContext) -> Result<(), HomectlError> {
        let Some((firings, commands)) = self.evaluate(ctx.event()) else {
            return Ok(());
        };
        for firing in firings {
            tracing::debug!(rule = %firing.rule, "rule fired");
            for action in &firing.actions {
                match action {
                    RuleAction::Execute { command } => {
                        if let Err(err) = commands.execute(command).await {
                            tracing::warn!(
                                rule = %firing.rule,
                                command = %command,
                                error = ?err,
                                "rule action failed"
                            );
                        }
                    }
                    RuleAction::Log { message } => {
                        tracing::info!(rule = %firing.rule, "{message}");
                    }
                }
            }
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), HomectlError> {
        let previous = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = previous {
            tracing::info!(facts = runtime.session.fact_count(), "rule session disposed");
        }
        Ok(())
    }
}

/// Load and compile every rule file of a directory, in file name order.
///
/// Files that cannot be read, parsed or validated are logged and skipped.
///
/// # Errors
///
/// Returns [`DeploymentError::RulesDirectory`] when the directory itself
/// cannot be listed.
pub async fn load_rule_base(
    dir: &Path,
    known_command: impl Fn(&str) -> bool,
) -> Result<RuleBase, HomectlError> {
    let unreadable = |err: std::io::Error| DeploymentError::RulesDirectory {
        path: dir.display().to_string(),
        kind: err.kind(),
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == RULE_FILE_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();

    let mut rule_base = RuleBase::default();
    for path in files {
        let Some(compiled) = compile_file(&path, &known_command).await else {
            continue;
        };
        let count = compiled.len();
        match rule_base.merge(compiled) {
            Ok(()) => tracing::info!(file = %path.display(), rules = count, "rule file loaded"),
            Err(err) => tracing::error!(file = %path.display(), %err, "rule file rejected"),
        }
    }
    Ok(rule_base)
}

async fn compile_file(path: &Path, known_command: impl Fn(&str) -> bool) -> Option<RuleBase> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) => {
            tracing::error!(file = %path.display(), %err, "unable to read rule file");
            return None;
        }
    };
    let file: RuleFile = match toml::from_str(&content) {
        Ok(file) => file,
        Err(err) => {
            tracing::error!(file = %path.display(), %err, "unable to parse rule file");
            return None;
        }
    };
    match RuleBase::compile(file, known_command) {
        Ok(compiled) => Some(compiled),
        Err(errors) => {
            for err in &errors {
                tracing::error!(file = %path.display(), %err, "invalid rule");
            }
            None
        }
    }
}
