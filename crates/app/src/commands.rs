//! Named write commands of the current deployment generation.

use std::collections::HashMap;
use std::sync::Arc;

use homectl_domain::error::{DeploymentError, HomectlError, NotFoundError};

use crate::ports::ExecutableCommand;

/// Lookup of write commands by name, handed to processors on start.
///
/// Cheap to clone; all clones share the same command table.
#[derive(Clone, Default)]
pub struct CommandFacade {
    commands: Arc<HashMap<String, Arc<dyn ExecutableCommand>>>,
}

impl CommandFacade {
    /// Create a builder for constructing a [`CommandFacade`].
    #[must_use]
    pub fn builder() -> CommandFacadeBuilder {
        CommandFacadeBuilder::default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Send the named command.
    ///
    /// # Errors
    ///
    /// Returns [`HomectlError::NotFound`] when no command has that name.
    pub async fn execute(&self, name: &str) -> Result<(), HomectlError> {
        let command = self.commands.get(name).ok_or_else(|| NotFoundError {
            entity: "Command",
            id: name.to_string(),
        })?;
        tracing::debug!(command = name, "sending command");
        command.send().await;
        Ok(())
    }
}

impl std::fmt::Debug for CommandFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("CommandFacade").field("commands", &names).finish()
    }
}

/// Step-by-step builder for [`CommandFacade`].
#[derive(Default)]
pub struct CommandFacadeBuilder {
    commands: HashMap<String, Arc<dyn ExecutableCommand>>,
    duplicate: Option<String>,
}

impl CommandFacadeBuilder {
    #[must_use]
    pub fn command(mut self, name: impl Into<String>, command: Arc<dyn ExecutableCommand>) -> Self {
        let name = name.into();
        if self.commands.contains_key(&name) {
            self.duplicate.get_or_insert(name);
        } else {
            self.commands.insert(name, command);
        }
        self
    }

    /// Consume the builder and return a [`CommandFacade`].
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentError::DuplicateCommand`] for the first name that
    /// was added twice.
    pub fn build(self) -> Result<CommandFacade, DeploymentError> {
        if let Some(name) = self.duplicate {
            return Err(DeploymentError::DuplicateCommand(name));
        }
        Ok(CommandFacade {
            commands: Arc::new(self.commands),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct CountingCommand {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl ExecutableCommand for CountingCommand {
        async fn send(&self) {
            self.sent.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn should_send_named_command() {
        let heater = Arc::new(CountingCommand::default());
        let facade = CommandFacade::builder()
            .command("heater_on", heater.clone())
            .build()
            .unwrap();

        facade.execute("heater_on").await.unwrap();

        assert_eq!(heater.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_return_not_found_when_command_is_unknown() {
        let facade = CommandFacade::default();
        let err = facade.execute("missing").await.unwrap_err();
        assert!(matches!(err, HomectlError::NotFound(ref inner) if inner.id == "missing"));
    }

    #[test]
    fn should_reject_duplicate_command_names() {
        let result = CommandFacade::builder()
            .command("a", Arc::new(CountingCommand::default()))
            .command("a", Arc::new(CountingCommand::default()))
            .build();
        assert_eq!(
            result.unwrap_err(),
            DeploymentError::DuplicateCommand("a".to_string())
        );
    }
}
