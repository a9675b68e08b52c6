use std::sync::Arc;

use homectl_domain::event::Event;

use crate::commands::CommandFacade;

/// An event travelling through the processor chain.
#[derive(Debug, Clone)]
pub struct EventContext {
    event: Arc<Event>,
    terminated: bool,
}

impl EventContext {
    #[must_use]
    pub fn new(event: Event) -> Self {
        Self {
            event: Arc::new(event),
            terminated: false,
        }
    }

    /// The event; the same instance is seen by every processor.
    #[must_use]
    pub fn event(&self) -> &Arc<Event> {
        &self.event
    }

    /// Stop the event here: later processors are skipped and the status
    /// cache keeps its previous value.
    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    #[must_use]
    pub fn into_event(self) -> Arc<Event> {
        self.event
    }
}

/// What processors get when a deployment generation starts.
#[derive(Debug, Clone, Default)]
pub struct LifeCycleContext {
    commands: CommandFacade,
}

impl LifeCycleContext {
    #[must_use]
    pub fn new(commands: CommandFacade) -> Self {
        Self { commands }
    }

    /// Write commands of the generation.
    #[must_use]
    pub fn commands(&self) -> &CommandFacade {
        &self.commands
    }
}
