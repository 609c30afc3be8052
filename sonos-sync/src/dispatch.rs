//! Command dispatch middleware
//!
//! A command passes through up to two layers before it reaches the proxy:
//!
//! - `on_coordinator` redirects it to the addressed speaker's coordinator;
//! - `suppress` turns listed UPnP faults into [`CommandOutcome::Ignored`].
//!
//! Whatever is left over is logged with speaker and command context and
//! reported as [`CommandOutcome::Failed`]; nothing here returns `Err`.

use tracing::{error, trace, warn};

use sonos_api::{ApiError, Command, SpeakerId};

use crate::engine::EngineInner;
use crate::SyncError;

/// Result of sending one command
#[derive(Debug)]
pub enum CommandOutcome {
    Sent,
    /// The device reported a fault the command tolerates
    Ignored(u16),
    Failed(SyncError),
}

impl CommandOutcome {
    pub fn is_ok(&self) -> bool {
        !matches!(self, CommandOutcome::Failed(_))
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, CommandOutcome::Sent)
    }

    /// Keep the first failure of a command sequence
    pub fn and(self, next: CommandOutcome) -> CommandOutcome {
        match self {
            CommandOutcome::Failed(_) => self,
            _ => next,
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            CommandOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// A configured dispatch pipeline
pub(crate) struct Dispatcher<'a> {
    engine: &'a EngineInner,
    route_to_coordinator: bool,
    ignorable: &'a [u16],
}

impl<'a> Dispatcher<'a> {
    /// Send as addressed, report every fault
    pub(crate) fn new(engine: &'a EngineInner) -> Self {
        Self {
            engine,
            route_to_coordinator: false,
            ignorable: &[],
        }
    }

    /// Middleware picked from the command itself and the engine config
    pub(crate) fn for_command(engine: &'a EngineInner, command: &Command) -> Self {
        let mut dispatcher = Self::new(engine);
        if command.targets_coordinator() {
            dispatcher = dispatcher.on_coordinator();
        }
        if command.is_transport_control() {
            dispatcher = dispatcher.suppress(&engine.config.ignorable_fault_codes);
        }
        dispatcher
    }

    pub(crate) fn on_coordinator(mut self) -> Self {
        self.route_to_coordinator = true;
        self
    }

    pub(crate) fn suppress(mut self, codes: &'a [u16]) -> Self {
        self.ignorable = codes;
        self
    }

    /// Speaker the command will actually be sent to
    pub(crate) fn target(&self, speaker: &SpeakerId) -> SpeakerId {
        if self.route_to_coordinator {
            if let Some(coordinator) = self.engine.topology.effective_coordinator(speaker) {
                return coordinator;
            }
        }
        speaker.clone()
    }

    pub(crate) async fn send(&self, speaker: &SpeakerId, command: Command) -> CommandOutcome {
        let target = self.target(speaker);
        let name = command.name();
        if target != *speaker {
            trace!("Routing {} for {} to coordinator {}", name, speaker, target);
        }

        let call_target = target.clone();
        let result = self
            .engine
            .call(move |proxy| proxy.send_command(&call_target, &command))
            .await;

        match result {
            Ok(()) => CommandOutcome::Sent,
            Err(err) => {
                if let Some(api) = err.api().filter(|api| api.is_ignorable(self.ignorable)) {
                    let code = api.upnp_code().unwrap_or_default();
                    trace!("Ignoring UPnP error {} on {} for {}", code, name, target);
                    return CommandOutcome::Ignored(code);
                }
                match err.api() {
                    Some(ApiError::NotFound(what)) => {
                        warn!("{} on {} found no {}", name, target, what)
                    }
                    _ => error!("Error on {} with {}: {}", name, target, err),
                }
                CommandOutcome::Failed(err)
            }
        }
    }
}
