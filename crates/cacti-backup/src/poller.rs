//! Stopping and restarting the background poller around a run.
//!

use shared::Failure;
use tracing::{info, warn};

use crate::{
    collaborator::{CollaboratorError, Collaborators, ServiceAction},
    config::{Poller, PollerPolicy},
    context::Context,
};

/// Stop the poller.
///
/// Under [`PollerPolicy::BestEffort`] a failure is logged and swallowed, under
/// [`PollerPolicy::FailFast`] it is returned and the caller must restart the poller without
/// touching any data.
pub fn stop<C: Collaborators>(
    collaborators: &mut C,
    poller: &Poller,
    context: &mut Context,
) -> Result<(), CollaboratorError> {
    context.current_context = "Stop Poller";
    info!("{context}Stopping {}", poller.service);

    match collaborators.service(&poller.service, ServiceAction::Stop) {
        Ok(()) => {
            info!("{context}Stopped {}", poller.service);
            Ok(())
        }
        Err(error) => match poller.policy {
            PollerPolicy::BestEffort => {
                warn!(
                    "{context}Could not stop {}, continuing while it may still write: {error}",
                    poller.service
                );
                Ok(())
            }
            PollerPolicy::FailFast => Err(error),
        },
    }
}

/// Start the poller. Always attempted, a failure is only a warning.
pub fn start<C: Collaborators>(collaborators: &mut C, poller: &Poller, context: &mut Context) {
    context.current_context = "Start Poller";
    info!("{context}Starting {}", poller.service);

    let started = collaborators
        .service(&poller.service, ServiceAction::Start)
        .or_warn(&format!(
            "{context}Could not start {}, start it manually",
            poller.service
        ));

    if started.is_some() {
        info!("{context}Started {}", poller.service);
    }
}
