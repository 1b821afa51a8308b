//! Segment-by-segment delivery over a connection manager.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::job::{DeliveryJob, Destination, Pacing};
use crate::connection::{ConnectionError, ConnectionManager};
use crate::format::Renderer;

/// Delays between the segments of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub regular: Duration,
    pub extended: Duration,
}

impl PacingConfig {
    pub fn delay_for(&self, pacing: Pacing) -> Duration {
        match pacing {
            Pacing::Regular => self.regular,
            Pacing::Extended => self.extended,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            regular: Duration::from_secs(1),
            extended: Duration::from_secs(2),
        }
    }
}

/// Outcome of one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Neither the styled nor the plain command for a segment went through.
    #[error("segment {index} for {destination} could not be sent: {source}")]
    SegmentSendFailed {
        index: usize,
        destination: Destination,
        #[source]
        source: ConnectionError,
    },
}

/// Sends segments with a header on the first one and a pause between them.
#[derive(Clone)]
pub struct DeliveryPacer {
    connection: Arc<ConnectionManager>,
    renderer: Arc<dyn Renderer>,
    pacing: PacingConfig,
}

impl DeliveryPacer {
    pub fn new(
        connection: Arc<ConnectionManager>,
        renderer: Arc<dyn Renderer>,
        pacing: PacingConfig,
    ) -> Self {
        Self {
            connection,
            renderer,
            pacing,
        }
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// Deliver every segment of `job`; a failed segment does not stop the rest.
    pub async fn deliver(&self, job: &DeliveryJob) -> DeliveryReport {
        let delay = self.pacing.delay_for(job.pacing);
        let last = job.segments.len().saturating_sub(1);
        let mut report = DeliveryReport::default();

        for (index, segment) in job.segments.iter().enumerate() {
            match self.send_segment(index, segment, &job.destination).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(server = %self.connection.server(), error = %e, "dropping segment");
                }
            }
            if index < last {
                tokio::time::sleep(delay).await;
            }
        }
        report
    }

    /// Deliver `job` to `player` only, bypassing any queue.
    pub async fn deliver_private(&self, job: DeliveryJob, player: &str) -> DeliveryReport {
        let job = DeliveryJob {
            destination: Destination::Player(player.to_string()),
            ..job
        };
        self.deliver(&job).await
    }

    /// Send pre-rendered commands in order, stopping at the first failure.
    pub async fn deliver_sequence(
        &self,
        commands: &[String],
        delay: Duration,
    ) -> Result<(), DeliveryError> {
        for (index, command) in commands.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(delay).await;
            }
            self.connection
                .send(command)
                .await
                .map_err(|source| DeliveryError::SegmentSendFailed {
                    index,
                    destination: Destination::Broadcast,
                    source,
                })?;
        }
        Ok(())
    }

    async fn send_segment(
        &self,
        index: usize,
        text: &str,
        destination: &Destination,
    ) -> Result<(), DeliveryError> {
        let show_header = index == 0;
        let styled = self.renderer.render(text, show_header, destination);
        let Err(e) = self.connection.send(&styled).await else {
            return Ok(());
        };
        tracing::warn!(
            server = %self.connection.server(),
            error = %e,
            "styled message failed, falling back to plain text"
        );

        let plain = self.renderer.fallback(text, show_header, destination);
        self.connection
            .send(&plain)
            .await
            .map(|_| ())
            .map_err(|source| DeliveryError::SegmentSendFailed {
                index,
                destination: destination.clone(),
                source,
            })
    }
}
