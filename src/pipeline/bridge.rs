//! Thread boundary between transports and the pipeline owner.
//!
//! Transport threads (serial reader, BLE notification handler, replay) hold a
//! cloneable [`FrameSender`]. The thread that owns the [`PipelineBridge`]
//! applies frames and control commands in arrival order, so the pipeline
//! never needs a lock.

use super::PowerPipeline;
use crate::error::{PowerOsdError, Result};
use crate::protocol::RawFrame;
use crate::types::Sample;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::Duration;

/// Messages sent from transports and UI actions to the pipeline owner.
#[derive(Debug, Clone)]
pub enum PipelineCommand {
    /// A raw frame from a transport.
    Frame(RawFrame),
    /// Clear the history and energy total.
    ResetHistory,
    /// Capture the newest current as the baseline offset.
    SetBaseCurrent,
    /// Zero the baseline offset.
    ResetBaseCurrent,
    /// Resize the history.
    SetCapacity(usize),
    /// Stop processing.
    Shutdown,
}

/// Channel capacity for commands.
/// Meters send at most a few readings per second; 1024 covers minutes of
/// backlog.
const CMD_CHANNEL_CAPACITY: usize = 1024;

/// Maximum messages applied by one [`PipelineBridge::drain`] call.
const MAX_DRAIN_PER_TICK: usize = 256;

/// Transport-side handle.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: Sender<PipelineCommand>,
}

impl FrameSender {
    /// Queue a frame, blocking while the channel is full.
    pub fn send_frame(&self, frame: RawFrame) -> Result<()> {
        self.send(PipelineCommand::Frame(frame))
    }

    /// Queue a frame without blocking. Returns false if the frame was not queued.
    pub fn try_send_frame(&self, frame: RawFrame) -> bool {
        match self.tx.try_send(PipelineCommand::Frame(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Pipeline channel full, dropping frame");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn send(&self, cmd: PipelineCommand) -> Result<()> {
        self.tx
            .send(cmd)
            .map_err(|_| PowerOsdError::Channel("pipeline receiver dropped".to_string()))
    }

    pub fn reset_history(&self) -> Result<()> {
        self.send(PipelineCommand::ResetHistory)
    }

    pub fn set_base_current(&self) -> Result<()> {
        self.send(PipelineCommand::SetBaseCurrent)
    }

    pub fn reset_base_current(&self) -> Result<()> {
        self.send(PipelineCommand::ResetBaseCurrent)
    }

    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        self.send(PipelineCommand::SetCapacity(capacity))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(PipelineCommand::Shutdown)
    }
}

/// Result of applying one command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Applied {
    /// A frame was ingested; carries the sample pushed to the history, if any
    Frame(Option<Sample>),
    /// A control command was applied
    Control,
    /// Shutdown was requested
    Shutdown,
}

/// Pipeline-owner side of the channel.
pub struct PipelineBridge {
    pipeline: PowerPipeline,
    cmd_rx: Receiver<PipelineCommand>,
    shutdown: bool,
}

impl PipelineBridge {
    /// Create a bridge around a pipeline and the sender for transports.
    pub fn new(pipeline: PowerPipeline) -> (Self, FrameSender) {
        let (tx, cmd_rx) = bounded(CMD_CHANNEL_CAPACITY);
        (
            Self {
                pipeline,
                cmd_rx,
                shutdown: false,
            },
            FrameSender { tx },
        )
    }

    pub fn pipeline(&self) -> &PowerPipeline {
        &self.pipeline
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Apply pending commands without blocking.
    ///
    /// Applies at most a fixed number of commands per call so a UI tick
    /// stays bounded. Returns the samples pushed to the history.
    pub fn drain(&mut self) -> Vec<Sample> {
        let mut pushed = Vec::new();
        for _ in 0..MAX_DRAIN_PER_TICK {
            if self.shutdown {
                break;
            }
            let Ok(cmd) = self.cmd_rx.try_recv() else {
                break;
            };
            if let Applied::Frame(Some(sample)) = self.apply(cmd) {
                pushed.push(sample);
            }
        }
        pushed
    }

    /// Block and apply commands until shutdown or until every sender is dropped.
    ///
    /// `on_sample` runs for every sample pushed to the history.
    pub fn run_until_shutdown<F>(&mut self, mut on_sample: F)
    where
        F: FnMut(&PowerPipeline, &Sample),
    {
        while !self.shutdown {
            match self.cmd_rx.recv_timeout(Duration::from_millis(500)) {
                Ok(cmd) => {
                    if let Applied::Frame(Some(sample)) = self.apply(cmd) {
                        on_sample(&self.pipeline, &sample);
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("All frame senders dropped");
                    break;
                }
            }
        }
    }

    /// Apply a single command to the pipeline.
    pub fn apply(&mut self, cmd: PipelineCommand) -> Applied {
        match cmd {
            PipelineCommand::Frame(frame) => Applied::Frame(self.pipeline.ingest(frame)),
            PipelineCommand::ResetHistory => {
                self.pipeline.reset_history();
                Applied::Control
            }
            PipelineCommand::SetBaseCurrent => {
                self.pipeline.set_base_current();
                Applied::Control
            }
            PipelineCommand::ResetBaseCurrent => {
                self.pipeline.reset_base_current();
                Applied::Control
            }
            PipelineCommand::SetCapacity(capacity) => {
                if let Err(e) = self.pipeline.set_capacity(capacity) {
                    tracing::warn!("Ignoring capacity change: {}", e);
                }
                Applied::Control
            }
            PipelineCommand::Shutdown => {
                self.shutdown = true;
                Applied::Shutdown
            }
        }
    }
}
