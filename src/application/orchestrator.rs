// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Export Orchestrator
//!
//! Drives one export through
//! `Idle -> ExtractionStarting -> BothRunning -> {Draining, Aborting} -> Done`.
//!
//! Catalog work happens before any process exists, so failures there need
//! no cleanup. Once the extraction task is started, every exit path goes
//! through terminate-and-reap before the error is returned, and the
//! rendezvous channel is released last.

use crate::application::pipeline_composer::PipelineComposer;
use crate::domain::command::{DestinationTemplate, PipelineStage, StageCommand};
use crate::domain::entities::{ExportReport, ExportSpec, ExportStatus, TaskState};
use crate::domain::errors::{ExportError, Result};
use crate::domain::projection::{build_projection, build_statement};
use crate::infrastructure::process::{CancelToken, TaskHandle};
use crate::infrastructure::rendezvous::{await_channel, RendezvousChannel};
use crate::infrastructure::shell::require_executables;
use crate::ports::catalog_port::CatalogPort;
use crate::ports::codec_port::CodecPort;
use crate::ports::extraction_port::ExtractionPort;
use crate::ports::sink_port::SinkPort;
use chrono::{DateTime, Local};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Timing knobs for the task lifecycle.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub channel_poll_attempts: u32,
    pub channel_poll_interval: Duration,
    /// SIGTERM-to-SIGKILL grace when a task group must be stopped.
    pub termination_grace: Duration,
    pub task_poll_interval: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            channel_poll_attempts: 15,
            channel_poll_interval: Duration::from_millis(100),
            termination_grace: Duration::from_secs(5),
            task_poll_interval: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    ExtractionStarting,
    BothRunning,
    Draining,
    Aborting,
    Done,
}

fn advance(phase: &mut Phase, next: Phase) {
    debug!("Orchestrator {:?} -> {:?}", phase, next);
    *phase = next;
}

/// Runs exports end to end against the configured ports.
pub struct ExportOrchestrator {
    catalog: Arc<dyn CatalogPort>,
    extractor: Arc<dyn ExtractionPort>,
    sink: Arc<dyn SinkPort>,
    codec: Option<Arc<dyn CodecPort>>,
    composer: PipelineComposer,
    settings: OrchestratorSettings,
    cancel: CancelToken,
}

impl ExportOrchestrator {
    pub fn new(
        catalog: Arc<dyn CatalogPort>,
        extractor: Arc<dyn ExtractionPort>,
        sink: Arc<dyn SinkPort>,
        codec: Option<Arc<dyn CodecPort>>,
        composer: PipelineComposer,
        settings: OrchestratorSettings,
        cancel: CancelToken,
    ) -> Self {
        Self {
            catalog,
            extractor,
            sink,
            codec,
            composer,
            settings,
            cancel,
        }
    }

    /// Exports `spec.table` to `spec.destination`.
    ///
    /// Returns a `Skipped` report without starting any task when the
    /// catalog reports an empty table.
    pub fn run(&self, spec: &ExportSpec) -> Result<ExportReport> {
        let started_at = Local::now();
        let timer = Instant::now();
        info!(
            "Exporting {} as {} ({}) to {}",
            spec.table, spec.format, spec.compression, spec.destination
        );

        match self.catalog.estimated_data_bytes(&spec.table) {
            Ok(0) => {
                info!("{} has no data, skipping export", spec.table);
                return Ok(report(spec, ExportStatus::Skipped, started_at, timer));
            }
            Ok(bytes) => debug!("{} holds about {} bytes", spec.table, bytes),
            Err(e) => warn!(
                "Could not estimate size of {}, exporting anyway: {}",
                spec.table, e
            ),
        }

        let columns = self.catalog.columns_of(&spec.table)?;
        let plan = build_projection(&columns, spec.format, spec.prevent_precision_loss);
        let statement = build_statement(&spec.table, spec.format, &plan);
        debug!("Extraction statement: {}", statement);

        let codec = self.codec.as_deref();
        let extension = spec.file_extension(codec.map(|c| c.extension()));
        let destination = DestinationTemplate::new(&spec.destination, &extension);

        let channel = RendezvousChannel::create(&extension)?;
        let outcome = self.transfer(
            spec,
            plan.masked_dots,
            &statement,
            &destination,
            &channel,
        );
        let released = channel.close();
        outcome?;
        released?;

        let report = report(spec, ExportStatus::Succeeded, started_at, timer);
        info!(
            "Export of {} finished in {:.2}s",
            spec.table, report.duration_secs
        );
        Ok(report)
    }

    fn transfer(
        &self,
        spec: &ExportSpec,
        masked_dots: bool,
        statement: &str,
        destination: &DestinationTemplate,
        channel: &RendezvousChannel,
    ) -> Result<()> {
        let extraction = self
            .extractor
            .extraction_command(statement, spec.format, channel.path())?;
        let stages = self.composer.compose(
            spec,
            masked_dots,
            channel.path(),
            destination,
            self.sink.as_ref(),
            self.codec.as_deref(),
        )?;

        require_executables(
            extraction
                .programs()
                .into_iter()
                .chain(stages.iter().flat_map(|s| s.command.programs())),
        )?;
        self.sink.prepare(destination)?;
        debug!(
            "Writing chunks to {} via {} sink",
            destination,
            self.sink.name()
        );

        pump(
            &extraction,
            &stages,
            channel.path(),
            &self.settings,
            &self.cancel,
        )
    }
}

fn report(
    spec: &ExportSpec,
    status: ExportStatus,
    started_at: DateTime<Local>,
    timer: Instant,
) -> ExportReport {
    ExportReport {
        table: spec.table.clone(),
        format: spec.format,
        compression: spec.compression,
        destination: spec.destination.clone(),
        status,
        started_at: started_at.to_rfc3339(),
        completed_at: Local::now().to_rfc3339(),
        duration_secs: timer.elapsed().as_secs_f64(),
    }
}

/// Runs the extraction task and the pipeline task against `channel`.
///
/// Extraction is started first and waited on first. A failed extraction
/// kills the pipeline, which can never see a clean end of stream. A
/// failed pipeline is reported as is.
pub fn pump(
    extraction: &StageCommand,
    stages: &[PipelineStage],
    channel: &Path,
    settings: &OrchestratorSettings,
    cancel: &CancelToken,
) -> Result<()> {
    let mut phase = Phase::Idle;
    if cancel.is_cancelled() {
        return Err(ExportError::Cancelled);
    }

    advance(&mut phase, Phase::ExtractionStarting);
    let mut extractor = TaskHandle::spawn_command("Extraction", extraction)?;

    if let Err(e) = await_channel(
        channel,
        settings.channel_poll_attempts,
        settings.channel_poll_interval,
    ) {
        advance(&mut phase, Phase::Aborting);
        extractor.terminate(settings.termination_grace);
        return Err(e);
    }

    let mut pipeline = match TaskHandle::spawn_pipeline("Pipeline", stages) {
        Ok(task) => task,
        Err(e) => {
            advance(&mut phase, Phase::Aborting);
            extractor.terminate(settings.termination_grace);
            return Err(e);
        }
    };
    advance(&mut phase, Phase::BothRunning);

    match extractor.wait(settings.task_poll_interval, cancel)? {
        None => {
            advance(&mut phase, Phase::Aborting);
            info!("Cancellation requested, stopping both tasks");
            extractor.terminate(settings.termination_grace);
            pipeline.terminate(settings.termination_grace);
            return Err(ExportError::Cancelled);
        }
        Some(TaskState::Failed(code)) => {
            advance(&mut phase, Phase::Aborting);
            // A stage that died first broke the channel under the extractor.
            let stage_code = pipeline.failed_stage_code().unwrap_or_else(|e| {
                warn!("Could not poll pipeline task: {}", e);
                None
            });
            pipeline.terminate(settings.termination_grace);
            return Err(match stage_code {
                Some(pipeline_code) => {
                    warn!(
                        "Extraction exited with code {} after pipeline stage failed with code {}",
                        code, pipeline_code
                    );
                    ExportError::PipelineFailedError {
                        code: pipeline_code,
                    }
                }
                None => ExportError::ExtractionFailedError { code },
            });
        }
        Some(_) => info!("Extraction task finished"),
    }

    advance(&mut phase, Phase::Draining);
    match pipeline.wait(settings.task_poll_interval, cancel)? {
        None => {
            advance(&mut phase, Phase::Aborting);
            info!("Cancellation requested, stopping pipeline task");
            pipeline.terminate(settings.termination_grace);
            Err(ExportError::Cancelled)
        }
        Some(TaskState::Failed(code)) => Err(ExportError::PipelineFailedError { code }),
        Some(_) => {
            advance(&mut phase, Phase::Done);
            info!("Pipeline task finished");
            Ok(())
        }
    }
}
