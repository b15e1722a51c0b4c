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

//! `stx` command line entry point.

use clap::Parser;
use log::{error, info, warn};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::process;
use std::sync::Arc;
use streamxfer::application::escape_filter::run_escape;
use streamxfer::application::orchestrator::ExportOrchestrator;
use streamxfer::application::pipeline_composer::PipelineComposer;
use streamxfer::config::{AppConfig, Cli, Command, EscapeArgs, ExportArgs};
use streamxfer::domain::entities::ExportReport;
use streamxfer::domain::errors::Result;
use streamxfer::infrastructure::codec_adapter::codec_for;
use streamxfer::infrastructure::mssql::bcp_extraction_adapter::BcpExtractionAdapter;
use streamxfer::infrastructure::mssql::mssql_catalog_adapter::MssqlCatalogAdapter;
use streamxfer::infrastructure::process::CancelToken;
use streamxfer::infrastructure::sinks::sink_for_uri;

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Export(args) => export(&args),
        Command::Escape(args) => {
            init_logging("warn");
            escape(&args)
        }
    };

    if let Err(e) = outcome {
        error!("{}", e);
        process::exit(1);
    }
}

fn export(args: &ExportArgs) -> Result<()> {
    let config = match AppConfig::load(args) {
        Ok(c) => c,
        Err(e) => {
            init_logging(args.log_level.as_deref().unwrap_or("info"));
            return Err(e);
        }
    };
    init_logging(&config.runtime.log_level);

    let cancel = CancelToken::new();
    let token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("Interrupted, stopping export");
        token.cancel();
    }) {
        warn!("Could not install signal handler: {}", e);
    }

    let spec = config.to_export_spec()?;
    let creds = config.creds()?;

    let composer = match &config.runtime.escape_program {
        Some(program) => PipelineComposer::new(program.as_str(), vec!["escape".to_string()]),
        None => PipelineComposer::for_current_exe()?,
    };

    let orchestrator = ExportOrchestrator::new(
        Arc::new(MssqlCatalogAdapter::new(creds.clone())),
        Arc::new(BcpExtractionAdapter::new(creds, config.export.packet_size)),
        sink_for_uri(&spec.destination),
        codec_for(spec.compression),
        composer,
        config.orchestrator_settings(),
        cancel,
    );

    let report = orchestrator.run(&spec)?;
    info!(
        "Export report: {}",
        serde_json::to_string(&report).unwrap_or_default()
    );
    if let Some(path) = &config.runtime.report_path {
        write_report(path, &report)?;
    }
    Ok(())
}

fn write_report(path: &str, report: &ExportReport) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), report).map_err(io::Error::from)?;
    info!("Report written to {}", path);
    Ok(())
}

fn escape(args: &EscapeArgs) -> Result<()> {
    let input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin().lock()),
    };
    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    run_escape(args.kind, BufReader::new(input), output)?;
    Ok(())
}
