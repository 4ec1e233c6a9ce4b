use std::io::IsTerminal;
use std::path::Path;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ipcharness_frame::Payload;
use ipcharness_session::SessionReport;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct SessionOutput<'a> {
    endpoint: String,
    exit_code: Option<i32>,
    connections: usize,
    raw_bytes: usize,
    timed_out: bool,
    payloads: Option<&'a [Payload]>,
}

#[derive(Serialize)]
struct PayloadsOutput<'a> {
    source: &'a str,
    count: usize,
    payloads: &'a [Payload],
}

pub fn print_session(report: &SessionReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SessionOutput {
                endpoint: report.endpoint.display().to_string(),
                exit_code: report.exit_status.code(),
                connections: report.connections,
                raw_bytes: report.raw_bytes,
                timed_out: report.timed_out,
                payloads: report.payloads.as_deref(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut summary = Table::new();
            summary
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "EXIT", "CONNECTIONS", "BYTES", "TIMED OUT"])
                .add_row(vec![
                    report.endpoint.display().to_string(),
                    exit_label(report),
                    report.connections.to_string(),
                    report.raw_bytes.to_string(),
                    report.timed_out.to_string(),
                ]);
            println!("{summary}");
            if let Some(payloads) = &report.payloads {
                println!("{}", payload_table(payloads));
            }
        }
        OutputFormat::Pretty => {
            println!(
                "endpoint={} exit={} connections={} bytes={} timed_out={}",
                report.endpoint.display(),
                exit_label(report),
                report.connections,
                report.raw_bytes,
                report.timed_out
            );
            match &report.payloads {
                Some(payloads) => print_pretty(payloads),
                None => println!("no data received"),
            }
        }
    }
}

pub fn print_payloads(payloads: &[Payload], source: &Path, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let source = source.display().to_string();
            let out = PayloadsOutput {
                source: &source,
                count: payloads.len(),
                payloads,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => println!("{}", payload_table(payloads)),
        OutputFormat::Pretty => print_pretty(payloads),
    }
}

fn print_pretty(payloads: &[Payload]) {
    for (index, payload) in payloads.iter().enumerate() {
        let body = serde_json::to_string_pretty(payload).unwrap_or_else(|_| "{}".to_string());
        println!("[{index}] {body}");
    }
}

fn payload_table(payloads: &[Payload]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "KEYS", "PAYLOAD"]);
    for (index, payload) in payloads.iter().enumerate() {
        let keys = payload.keys().cloned().collect::<Vec<_>>().join(",");
        table.add_row(vec![
            index.to_string(),
            keys,
            serde_json::to_string(payload).unwrap_or_default(),
        ]);
    }
    table
}

fn exit_label(report: &SessionReport) -> String {
    report
        .exit_status
        .code()
        .map_or_else(|| "signal".to_string(), |code| code.to_string())
}
