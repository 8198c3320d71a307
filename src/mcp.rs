use anyhow::Result;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::ProcessError;
use crate::service::{DocumentService, Input, SplitMode};
use crate::sweep::Sweeper;

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfMergeRequest {
    #[schemars(description = "Paths of the PDF files to merge, in output order (at least 2)")]
    pub paths: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfSplitRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
    #[schemars(description = "Page ranges, one output file per comma-separated token (e.g., '1-3, 5, 7-10')")]
    #[serde(default)]
    pub ranges: Option<String>,
    #[schemars(description = "Number of evenly sized parts (use instead of ranges)")]
    #[serde(default)]
    pub parts: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfWatermarkRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
    #[schemars(description = "Text stamped diagonally across every page")]
    pub text: String,
}

#[derive(Clone)]
pub struct PdfServer {
    tool_router: ToolRouter<Self>,
    service: Arc<DocumentService>,
}

impl PdfServer {
    pub fn new(service: Arc<DocumentService>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            service,
        }
    }
}

fn read_input(path: &str) -> Result<Input, ProcessError> {
    let bytes = std::fs::read(path)?;
    let name = Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("document.pdf");
    Ok(Input::new(name, bytes))
}

fn to_json<T: Serialize>(result: Result<T, ProcessError>) -> String {
    match result {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|e| format!("Error: {}", e)),
        Err(e) => {
            if !e.is_caller_fault() {
                warn!(error = %e, "Request failed");
            }
            format!("Error: {}", e)
        }
    }
}

#[tool_router]
impl PdfServer {
    #[tool(description = "Merge two or more PDFs into one, keeping the given file order and each file's page order")]
    fn pdf_merge(&self, Parameters(req): Parameters<PdfMergeRequest>) -> String {
        if req.paths.len() < 2 {
            return to_json::<()>(Err(ProcessError::validation("at least 2 files required")));
        }
        let result = req
            .paths
            .iter()
            .map(|path| read_input(path))
            .collect::<Result<Vec<_>, _>>()
            .and_then(|inputs| self.service.merge(&inputs));
        to_json(result)
    }

    #[tool(description = "Split a PDF into several PDFs bundled as a zip archive, either by page ranges ('1-3, 5, 7-10' gives three files) or into a number of evenly sized parts")]
    fn pdf_split(&self, Parameters(req): Parameters<PdfSplitRequest>) -> String {
        let result = SplitMode::from_params(req.ranges, req.parts.map(|p| p as usize))
            .and_then(|mode| {
                let input = read_input(&req.path)?;
                self.service.split(&input, &mode)
            });
        to_json(result)
    }

    #[tool(description = "Stamp a text watermark diagonally across every page of a PDF and save the result as a new file")]
    fn pdf_watermark(&self, Parameters(req): Parameters<PdfWatermarkRequest>) -> String {
        let result = read_input(&req.path).and_then(|input| self.service.watermark(&input, &req.text));
        to_json(result)
    }
}

#[tool_handler]
impl ServerHandler for PdfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "PDF assembly tools. Use pdf_merge to combine files, pdf_split to cut one file \
                 into parts by page ranges or part count (returns a zip archive), and \
                 pdf_watermark to stamp text on every page. Outputs are written to the \
                 server's storage directory and removed after the retention window."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server(config: &Config) -> Result<()> {
    let clock = Arc::new(SystemClock);
    let service = Arc::new(DocumentService::new(config, clock.clone())?);

    let sweeper = Sweeper::new(service.store().root(), config.retention()?, clock);
    let sweep_task = tokio::spawn(sweeper.run(config.sweep_interval()));

    info!(
        storage = %service.store().root().display(),
        retention_secs = config.retention_secs,
        "Serving PDF tools on stdio"
    );

    let server = PdfServer::new(service);

    // Serve using stdin/stdout as a tuple
    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;
    sweep_task.abort();

    Ok(())
}
