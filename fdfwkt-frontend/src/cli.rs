use std::path::PathBuf;

use fdfwkt_config::{AppConfig, OutputFormat};
use fdfwkt_core::annotation::Annotation;
use fdfwkt_io::ScanStats;
use serde::Serialize;
use tracing::info;

use crate::errors::FrontendError;
use crate::loader::{LoadedAnnotations, load_annotations};
use crate::svg;

/// 一次命令行调用的参数。
#[derive(Debug, Clone)]
pub struct CliRequest {
    pub input: PathBuf,
    pub format: OutputFormat,
    pub svg_output: Option<PathBuf>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    source: String,
    annotations: Vec<JsonEntry<'a>>,
    stats: ScanStats,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    index: usize,
    #[serde(flatten)]
    annotation: &'a Annotation,
    #[serde(skip_serializing_if = "Option::is_none")]
    wkt_error: Option<String>,
}

/// 加载 FDF，打印报告，并按需写出 SVG。
pub fn run(request: &CliRequest, config: &AppConfig) -> Result<(), FrontendError> {
    let loaded = load_annotations(&request.input, config)?;
    print!("{}", render_report(&loaded, request.format)?);

    if let Some(path) = &request.svg_output {
        let shapes = svg::write_svg(path, loaded.annotations(), &config.render)?;
        info!(path = %path.display(), shapes, "绘图完成");
    }
    Ok(())
}

/// 生成文本报告。`wkt` 格式每个标注一行，`json` 格式输出完整结构与扫描统计。
pub fn render_report(loaded: &LoadedAnnotations, format: OutputFormat) -> Result<String, FrontendError> {
    match format {
        OutputFormat::Wkt => Ok(render_wkt_lines(loaded)),
        OutputFormat::Json => {
            let report = JsonReport {
                source: loaded.source.display().to_string(),
                annotations: loaded
                    .entries
                    .iter()
                    .enumerate()
                    .map(|(index, entry)| JsonEntry {
                        index,
                        annotation: &entry.annotation,
                        wkt_error: entry.wkt_error.as_ref().map(|err| err.to_string()),
                    })
                    .collect(),
                stats: loaded.stats,
            };
            let mut json = serde_json::to_string_pretty(&report)?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn render_wkt_lines(loaded: &LoadedAnnotations) -> String {
    let mut output = String::new();
    for (index, entry) in loaded.entries.iter().enumerate() {
        let annotation = &entry.annotation;
        let page = annotation
            .page
            .as_ref()
            .map(|page| page.to_string())
            .unwrap_or_else(|| "-".to_string());
        let geometry = match (&annotation.wkt, &entry.wkt_error) {
            (Some(wkt), _) => wkt.clone(),
            (None, Some(err)) => format!("ERROR: {err}"),
            (None, None) => "ERROR: 未转换".to_string(),
        };
        output.push_str(&format!(
            "{index}\t{}\tpage={page}\t{geometry}\n",
            annotation.kind
        ));
    }
    output
}
