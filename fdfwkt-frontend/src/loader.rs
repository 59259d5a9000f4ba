use std::path::{Path, PathBuf};

use fdfwkt_config::AppConfig;
use fdfwkt_core::annotation::Annotation;
use fdfwkt_core::wkt::WktError;
use fdfwkt_io::{DocumentLoader, FdfDocument, FdfFacade, ScanOptions, ScanStats};
use tracing::{info, warn};

use crate::errors::FrontendError;

/// 单个标注及其 WKT 转换结果。转换失败只影响该标注本身。
#[derive(Debug, Clone)]
pub struct LoadedAnnotation {
    pub annotation: Annotation,
    pub wkt_error: Option<WktError>,
}

impl LoadedAnnotation {
    fn convert(mut annotation: Annotation) -> Self {
        let wkt_error = annotation.populate_wkt().err();
        Self {
            annotation,
            wkt_error,
        }
    }
}

/// 统一封装加载结果与来源信息。
#[derive(Debug, Clone)]
pub struct LoadedAnnotations {
    pub source: PathBuf,
    pub entries: Vec<LoadedAnnotation>,
    pub stats: ScanStats,
}

impl LoadedAnnotations {
    pub fn from_document(source: impl Into<PathBuf>, document: FdfDocument) -> Self {
        let entries = document
            .annotations
            .into_iter()
            .map(LoadedAnnotation::convert)
            .collect();
        Self {
            source: source.into(),
            entries,
            stats: document.stats,
        }
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.entries.iter().map(|entry| &entry.annotation)
    }

    pub fn conversion_failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.wkt_error.is_some())
            .count()
    }
}

pub fn scan_options(config: &AppConfig) -> ScanOptions {
    ScanOptions {
        max_interleaved_headers: config.scanner.max_interleaved_headers,
    }
}

/// 读取 FDF、装配标注并逐个转换为 WKT。只有文件读取失败才会返回错误。
pub fn load_annotations(path: &Path, config: &AppConfig) -> Result<LoadedAnnotations, FrontendError> {
    let loader = FdfFacade::with_options(scan_options(config));
    let document = loader.load(path)?;
    let loaded = LoadedAnnotations::from_document(path, document);

    for (index, entry) in loaded.entries.iter().enumerate() {
        if let Some(err) = &entry.wkt_error {
            warn!(index, kind = %entry.annotation.kind, error = %err, "标注无法转换为 WKT");
        }
    }
    info!(
        path = %path.display(),
        annotations = loaded.entries.len(),
        failures = loaded.conversion_failures(),
        undecodable = loaded.stats.undecodable_lines,
        discarded = loaded.stats.discarded_pending,
        "FDF 标注加载完成"
    );
    Ok(loaded)
}
