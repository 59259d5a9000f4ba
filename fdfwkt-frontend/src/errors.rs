use std::path::PathBuf;

use fdfwkt_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("写入 {path:?} 失败: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("序列化 JSON 报告失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("没有可绘制的标注")]
    NothingToPlot,
}
