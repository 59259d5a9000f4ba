use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use fdfwkt_core::annotation::Annotation;
use thiserror::Error;
use tracing::debug;

pub mod extract;
pub mod scanner;

pub use scanner::{AnnotationScanner, ScanOptions, ScanOutcome, ScanStats};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 一次 FDF 扫描的结果：按完成顺序排列的标注，以及扫描统计。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FdfDocument {
    pub annotations: Vec<Annotation>,
    pub stats: ScanStats,
}

impl From<ScanOutcome> for FdfDocument {
    fn from(outcome: ScanOutcome) -> Self {
        Self {
            annotations: outcome.annotations,
            stats: outcome.stats,
        }
    }
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<FdfDocument, IoError>;
}

#[derive(Debug, Clone, Default)]
pub struct FdfFacade {
    options: ScanOptions,
}

impl FdfFacade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ScanOptions) -> Self {
        Self { options }
    }

    /// 从任意按行读取的字节源扫描标注。只有底层读取失败才返回错误，
    /// 无法按 UTF-8 解码的行会被跳过。
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> std::io::Result<FdfDocument> {
        let mut source = LineSource::new(reader);
        let mut scanner = AnnotationScanner::with_options(self.options);
        while let Some(line) = source.next_line()? {
            scanner.feed(&line);
        }
        scanner.record_undecodable(source.undecodable_lines());
        Ok(scanner.finish().into())
    }

    pub fn parse_bytes(&self, bytes: &[u8]) -> FdfDocument {
        match self.parse_reader(bytes) {
            Ok(document) => document,
            // 内存切片的读取不会失败
            Err(_) => FdfDocument::default(),
        }
    }
}

impl DocumentLoader for FdfFacade {
    fn load(&self, path: &Path) -> Result<FdfDocument, IoError> {
        let read_error = |source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(read_error)?;
        let document = self
            .parse_reader(BufReader::new(file))
            .map_err(read_error)?;
        debug!(
            path = %path.display(),
            annotations = document.annotations.len(),
            undecodable = document.stats.undecodable_lines,
            "FDF 扫描完成"
        );
        Ok(document)
    }
}

/// 行源：按 `\n` 切分字节流并逐行解码为 UTF-8，解码失败的行直接跳过并计数。
pub struct LineSource<R> {
    reader: R,
    buffer: Vec<u8>,
    line_number: usize,
    undecodable: usize,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            line_number: 0,
            undecodable: 0,
        }
    }

    /// 返回下一条可解码的行（不含行尾 `\r\n`/`\n`），读完返回 `None`。
    pub fn next_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            self.buffer.clear();
            if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            let mut end = self.buffer.len();
            if end > 0 && self.buffer[end - 1] == b'\n' {
                end -= 1;
            }
            if end > 0 && self.buffer[end - 1] == b'\r' {
                end -= 1;
            }
            match std::str::from_utf8(&self.buffer[..end]) {
                Ok(text) => return Ok(Some(text.to_string())),
                Err(err) => {
                    self.undecodable += 1;
                    debug!(
                        line = self.line_number,
                        error = %err,
                        "跳过无法按 UTF-8 解码的行"
                    );
                }
            }
        }
    }

    #[inline]
    pub fn undecodable_lines(&self) -> usize {
        self.undecodable
    }
}
