//! 标注装配器：逐行扫描 FDF 文本，把对象头中的几何信息与随后内容流中的样式关联起来。
//!
//! FDF 中几何标注的对象头总是先于其外观内容流出现，中间可能夹杂边界框、弹出框等
//! 其他对象头。装配器因此只保留一个待定对象：对象头提供类型、坐标、标签、页码与
//! 不透明度，随后第一个闭合的内容流提供颜色、线宽与虚线，二者齐备即产出一个标注。

use std::mem;

use fdfwkt_core::annotation::{Annotation, AnnotationKind, AnnotationProperties, PageRef};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::extract;

/// 扫描选项。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// 待定对象之后允许出现的非几何对象头数量；超过后丢弃待定对象。`None` 表示不限制。
    pub max_interleaved_headers: Option<usize>,
}

/// 扫描统计，便于前端输出诊断信息。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub lines_scanned: usize,
    pub undecodable_lines: usize,
    pub header_lines: usize,
    pub streams_closed: usize,
    pub annotations_emitted: usize,
    pub discarded_pending: usize,
}

/// 扫描结果：按完成顺序排列的标注与统计。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    pub annotations: Vec<Annotation>,
    pub stats: ScanStats,
}

#[derive(Debug, Default)]
enum ScanState {
    #[default]
    Scanning,
    /// 刚遇到 `stream`，下一条非空行即为内容流正文。
    AwaitingStreamBody,
    /// 已保存一行正文，等待 `endstream`。
    HoldingStreamBody(String),
}

#[derive(Debug, Default)]
struct PendingAnnotation {
    geometry: Option<(AnnotationKind, String)>,
    label: Option<String>,
    page: Option<PageRef>,
    header_properties: AnnotationProperties,
    interleaved_headers: usize,
}

/// 单次扫描独占的状态机。每份文档各自创建，互不共享。
#[derive(Debug, Default)]
pub struct AnnotationScanner {
    options: ScanOptions,
    state: ScanState,
    pending: PendingAnnotation,
    annotations: Vec<Annotation>,
    stats: ScanStats,
}

impl AnnotationScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ScanOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// 一次性扫描全部行。
    pub fn scan<I, S>(lines: I, options: ScanOptions) -> ScanOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut scanner = Self::with_options(options);
        for line in lines {
            scanner.feed(line.as_ref());
        }
        scanner.finish()
    }

    /// 记录行源中被跳过的不可解码行，仅用于统计。
    pub fn record_undecodable(&mut self, count: usize) {
        self.stats.undecodable_lines += count;
    }

    pub fn feed(&mut self, line: &str) {
        self.stats.lines_scanned += 1;
        let line_number = self.stats.lines_scanned;

        if extract::is_stream_close(line) {
            match mem::take(&mut self.state) {
                ScanState::HoldingStreamBody(body) => {
                    trace!(line_number, "内容流结束");
                    let properties = extract::extract_stream_properties(&body);
                    self.close_stream(properties, line_number);
                }
                ScanState::AwaitingStreamBody => {
                    // 正文与 endstream 同行，或内容流为空
                    let body = line.split("endstream").next().unwrap_or_default();
                    let properties = extract::extract_stream_properties(body);
                    self.close_stream(properties, line_number);
                }
                ScanState::Scanning => {
                    trace!(line_number, "忽略没有对应正文的 endstream");
                }
            }
            return;
        }

        if matches!(self.state, ScanState::AwaitingStreamBody) {
            if !line.trim().is_empty() {
                trace!(line_number, "捕获内容流正文");
                self.state = ScanState::HoldingStreamBody(line.to_string());
            }
            return;
        }

        let is_header = extract::is_object_header(line);
        let opens_stream = extract::is_stream_open(line);
        if !is_header && !opens_stream {
            return;
        }

        if opens_stream {
            if let ScanState::HoldingStreamBody(_) = self.state {
                debug!(line_number, "上一个内容流未闭合即开始新的内容流，丢弃已保存的正文");
            }
            trace!(line_number, "内容流开始");
            self.state = ScanState::AwaitingStreamBody;
            return;
        }

        self.handle_header(line, line_number);
    }

    /// 结束扫描。尚未配齐样式的待定对象直接丢弃，不产出残缺标注。
    pub fn finish(mut self) -> ScanOutcome {
        if let Some((kind, _)) = self.pending.geometry.take() {
            debug!(%kind, "输入结束时仍有未完成的标注，已丢弃");
            self.stats.discarded_pending += 1;
        }
        self.stats.annotations_emitted = self.annotations.len();
        ScanOutcome {
            annotations: self.annotations,
            stats: self.stats,
        }
    }

    fn handle_header(&mut self, line: &str, line_number: usize) {
        self.stats.header_lines += 1;
        match extract::extract_type_and_vertices(line) {
            Some((kind, vertices)) => {
                if let Some((previous, _)) = &self.pending.geometry {
                    debug!(
                        line_number,
                        %previous,
                        next = %kind,
                        "新的几何对象头到达时上一个对象尚未获得样式，已丢弃"
                    );
                    self.stats.discarded_pending += 1;
                }
                let fields = extract::extract_object_properties(line);
                trace!(line_number, %kind, "记录待定几何对象");
                self.pending = PendingAnnotation {
                    geometry: Some((kind, vertices)),
                    label: fields.label,
                    page: fields.page,
                    header_properties: fields.properties,
                    interleaved_headers: 0,
                };
            }
            None => {
                if self.pending.geometry.is_none() {
                    return;
                }
                self.pending.interleaved_headers += 1;
                let Some(limit) = self.options.max_interleaved_headers else {
                    return;
                };
                if self.pending.interleaved_headers > limit {
                    debug!(
                        line_number,
                        limit, "待定对象之后的非几何对象头超过上限，已丢弃"
                    );
                    self.pending = PendingAnnotation::default();
                    self.stats.discarded_pending += 1;
                }
            }
        }
    }

    fn close_stream(&mut self, stream_properties: AnnotationProperties, line_number: usize) {
        self.stats.streams_closed += 1;
        if self.pending.geometry.is_none() {
            debug!(line_number, "内容流之前没有待定的几何对象，忽略其样式");
            return;
        }
        let pending = mem::take(&mut self.pending);
        let Some((kind, vertices)) = pending.geometry else {
            return;
        };
        let mut properties = pending.header_properties;
        properties.merge(stream_properties);
        debug!(line_number, %kind, "完成标注");
        self.annotations.push(Annotation {
            kind,
            vertices,
            page: pending.page,
            label: pending.label,
            properties,
            wkt: None,
        });
    }
}
