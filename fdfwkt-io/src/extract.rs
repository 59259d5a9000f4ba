//! 单行字段提取器。每个函数只看一行文本，未命中时返回 `None`（或空样式），从不报错。
//!
//! 对象头行（`N 0 obj<<...`）与内容流正文行是两套不同的词法：前者按 `/Key(...)`、
//! `/Key[...]` 标记取值，后者按 PDF 绘图操作符（`RG`/`rg`/`w`/`d`）取操作数。

use std::borrow::Cow;

use fdfwkt_core::annotation::{
    AnnotationKind, AnnotationProperties, DashPattern, PageRef, PropertyField, Rgb,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// 数值字面量：整数、小数、科学计数法。
const NUMBER: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

static OBJECT_HEADER: Lazy<Regex> =
    Lazy::new(|| compile(r"\d+\s+\d+\s+obj\s*<<".to_string()));
static STREAM_OPEN: Lazy<Regex> = Lazy::new(|| compile(r"\bstream\b".to_string()));
static SUBJECT: Lazy<Regex> = Lazy::new(|| compile(r"/Subj\(([^)]*)\)".to_string()));
static LINE_POINTS: Lazy<Regex> = Lazy::new(|| compile(r"/L\[([^\]]*)\]".to_string()));
static VERTICES: Lazy<Regex> = Lazy::new(|| compile(r"/Vertices\[([^\]]*)\]".to_string()));
static RECT: Lazy<Regex> = Lazy::new(|| compile(r"/Rect\[([^\]]*)\]".to_string()));
static FILL_OPACITY: Lazy<Regex> =
    Lazy::new(|| compile(format!(r"/FillOpacity\s+({NUMBER})\s*/")));
static LINE_OPACITY: Lazy<Regex> =
    Lazy::new(|| compile(format!(r"/LineOpacity\s+({NUMBER})\s*/")));
static PAGE: Lazy<Regex> =
    Lazy::new(|| compile(r"/Page(?:\(([^)]*)\)|\s+(\d+))".to_string()));
static STROKE_COLOR: Lazy<Regex> = Lazy::new(|| {
    compile(format!(
        r"(?:^|\s)({NUMBER})\s+({NUMBER})\s+({NUMBER})\s+RG(?:\s|$)"
    ))
});
static FILL_COLOR: Lazy<Regex> = Lazy::new(|| {
    compile(format!(
        r"(?:^|\s)({NUMBER})\s+({NUMBER})\s+({NUMBER})\s+rg(?:\s|$)"
    ))
});
static LINE_WEIGHT: Lazy<Regex> =
    Lazy::new(|| compile(format!(r"(?:^|\s)({NUMBER})\s+w(?:\s|$)")));
static DASH: Lazy<Regex> =
    Lazy::new(|| compile(format!(r"\[([^\]]*)\]\s*({NUMBER})\s+d(?:\s|$)")));

fn compile(pattern: String) -> Regex {
    match Regex::new(&pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("内部错误：字段提取正则 {pattern} 无效: {err}"),
    }
}

/// 对象头中与几何无关的元数据：标签、页码、不透明度。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderFields {
    pub label: Option<String>,
    pub page: Option<PageRef>,
    pub properties: AnnotationProperties,
}

/// 对象头行：`<num> <gen> obj<<`。
pub fn is_object_header(line: &str) -> bool {
    OBJECT_HEADER.is_match(line)
}

/// 内容流起始标记。`endstream` 不算起始，字面字符串（如标签）里的文字也不算。
pub fn is_stream_open(line: &str) -> bool {
    STREAM_OPEN.is_match(&without_literal_strings(line))
}

pub fn is_stream_close(line: &str) -> bool {
    without_literal_strings(line).contains("endstream")
}

/// 从对象头行提取标注类型与坐标串。
///
/// - `Line` 取 `/L[...]` 的两点坐标；
/// - `Circle`/`PolyLine`/`Polygon` 取 `/Vertices[...]`；
/// - `Rectangle`/`Square` 取 `/Rect[x1 y1 x2 y2]`，并按左下、左上、右上、右下的顺序展开为 8 个坐标。
///
/// 类型不受支持、或类型对应的坐标字段缺失时返回 `None`。
pub fn extract_type_and_vertices(line: &str) -> Option<(AnnotationKind, String)> {
    let subject = SUBJECT.captures(line)?.get(1)?.as_str();
    let kind = AnnotationKind::from_subject(subject)?;
    let vertices = match kind {
        AnnotationKind::Line => normalize_ordinates(capture(&LINE_POINTS, line)?),
        AnnotationKind::Circle | AnnotationKind::PolyLine | AnnotationKind::Polygon => {
            normalize_ordinates(capture(&VERTICES, line)?)
        }
        AnnotationKind::Rectangle | AnnotationKind::Square => {
            rectangle_vertices(capture(&RECT, line)?)?
        }
    };
    if vertices.is_empty() {
        return None;
    }
    Some((kind, vertices))
}

/// 将 `x1 y1 x2 y2` 边界框展开为闭合矩形的四个角点：
/// (x1,y1) (x1,y2) (x2,y2) (x2,y1)。
pub fn rectangle_vertices(bbox: &str) -> Option<String> {
    let ordinates: Vec<&str> = bbox.split_whitespace().collect();
    let [x1, y1, x2, y2] = ordinates.as_slice() else {
        return None;
    };
    Some([*x1, *y1, *x1, *y2, *x2, *y2, *x2, *y1].join(" "))
}

pub fn extract_object_properties(line: &str) -> HeaderFields {
    HeaderFields {
        label: extract_label(line),
        page: extract_page(line),
        properties: extract_object_opacity(line),
    }
}

/// 填充与线条不透明度相互独立，可同时存在、只存在其一或都不存在。
pub fn extract_object_opacity(line: &str) -> AnnotationProperties {
    let mut fields = Vec::new();
    if let Some(value) = capture_number(&FILL_OPACITY, line) {
        fields.push(PropertyField::FillOpacity(value));
    }
    if let Some(value) = capture_number(&LINE_OPACITY, line) {
        fields.push(PropertyField::LineOpacity(value));
    }
    AnnotationProperties::from_fields(fields)
}

/// `/Contents(...)` 是 PDF 字面字符串：可含成对的未转义括号，直到配对的 `)` 为止。
pub fn extract_label(line: &str) -> Option<String> {
    literal_string_after(line, "/Contents(").map(decode_literal_string)
}

pub fn extract_page(line: &str) -> Option<PageRef> {
    let captures = PAGE.captures(line)?;
    let raw = captures.get(1).or_else(|| captures.get(2))?.as_str();
    if raw.trim().is_empty() {
        return None;
    }
    Some(PageRef::parse(raw))
}

/// 解析内容流正文行中的颜色、线宽与虚线样式。
pub fn extract_stream_properties(stream_line: &str) -> AnnotationProperties {
    let mut properties = AnnotationProperties::new();
    if let Some(color) = parse_line_color(stream_line) {
        properties.set(PropertyField::LineColor(color));
    }
    if let Some(color) = parse_fill_color(stream_line) {
        properties.set(PropertyField::FillColor(color));
    }
    if let Some(weight) = parse_line_weight(stream_line) {
        properties.set(PropertyField::LineWeight(weight));
    }
    if let Some(dash) = parse_line_type(stream_line) {
        properties.set(PropertyField::LineType(dash));
    }
    properties
}

/// 描边颜色：`r g b RG`（大写）。
pub fn parse_line_color(stream_line: &str) -> Option<Rgb> {
    capture_rgb(&STROKE_COLOR, stream_line)
}

/// 填充颜色：`r g b rg`（小写）。
pub fn parse_fill_color(stream_line: &str) -> Option<Rgb> {
    capture_rgb(&FILL_COLOR, stream_line)
}

/// 线宽：`<width> w`，单位为点。
pub fn parse_line_weight(stream_line: &str) -> Option<f64> {
    capture_number(&LINE_WEIGHT, stream_line)
}

/// 虚线：`[<on> <off> ...] <phase> d`。
pub fn parse_line_type(stream_line: &str) -> Option<DashPattern> {
    let captures = DASH.captures(stream_line)?;
    let pattern = captures
        .get(1)?
        .as_str()
        .split_whitespace()
        .map(|item| item.parse::<f64>().ok())
        .collect::<Option<Vec<f64>>>()?;
    let phase = captures.get(2)?.as_str().parse::<f64>().ok()?;
    Some(DashPattern { phase, pattern })
}

fn capture<'a>(regex: &Regex, line: &'a str) -> Option<&'a str> {
    regex
        .captures(line)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

fn capture_number(regex: &Regex, line: &str) -> Option<f64> {
    capture(regex, line)?.parse::<f64>().ok()
}

fn capture_rgb(regex: &Regex, line: &str) -> Option<Rgb> {
    let captures = regex.captures(line)?;
    let component = |idx: usize| -> Option<f64> { captures.get(idx)?.as_str().parse().ok() };
    Some(Rgb::new(component(1)?, component(2)?, component(3)?))
}

/// 从紧随 `(` 之后的位置开始扫描字面字符串，返回配对 `)` 的字节位置。
fn literal_string_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 1,
            b'(' => depth += 1,
            b')' if depth == 0 => return Some(index),
            b')' => depth -= 1,
            _ => {}
        }
        index += 1;
    }
    None
}

fn literal_string_after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let start = line.find(marker)? + marker.len();
    let rest = &line[start..];
    let end = literal_string_end(rest)?;
    Some(&rest[..end])
}

/// 清空行内字面字符串的内容，只留下括号，用于判断结构标记。未闭合的字符串截断到行尾。
fn without_literal_strings(line: &str) -> Cow<'_, str> {
    if !line.contains('(') {
        return Cow::Borrowed(line);
    }
    let mut stripped = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(open) = rest.find('(') {
        stripped.push_str(&rest[..=open]);
        let inner = &rest[open + 1..];
        match literal_string_end(inner) {
            Some(close) => {
                stripped.push(')');
                rest = &inner[close + 1..];
            }
            None => rest = "",
        }
    }
    stripped.push_str(rest);
    Cow::Owned(stripped)
}

fn normalize_ordinates(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 处理 PDF 字面字符串中的转义：`\(`、`\)`、`\\`、`\n`、`\r`、`\t`。
fn decode_literal_string(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some(other @ ('(' | ')' | '\\')) => result.push(other),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_stream_markers() {
        assert!(is_object_header("12 0 obj<</Subj(Line)"));
        assert!(is_object_header("3 0 obj <</Type/Annot>>"));
        assert!(!is_object_header("endobj"));
        assert!(is_stream_open("<</Length 42>>stream"));
        assert!(is_stream_open("stream"));
        assert!(!is_stream_open("endstream"));
        assert!(is_stream_close("endstream"));
        assert!(!is_stream_close("stream"));
    }

    #[test]
    fn markers_inside_literal_strings_are_ignored() {
        let open = "4 0 obj<</Subj(PolyLine)/Contents(culvert under stream)/Vertices[0 0 5 5]>>";
        assert!(!is_stream_open(open));
        let close = "5 0 obj<</Subj(Line)/Contents(see endstream valve)/L[0 0 5 5]>>";
        assert!(!is_stream_close(close));
        assert!(is_stream_open("6 0 obj<</Contents(a \\) b)/Length 3>>stream"));
        assert!(!is_stream_close("7 0 obj<</Contents(unterminated endstream"));
    }

    #[test]
    fn line_vertices_come_from_l_array() {
        let line = "1 0 obj<</Subj(Line)/Type/Annot/L[10 20 30 40]/Page(0)>>";
        assert_eq!(
            extract_type_and_vertices(line),
            Some((AnnotationKind::Line, "10 20 30 40".to_string()))
        );
    }

    #[test]
    fn polygon_vertices_come_from_vertices_array() {
        let line = "5 0 obj<</Subj(Polygon)/Vertices[0 0  10 0 10 10]/Rect[0 0 10 10]>>";
        assert_eq!(
            extract_type_and_vertices(line),
            Some((AnnotationKind::Polygon, "0 0 10 0 10 10".to_string()))
        );
        let circle = "6 0 obj<</Subj(Circle)/Vertices[1 2 3 4]>>";
        assert_eq!(
            extract_type_and_vertices(circle),
            Some((AnnotationKind::Circle, "1 2 3 4".to_string()))
        );
    }

    #[test]
    fn rectangle_bbox_expands_to_four_corners() {
        let line = "7 0 obj<</Subj(Rectangle)/Rect[0 0 100 50]>>";
        assert_eq!(
            extract_type_and_vertices(line),
            Some((AnnotationKind::Rectangle, "0 0 0 50 100 50 100 0".to_string()))
        );
        let square = "8 0 obj<</Subj(Square)/Rect[1.5 2 3 4.25]>>";
        let (kind, vertices) = extract_type_and_vertices(square).unwrap();
        assert_eq!(kind, AnnotationKind::Square);
        assert_eq!(vertices, "1.5 2 1.5 4.25 3 4.25 3 2");
        assert_eq!(vertices.split(' ').count(), 8);
    }

    #[test]
    fn rectangle_vertices_require_four_numbers() {
        assert_eq!(rectangle_vertices("1 2 3"), None);
        assert_eq!(rectangle_vertices("1 2 3 4 5"), None);
        assert_eq!(
            rectangle_vertices(" 10 20 30 40 "),
            Some("10 20 10 40 30 40 30 20".to_string())
        );
    }

    #[test]
    fn unsupported_or_incomplete_headers_yield_none() {
        assert_eq!(extract_type_and_vertices("2 0 obj<</Subj(Ink)/L[1 2 3 4]>>"), None);
        assert_eq!(extract_type_and_vertices("2 0 obj<</Subj(Line)/Rect[1 2 3 4]>>"), None);
        assert_eq!(extract_type_and_vertices("2 0 obj<</Type/Popup>>"), None);
        assert_eq!(extract_type_and_vertices("2 0 obj<</Subj(PolyLine)/Vertices[]>>"), None);
    }

    #[test]
    fn opacity_fields_are_independent() {
        let both = extract_object_opacity("/FillOpacity 0.5/LineOpacity 0.75/Page(1)");
        assert_eq!(both.fill_opacity, Some(0.5));
        assert_eq!(both.line_opacity, Some(0.75));

        let fill_only = extract_object_opacity("/FillOpacity 1/Subj(Polygon)");
        assert_eq!(fill_only.fill_opacity, Some(1.0));
        assert!(fill_only.line_opacity.is_none());

        assert!(extract_object_opacity("/Subj(Line)").is_empty());
    }

    #[test]
    fn label_and_page_are_extracted() {
        let line = r"1 0 obj<</Subj(Line)/Contents(Beam \(B1\))/Page(2)/L[0 0 1 1]>>";
        assert_eq!(extract_label(line).as_deref(), Some("Beam (B1)"));
        assert_eq!(extract_page(line), Some(PageRef::Number(2)));
        assert_eq!(extract_page("/Page(Sheet A)"), Some(PageRef::Name("Sheet A".into())));
        assert_eq!(extract_page("/Page 4/Rect[0 0 1 1]"), Some(PageRef::Number(4)));
        assert_eq!(extract_label("/Subj(Line)"), None);
        assert_eq!(extract_label("/Contents(never closed"), None);
    }

    #[test]
    fn label_keeps_balanced_parentheses() {
        let line = "8 0 obj<</Subj(Polygon)/Contents(Slab (S1) east)/Page(1)/Vertices[0 0 1 0 1 1]>>";
        assert_eq!(extract_label(line).as_deref(), Some("Slab (S1) east"));
        assert_eq!(extract_page(line), Some(PageRef::Number(1)));
        let nested = r"/Contents(a (b (c) d) e\))/Page(2)";
        assert_eq!(extract_label(nested).as_deref(), Some("a (b (c) d) e)"));
        assert_eq!(extract_page("/Subj(Line)"), None);
    }

    #[test]
    fn object_properties_bundle_header_fields() {
        let fields = extract_object_properties(
            "1 0 obj<</Subj(Polygon)/Contents(Slab)/LineOpacity 0.4/Page(3)>>",
        );
        assert_eq!(fields.label.as_deref(), Some("Slab"));
        assert_eq!(fields.page, Some(PageRef::Number(3)));
        assert_eq!(fields.properties.line_opacity, Some(0.4));
        assert!(fields.properties.fill_opacity.is_none());
    }

    #[test]
    fn stroke_color_and_weight_from_stream() {
        assert_eq!(parse_line_color("0.2 0.4 0.6 RG"), Some(Rgb::new(0.2, 0.4, 0.6)));
        assert_eq!(parse_line_weight("2.5 w"), Some(2.5));
        assert_eq!(parse_line_weight("q 1 0 0 1 10 20 cm 0.75 w S Q"), Some(0.75));
    }

    #[test]
    fn stroke_and_fill_colors_are_case_sensitive() {
        let fill_only = extract_stream_properties("1 0 0 rg 10 20 m 30 40 l f");
        assert_eq!(fill_only.fill_color, Some(Rgb::new(1.0, 0.0, 0.0)));
        assert!(fill_only.line_color.is_none());

        let stroke_only = extract_stream_properties("0 0 1 RG 10 20 m 30 40 l S");
        assert_eq!(stroke_only.line_color, Some(Rgb::new(0.0, 0.0, 1.0)));
        assert!(stroke_only.fill_color.is_none());

        let both = extract_stream_properties("0 0 1 RG 1 .5 0 rg 3 w");
        assert_eq!(both.line_color, Some(Rgb::new(0.0, 0.0, 1.0)));
        assert_eq!(both.fill_color, Some(Rgb::new(1.0, 0.5, 0.0)));
        assert_eq!(both.line_weight, Some(3.0));
    }

    #[test]
    fn dash_pattern_includes_phase_and_items() {
        assert_eq!(
            parse_line_type("0 0 0 RG [3 2] 0 d 1 w"),
            Some(DashPattern {
                phase: 0.0,
                pattern: vec![3.0, 2.0]
            })
        );
        let solid = parse_line_type("[] 0 d").expect("solid dash");
        assert!(solid.is_solid());
        assert_eq!(parse_line_type("[3 x] 0 d"), None);
        assert_eq!(parse_line_type("1 w"), None);
    }

    #[test]
    fn stream_without_operators_is_empty() {
        assert!(extract_stream_properties("10 20 m 30 40 l S").is_empty());
    }
}
