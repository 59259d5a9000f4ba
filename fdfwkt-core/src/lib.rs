pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。坐标单位与 FDF 页面坐标一致（1/72 英寸）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 轴对齐边界框，用于估算标注集合的范围（绘图时确定视窗）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        pub fn from_points<I>(points: I) -> Self
        where
            I: IntoIterator<Item = Point2>,
        {
            let mut bounds = Self::empty();
            for point in points {
                bounds.include_point(point);
            }
            bounds
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }
}

pub mod annotation {
    use std::fmt;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2};
    use crate::wkt::{self, WktError};

    /// 支持提取的几何标注类型，对应 FDF 对象头中 `/Subj(...)` 的取值。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum AnnotationKind {
        Line,
        PolyLine,
        Polygon,
        Circle,
        Rectangle,
        Square,
    }

    impl AnnotationKind {
        /// 按 `/Subj(...)` 中的名称识别类型，大小写敏感；未知名称返回 `None`。
        pub fn from_subject(subject: &str) -> Option<Self> {
            match subject {
                "Line" => Some(Self::Line),
                "PolyLine" => Some(Self::PolyLine),
                "Polygon" => Some(Self::Polygon),
                "Circle" => Some(Self::Circle),
                "Rectangle" => Some(Self::Rectangle),
                "Square" => Some(Self::Square),
                _ => None,
            }
        }

        pub fn as_str(self) -> &'static str {
            match self {
                Self::Line => "Line",
                Self::PolyLine => "PolyLine",
                Self::Polygon => "Polygon",
                Self::Circle => "Circle",
                Self::Rectangle => "Rectangle",
                Self::Square => "Square",
            }
        }

        /// 闭合图形（绘制时填充，WKT 输出为 POLYGON）。
        #[inline]
        pub fn is_closed(self) -> bool {
            matches!(self, Self::Polygon | Self::Rectangle | Self::Square)
        }

        /// 开放折线（绘制时不填充，WKT 输出为 LINESTRING）。
        #[inline]
        pub fn is_open(self) -> bool {
            matches!(self, Self::Line | Self::PolyLine)
        }
    }

    impl fmt::Display for AnnotationKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    /// 页码标识。源文件中可能是整数也可能是任意字符串，原样保留。
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum PageRef {
        Number(i64),
        Name(String),
    }

    impl PageRef {
        pub fn parse(raw: &str) -> Self {
            let trimmed = raw.trim();
            match trimmed.parse::<i64>() {
                Ok(number) => Self::Number(number),
                Err(_) => Self::Name(trimmed.to_string()),
            }
        }
    }

    impl fmt::Display for PageRef {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Number(number) => write!(f, "{number}"),
                Self::Name(name) => f.write_str(name),
            }
        }
    }

    /// RGB 颜色，各分量取值范围 [0.0, 1.0]。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Rgb {
        pub r: f64,
        pub g: f64,
        pub b: f64,
    }

    impl Rgb {
        #[inline]
        pub fn new(r: f64, g: f64, b: f64) -> Self {
            Self { r, g, b }
        }
    }

    /// 虚线样式：相位与虚实长度序列。序列为空表示实线。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct DashPattern {
        pub phase: f64,
        pub pattern: Vec<f64>,
    }

    impl DashPattern {
        #[inline]
        pub fn is_solid(&self) -> bool {
            self.pattern.is_empty()
        }
    }

    /// 单个样式字段。提取器逐字段产出，再汇总为 [`AnnotationProperties`]。
    #[derive(Debug, Clone, PartialEq)]
    pub enum PropertyField {
        LineColor(Rgb),
        FillColor(Rgb),
        LineOpacity(f64),
        FillOpacity(f64),
        LineWeight(f64),
        LineType(DashPattern),
    }

    /// 标注样式。所有字段相互独立且可缺省，缺省表示源文件未指定，而非数值 0。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct AnnotationProperties {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub line_color: Option<Rgb>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub line_opacity: Option<f64>,
        /// 线宽，单位为点（1/72 英寸）。
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub line_weight: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub line_type: Option<DashPattern>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub fill_color: Option<Rgb>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub fill_opacity: Option<f64>,
    }

    impl AnnotationProperties {
        pub fn new() -> Self {
            Self::default()
        }

        /// 由若干字段构造；未出现的字段保持 `None`，重复字段以后出现者为准。
        pub fn from_fields<I>(fields: I) -> Self
        where
            I: IntoIterator<Item = PropertyField>,
        {
            let mut properties = Self::new();
            for field in fields {
                properties.set(field);
            }
            properties
        }

        pub fn set(&mut self, field: PropertyField) {
            match field {
                PropertyField::LineColor(color) => self.line_color = Some(color),
                PropertyField::FillColor(color) => self.fill_color = Some(color),
                PropertyField::LineOpacity(value) => self.line_opacity = Some(value),
                PropertyField::FillOpacity(value) => self.fill_opacity = Some(value),
                PropertyField::LineWeight(value) => self.line_weight = Some(value),
                PropertyField::LineType(dash) => self.line_type = Some(dash),
            }
        }

        /// 合并另一组样式：`other` 中已指定的字段覆盖当前值，未指定的字段不影响当前值。
        pub fn merge(&mut self, other: AnnotationProperties) {
            if other.line_color.is_some() {
                self.line_color = other.line_color;
            }
            if other.line_opacity.is_some() {
                self.line_opacity = other.line_opacity;
            }
            if other.line_weight.is_some() {
                self.line_weight = other.line_weight;
            }
            if other.line_type.is_some() {
                self.line_type = other.line_type;
            }
            if other.fill_color.is_some() {
                self.fill_color = other.fill_color;
            }
            if other.fill_opacity.is_some() {
                self.fill_opacity = other.fill_opacity;
            }
        }

        pub fn is_empty(&self) -> bool {
            *self == Self::default()
        }
    }

    /// 一个已识别的几何标注。创建后不再修改几何与样式，`wkt` 由转换步骤补充。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Annotation {
        pub kind: AnnotationKind,
        /// 原始坐标串 `"x1 y1 x2 y2 ..."`。
        pub vertices: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub page: Option<PageRef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub label: Option<String>,
        #[serde(default)]
        pub properties: AnnotationProperties,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub wkt: Option<String>,
    }

    impl Annotation {
        pub fn new(kind: AnnotationKind, vertices: impl Into<String>) -> Self {
            Self {
                kind,
                vertices: vertices.into(),
                page: None,
                label: None,
                properties: AnnotationProperties::default(),
                wkt: None,
            }
        }

        /// 计算 WKT，不修改自身；同一标注多次调用结果一致。
        pub fn to_wkt(&self) -> Result<String, WktError> {
            wkt::annotation_to_wkt(self)
        }

        /// 计算并缓存 WKT。
        pub fn populate_wkt(&mut self) -> Result<&str, WktError> {
            let literal = self.to_wkt()?;
            Ok(self.wkt.insert(literal).as_str())
        }

        /// 将坐标串解析为数值点序列，供绘图与范围计算使用。
        pub fn points(&self) -> Result<Vec<Point2>, WktError> {
            wkt::ordinate_pairs(&self.vertices)?
                .into_iter()
                .map(|(x, y)| Ok(Point2::new(parse_ordinate(x)?, parse_ordinate(y)?)))
                .collect()
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let points = self.points().ok()?;
            let bounds = Bounds2D::from_points(points);
            (!bounds.is_empty()).then_some(bounds)
        }
    }

    fn parse_ordinate(token: &str) -> Result<f64, WktError> {
        token.parse::<f64>().map_err(|_| WktError::InvalidOrdinate {
            token: token.to_string(),
        })
    }
}

/// 坐标串到 WKT 字面量的转换。纯函数，不做投影、环方向或自相交校验。
pub mod wkt {
    use thiserror::Error;

    use crate::annotation::{Annotation, AnnotationKind};

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum WktError {
        #[error("{0} 类型暂无 WKT 转换规则")]
        UnsupportedKind(AnnotationKind),
        #[error("坐标数量为奇数（{count} 个），无法组成 x/y 对")]
        OddOrdinateCount { count: usize },
        #[error("坐标串为空")]
        EmptyVertices,
        #[error("无法解析的坐标值 \"{token}\"")]
        InvalidOrdinate { token: String },
    }

    pub fn annotation_to_wkt(annotation: &Annotation) -> Result<String, WktError> {
        vertices_to_wkt(annotation.kind, &annotation.vertices)
    }

    pub fn vertices_to_wkt(kind: AnnotationKind, vertices: &str) -> Result<String, WktError> {
        match kind {
            AnnotationKind::Line | AnnotationKind::PolyLine => {
                Ok(format!("LINESTRING({})", group_vertices(vertices, false)?))
            }
            AnnotationKind::Polygon | AnnotationKind::Rectangle | AnnotationKind::Square => {
                Ok(format!("POLYGON(({}))", group_vertices(vertices, true)?))
            }
            AnnotationKind::Circle => Err(WktError::UnsupportedKind(kind)),
        }
    }

    /// 将 `"x1 y1 x2 y2"` 分组为 `"x1 y1, x2 y2"`；`close` 为真时在末尾重复首个坐标对。
    pub fn group_vertices(vertices: &str, close: bool) -> Result<String, WktError> {
        let mut grouped: Vec<String> = ordinate_pairs(vertices)?
            .into_iter()
            .map(|(x, y)| format!("{x} {y}"))
            .collect();
        if close {
            if let Some(first) = grouped.first().cloned() {
                grouped.push(first);
            }
        }
        Ok(grouped.join(", "))
    }

    /// 按位置两两分组：偶数位为 x，奇数位为 y。坐标保持原始文本，不做舍入。
    pub fn ordinate_pairs(vertices: &str) -> Result<Vec<(&str, &str)>, WktError> {
        let tokens: Vec<&str> = vertices.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(WktError::EmptyVertices);
        }
        if tokens.len() % 2 != 0 {
            return Err(WktError::OddOrdinateCount {
                count: tokens.len(),
            });
        }
        if let Some(bad) = tokens.iter().find(|token| token.parse::<f64>().is_err()) {
            return Err(WktError::InvalidOrdinate {
                token: bad.to_string(),
            });
        }
        Ok(tokens
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect())
    }

}
