//! 将标注绘制为 SVG。闭合图形绘制为带填充的多边形，开放图形绘制为折线，
//! 绘制顺序即提取顺序。页面坐标原点在左下角，输出时翻转 y 轴并保持纵横比。

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use fdfwkt_config::RenderConfig;
use fdfwkt_core::annotation::{Annotation, AnnotationProperties, Rgb};
use fdfwkt_core::geometry::{Bounds2D, Point2};
use glam::DVec2;
use tracing::{debug, info};

use crate::errors::FrontendError;

/// 未指定线宽时使用的默认值（点）。
const DEFAULT_LINE_WEIGHT: f64 = 1.0;
const POINTS_PER_INCH: f64 = 72.0;

struct Shape<'a> {
    annotation: &'a Annotation,
    points: Vec<Point2>,
}

/// 页面坐标到画布像素的变换。
struct Viewport {
    origin: DVec2,
    top: f64,
    scale: f64,
    offset: DVec2,
}

impl Viewport {
    fn fit(bounds: &Bounds2D, config: &RenderConfig) -> Self {
        let side = canvas_side(config);
        let available = (side - 2.0 * config.padding_px).max(1.0);
        let extent = bounds.width().max(bounds.height());
        let scale = if extent > f64::EPSILON {
            available / extent
        } else {
            1.0
        };
        let offset = DVec2::new(
            config.padding_px + (available - bounds.width() * scale) * 0.5,
            config.padding_px + (available - bounds.height() * scale) * 0.5,
        );
        Self {
            origin: bounds.min().as_vec2(),
            top: bounds.max().y(),
            scale,
            offset,
        }
    }

    fn project(&self, point: Point2) -> DVec2 {
        let local = DVec2::new(point.x() - self.origin.x, self.top - point.y());
        self.offset + local * self.scale
    }
}

fn canvas_side(config: &RenderConfig) -> f64 {
    (config.size_inches * config.dpi).max(1.0)
}

/// 渲染好的 SVG 文本及其中绘制的图形数量。
#[derive(Debug, Clone)]
pub struct RenderedSvg {
    pub svg: String,
    pub shapes: usize,
}

/// 渲染为 SVG 文本。没有任何可绘制标注时返回 [`FrontendError::NothingToPlot`]。
pub fn render_svg<'a, I>(annotations: I, config: &RenderConfig) -> Result<RenderedSvg, FrontendError>
where
    I: IntoIterator<Item = &'a Annotation>,
{
    let shapes: Vec<Shape<'a>> = annotations
        .into_iter()
        .filter_map(|annotation| {
            if !annotation.kind.is_closed() && !annotation.kind.is_open() {
                debug!(kind = %annotation.kind, "该类型没有绘制规则，跳过");
                return None;
            }
            match annotation.points() {
                Ok(points) if points.len() >= 2 => Some(Shape { annotation, points }),
                Ok(_) => {
                    debug!(kind = %annotation.kind, "顶点不足两个，跳过");
                    None
                }
                Err(err) => {
                    debug!(kind = %annotation.kind, error = %err, "顶点无法解析，跳过");
                    None
                }
            }
        })
        .collect();

    if shapes.is_empty() {
        return Err(FrontendError::NothingToPlot);
    }

    let bounds = Bounds2D::from_points(shapes.iter().flat_map(|shape| shape.points.iter().copied()));
    let viewport = Viewport::fit(&bounds, config);
    let side = canvas_side(config);
    let px_per_point = config.dpi / POINTS_PER_INCH;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{side:.0}" height="{side:.0}" viewBox="0 0 {side:.0} {side:.0}">"#
    );
    let _ = writeln!(
        svg,
        r#"  <rect width="100%" height="100%" fill="{}"/>"#,
        escape_xml(&config.background)
    );
    for shape in &shapes {
        write_shape(&mut svg, shape, &viewport, px_per_point);
    }
    svg.push_str("</svg>\n");
    Ok(RenderedSvg {
        svg,
        shapes: shapes.len(),
    })
}

/// 渲染并写入文件，返回绘制的图形数量。
pub fn write_svg<'a, I>(path: &Path, annotations: I, config: &RenderConfig) -> Result<usize, FrontendError>
where
    I: IntoIterator<Item = &'a Annotation>,
{
    let RenderedSvg { svg, shapes } = render_svg(annotations, config)?;
    fs::write(path, svg).map_err(|source| FrontendError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), shapes, "已写出 SVG");
    Ok(shapes)
}

fn write_shape(svg: &mut String, shape: &Shape<'_>, viewport: &Viewport, px_per_point: f64) {
    let points: Vec<String> = shape
        .points
        .iter()
        .map(|point| {
            let projected = viewport.project(*point);
            format!("{:.2},{:.2}", projected.x, projected.y)
        })
        .collect();
    let properties = &shape.annotation.properties;
    let closed = shape.annotation.kind.is_closed();
    let element = if closed { "polygon" } else { "polyline" };

    let _ = write!(svg, r#"  <{element} points="{}""#, points.join(" "));
    if closed {
        match properties.fill_color {
            Some(color) => {
                let _ = write!(svg, r#" fill="{}""#, rgb(color));
                if let Some(opacity) = properties.fill_opacity {
                    let _ = write!(svg, r#" fill-opacity="{opacity}""#);
                }
            }
            None => svg.push_str(r#" fill="none""#),
        }
    } else {
        svg.push_str(r#" fill="none""#);
    }
    write_stroke(svg, properties, px_per_point);

    match &shape.annotation.label {
        Some(label) => {
            let _ = writeln!(svg, "><title>{}</title></{element}>", escape_xml(label));
        }
        None => svg.push_str("/>\n"),
    }
}

fn write_stroke(svg: &mut String, properties: &AnnotationProperties, px_per_point: f64) {
    let stroke = properties.line_color.map(rgb).unwrap_or_else(|| "black".to_string());
    let width = properties.line_weight.unwrap_or(DEFAULT_LINE_WEIGHT) * px_per_point;
    let _ = write!(svg, r#" stroke="{stroke}" stroke-width="{width:.2}""#);
    if let Some(opacity) = properties.line_opacity {
        let _ = write!(svg, r#" stroke-opacity="{opacity}""#);
    }
    if let Some(dash) = properties.line_type.as_ref().filter(|dash| !dash.is_solid()) {
        let array: Vec<String> = dash
            .pattern
            .iter()
            .map(|length| format!("{:.2}", length * px_per_point))
            .collect();
        let _ = write!(
            svg,
            r#" stroke-dasharray="{}" stroke-dashoffset="{:.2}""#,
            array.join(","),
            dash.phase * px_per_point
        );
    }
}

fn rgb(color: Rgb) -> String {
    let channel = |value: f64| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "rgb({},{},{})",
        channel(color.r),
        channel(color.g),
        channel(color.b)
    )
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}
