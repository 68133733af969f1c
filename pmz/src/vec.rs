//! Interpreter for the legacy `.vec` drawing language: one command per line,
//! `command arg1,arg2,...`, executed against mutable pen/brush/opacity state
//! into an SVG document. An `angle` command opens a nested rotated group that
//! every later command targets. Unknown commands are reported, never fatal.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::encoding::read_all_lines;
use crate::geometry::{
    cubic_interpolate, vector_add, vector_left, vector_len, vector_mul_s, vector_rotate,
    vector_sub, Point,
};
use crate::svg::SvgDocument;
use crate::values::{as_list, as_point_list_with_width, as_rgb};

const ARROW_HALF_ANGLE: f64 = 15.0;
const STAIRS_STEP_LENGTH: f64 = 4.0;
const RAILWAY_RAIL_OFFSET: f64 = 2.0;
const RAILWAY_TIE_SPACING: f64 = 8.0;
const RAILWAY_TIE_HALF_LENGTH: f64 = 4.0;

pub struct VecDrawing {
    pub svg: String,
    pub bounds: VecBounds,
    pub unknown_commands: Vec<String>,
}

/// Serialized as the `.svg.meta` sidecar so clients can center scroll/zoom
/// without parsing the SVG.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VecBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

struct Style {
    pen: String,
    brush: String,
    opacity: f64,
    angle: f64,
}

/// Tracks the extent of everything drawn, in unrotated canvas coordinates.
struct BoundsAccumulator {
    min: Option<Point>,
    max: Option<Point>,
}

impl BoundsAccumulator {
    fn new() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    fn update(&mut self, pt: Point) {
        let (min, max) = match (self.min, self.max) {
            (Some(min), Some(max)) => (min, max),
            _ => (pt, pt),
        };
        self.min = Some((min.0.min(pt.0), min.1.min(pt.1)));
        self.max = Some((max.0.max(pt.0), max.1.max(pt.1)));
    }

    fn update_all(&mut self, pts: &[Point]) {
        for pt in pts {
            self.update(*pt);
        }
    }

    fn finish(self, canvas: (i32, i32)) -> VecBounds {
        match (self.min, self.max) {
            (Some(min), Some(max)) => VecBounds {
                x: min.0,
                y: min.1,
                width: max.0 - min.0,
                height: max.1 - min.1,
            },
            _ => VecBounds {
                x: 0.0,
                y: 0.0,
                width: canvas.0 as f64,
                height: canvas.1 as f64,
            },
        }
    }
}

pub fn convert_vec_file(path: &Path) -> Result<VecDrawing> {
    convert_vec(&read_all_lines(path)?)
}

pub fn convert_vec(lines: &[String]) -> Result<VecDrawing> {
    let mut style = Style {
        pen: "none".to_string(),
        brush: "none".to_string(),
        opacity: 1.0,
        angle: 0.0,
    };

    let canvas = parse_canvas_size(lines.first().map(|l| l.as_str()).unwrap_or(""));
    let mut doc = SvgDocument::new(canvas.0, canvas.1);
    let mut bounds = BoundsAccumulator::new();
    let mut unknown: Vec<String> = Vec::new();

    for raw in lines.iter().skip(1) {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || !line.contains(' ') {
            // Quirk of the format: a bare word resets the pen.
            style.pen = "black".to_string();
            continue;
        }

        let space = line.find(' ').unwrap();
        let cmd = line[..space].trim().to_lowercase();
        let args = line[space..].trim();

        // TODO image, spotrect and spotcircle still land in unknown_commands

        let handled = match cmd.as_str() {
            "angle" => cmd_angle(&mut doc, args, &mut style, canvas),
            "pencolor" => {
                style.pen = as_rgb(args.trim());
                Ok(())
            }
            "brushcolor" => {
                style.brush = as_rgb(args.trim());
                Ok(())
            }
            "opaque" => {
                style.opacity = args.trim().parse::<f64>().unwrap_or(100.0) / 100.0;
                Ok(())
            }
            "line" => cmd_line(&mut doc, args, &style, &mut bounds, None),
            "dashed" => cmd_line(&mut doc, args, &style, &mut bounds, Some("5,5")),
            "spline" => cmd_spline(&mut doc, args, &style, &mut bounds),
            "polygon" => cmd_polygon(&mut doc, args, &style, &mut bounds),
            "arrow" => cmd_arrow(&mut doc, args, &style, &mut bounds),
            "stairs" => cmd_stairs(&mut doc, args, &style, &mut bounds),
            "railway" => cmd_railway(&mut doc, args, &style, &mut bounds),
            "ellipse" => cmd_ellipse(&mut doc, args, &style, &mut bounds),
            "textout" => cmd_text_out(&mut doc, args, &style, &mut bounds, false),
            "angletextout" => cmd_text_out(&mut doc, args, &style, &mut bounds, true),
            _ => {
                if !unknown.contains(&cmd) {
                    warn!("Unknown vec command '{}', skipped", cmd);
                    unknown.push(cmd.clone());
                }
                Ok(())
            }
        };
        if let Err(err) = handled {
            warn!("Skipped vec command '{}': {}", cmd, err);
        }
    }

    Ok(VecDrawing {
        svg: doc.finish(),
        bounds: bounds.finish(canvas),
        unknown_commands: unknown,
    })
}

fn parse_canvas_size(first_line: &str) -> (i32, i32) {
    let line = first_line.trim();
    if let Some(rest) = line.strip_prefix("Size") {
        let parts: Vec<&str> = rest.trim().split('x').collect();
        if parts.len() == 2 {
            if let (Ok(w), Ok(h)) = (parts[0].trim().parse(), parts[1].trim().parse()) {
                return (w, h);
            }
        }
    }
    (1000, 1000)
}

fn cmd_angle(doc: &mut SvgDocument, args: &str, style: &mut Style, canvas: (i32, i32)) -> Result<()> {
    let angle: f64 = args
        .trim()
        .parse()
        .map_err(|_| anyhow!("bad angle '{}'", args))?;
    let rotate = format!(
        "rotate({},{},{})",
        style.angle - angle,
        canvas.0 / 2,
        canvas.1 / 2
    );
    style.angle = angle;
    doc.open_group(&rotate);
    Ok(())
}

fn cmd_line(
    doc: &mut SvgDocument,
    args: &str,
    style: &Style,
    bounds: &mut BoundsAccumulator,
    dash: Option<&str>,
) -> Result<()> {
    let (pts, width) = as_point_list_with_width(args)?;
    bounds.update_all(&pts);
    doc.polyline(&pts, &style.pen, width, style.opacity, dash);
    Ok(())
}

fn cmd_spline(
    doc: &mut SvgDocument,
    args: &str,
    style: &Style,
    bounds: &mut BoundsAccumulator,
) -> Result<()> {
    let (pts, width) = as_point_list_with_width(args)?;
    let curve = cubic_interpolate(&pts);
    bounds.update_all(&curve);
    doc.polyline(&curve, &style.pen, width, style.opacity, None);
    Ok(())
}

fn cmd_polygon(
    doc: &mut SvgDocument,
    args: &str,
    style: &Style,
    bounds: &mut BoundsAccumulator,
) -> Result<()> {
    let (pts, width) = as_point_list_with_width(args)?;
    bounds.update_all(&pts);
    doc.polygon(&pts, &style.pen, width, &style.brush, style.opacity);
    Ok(())
}

fn cmd_arrow(
    doc: &mut SvgDocument,
    args: &str,
    style: &Style,
    bounds: &mut BoundsAccumulator,
) -> Result<()> {
    let (pts, width) = as_point_list_with_width(args)?;
    if pts.len() < 2 {
        bail!("arrow needs at least 2 points");
    }
    bounds.update_all(&pts);
    doc.polyline(&pts, &style.pen, width, style.opacity, None);

    let start = pts[pts.len() - 2];
    let end = pts[pts.len() - 1];
    let v = vector_mul_s(vector_sub(start, end), 0.3);
    let left_side = vector_add(vector_rotate(v, ARROW_HALF_ANGLE), end);
    let right_side = vector_add(vector_rotate(v, -ARROW_HALF_ANGLE), end);
    let head = [right_side, end, left_side];
    bounds.update_all(&head);
    doc.polygon(&head, &style.pen, width, &style.pen, style.opacity);
    Ok(())
}

fn cmd_stairs(
    doc: &mut SvgDocument,
    args: &str,
    style: &Style,
    bounds: &mut BoundsAccumulator,
) -> Result<()> {
    let (pts, _) = as_point_list_with_width(args)?;
    if pts.len() < 3 {
        bail!("stairs needs start, end and target points");
    }
    let (mut start, mut end, target) = (pts[0], pts[1], pts[2]);
    let path = vector_sub(target, start);
    let length = vector_len(path);
    if length == 0.0 {
        bail!("stairs has a zero-length path");
    }
    let step = vector_mul_s(path, STAIRS_STEP_LENGTH / length);
    let step_count = (length as i64) / (STAIRS_STEP_LENGTH as i64) + 1;

    for _ in 0..step_count {
        bounds.update(start);
        bounds.update(end);
        doc.polyline(&[start, end], &style.pen, 1.0, style.opacity, None);
        start = vector_add(start, step);
        end = vector_add(end, step);
    }
    Ok(())
}

fn cmd_railway(
    doc: &mut SvgDocument,
    args: &str,
    style: &Style,
    bounds: &mut BoundsAccumulator,
) -> Result<()> {
    let (pts, width) = as_point_list_with_width(args)?;
    if pts.len() < 2 {
        bail!("railway needs 2 points");
    }
    let (from, to) = (pts[0], pts[1]);
    let axis = vector_sub(to, from);
    let length = vector_len(axis);
    if length == 0.0 {
        bail!("railway has a zero-length axis");
    }
    let dir = vector_mul_s(axis, 1.0 / length);
    let left = vector_left(axis);

    // Two parallel rails.
    for side in [RAILWAY_RAIL_OFFSET, -RAILWAY_RAIL_OFFSET] {
        let offset = vector_mul_s(left, side);
        let rail = [vector_add(from, offset), vector_add(to, offset)];
        bounds.update_all(&rail);
        doc.polyline(&rail, &style.pen, width, style.opacity, None);
    }

    // Perpendicular ties at fixed spacing.
    let tie_count = (length / RAILWAY_TIE_SPACING) as i64 + 1;
    for i in 0..tie_count {
        let center = vector_add(from, vector_mul_s(dir, RAILWAY_TIE_SPACING * i as f64));
        let tie = [
            vector_add(center, vector_mul_s(left, RAILWAY_TIE_HALF_LENGTH)),
            vector_add(center, vector_mul_s(left, -RAILWAY_TIE_HALF_LENGTH)),
        ];
        bounds.update_all(&tie);
        doc.polyline(&tie, &style.pen, 1.0, style.opacity, None);
    }
    Ok(())
}

fn cmd_ellipse(
    doc: &mut SvgDocument,
    args: &str,
    style: &Style,
    bounds: &mut BoundsAccumulator,
) -> Result<()> {
    let parts = as_list(args);
    if parts.len() < 4 {
        bail!("ellipse needs a bounding rectangle");
    }
    let mut coords = [0.0f64; 4];
    for (i, part) in parts.iter().take(4).enumerate() {
        coords[i] = part
            .parse()
            .map_err(|_| anyhow!("non-numeric ellipse coordinate '{}'", part))?;
    }
    let (x1, y1, x2, y2) = (coords[0], coords[1], coords[2], coords[3]);
    bounds.update((x1, y1));
    bounds.update((x2, y2));
    doc.ellipse(
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0),
        (x2 - x1).abs() / 2.0,
        (y2 - y1).abs() / 2.0,
        &style.pen,
        &style.brush,
        style.opacity,
    );
    Ok(())
}

fn cmd_text_out(
    doc: &mut SvgDocument,
    args: &str,
    style: &Style,
    bounds: &mut BoundsAccumulator,
    with_angle: bool,
) -> Result<()> {
    let parts = as_list(args.trim_matches('\''));
    let fixed = if with_angle { 5 } else { 4 };
    if parts.len() <= fixed {
        bail!("text command is missing its text");
    }

    let mut i = 0;
    let angle: f64 = if with_angle {
        i += 1;
        parts[0]
            .parse()
            .map_err(|_| anyhow!("bad text angle '{}'", parts[0]))?
    } else {
        0.0
    };
    let font_family = parts[i].clone();
    let font_size = parts[i + 1].clone();
    let x: f64 = parts[i + 2]
        .parse()
        .map_err(|_| anyhow!("bad text position '{}'", parts[i + 2]))?;
    let y: f64 = parts[i + 3]
        .parse()
        .map_err(|_| anyhow!("bad text position '{}'", parts[i + 3]))?;

    // The tail of the argument list is the text itself; commas inside it were
    // already split, so rejoin with spaces the way the original renderer did.
    let mut text = parts[fixed..].join(" ");
    let mut font_weight = "normal";
    if let Some(stripped) = text.strip_suffix(" 1") {
        text = stripped.to_string();
        font_weight = "bold";
    }
    let text = text.trim_matches('\'');

    let transform = if with_angle {
        format!("rotate({} {},{}) translate(0 {})", -angle, x, y, font_size)
    } else {
        format!("translate(0 {})", font_size)
    };

    bounds.update((x, y));
    doc.text(
        (x, y),
        text,
        &font_family,
        &font_size,
        font_weight,
        &style.pen,
        style.opacity,
        Some(&transform),
    );
    Ok(())
}
