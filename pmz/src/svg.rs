//! A small SVG writer. The documents we emit are flat lists of shapes with
//! the occasional nested rotation group, so assembling the XML by hand keeps
//! the output byte-stable and dependency-free.

use std::fmt::Write;

use crate::geometry::Point;

pub struct SvgDocument {
    body: String,
    width: i32,
    height: i32,
    open_groups: usize,
}

impl SvgDocument {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            body: String::new(),
            width,
            height,
            open_groups: 0,
        }
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn indent(&mut self) {
        for _ in 0..=self.open_groups {
            self.body.push_str("  ");
        }
    }

    /// Opens a nested group; it stays open until the document is finished or
    /// another group closes it from outside.
    pub fn open_group(&mut self, transform: &str) {
        self.indent();
        let _ = writeln!(self.body, "<g transform=\"{}\">", escape(transform));
        self.open_groups += 1;
    }

    pub fn polyline(
        &mut self,
        points: &[Point],
        stroke: &str,
        stroke_width: f64,
        opacity: f64,
        dash: Option<&str>,
    ) {
        self.indent();
        let dash = match dash {
            Some(d) => format!(" stroke-dasharray=\"{}\"", d),
            None => String::new(),
        };
        let _ = writeln!(
            self.body,
            "<polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"{} opacity=\"{}\" />",
            format_points(points),
            stroke,
            stroke_width,
            dash,
            opacity
        );
    }

    pub fn polygon(
        &mut self,
        points: &[Point],
        stroke: &str,
        stroke_width: f64,
        fill: &str,
        opacity: f64,
    ) {
        self.indent();
        let _ = writeln!(
            self.body,
            "<polygon points=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\" opacity=\"{}\" />",
            format_points(points),
            fill,
            stroke,
            stroke_width,
            opacity
        );
    }

    pub fn ellipse(
        &mut self,
        center: Point,
        rx: f64,
        ry: f64,
        stroke: &str,
        fill: &str,
        opacity: f64,
    ) {
        self.indent();
        let _ = writeln!(
            self.body,
            "<ellipse cx=\"{}\" cy=\"{}\" rx=\"{}\" ry=\"{}\" fill=\"{}\" stroke=\"{}\" opacity=\"{}\" />",
            center.0, center.1, rx, ry, fill, stroke, opacity
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn text(
        &mut self,
        pos: Point,
        content: &str,
        font_family: &str,
        font_size: &str,
        font_weight: &str,
        fill: &str,
        opacity: f64,
        transform: Option<&str>,
    ) {
        self.indent();
        let transform = match transform {
            Some(t) => format!(" transform=\"{}\"", escape(t)),
            None => String::new(),
        };
        let _ = writeln!(
            self.body,
            "<text x=\"{}\" y=\"{}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"{}\" fill=\"{}\" opacity=\"{}\"{}>{}</text>",
            pos.0,
            pos.1,
            escape(font_family),
            escape(font_size),
            font_weight,
            fill,
            opacity,
            transform,
            escape(content)
        );
    }

    pub fn finish(mut self) -> String {
        let mut out = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}px\" height=\"{}px\" baseProfile=\"tiny\" version=\"1.2\">\n",
            self.width, self.height
        );
        out.push_str(&self.body);
        while self.open_groups > 0 {
            self.open_groups -= 1;
            for _ in 0..=self.open_groups {
                out.push_str("  ");
            }
            out.push_str("</g>\n");
        }
        out.push_str("</svg>\n");
        out
    }
}

fn format_points(points: &[Point]) -> String {
    let mut out = String::new();
    for (i, (x, y)) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{},{}", x, y);
    }
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_close_on_finish() {
        let mut doc = SvgDocument::new(10, 10);
        doc.open_group("rotate(45,5,5)");
        doc.polyline(&[(0.0, 0.0), (1.0, 1.0)], "#000", 1.0, 1.0, None);
        let out = doc.finish();
        assert!(out.contains("<g transform=\"rotate(45,5,5)\">"));
        assert!(out.contains("points=\"0,0 1,1\""));
        assert_eq!(out.matches("</g>").count(), 1);
        assert!(out.ends_with("</svg>\n"));
    }

    #[test]
    fn text_is_escaped() {
        let mut doc = SvgDocument::new(10, 10);
        doc.text((0.0, 0.0), "a<b & c", "Arial", "10", "normal", "#000", 1.0, None);
        assert!(doc.finish().contains(">a&lt;b &amp; c</text>"));
    }
}
