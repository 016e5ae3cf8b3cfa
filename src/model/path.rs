//! Normalized path data for persisted fingers.
//!
//! Fingers are stored as SVG-style path data in a 0–100 coordinate space,
//! independent of the working square's size. Output is always absolute
//! `M x y C x1 y1 x2 y2 x y …`; the parser also accepts relative commands and
//! `L H V S Q T A Z`, converting everything to cubics. Arcs become one cubic
//! per quarter turn at most, and further subpaths are joined to the previous
//! one by a straight connector.

use std::f64::consts::{FRAC_PI_2, TAU};

use crate::geometry::{CubicBezier, Finger, Lobe};
use crate::math::{Point2, Vector2};

/// Side length of the normalized coordinate space.
pub const NORMALIZED_SIZE: f64 = 100.0;

/// Formats a finger as normalized path data.
#[must_use]
pub fn format_path(finger: &Finger, square_size: f64) -> String {
    let scale = NORMALIZED_SIZE / square_size;
    let pt = |p: &Point2| format!("{} {}", format_number(p.x * scale), format_number(p.y * scale));

    let mut out = format!("M {}", pt(&finger.start()));
    for seg in finger.segments() {
        out.push_str(&format!(" C {} {} {}", pt(&seg.p1), pt(&seg.p2), pt(&seg.p3)));
    }
    out
}

/// Formats a coordinate with up to six decimals, trailing zeros trimmed.
#[must_use]
pub fn format_number(value: f64) -> String {
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_owned(),
        other => other.to_owned(),
    }
}

/// Parses path data into absolute cubic segments, in the coordinates of the data.
///
/// Returns `None` for malformed data, non-finite numbers, or data without any
/// segment.
#[must_use]
pub fn parse_path(data: &str) -> Option<Vec<CubicBezier>> {
    let tokens = tokenize(data)?;
    let mut parser = PathBuilder::default();
    let mut i = 0;
    let mut command: Option<char> = None;

    while i < tokens.len() {
        if let Token::Command(c) = tokens[i] {
            command = Some(c);
            i += 1;
            if c.eq_ignore_ascii_case(&'z') {
                parser.close()?;
                continue;
            }
        }
        let c = command?;
        let arity = arity(c)?;
        if arity == 0 {
            // Numbers after a close command.
            return None;
        }
        let args: Vec<f64> = tokens
            .get(i..i + arity)?
            .iter()
            .map(|t| match t {
                Token::Number(v) => Some(*v),
                Token::Command(_) => None,
            })
            .collect::<Option<_>>()?;
        i += arity;
        parser.apply(c, &args)?;
        if c == 'M' {
            command = Some('L');
        } else if c == 'm' {
            command = Some('l');
        }
    }

    if parser.segments.is_empty() {
        return None;
    }
    Some(parser.segments)
}

/// Parses normalized path data into a finger in square coordinates.
///
/// Returns `None` when the data is malformed or the curve is degenerate.
#[must_use]
pub fn normalize_path(data: &str, lobe: Lobe, square_size: f64) -> Option<Finger> {
    let segments = parse_path(data)?;
    let scale = square_size / NORMALIZED_SIZE;
    let segments: Vec<CubicBezier> = segments
        .iter()
        .map(|s| s.map(|p| Point2::new(p.x * scale, p.y * scale)))
        .collect();
    let finger = Finger::new(lobe, segments).ok()?;
    if (finger.end() - finger.start()).norm() <= f64::EPSILON * square_size {
        return None;
    }
    Some(finger)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Command(char),
    Number(f64),
}

fn arity(command: char) -> Option<usize> {
    match command.to_ascii_uppercase() {
        'M' | 'L' | 'T' => Some(2),
        'H' | 'V' => Some(1),
        'C' => Some(6),
        'S' | 'Q' => Some(4),
        'A' => Some(7),
        'Z' => Some(0),
        _ => None,
    }
}

fn tokenize(data: &str) -> Option<Vec<Token>> {
    let bytes = data.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() || b == b',' {
            i += 1;
        } else if b"MmLlHhVvCcSsQqTtAaZz".contains(&b) {
            tokens.push(Token::Command(char::from(b)));
            i += 1;
        } else if b.is_ascii_digit() || b == b'.' || b == b'-' || b == b'+' {
            let end = scan_number(bytes, i)?;
            let value: f64 = data[i..end].parse().ok()?;
            if !value.is_finite() {
                return None;
            }
            tokens.push(Token::Number(value));
            i = end;
        } else {
            return None;
        }
    }
    Some(tokens)
}

/// End index of the number starting at `start`: `[-+]?(\d*\.\d+|\d+\.?\d*)([eE][-+]?\d+)?`.
fn scan_number(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if matches!(bytes.get(i), Some(b'-' | b'+')) {
        i += 1;
    }
    let int_start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let mut digits = i > int_start;
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        let frac_start = i;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        digits |= i > frac_start;
    }
    if !digits {
        return None;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'-' | b'+')) {
            j += 1;
        }
        let exp_start = j;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    Some(i)
}

/// Accumulates absolute cubic segments while walking path commands.
#[derive(Debug, Default)]
struct PathBuilder {
    segments: Vec<CubicBezier>,
    current: Option<Point2>,
    subpath_start: Option<Point2>,
    last_cubic_handle: Option<Point2>,
    last_quad_handle: Option<Point2>,
}

impl PathBuilder {
    fn apply(&mut self, command: char, args: &[f64]) -> Option<()> {
        let relative = command.is_ascii_lowercase();
        let upper = command.to_ascii_uppercase();

        if upper == 'M' {
            let origin = self.current.unwrap_or_else(Point2::origin);
            let p = if relative {
                origin + Vector2::new(args[0], args[1])
            } else {
                Point2::new(args[0], args[1])
            };
            // A finger is a single curve: later subpaths hang off a connector.
            if let Some(from) = self.current.filter(|from| *from != p) {
                self.segments.push(CubicBezier::line(from, p));
            }
            self.current = Some(p);
            self.subpath_start = Some(p);
            self.last_cubic_handle = None;
            self.last_quad_handle = None;
            return Some(());
        }

        let from = self.current?;
        let abs = |x: f64, y: f64| {
            if relative {
                Point2::new(from.x + x, from.y + y)
            } else {
                Point2::new(x, y)
            }
        };

        if upper == 'A' {
            let to = abs(args[5], args[6]);
            let arc = ArcTo {
                radii: (args[0], args[1]),
                rotation: args[2],
                large_arc: args[3].abs() >= 1.0,
                sweep: args[4].abs() >= 1.0,
            };
            let pieces = arc.to_cubics(from, to);
            self.last_cubic_handle = pieces.last().map(|c| c.p2);
            self.last_quad_handle = None;
            self.segments.extend(pieces);
            self.current = Some(to);
            return Some(());
        }

        let (segment, cubic_handle, quad_handle) = match upper {
            'L' => (CubicBezier::line(from, abs(args[0], args[1])), None, None),
            'H' => {
                let x = if relative { from.x + args[0] } else { args[0] };
                (CubicBezier::line(from, Point2::new(x, from.y)), None, None)
            }
            'V' => {
                let y = if relative { from.y + args[0] } else { args[0] };
                (CubicBezier::line(from, Point2::new(from.x, y)), None, None)
            }
            'C' => {
                let p1 = abs(args[0], args[1]);
                let p2 = abs(args[2], args[3]);
                let p3 = abs(args[4], args[5]);
                (CubicBezier::new(from, p1, p2, p3), Some(p2), None)
            }
            'S' => {
                let p1 = reflect(self.last_cubic_handle, from);
                let p2 = abs(args[0], args[1]);
                let p3 = abs(args[2], args[3]);
                (CubicBezier::new(from, p1, p2, p3), Some(p2), None)
            }
            'Q' => {
                let q = abs(args[0], args[1]);
                let p3 = abs(args[2], args[3]);
                (quad_to_cubic(from, q, p3), None, Some(q))
            }
            'T' => {
                let q = reflect(self.last_quad_handle, from);
                let p3 = abs(args[0], args[1]);
                (quad_to_cubic(from, q, p3), None, Some(q))
            }
            _ => return None,
        };

        self.segments.push(segment);
        self.current = Some(segment.p3);
        self.last_cubic_handle = cubic_handle;
        self.last_quad_handle = quad_handle;
        Some(())
    }

    fn close(&mut self) -> Option<()> {
        let from = self.current?;
        let start = self.subpath_start?;
        if (from - start).norm() > 0.0 {
            self.segments.push(CubicBezier::line(from, start));
        }
        self.current = Some(start);
        self.last_cubic_handle = None;
        self.last_quad_handle = None;
        Some(())
    }
}

/// Reflection of the previous handle about the current point, or the point itself.
fn reflect(handle: Option<Point2>, about: Point2) -> Point2 {
    handle.map_or(about, |h| about + (about - h))
}

/// Parameters of an elliptical arc command.
#[derive(Debug, Clone, Copy)]
struct ArcTo {
    radii: (f64, f64),
    /// X-axis rotation in degrees.
    rotation: f64,
    large_arc: bool,
    sweep: bool,
}

impl ArcTo {
    /// Cubic approximation of the arc from `from` to `to`, at most a quarter
    /// turn per cubic.
    ///
    /// Uses the endpoint-to-center conversion of SVG implementation notes
    /// F.6.5, with out-of-range radii scaled up. Zero radii give a line;
    /// coincident endpoints give nothing.
    fn to_cubics(self, from: Point2, to: Point2) -> Vec<CubicBezier> {
        if from == to {
            return Vec::new();
        }
        let (mut rx, mut ry) = (self.radii.0.abs(), self.radii.1.abs());
        if rx <= f64::EPSILON || ry <= f64::EPSILON {
            return vec![CubicBezier::line(from, to)];
        }

        let (sin, cos) = self.rotation.rem_euclid(360.0).to_radians().sin_cos();
        let half = (from - to) / 2.0;
        let x1 = cos * half.x + sin * half.y;
        let y1 = -sin * half.x + cos * half.y;

        let lambda = (x1 * x1) / (rx * rx) + (y1 * y1) / (ry * ry);
        if lambda > 1.0 {
            let s = lambda.sqrt();
            rx *= s;
            ry *= s;
        }

        let (rx2, ry2) = (rx * rx, ry * ry);
        let den = rx2 * y1 * y1 + ry2 * x1 * x1;
        if den <= 0.0 {
            return vec![CubicBezier::line(from, to)];
        }
        let num = rx2 * ry2 - rx2 * y1 * y1 - ry2 * x1 * x1;
        let mut coef = (num / den).max(0.0).sqrt();
        if self.large_arc == self.sweep {
            coef = -coef;
        }
        let cx1 = coef * rx * y1 / ry;
        let cy1 = -coef * ry * x1 / rx;
        let mid = Point2::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0);
        let center = Point2::new(cos * cx1 - sin * cy1 + mid.x, sin * cx1 + cos * cy1 + mid.y);

        let u = Vector2::new((x1 - cx1) / rx, (y1 - cy1) / ry);
        let v = Vector2::new((-x1 - cx1) / rx, (-y1 - cy1) / ry);
        let theta = u.y.atan2(u.x);
        let mut delta = (u.x * v.y - u.y * v.x).atan2(u.dot(&v));
        if !self.sweep && delta > 0.0 {
            delta -= TAU;
        } else if self.sweep && delta < 0.0 {
            delta += TAU;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = ((delta.abs() / FRAC_PI_2 - 1e-9).ceil() as usize).max(1);
        #[allow(clippy::cast_precision_loss)]
        let step = delta / count as f64;

        let point = |t: f64| {
            let (st, ct) = t.sin_cos();
            Point2::new(
                center.x + rx * cos * ct - ry * sin * st,
                center.y + rx * sin * ct + ry * cos * st,
            )
        };
        let tangent = |t: f64| {
            let (st, ct) = t.sin_cos();
            Vector2::new(-rx * cos * st - ry * sin * ct, -rx * sin * st + ry * cos * ct)
        };
        let k = 4.0 / 3.0 * (step / 4.0).tan();

        let mut start = from;
        (0..count)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t0 = theta + step * i as f64;
                let t1 = t0 + step;
                let end = if i + 1 == count { to } else { point(t1) };
                let cubic = CubicBezier::new(start, start + tangent(t0) * k, end - tangent(t1) * k, end);
                start = end;
                cubic
            })
            .collect()
    }
}

fn quad_to_cubic(p0: Point2, q: Point2, p3: Point2) -> CubicBezier {
    let p1 = p0 + (q - p0) * (2.0 / 3.0);
    let p2 = p3 + (q - p3) * (2.0 / 3.0);
    CubicBezier::new(p0, p1, p2, p3)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_points_eq(a: &Point2, b: &Point2) {
        assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-9);
        assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-9);
    }

    #[test]
    fn numbers_are_trimmed() {
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
        assert_eq!(format_number(-0.000_000_1), "0");
        assert_eq!(format_number(-2.25), "-2.25");
    }

    #[test]
    fn format_uses_normalized_space() {
        let finger = Finger::straight(Lobe::Left, Point2::new(0.0, 75.0), Point2::new(150.0, 75.0));
        let text = format_path(&finger, 150.0);
        assert_eq!(text, "M 0 50 C 33.333333 50 66.666667 50 100 50");
    }

    #[test]
    fn formatted_path_parses_back() {
        let mut finger = Finger::straight(Lobe::Right, Point2::new(40.0, 0.0), Point2::new(40.0, 200.0));
        finger.set_point(1, Point2::new(71.234_567, 50.5)).unwrap();
        finger.split_segment(0, 0.4).unwrap();
        let text = format_path(&finger, 200.0);
        let back = normalize_path(&text, Lobe::Right, 200.0).unwrap();
        assert_eq!(back.segment_count(), 2);
        for (a, b) in finger.points().iter().zip(back.points()) {
            assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-5);
            assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-5);
        }
    }

    #[test]
    fn relative_and_shorthand_commands() {
        let segs = parse_path("m10 20 l 30 0 h-10 v5 q 5 5 10 0 t 10 0 s 5 5 10 0").unwrap();
        assert_eq!(segs.len(), 6);
        assert_points_eq(&segs[0].p0, &Point2::new(10.0, 20.0));
        assert_points_eq(&segs[0].p3, &Point2::new(40.0, 20.0));
        assert_points_eq(&segs[1].p3, &Point2::new(30.0, 20.0));
        assert_points_eq(&segs[2].p3, &Point2::new(30.0, 25.0));
        // Quadratic control (35, 30) elevated to cubic handles.
        assert_points_eq(&segs[3].p1, &Point2::new(30.0 + 5.0 * 2.0 / 3.0, 25.0 + 5.0 * 2.0 / 3.0));
        assert_points_eq(&segs[3].p3, &Point2::new(40.0, 25.0));
        // T reflects the quadratic control (35, 30) about (40, 25) to (45, 20).
        assert_points_eq(&segs[4].p3, &Point2::new(50.0, 25.0));
        assert_points_eq(&segs[4].p1, &Point2::new(40.0 + 5.0 * 2.0 / 3.0, 25.0 - 5.0 * 2.0 / 3.0));
        // S after a non-cubic uses the current point as first handle.
        assert_points_eq(&segs[5].p1, &Point2::new(50.0, 25.0));
    }

    #[test]
    fn implicit_lineto_after_moveto() {
        let segs = parse_path("M0,0 10,0 10,10").unwrap();
        assert_eq!(segs.len(), 2);
        assert!(segs[1].is_straight(1e-12));
    }

    #[test]
    fn compact_number_syntax() {
        let segs = parse_path("M0-5L.5.5e1").unwrap();
        assert_points_eq(&segs[0].p0, &Point2::new(0.0, -5.0));
        assert_points_eq(&segs[0].p3, &Point2::new(0.5, 5.0));
    }

    #[test]
    fn close_adds_line_back_to_start() {
        let segs = parse_path("M0 0 L10 0 L10 10 Z").unwrap();
        assert_eq!(segs.len(), 3);
        assert_points_eq(&segs[2].p3, &Point2::new(0.0, 0.0));
    }

    #[test]
    fn malformed_data_is_rejected() {
        for bad in [
            "",
            "M 0 0",
            "C 1 2 3 4 5 6",
            "M 0 0 C 1 2 3",
            "M 0 0 A 5 5 0 0 1",
            "M 0 0 R 1 1",
            "M 0 0 L x 1",
            "M 0 0 L 1e999 1",
            "M 0 0 Z 5",
        ] {
            assert!(parse_path(bad).is_none(), "accepted {bad:?}");
        }
    }

    #[test]
    fn semicircle_arc_becomes_two_quarter_cubics() {
        let segs = parse_path("M 0 0 A 10 10 0 0 1 20 0").unwrap();
        assert_eq!(segs.len(), 2);
        assert_points_eq(&segs[0].p0, &Point2::new(0.0, 0.0));
        assert_points_eq(&segs[0].p3, &Point2::new(10.0, -10.0));
        assert_points_eq(&segs[1].p0, &segs[0].p3);
        assert_points_eq(&segs[1].p3, &Point2::new(20.0, 0.0));
        // Quarter-circle handle length 4/3·tan(π/8)·r.
        let k = 4.0 / 3.0 * (std::f64::consts::PI / 8.0).tan() * 10.0;
        assert_points_eq(&segs[0].p1, &Point2::new(0.0, -k));
        let center = Point2::new(10.0, 0.0);
        for seg in &segs {
            let r = (seg.evaluate(0.5) - center).norm();
            assert_abs_diff_eq!(r, 10.0, epsilon = 5e-3);
        }
    }

    #[test]
    fn arc_flags_and_radii() {
        // Counter-sweep bulges the other way.
        let segs = parse_path("M 0 0 A 10 10 0 0 0 20 0").unwrap();
        assert_points_eq(&segs[0].p3, &Point2::new(10.0, 10.0));

        // Radii too small for the chord are scaled up to a semicircle.
        let segs = parse_path("M 0 0 a 1 1 0 0 1 20 0").unwrap();
        assert_eq!(segs.len(), 2);
        assert_points_eq(&segs[1].p3, &Point2::new(20.0, 0.0));

        // Large arc: three quarter turns around (10, 10).
        let segs = parse_path("M 10 0 A 10 10 0 1 1 0 10").unwrap();
        assert_eq!(segs.len(), 3);
        for seg in &segs {
            assert_abs_diff_eq!((seg.p3 - Point2::new(10.0, 10.0)).norm(), 10.0, epsilon = 1e-9);
        }

        // Zero radius is a straight line.
        let segs = parse_path("M 0 0 A 0 5 0 0 1 20 0").unwrap();
        assert_eq!(segs.len(), 1);
        assert!(segs[0].is_straight(1e-12));
    }

    #[test]
    fn subpaths_are_joined_by_a_connector() {
        let segs = parse_path("M 0 0 L 10 0 M 20 0 L 30 0").unwrap();
        assert_eq!(segs.len(), 3);
        assert_points_eq(&segs[1].p0, &Point2::new(10.0, 0.0));
        assert_points_eq(&segs[1].p3, &Point2::new(20.0, 0.0));
        assert!(segs[1].is_straight(1e-12));
        assert_points_eq(&segs[2].p3, &Point2::new(30.0, 0.0));

        // Relative moveto continues from the current point.
        let segs = parse_path("M 0 0 L 10 0 m 5 5 l 5 0").unwrap();
        assert_points_eq(&segs[1].p3, &Point2::new(15.0, 5.0));
        assert_points_eq(&segs[2].p3, &Point2::new(20.0, 5.0));
    }

    #[test]
    fn degenerate_finger_is_rejected() {
        assert!(normalize_path("M 10 10 L 10 10", Lobe::Left, 100.0).is_none());
    }
}
