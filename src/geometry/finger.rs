use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};
use crate::math::{Point2, Vector2};

use super::{Aabb, CubicBezier};

/// One of the two halves of the heart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lobe {
    /// Fingers run left to right and are ordered by `y`.
    Left,
    /// Fingers run top to bottom and are ordered by `x`.
    Right,
}

impl Lobe {
    /// Both lobes, left first.
    pub const ALL: [Lobe; 2] = [Lobe::Left, Lobe::Right];

    /// The other lobe.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Coordinate along which this lobe's fingers are ordered.
    #[must_use]
    pub fn order_coord(self, p: &Point2) -> f64 {
        match self {
            Self::Left => p.y,
            Self::Right => p.x,
        }
    }

    /// Coordinate along which this lobe's fingers run.
    #[must_use]
    pub fn span_coord(self, p: &Point2) -> f64 {
        match self {
            Self::Left => p.x,
            Self::Right => p.y,
        }
    }

    /// Index into per-lobe arrays.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    /// Single-letter tag used in finger identifiers.
    #[must_use]
    pub fn tag(self) -> char {
        match self {
            Self::Left => 'L',
            Self::Right => 'R',
        }
    }
}

impl fmt::Display for Lobe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// What a control point of a finger is, by flat index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointRole {
    /// First or last point; pinned to a square edge.
    Anchor,
    /// Shared endpoint between two consecutive segments.
    Joint,
    /// Off-curve control handle.
    Handle,
}

/// A boundary curve of one lobe: one or more C0-continuous cubic segments.
///
/// Control points are addressed by a flat index `0..=3*m` for `m` segments.
/// Index `3k` is the start of segment `k` (and the end of segment `k-1`);
/// `3k+1` and `3k+2` are its handles.
#[derive(Debug, Clone, PartialEq)]
pub struct Finger {
    lobe: Lobe,
    segments: Vec<CubicBezier>,
}

impl Finger {
    /// Creates a finger from its segments.
    ///
    /// Each segment's start is snapped onto the previous segment's end.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::Degenerate` if `segments` is empty or contains
    /// non-finite coordinates.
    pub fn new(lobe: Lobe, mut segments: Vec<CubicBezier>) -> Result<Self> {
        if segments.is_empty() {
            return Err(GeometryError::Degenerate("finger without segments".to_owned()).into());
        }
        if !segments.iter().all(CubicBezier::is_finite) {
            return Err(GeometryError::Degenerate("non-finite control point".to_owned()).into());
        }
        for i in 1..segments.len() {
            segments[i].p0 = segments[i - 1].p3;
        }
        Ok(Self { lobe, segments })
    }

    /// A single straight segment from `start` to `end`.
    #[must_use]
    pub fn straight(lobe: Lobe, start: Point2, end: Point2) -> Self {
        Self {
            lobe,
            segments: vec![CubicBezier::line(start, end)],
        }
    }

    /// The lobe this finger belongs to.
    #[must_use]
    pub fn lobe(&self) -> Lobe {
        self.lobe
    }

    /// The segments in order.
    #[must_use]
    pub fn segments(&self) -> &[CubicBezier] {
        &self.segments
    }

    /// Number of segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The four-point view, when the finger is a single segment.
    #[must_use]
    pub fn as_single(&self) -> Option<&CubicBezier> {
        match self.segments.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Number of addressable control points (`3m + 1`).
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.segments.len() * 3 + 1
    }

    /// Start anchor.
    #[must_use]
    pub fn start(&self) -> Point2 {
        self.segments[0].p0
    }

    /// End anchor.
    #[must_use]
    pub fn end(&self) -> Point2 {
        self.segments[self.segments.len() - 1].p3
    }

    /// Role of the control point at `index`.
    #[must_use]
    pub fn role(&self, index: usize) -> Option<PointRole> {
        let last = self.point_count() - 1;
        match index {
            i if i > last => None,
            0 => Some(PointRole::Anchor),
            i if i == last => Some(PointRole::Anchor),
            i if i % 3 == 0 => Some(PointRole::Joint),
            _ => Some(PointRole::Handle),
        }
    }

    /// Control point at flat `index`.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<Point2> {
        let (seg, slot) = self.locate(index)?;
        Some(self.segments[seg].points()[slot])
    }

    /// All control points in flat order.
    #[must_use]
    pub fn points(&self) -> Vec<Point2> {
        let mut pts = Vec::with_capacity(self.point_count());
        pts.push(self.start());
        for seg in &self.segments {
            pts.extend_from_slice(&[seg.p1, seg.p2, seg.p3]);
        }
        pts
    }

    /// Moves the control point at `index` to `p`.
    ///
    /// Moving a joint carries its two handles along by the same delta.
    /// Anchors are not re-projected here; see `WorkingSquare::pin_anchors`.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::PointOutOfRange` for an invalid index.
    pub fn set_point(&mut self, index: usize, p: Point2) -> Result<()> {
        let current = self.point(index).ok_or(GeometryError::PointOutOfRange {
            index,
            count: self.point_count(),
        })?;
        if self.role(index) == Some(PointRole::Joint) {
            let delta = p - current;
            self.translate_raw(index - 1, delta);
            self.translate_raw(index + 1, delta);
        }
        self.set_raw(index, p);
        Ok(())
    }

    /// Sets one control point, keeping shared joints consistent. Out-of-range indices are ignored.
    pub(crate) fn set_raw(&mut self, index: usize, p: Point2) {
        let Some((seg, slot)) = self.locate(index) else {
            return;
        };
        let segment = &mut self.segments[seg];
        match slot {
            0 => segment.p0 = p,
            1 => segment.p1 = p,
            2 => segment.p2 = p,
            _ => segment.p3 = p,
        }
        if slot == 0 && seg > 0 {
            self.segments[seg - 1].p3 = p;
        }
    }

    /// Translates one control point. Out-of-range indices are ignored.
    pub(crate) fn translate_raw(&mut self, index: usize, delta: Vector2) {
        if let Some(p) = self.point(index) {
            self.set_raw(index, p + delta);
        }
    }

    /// Segment and slot (0..=3) of a flat index; joints resolve to the later segment.
    fn locate(&self, index: usize) -> Option<(usize, usize)> {
        let m = self.segments.len();
        if index > 3 * m {
            return None;
        }
        if index == 3 * m {
            return Some((m - 1, 3));
        }
        Some((index / 3, index % 3))
    }

    /// The same curve traversed backwards (segment and point order reversed).
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            lobe: self.lobe,
            segments: self.segments.iter().rev().map(CubicBezier::reversed).collect(),
        }
    }

    /// Applies `f` to every control point, optionally retagging the lobe.
    #[must_use]
    pub fn mapped(&self, lobe: Lobe, f: impl Fn(&Point2) -> Point2) -> Self {
        Self {
            lobe,
            segments: self.segments.iter().map(|s| s.map(&f)).collect(),
        }
    }

    /// Tight bounding box of the whole curve.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.segments
            .iter()
            .map(CubicBezier::bounds)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| Aabb::new(self.start(), self.start()))
    }

    /// Evaluates the finger at a global parameter in `[0, m]`.
    #[must_use]
    pub fn evaluate(&self, t: f64) -> Point2 {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let seg = (t.max(0.0).floor() as usize).min(self.segments.len() - 1);
        #[allow(clippy::cast_precision_loss)]
        let local = (t - seg as f64).clamp(0.0, 1.0);
        self.segments[seg].evaluate(local)
    }

    /// Whether every segment is a straight line (handles at 1/3 and 2/3).
    #[must_use]
    pub fn is_straight(&self, tolerance: f64) -> bool {
        self.segments.iter().all(|s| s.is_straight(tolerance))
    }

    /// Whether every control point is within `tolerance` of the other finger's.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.segment_count() == other.segment_count()
            && self
                .points()
                .iter()
                .zip(other.points())
                .all(|(a, b)| (a - b).norm() <= tolerance)
    }

    /// Splits segment `segment` at local parameter `t`, keeping the curve unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment index or parameter is out of range.
    pub fn split_segment(&mut self, segment: usize, t: f64) -> Result<()> {
        let count = self.segments.len();
        let target = self
            .segments
            .get(segment)
            .ok_or(GeometryError::SegmentOutOfRange { index: segment, count })?;
        let (a, b) = target.try_split(t)?;
        self.segments[segment] = a;
        self.segments.insert(segment + 1, b);
        Ok(())
    }

    /// Merges segment `segment` with the following one into a single cubic.
    ///
    /// The outer handles keep their directions; their lengths are rescaled by
    /// the chord-length split ratio, which recovers the original exactly when
    /// the pair came from `split_segment` at that ratio.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::SegmentOutOfRange` if there is no following segment.
    pub fn merge_segments(&mut self, segment: usize) -> Result<()> {
        let count = self.segments.len();
        if segment + 1 >= count {
            return Err(GeometryError::SegmentOutOfRange {
                index: segment + 1,
                count,
            }
            .into());
        }
        let a = self.segments[segment];
        let b = self.segments[segment + 1];
        let la = a.control_length();
        let lb = b.control_length();
        let t = if la + lb > 0.0 { la / (la + lb) } else { 0.5 };
        let t = t.clamp(0.05, 0.95);

        let p1 = a.p0 + (a.p1 - a.p0) / t;
        let p2 = b.p3 + (b.p2 - b.p3) / (1.0 - t);
        self.segments[segment] = CubicBezier::new(a.p0, p1, p2, b.p3);
        self.segments.remove(segment + 1);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn two_segment_finger() -> Finger {
        Finger::new(
            Lobe::Left,
            vec![
                CubicBezier::new(
                    Point2::new(0.0, 50.0),
                    Point2::new(20.0, 40.0),
                    Point2::new(30.0, 40.0),
                    Point2::new(50.0, 50.0),
                ),
                CubicBezier::new(
                    Point2::new(50.0, 50.0),
                    Point2::new(70.0, 60.0),
                    Point2::new(80.0, 60.0),
                    Point2::new(100.0, 50.0),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn empty_finger_is_rejected() {
        assert!(Finger::new(Lobe::Left, vec![]).is_err());
    }

    #[test]
    fn roles_follow_flat_index() {
        let f = two_segment_finger();
        assert_eq!(f.point_count(), 7);
        assert_eq!(f.role(0), Some(PointRole::Anchor));
        assert_eq!(f.role(1), Some(PointRole::Handle));
        assert_eq!(f.role(3), Some(PointRole::Joint));
        assert_eq!(f.role(6), Some(PointRole::Anchor));
        assert_eq!(f.role(7), None);
    }

    #[test]
    fn moving_a_joint_carries_its_handles() {
        let mut f = two_segment_finger();
        f.set_point(3, Point2::new(50.0, 55.0)).unwrap();
        assert_eq!(f.segments()[0].p3, Point2::new(50.0, 55.0));
        assert_eq!(f.segments()[1].p0, Point2::new(50.0, 55.0));
        assert_eq!(f.point(2).unwrap(), Point2::new(30.0, 45.0));
        assert_eq!(f.point(4).unwrap(), Point2::new(70.0, 65.0));
    }

    #[test]
    fn moving_a_handle_touches_nothing_else() {
        let mut f = two_segment_finger();
        let before = f.points();
        f.set_point(1, Point2::new(10.0, 10.0)).unwrap();
        let after = f.points();
        for (i, (a, b)) in before.iter().zip(&after).enumerate() {
            if i != 1 {
                assert_eq!(a, b);
            }
        }
        assert!(f.set_point(9, Point2::origin()).is_err());
    }

    #[test]
    fn single_view_only_for_one_segment() {
        assert!(two_segment_finger().as_single().is_none());
        let line = Finger::straight(Lobe::Right, Point2::new(10.0, 0.0), Point2::new(10.0, 90.0));
        assert!(line.as_single().is_some());
    }

    #[test]
    fn reversal_is_an_involution() {
        let f = two_segment_finger();
        let r = f.reversed();
        assert_eq!(r.start(), f.end());
        assert_eq!(r.reversed(), f);
    }

    #[test]
    fn split_then_merge_recovers_segment() {
        let mut f = Finger::straight(Lobe::Left, Point2::new(0.0, 10.0), Point2::new(90.0, 10.0));
        f.set_point(1, Point2::new(30.0, 40.0)).unwrap();
        let original = f.clone();
        f.split_segment(0, 0.5).unwrap();
        assert_eq!(f.segment_count(), 2);
        let mid = f.evaluate(1.0);
        let expected = original.evaluate(0.5);
        assert_abs_diff_eq!(mid.x, expected.x, epsilon = 1e-9);
        assert_abs_diff_eq!(mid.y, expected.y, epsilon = 1e-9);

        f.merge_segments(0).unwrap();
        assert_eq!(f.segment_count(), 1);
        // Symmetric control lengths: chord ratio estimate is close to the true split.
        assert!(f.approx_eq(&original, 5.0));
        assert!(f.merge_segments(0).is_err());
    }

    #[test]
    fn split_rejects_bad_arguments() {
        let mut f = two_segment_finger();
        assert!(f.split_segment(5, 0.5).is_err());
        assert!(f.split_segment(0, 1.0).is_err());
    }
}
