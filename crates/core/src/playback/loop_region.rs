use serde::Serialize;

/// A `[start, end)` sub-range of the timeline that playback is confined to
/// while looping. `0 <= start < end <= duration` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoopRegion {
    start: f64,
    end: f64,
}

impl LoopRegion {
    /// Builds a region from two bounds. Reversed bounds are swapped and both
    /// are clamped to `[0, duration]` (only the lower bound when the duration
    /// is unknown). Returns `None` when nothing of the range remains.
    pub fn new(a: f64, b: f64, duration: Option<f64>) -> Option<Self> {
        if a.is_nan() || b.is_nan() {
            return None;
        }

        let upper = upper_bound(duration);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let start = low.max(0.0).min(upper);
        let end = high.max(0.0).min(upper);

        (end > start).then_some(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, seconds: f64) -> bool {
        seconds >= self.start && seconds < self.end
    }

    /// Moves the start handle, keeping at least `min_span` before the end.
    /// Returns `None` when no non-empty region is left.
    pub fn with_start(self, seconds: f64, min_span: f64) -> Option<Self> {
        if seconds.is_nan() {
            return None;
        }
        let start = seconds.min(self.end - min_span).max(0.0);
        (self.end > start).then_some(Self { start, ..self })
    }

    /// Moves the end handle, keeping at least `min_span` after the start.
    /// Returns `None` when the media ends at or before the start.
    pub fn with_end(self, seconds: f64, min_span: f64, duration: Option<f64>) -> Option<Self> {
        if seconds.is_nan() {
            return None;
        }
        let end = seconds
            .max(self.start + min_span)
            .min(upper_bound(duration));
        (end > self.start).then_some(Self { end, ..self })
    }

    /// Re-applies the bounds once the media duration is known.
    pub fn clamped_to(self, duration: Option<f64>) -> Option<Self> {
        Self::new(self.start, self.end, duration)
    }
}

fn upper_bound(duration: Option<f64>) -> f64 {
    duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_reversed_bounds() {
        let region = LoopRegion::new(30.0, 5.0, Some(120.0)).unwrap();
        assert_eq!(region.start(), 5.0);
        assert_eq!(region.end(), 30.0);
    }

    #[test]
    fn clamps_to_media_duration() {
        let region = LoopRegion::new(-4.0, 500.0, Some(90.0)).unwrap();
        assert_eq!((region.start(), region.end()), (0.0, 90.0));

        let open = LoopRegion::new(10.0, 500.0, None).unwrap();
        assert_eq!(open.end(), 500.0);
    }

    #[test]
    fn rejects_empty_ranges() {
        assert!(LoopRegion::new(12.0, 12.0, Some(60.0)).is_none());
        assert!(LoopRegion::new(70.0, 80.0, Some(60.0)).is_none());
        assert!(LoopRegion::new(f64::NAN, 3.0, None).is_none());
    }

    #[test]
    fn handles_keep_a_minimum_span() {
        let region = LoopRegion::new(10.0, 20.0, Some(60.0)).unwrap();

        let dragged = region.with_start(25.0, 1.0).unwrap();
        assert_eq!((dragged.start(), dragged.end()), (19.0, 20.0));

        let dragged = region.with_end(2.0, 1.0, Some(60.0)).unwrap();
        assert_eq!((dragged.start(), dragged.end()), (10.0, 11.0));

        let dragged = region.with_end(99.0, 1.0, Some(60.0)).unwrap();
        assert_eq!(dragged.end(), 60.0);
    }

    #[test]
    fn end_handle_rejects_media_shorter_than_the_start() {
        let region = LoopRegion::new(150.0, 170.0, Some(180.0)).unwrap();
        assert!(region.with_end(120.0, 1.0, Some(100.0)).is_none());
        assert!(region.with_end(150.0, 1.0, Some(150.0)).is_none());
    }

    #[test]
    fn start_handle_without_a_span_cannot_reach_the_end() {
        let region = LoopRegion::new(10.0, 20.0, None).unwrap();
        assert!(region.with_start(30.0, 0.0).is_none());
        assert!(region.with_start(30.0, -5.0).is_none());
        assert!(region.with_start(f64::NAN, 1.0).is_none());
    }

    #[test]
    fn open_ended_region_is_clamped_once_the_duration_is_known() {
        let open = LoopRegion::new(50.0, 500.0, None).unwrap();

        let clamped = open.clamped_to(Some(60.0)).unwrap();
        assert_eq!((clamped.start(), clamped.end()), (50.0, 60.0));

        assert!(open.clamped_to(Some(40.0)).is_none());
        assert_eq!(open.clamped_to(None), Some(open));
    }
}
