//! Quality search: find an encoder quality whose output lands in a byte window.
//!
//! The search assumes encoded size grows with quality for a fixed image, so a
//! binary search over `[floor, ceiling]` converges in `O(log range)` encodes.
//! Real encoders are noisy and some windows are unreachable, so the number of
//! search encodes is capped; running out is a near miss, not an error.
//!
//! The state machine ([`SearchState::advance`]) is pure and knows nothing
//! about images. [`search_quality`] drives it against any [`QualityEncoder`],
//! which lets tests run the whole loop against stub encoders.

use super::backend::BackendError;
use super::params::{Quality, QualityConfig, TargetWindow};

/// Something that can be re-encoded at a given quality.
///
/// `None` means "no quality parameter" (lossless or fixed formats).
pub trait QualityEncoder {
    fn encode(&mut self, quality: Option<Quality>) -> Result<Vec<u8>, BackendError>;
}

impl<F> QualityEncoder for F
where
    F: FnMut(Option<Quality>) -> Result<Vec<u8>, BackendError>,
{
    fn encode(&mut self, quality: Option<Quality>) -> Result<Vec<u8>, BackendError> {
        self(quality)
    }
}

/// Binary-search bookkeeping for one image.
///
/// Invariant: every guess returned by [`advance`](Self::advance) satisfies
/// `lower <= guess <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchState {
    pub guess: u32,
    pub lower: u32,
    pub upper: u32,
    pub attempts: u32,
    pub max_attempts: u32,
}

impl SearchState {
    /// State after the initial encode at `config.initial`.
    ///
    /// All three values are clamped to `1..=100`, the same range
    /// [`Quality::new`] clamps to, so guesses and reported qualities agree
    /// even for a config that skipped validation.
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            guess: Quality::new(config.initial).value(),
            lower: Quality::new(config.floor).value(),
            upper: Quality::new(config.ceiling).value(),
            attempts: 0,
            max_attempts: config.max_attempts,
        }
    }

    /// Next quality to try, given the size produced by the current guess.
    ///
    /// Returns `None` when the attempt cap is reached or the bounds cross.
    /// Callers stop before calling this once a size lands in the window.
    pub fn advance(&mut self, last_size: u64, window: &TargetWindow) -> Option<Quality> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        if window.is_above(last_size) {
            match self.guess.checked_sub(1) {
                Some(upper) => self.upper = upper,
                None => return None,
            }
        } else if window.is_below(last_size) {
            self.lower = self.guess + 1;
        }
        if self.lower > self.upper {
            return None;
        }
        self.guess = (self.lower + self.upper) / 2;
        self.attempts += 1;
        Some(Quality::new(self.guess))
    }
}

/// Result of a search: the last encode and whether it landed in the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub bytes: Vec<u8>,
    /// `None` when the format has no quality parameter.
    pub quality: Option<Quality>,
    pub in_window: bool,
    /// Total encode calls, initial encode included.
    pub encodes: u32,
}

impl SearchResult {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Encode exactly once, for formats without a quality parameter.
pub fn encode_once<E: QualityEncoder>(
    encoder: &mut E,
    window: &TargetWindow,
) -> Result<SearchResult, BackendError> {
    let bytes = encoder.encode(None)?;
    let in_window = window.contains(bytes.len() as u64);
    Ok(SearchResult {
        bytes,
        quality: None,
        in_window,
        encodes: 1,
    })
}

/// Search for a quality whose encoded size lands in `window`.
///
/// Encodes at `config.initial` first, then binary-searches `[floor, ceiling]`
/// for at most `config.max_attempts` further encodes. The last encode is
/// always the one returned.
pub fn search_quality<E: QualityEncoder>(
    encoder: &mut E,
    window: &TargetWindow,
    config: &QualityConfig,
) -> Result<SearchResult, BackendError> {
    let initial = Quality::new(config.initial);
    let mut best = SearchResult {
        bytes: encoder.encode(Some(initial))?,
        quality: Some(initial),
        in_window: false,
        encodes: 1,
    };
    if window.contains(best.size()) {
        best.in_window = true;
        return Ok(best);
    }

    let mut state = SearchState::new(config);
    while let Some(quality) = state.advance(best.size(), window) {
        best.bytes = encoder.encode(Some(quality))?;
        best.quality = Some(quality);
        best.encodes += 1;
        if window.contains(best.size()) {
            best.in_window = true;
            break;
        }
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stub encoder: output size is a pure function of quality.
    struct SizeStub<F: Fn(u32) -> u64> {
        size_of: F,
        calls: Vec<Option<u32>>,
    }

    impl<F: Fn(u32) -> u64> SizeStub<F> {
        fn new(size_of: F) -> Self {
            Self {
                size_of,
                calls: Vec::new(),
            }
        }
    }

    impl<F: Fn(u32) -> u64> QualityEncoder for SizeStub<F> {
        fn encode(&mut self, quality: Option<Quality>) -> Result<Vec<u8>, BackendError> {
            let q = quality.map(Quality::value);
            self.calls.push(q);
            Ok(vec![0; (self.size_of)(q.unwrap_or(100)) as usize])
        }
    }

    fn wide_config(max_attempts: u32) -> QualityConfig {
        QualityConfig {
            initial: 85,
            floor: 1,
            ceiling: 100,
            max_attempts,
        }
    }

    // =========================================================================
    // SearchState transitions
    // =========================================================================

    #[test]
    fn too_large_tightens_upper_bound() {
        let mut state = SearchState::new(&QualityConfig::default());
        let window = TargetWindow::new(100, 200).unwrap();

        let next = state.advance(500, &window).unwrap();
        assert_eq!(state.upper, 84);
        assert_eq!(state.lower, 60);
        assert_eq!(next.value(), 72);
        assert_eq!(state.attempts, 1);
    }

    #[test]
    fn too_small_tightens_lower_bound() {
        let mut state = SearchState::new(&QualityConfig::default());
        let window = TargetWindow::new(100, 200).unwrap();

        let next = state.advance(50, &window).unwrap();
        assert_eq!(state.lower, 86);
        assert_eq!(state.upper, 95);
        assert_eq!(next.value(), 90);
    }

    #[test]
    fn crossing_bounds_stops_without_guess() {
        let config = QualityConfig {
            initial: 60,
            floor: 60,
            ceiling: 60,
            max_attempts: 10,
        };
        let mut state = SearchState::new(&config);
        let window = TargetWindow::new(100, 200).unwrap();

        assert_eq!(state.advance(500, &window), None);
        assert_eq!(state.attempts, 0);
    }

    #[test]
    fn attempt_cap_stops_search() {
        let mut state = SearchState::new(&wide_config(2));
        let window = TargetWindow::new(1, 10).unwrap();

        assert!(state.advance(1000, &window).is_some());
        assert!(state.advance(1000, &window).is_some());
        assert_eq!(state.advance(1000, &window), None);
        assert_eq!(state.attempts, 2);
    }

    #[test]
    fn guesses_stay_within_bounds() {
        let window = TargetWindow::new(100, 200).unwrap();
        for size in [0u64, 50, 5000] {
            let mut state = SearchState::new(&QualityConfig::default());
            let mut last = size;
            while let Some(q) = state.advance(last, &window) {
                assert!(state.lower <= q.value() && q.value() <= state.upper);
                assert!((60..=95).contains(&q.value()));
                // Alternate directions to exercise both branches
                last = if last > 200 { 0 } else { 5000 };
            }
        }
    }

    #[test]
    fn unvalidated_bounds_are_clamped_to_quality_range() {
        let config = QualityConfig {
            initial: 150,
            floor: 0,
            ceiling: 250,
            max_attempts: 20,
        };
        let mut state = SearchState::new(&config);
        assert_eq!((state.lower, state.guess, state.upper), (1, 100, 100));

        // Always too small: the search climbs but never past 100
        let window = TargetWindow::new(1_000_000, 2_000_000).unwrap();
        while let Some(q) = state.advance(10, &window) {
            assert_eq!(q.value(), state.guess);
            assert!(q.value() <= 100);
        }
    }

    #[test]
    fn search_reports_the_quality_it_encoded() {
        let config = QualityConfig {
            initial: 120,
            floor: 90,
            ceiling: 300,
            max_attempts: 10,
        };
        let window = TargetWindow::new(1_000_000, 2_000_000).unwrap();
        let mut stub = SizeStub::new(|q| u64::from(q) * 10);

        let result = search_quality(&mut stub, &window, &config).unwrap();

        assert!(stub.calls.iter().all(|q| q.unwrap() <= 100));
        assert_eq!(result.quality.map(Quality::value), *stub.calls.last().unwrap());
    }

    #[test]
    fn advance_is_deterministic() {
        let window = TargetWindow::new(100, 200).unwrap();
        let mut a = SearchState::new(&QualityConfig::default());
        let mut b = a;
        assert_eq!(a.advance(300, &window), b.advance(300, &window));
        assert_eq!(a, b);
    }

    // =========================================================================
    // search_quality against stub encoders
    // =========================================================================

    #[test]
    fn initial_encode_in_window_stops_immediately() {
        let mut stub = SizeStub::new(|q| q as u64 * 10);
        let window = TargetWindow::new(800, 900).unwrap();

        let result = search_quality(&mut stub, &window, &QualityConfig::default()).unwrap();

        assert!(result.in_window);
        assert_eq!(result.quality, Some(Quality::new(85)));
        assert_eq!(result.size(), 850);
        assert_eq!(stub.calls, vec![Some(85)]);
    }

    #[test]
    fn monotonic_encoder_converges_in_window() {
        // size grows with quality: q ∈ [40, 45] lands in [400, 450]
        let mut stub = SizeStub::new(|q| q as u64 * 10);
        let window = TargetWindow::new(400, 450).unwrap();

        let result = search_quality(&mut stub, &window, &wide_config(10)).unwrap();

        assert!(result.in_window);
        assert_eq!(result.quality, Some(Quality::new(42)));
        assert_eq!(result.size(), 420);
        assert_eq!(stub.calls, vec![Some(85), Some(42)]);
    }

    #[test]
    fn monotonic_encoder_searches_upward() {
        // q ∈ [90, 92] lands in [900, 920]; initial 85 is too small
        let mut stub = SizeStub::new(|q| q as u64 * 10);
        let window = TargetWindow::new(900, 920).unwrap();

        let result = search_quality(&mut stub, &window, &QualityConfig::default()).unwrap();

        assert!(result.in_window);
        // 85 → lower 86 → (86+95)/2 = 90
        assert_eq!(result.quality, Some(Quality::new(90)));
        assert_eq!(stub.calls, vec![Some(85), Some(90)]);
    }

    #[test]
    fn narrow_window_needs_several_steps() {
        // Only q = 23 gives 230
        let mut stub = SizeStub::new(|q| q as u64 * 10);
        let window = TargetWindow::new(230, 230).unwrap();

        let result = search_quality(&mut stub, &window, &wide_config(10)).unwrap();

        assert!(result.in_window);
        assert_eq!(result.quality, Some(Quality::new(23)));
        assert!(result.encodes <= 11);
        // 85 → 42 → 21 → 31 → 26 → 23
        assert_eq!(
            stub.calls,
            vec![Some(85), Some(42), Some(21), Some(31), Some(26), Some(23)]
        );
    }

    #[test]
    fn decreasing_encoder_terminates_as_near_miss() {
        // size = 1000 - 5q shrinks as quality rises, the opposite of what the
        // search assumes; it must still stop within the cap.
        let mut stub = SizeStub::new(|q| 1000 - 5 * q as u64);
        let window = TargetWindow::new(400, 500).unwrap();
        let config = QualityConfig::default();

        let result = search_quality(&mut stub, &window, &config).unwrap();

        assert!(!result.in_window);
        assert!(result.encodes <= config.max_attempts + 1);
        assert_eq!(stub.calls.len() as u32, result.encodes);
    }

    #[test]
    fn unresponsive_encoder_uses_exactly_the_cap() {
        // Size never changes, bounds cannot cross in three steps over 1..=100
        let mut stub = SizeStub::new(|_| 5000);
        let window = TargetWindow::new(1, 10).unwrap();

        let result = search_quality(&mut stub, &window, &wide_config(3)).unwrap();

        assert!(!result.in_window);
        assert_eq!(result.encodes, 4);
        // 85 → 42 → 21 → 10
        assert_eq!(stub.calls, vec![Some(85), Some(42), Some(21), Some(10)]);
        assert_eq!(result.quality, Some(Quality::new(10)));
        assert_eq!(result.size(), 5000);
    }

    #[test]
    fn unresponsive_encoder_with_default_cap_stays_bounded() {
        let mut stub = SizeStub::new(|_| 5000);
        let window = TargetWindow::new(1, 10).unwrap();
        let config = QualityConfig::default();

        let result = search_quality(&mut stub, &window, &config).unwrap();

        assert!(!result.in_window);
        assert!(result.encodes <= config.max_attempts + 1);
        // Walks down to the floor and stops when the bounds cross
        assert_eq!(result.quality, Some(Quality::new(60)));
    }

    #[test]
    fn unreachable_small_window_reports_last_attempt() {
        let mut stub = SizeStub::new(|q| q as u64 * 10);
        let window = TargetWindow::new(5, 9).unwrap();

        let result = search_quality(&mut stub, &window, &QualityConfig::default()).unwrap();

        assert!(!result.in_window);
        assert_eq!(stub.calls.last().copied().flatten(), Some(60));
        assert_eq!(result.quality, Some(Quality::new(60)));
        assert_eq!(result.size(), 600);
    }

    #[test]
    fn encoder_error_propagates() {
        let mut calls = 0;
        let mut failing = |_q: Option<Quality>| -> Result<Vec<u8>, BackendError> {
            calls += 1;
            if calls > 1 {
                Err(BackendError::Encode("boom".into()))
            } else {
                Ok(vec![0; 10])
            }
        };
        let window = TargetWindow::new(100, 200).unwrap();

        let result = search_quality(&mut failing, &window, &QualityConfig::default());
        assert!(matches!(result, Err(BackendError::Encode(_))));
    }

    #[test]
    fn encode_once_never_searches() {
        let mut stub = SizeStub::new(|_| 5000);
        let window = TargetWindow::new(1, 10).unwrap();

        let result = encode_once(&mut stub, &window).unwrap();

        assert!(!result.in_window);
        assert_eq!(result.quality, None);
        assert_eq!(stub.calls, vec![None]);
    }

    #[test]
    fn encode_once_classifies_in_window() {
        let mut stub = SizeStub::new(|_| 150);
        let window = TargetWindow::new(100, 200).unwrap();

        let result = encode_once(&mut stub, &window).unwrap();
        assert!(result.in_window);
        assert_eq!(result.encodes, 1);
    }
}
