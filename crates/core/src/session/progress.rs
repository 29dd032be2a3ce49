/// Where the learner is in the quiz, in the shape a header or progress bar wants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionProgress {
    /// 1-based number of the question on screen.
    pub position: usize,
    pub total: usize,
    /// `position / total`, always in `(0, 1]`.
    pub fraction: f64,
    pub is_complete: bool,
}

impl SessionProgress {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn at(index: usize, total: usize, is_complete: bool) -> Self {
        let position = index + 1;
        Self {
            position,
            total,
            fraction: position as f64 / total.max(1) as f64,
            is_complete,
        }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(&self) -> u8 {
        (self.fraction * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// `"2/3"` style counter.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}/{}", self.position, self.total)
    }
}
