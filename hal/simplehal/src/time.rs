//! Time base abstractions

/// Free-running millisecond counter
///
/// Wraps around after about 49 days; consumers compare with wrapping
/// arithmetic.
pub trait Millis {
    /// Milliseconds since the counter was started
    fn millis(&self) -> u32;
}

impl<T: Millis + ?Sized> Millis for &T {
    fn millis(&self) -> u32 {
        (**self).millis()
    }
}
