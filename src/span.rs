/// A view into a connection buffer expressed as offset and length.
///
/// Spans stay meaningful only as long as the buffer they were taken from is
/// not recycled, which happens when a request completes or the connection
/// closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub const fn new(start: usize, len: usize) -> Self {
        Span { start, len }
    }

    /// Locate `sub` inside `base`. `sub` must be a subslice of `base`.
    pub(crate) fn within(base: &[u8], sub: &[u8]) -> Self {
        let start = (sub.as_ptr() as usize).saturating_sub(base.as_ptr() as usize);
        debug_assert!(start + sub.len() <= base.len());
        Span {
            start,
            len: sub.len(),
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slice out of `buf`. Out of range spans yield an empty slice.
    pub fn slice<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        buf.get(self.start..self.end()).unwrap_or(&[])
    }

    pub(crate) fn sub(&self, start: usize, len: usize) -> Span {
        Span {
            start: self.start + start,
            len,
        }
    }
}
