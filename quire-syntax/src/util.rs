use log::warn;

pub(crate) trait OptionLog {
    fn warn_none(self, f: &str) -> Self;
}

impl<T> OptionLog for Option<T> {
    #[inline]
    fn warn_none(self, f: &str) -> Self {
        self.or_else(|| {
            warn!("{f}");

            None
        })
    }
}

/// Find the first occurrence of `needle` in `haystack`, starting at `from`.
pub(crate) fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    let tail = haystack.get(from..)?;

    memchr::memmem::find(tail, needle).map(|pos| pos + from)
}

/// Find the last occurrence of `needle` in `haystack[..end]`.
pub(crate) fn rfind(haystack: &[u8], needle: &[u8], end: usize) -> Option<usize> {
    let head = haystack.get(..end.min(haystack.len()))?;

    memchr::memmem::rfind(head, needle)
}
