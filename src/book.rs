use std::fmt;

/// Byte capacity of a book's name and author fields.
pub const TEXT_CAPACITY: usize = 64;

/// Inline UTF-8 text of at most `N` bytes.
///
/// Longer input is cut at the last character boundary that fits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedStr<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> FixedStr<N> {
    pub fn new(text: &str) -> Self {
        let mut len = text.len().min(N);
        while !text.is_char_boundary(len) {
            len -= 1;
        }

        let mut buf = [0u8; N];
        buf[..len].copy_from_slice(&text.as_bytes()[..len]);
        Self { buf, len }
    }

    pub fn as_str(&self) -> &str {
        // Only whole characters are ever copied in.
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> From<&str> for FixedStr<N> {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl<const N: usize> fmt::Display for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

/// A library record. Never changed after it is published; a state change produces a
/// new `Book` via [`Book::with_borrowed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Book {
    id: i32,
    name: FixedStr<TEXT_CAPACITY>,
    author: FixedStr<TEXT_CAPACITY>,
    borrowed: bool,
}

impl Book {
    pub fn new(id: i32, name: &str, author: &str) -> Self {
        Self {
            id,
            name: FixedStr::new(name),
            author: FixedStr::new(author),
            borrowed: false,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn author(&self) -> &str {
        self.author.as_str()
    }

    pub fn is_borrowed(&self) -> bool {
        self.borrowed
    }

    /// A copy of this book with the borrowed flag set to `borrowed`.
    pub fn with_borrowed(&self, borrowed: bool) -> Self {
        Self { borrowed, ..*self }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id : {}, name : {}, author : {}, borrow : {}",
            self.id,
            self.name,
            self.author,
            u8::from(self.borrowed)
        )
    }
}
