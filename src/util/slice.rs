use std::{cmp::Ordering, fmt};

/// Owned byte string used for keys and values.
///
/// An empty `Slice` is a legitimate value and is distinct from an absent
/// one (`Option::<Slice>::None`).
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Slice {
    data: Vec<u8>,
}

impl Slice {
    pub fn new(data: Vec<u8>) -> Self {
        Slice { data }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        Slice {
            data: data.to_vec(),
        }
    }

    pub fn empty() -> Self {
        Slice { data: Vec::new() }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for Slice {
    fn from(data: Vec<u8>) -> Self {
        Slice::new(data)
    }
}

impl From<&[u8]> for Slice {
    fn from(data: &[u8]) -> Self {
        Slice::from_bytes(data)
    }
}

impl<const N: usize> From<&[u8; N]> for Slice {
    fn from(data: &[u8; N]) -> Self {
        Slice::from_bytes(data)
    }
}

impl From<String> for Slice {
    fn from(s: String) -> Self {
        Slice::new(s.into_bytes())
    }
}

impl From<&str> for Slice {
    fn from(s: &str) -> Self {
        Slice::from_bytes(s.as_bytes())
    }
}

impl AsRef<[u8]> for Slice {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl PartialOrd for Slice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slice {
    fn cmp(&self, other: &Self) -> Ordering {
        self.data.cmp(&other.data)
    }
}

impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.data) {
            Ok(s) => write!(f, "Slice(\"{s}\")"),
            Err(_) => write!(f, "Slice({:?})", self.data),
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.data) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "{:?}", self.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_creation() {
        let s1 = Slice::from("hello");
        assert_eq!(s1.size(), 5);
        assert_eq!(s1.data(), b"hello");
        assert_eq!(Slice::from(b"hello"), s1);
    }

    #[test]
    fn test_empty_slice_is_a_value() {
        let empty = Slice::empty();
        assert!(empty.is_empty());
        assert_ne!(Some(empty), None);
    }

    #[test]
    fn test_slice_ordering() {
        assert!(Slice::from("abc") < Slice::from("abd"));
        assert!(Slice::from("ab") < Slice::from("abc"));
    }

    #[test]
    fn test_slice_debug() {
        assert_eq!(format!("{:?}", Slice::from("key")), "Slice(\"key\")");
        assert_eq!(
            format!("{:?}", Slice::from(vec![0xff, 0xfe])),
            "Slice([255, 254])"
        );
    }
}
