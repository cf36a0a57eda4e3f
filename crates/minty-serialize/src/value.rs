//! Conversion between typed values and node payload strings.

/// A value that can be stored in a leaf [`Node`](crate::node::Node).
///
/// `from_node_str` returns `None` for text that does not parse; readers treat
/// that the same as an absent field.
pub trait NodeValue: Sized {
    fn to_node_string(&self) -> String;
    fn from_node_str(text: &str) -> Option<Self>;
}

macro_rules! impl_node_value_via_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl NodeValue for $ty {
                #[inline]
                fn to_node_string(&self) -> String {
                    self.to_string()
                }

                #[inline]
                fn from_node_str(text: &str) -> Option<Self> {
                    text.trim().parse().ok()
                }
            }
        )*
    };
}

impl_node_value_via_str!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl NodeValue for bool {
    fn to_node_string(&self) -> String {
        self.to_string()
    }

    fn from_node_str(text: &str) -> Option<Self> {
        match text.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

impl NodeValue for char {
    fn to_node_string(&self) -> String {
        self.to_string()
    }

    fn from_node_str(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        let c = chars.next()?;
        chars.next().is_none().then_some(c)
    }
}

impl NodeValue for String {
    fn to_node_string(&self) -> String {
        self.clone()
    }

    fn from_node_str(text: &str) -> Option<Self> {
        Some(text.to_owned())
    }
}
