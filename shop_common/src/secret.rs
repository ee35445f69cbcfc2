use std::{
    fmt,
    fmt::{Debug, Display},
};

/// A wrapper that keeps key material out of logs and debug output.
///
/// The payment callback secret and the gateway/notifier API keys all travel through config and constructors as
/// `Secret<String>`; both `Debug` and `Display` render as `****`, and reading the value requires an explicit
/// [`reveal`](Secret::reveal) at the point of use.
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
