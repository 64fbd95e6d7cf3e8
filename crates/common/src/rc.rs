use std::sync::{Arc, Weak};

// Type aliases instead of newtypes: `fn method(self: PyRc<Self>)` does not
// work with a newtype without the arbitrary_self_types unstable feature.

pub type PyRc<T> = Arc<T>;
pub type PyWeak<T> = Weak<T>;
