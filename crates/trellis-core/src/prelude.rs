pub use crate::cancel::Dispose;
pub use crate::component::{Component, Layout, MountMode, Rendered};
pub use crate::error::{Error, ErrorKind};
pub use crate::event::{LifecycleEvent, LifecycleKind};
pub use crate::hooks::HookResult;
pub use trellis_dom::{Element, ElementCaps, MarkupElement, RefAnnotation, RefType};
