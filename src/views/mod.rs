pub mod kind;
pub mod registry;
pub mod store;
pub mod tasks;

pub use kind::ViewKind;
pub use registry::ViewRegistry;
pub use store::ViewSnapshot;
