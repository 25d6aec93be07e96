pub mod controller;
pub mod handle;
pub mod registry;

pub use controller::{FormController, FormError, PendingPreview};
pub use handle::FormHandle;
pub use registry::FormRegistry;
