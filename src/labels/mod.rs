pub mod policy;
pub mod service;
pub mod store;
pub mod validator;

pub use policy::LabelAction;
pub use service::{LabelError, LabelService, LabelView};
pub use store::{LabelStore, StoreError};
pub use validator::ValidationError;
