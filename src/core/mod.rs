// Core modules: note entity, persistence, and error modeling.
pub mod error;
pub mod note;
pub mod store;
