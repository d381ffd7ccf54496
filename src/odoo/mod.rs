pub mod client;
pub mod collaborator;
pub mod probe;
pub mod value;

pub use client::{OdooClient, OdooError, OdooExecutor, OdooSession};
pub use collaborator::CollaboratorRef;
pub use value::{read_field, FieldValue};
