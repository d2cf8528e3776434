pub mod record;
pub mod status;

pub use record::{derive_instance_name, InstanceRecord};
pub use status::{InstanceStatus, StatusReport};
