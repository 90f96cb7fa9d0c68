mod handlers;
mod types;

pub use handlers::{list_devices, register_device};
pub use types::DevicesQuery;

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{__path_list_devices, __path_register_device};
