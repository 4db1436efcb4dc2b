//! Backend and push integrations.

pub mod api_client {
    pub use crate::api_client::*;
}

pub mod session {
    pub use crate::session::*;
}

pub mod webhook_models {
    pub use crate::webhook_models::*;
}
