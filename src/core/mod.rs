// Domain-layer modules and shared errors/models
pub mod analytics {
    pub use crate::analytics::*;
}

pub mod filters {
    pub use crate::filters::*;
}

pub mod impact {
    pub use crate::impact::*;
}

pub mod lead_actions {
    pub use crate::lead_actions::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
