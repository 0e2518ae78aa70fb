mod project_name;
mod record;
mod rewrite;
mod status;
mod summary;
mod types;

pub use project_name::*;
pub use record::*;
pub use rewrite::*;
pub use status::*;
pub use summary::*;
pub use types::*;
