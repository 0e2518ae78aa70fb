mod cleanup;
mod delete;
mod paths;
mod projects;
mod rename;
mod sessions;

pub use cleanup::*;
pub use delete::*;
pub use paths::*;
pub use projects::*;
pub use rename::*;
pub use sessions::*;
