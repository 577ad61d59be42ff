mod document;
mod workspace;

pub use document::{Analysis, DocumentState};
pub use workspace::{Workspace, WorkspaceError};
