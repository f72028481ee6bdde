pub mod editor;
pub mod session;
pub mod templates;

// 重新导出核心类型
pub use editor::{CellState, PermissionEditor};
pub use session::SessionStore;
pub use templates::RoleTemplateStore;

// 错误类型
pub use acl_error::{AclError, ConflictCode, Result};
