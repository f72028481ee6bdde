pub mod selector;
pub mod tree;

// 重新导出核心类型
pub use selector::{CascadingSelector, Column, ColumnOption};
pub use tree::{DivisionNode, DivisionTree, Level, TreeBuilder};

// 错误类型
pub use acl_error::{AclError, Result};
