pub mod catalog;
pub mod rule;

// 重新导出核心类型
pub use catalog::{RuleCatalog, CATALOG};
pub use rule::{Action, Rule, RuleSet, Subject};

// 错误类型
pub use acl_error::{AclError, ConflictCode, Result};
