use crate::rule::{Action, Rule, RuleSet, Subject};
use acl_error::{AclError, Result};
use once_cell::sync::Lazy;

use Action::*;

/// 规则目录：主体 → 可授权操作的有序列表
///
/// 进程级常量，编译期写死，运行期只读。目录定义了可授权规则的全集，
/// 不在目录中的 (主体, 操作) 对一律拒绝。
pub struct RuleCatalog {
    entries: Vec<(Subject, Vec<Action>)>,
}

/// 全局唯一的目录实例
pub static CATALOG: Lazy<RuleCatalog> = Lazy::new(RuleCatalog::builtin);

impl RuleCatalog {
    fn builtin() -> Self {
        Self {
            entries: vec![
                (Subject::Dashboard, vec![View, Add, Remove, Modify]),
                (Subject::Lightmap, vec![View, Modify]),
                (Subject::IvsSurveillance, vec![View, Export]),
                (Subject::IvsEvents, vec![View, Export]),
                (Subject::Wifi, vec![View, Add, Remove, Modify]),
                (Subject::Esignage, vec![View, Add, Remove, Modify]),
                (
                    Subject::AutomationRuleManagement,
                    vec![View, Add, Remove, Modify],
                ),
                (Subject::Device, vec![View, Add, Remove, Modify, Export]),
                (Subject::Group, vec![View, Add, Remove, Modify]),
                (Subject::User, vec![View, Add, Remove, Modify]),
                (Subject::Indoor, vec![View, Add, Remove, Modify]),
            ],
        }
    }

    /// 主体支持的操作列表；不在目录中的主体返回空
    pub fn actions_for(&self, subject: Subject) -> &[Action] {
        self.entries
            .iter()
            .find(|(s, _)| *s == subject)
            .map(|(_, actions)| actions.as_slice())
            .unwrap_or(&[])
    }

    /// 目录中的全部主体（有序）
    pub fn subjects(&self) -> impl Iterator<Item = Subject> + '_ {
        self.entries.iter().map(|(s, _)| *s)
    }

    /// 目录中的全部 (主体, 操作) 对
    pub fn all_rules(&self) -> RuleSet {
        RuleSet::from_rules(self.entries.iter().flat_map(|(subject, actions)| {
            actions.iter().map(|action| Rule::new(*subject, *action))
        }))
    }

    pub fn is_managed(&self, subject: Subject) -> bool {
        self.entries.iter().any(|(s, _)| *s == subject)
    }

    /// 封闭枚举校验：规则必须落在目录内
    pub fn validate(&self, rule: Rule) -> Result<()> {
        if self.actions_for(rule.subject).contains(&rule.action) {
            Ok(())
        } else {
            Err(AclError::Validation {
                subject: format!("{:?}", rule.subject),
                action: format!("{:?}", rule.action),
            })
        }
    }

    /// 校验整个集合，返回目录内的子集
    pub fn validated(&self, rules: &RuleSet) -> RuleSet {
        rules.intersect(Some(&self.all_rules()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_row_pinned() {
        assert_eq!(
            CATALOG.actions_for(Subject::Device),
            &[View, Add, Remove, Modify, Export]
        );
    }

    #[test]
    fn test_route_only_subjects_unmanaged() {
        for subject in [
            Subject::RoleTemplate,
            Subject::ElasticSearch,
            Subject::RecycleBin,
        ] {
            assert!(!CATALOG.is_managed(subject));
            assert!(CATALOG.actions_for(subject).is_empty());
            assert!(CATALOG
                .validate(Rule::new(subject, View))
                .is_err());
        }
    }

    #[test]
    fn test_all_rules_covers_every_entry() {
        let all = CATALOG.all_rules();
        for subject in CATALOG.subjects() {
            for action in CATALOG.actions_for(subject) {
                assert!(all.contains(Rule::new(subject, *action)));
            }
        }
        // 每个主体至少可见
        assert!(CATALOG
            .subjects()
            .all(|s| CATALOG.actions_for(s).contains(&View)));
    }

    #[test]
    fn test_validated_filters_catalog_outsiders() {
        let rules = RuleSet::from_rules([
            Rule::new(Subject::Device, Export),
            Rule::new(Subject::Lightmap, Export), // Lightmap 不支持导出
            Rule::new(Subject::RecycleBin, View),
        ]);
        let valid = CATALOG.validated(&rules);
        assert_eq!(valid.len(), 1);
        assert!(valid.contains(Rule::new(Subject::Device, Export)));
    }
}
