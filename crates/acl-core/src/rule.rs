use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 可管理的资源域
///
/// 目录内的主体可在权限矩阵中编辑；ROLE_TEMPLATE、ELASTIC_SEARCH、
/// RECYCLE_BIN 仅作为路由主体存在，不进入目录，因此永远不可编辑。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Subject {
    Dashboard,
    Lightmap,
    IvsSurveillance,
    IvsEvents,
    Wifi,
    Esignage,
    AutomationRuleManagement,
    Device,
    Group,
    User,
    Indoor,
    // 路由级主体，目录之外
    RoleTemplate,
    ElasticSearch,
    RecycleBin,
}

/// 操作类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    View,
    Add,
    Remove,
    Modify,
    Export,
}

/// 规则：不可变的 (主体, 操作) 对，按字段精确相等
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub subject: Subject,
    pub action: Action,
}

impl Rule {
    pub const fn new(subject: Subject, action: Action) -> Self {
        Self { subject, action }
    }
}

/// 规则集合
///
/// 对外表现为集合语义：去重、与顺序无关。所有运算返回新集合，
/// 从不原地修改（写时复制，单写者模型下无需加锁）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(Vec<Rule>);

impl RuleSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// 从任意规则序列构建，保序去重
    pub fn from_rules<I: IntoIterator<Item = Rule>>(rules: I) -> Self {
        let mut seen = HashSet::new();
        let deduped = rules
            .into_iter()
            .filter(|rule| seen.insert(*rule))
            .collect();
        Self(deduped)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, rule: Rule) -> bool {
        self.0.contains(&rule)
    }

    /// 交集：保留 `self` 中同时出现在 `other` 中的规则。
    /// `other` 为 None 表示"无限制"，原样返回 `self`。
    pub fn intersect(&self, other: Option<&RuleSet>) -> RuleSet {
        match other {
            Some(bound) => Self::from_rules(
                self.0.iter().copied().filter(|rule| bound.contains(*rule)),
            ),
            None => self.clone(),
        }
    }

    /// 差集：保留 `self` 中不出现在 `other` 中的规则。
    /// `other` 为 None 时原样返回 `self`。
    pub fn subtract(&self, other: Option<&RuleSet>) -> RuleSet {
        match other {
            Some(bound) => Self::from_rules(
                self.0.iter().copied().filter(|rule| !bound.contains(*rule)),
            ),
            None => self.clone(),
        }
    }

    /// 存在性判定：省略的过滤条件匹配任意值
    pub fn exists(&self, subject: Option<Subject>, action: Option<Action>) -> bool {
        self.0.iter().any(|rule| {
            subject.map_or(true, |s| rule.subject == s)
                && action.map_or(true, |a| rule.action == a)
        })
    }

    /// 追加规则，返回新集合；已存在时集合不变
    pub fn with(&self, rule: Rule) -> RuleSet {
        if self.contains(rule) {
            self.clone()
        } else {
            let mut rules = self.0.clone();
            rules.push(rule);
            Self(rules)
        }
    }

    /// 移除单条规则，返回新集合
    pub fn without(&self, rule: Rule) -> RuleSet {
        Self(self.0.iter().copied().filter(|r| *r != rule).collect())
    }

    /// 移除某主体的全部规则，返回新集合
    pub fn without_subject(&self, subject: Subject) -> RuleSet {
        Self(
            self.0
                .iter()
                .copied()
                .filter(|r| r.subject != subject)
                .collect(),
        )
    }

    /// 并集：`other` 中的新规则追加到 `self` 之后
    pub fn union(&self, other: &RuleSet) -> RuleSet {
        Self::from_rules(self.0.iter().chain(other.0.iter()).copied())
    }

    /// 集合意义上的相等（与顺序、重复无关）
    pub fn same_rules(&self, other: &RuleSet) -> bool {
        let a: HashSet<Rule> = self.0.iter().copied().collect();
        let b: HashSet<Rule> = other.0.iter().copied().collect();
        a == b
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self::from_rules(iter)
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
