use acl_core::{Action, Rule, RuleSet, Subject, CATALOG};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

/// 权限矩阵单元格的四种状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellState {
    UncheckedDisabled,
    UncheckedEnabled,
    CheckedDisabled,
    CheckedEnabled,
}

impl CellState {
    fn of(checked: bool, disabled: bool) -> Self {
        match (checked, disabled) {
            (false, true) => Self::UncheckedDisabled,
            (false, false) => Self::UncheckedEnabled,
            (true, true) => Self::CheckedDisabled,
            (true, false) => Self::CheckedEnabled,
        }
    }

    pub fn is_checked(&self) -> bool {
        matches!(self, Self::CheckedDisabled | Self::CheckedEnabled)
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::UncheckedDisabled | Self::CheckedDisabled)
    }
}

/// 权限编辑器
///
/// 操作者对目标用户在某群组下的规则集进行编辑。`accepted` 是操作者
/// 自身的授权上限（委派天花板）：超出上限的单元格被禁用，目标已持有
/// 而操作者无权管理的"只读余量"则锁死对应主体的 VIEW，防止静默撤销。
///
/// 单写者、写时复制：每次 toggle 产生一个全新规则集，恰好推送一次
/// 通知（watch 通道，接收方可延后消费，但不会丢失最终值）。
pub struct PermissionEditor {
    current: RuleSet,
    accepted: Option<RuleSet>,
    disabled: bool,
    notifier: watch::Sender<RuleSet>,
}

impl PermissionEditor {
    pub fn new(current: RuleSet, accepted: Option<RuleSet>, disabled: bool) -> Self {
        let (notifier, _) = watch::channel(current.clone());
        Self {
            current,
            accepted,
            disabled,
            notifier,
        }
    }

    pub fn current(&self) -> &RuleSet {
        &self.current
    }

    pub fn accepted(&self) -> Option<&RuleSet> {
        self.accepted.as_ref()
    }

    /// 订阅 toggle 通知；每次 toggle 恰好一条，携带解析后的完整规则集
    pub fn subscribe(&self) -> watch::Receiver<RuleSet> {
        self.notifier.subscribe()
    }

    /// 只读余量：目标已持有、但落在操作者授权上限之外的规则。
    /// 未给定 accepted（无限制）时余量为空。
    pub fn read_only_remainder(&self) -> RuleSet {
        match &self.accepted {
            Some(accepted) => self.current.subtract(Some(accepted)),
            None => RuleSet::new(),
        }
    }

    /// 主体行是否可见：必须在目录内；给定 accepted 时操作者自身
    /// 必须先持有该主体的 VIEW
    pub fn is_subject_visible(&self, subject: Subject) -> bool {
        if !CATALOG.is_managed(subject) {
            return false;
        }
        match &self.accepted {
            Some(accepted) => accepted.exists(Some(subject), Some(Action::View)),
            None => true,
        }
    }

    pub fn visible_subjects(&self) -> Vec<Subject> {
        CATALOG
            .subjects()
            .filter(|s| self.is_subject_visible(*s))
            .collect()
    }

    /// 单元格状态，唯一的判定入口
    ///
    /// 两条禁用规则（accepted 之外、只读余量锁 VIEW）是相互独立的
    /// 纵深防御，都保留，互不替代。
    pub fn cell_state(&self, subject: Subject, action: Action) -> CellState {
        let rule = Rule::new(subject, action);
        let checked = self.current.contains(rule);

        let outside_ceiling = self
            .accepted
            .as_ref()
            .map(|accepted| !accepted.contains(rule))
            .unwrap_or(false);
        let view_locked = action == Action::View
            && self.read_only_remainder().exists(Some(subject), None);

        let disabled = self.disabled || outside_ceiling || view_locked;
        CellState::of(checked, disabled)
    }

    /// 可见主体的整张矩阵，按目录顺序
    pub fn matrix(&self) -> Vec<(Subject, Vec<(Action, CellState)>)> {
        self.visible_subjects()
            .into_iter()
            .map(|subject| {
                let cells = CATALOG
                    .actions_for(subject)
                    .iter()
                    .map(|action| (*action, self.cell_state(subject, *action)))
                    .collect();
                (subject, cells)
            })
            .collect()
    }

    /// 翻转一个单元格，返回新的规则集
    ///
    /// - 勾选非 VIEW 操作时若主体尚无 VIEW，连带补上 VIEW；
    /// - 取消 VIEW 级联移除该主体全部规则（VIEW 是其余操作的前提）；
    /// - 其余情况只增删该条规则本身。
    pub fn toggle(&mut self, subject: Subject, action: Action) -> RuleSet {
        let rule = Rule::new(subject, action);
        let next = if self.current.contains(rule) {
            if action == Action::View {
                self.current.without_subject(subject)
            } else {
                self.current.without(rule)
            }
        } else if action != Action::View
            && !self.current.exists(Some(subject), Some(Action::View))
        {
            self.current.with(Rule::new(subject, Action::View)).with(rule)
        } else {
            self.current.with(rule)
        };

        debug!(
            subject = ?subject,
            action = ?action,
            rules = next.len(),
            "翻转权限单元格"
        );

        self.current = next.clone();
        // 每次 toggle 恰好一次通知
        self.notifier.send_replace(next.clone());
        next
    }

    /// 外部规则列表变更（例如套用了模板）时按值比对并重新同步
    pub fn reconcile(&mut self, external: &RuleSet) {
        if !self.current.same_rules(external) {
            self.current = external.clone();
        }
    }

    /// 提交前的纵深防御：与授权上限求交，绕过 UI 也产生不了越权请求
    pub fn sanitized_for_submit(&self) -> RuleSet {
        self.current.intersect(self.accepted.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(subject: Subject, action: Action) -> Rule {
        Rule::new(subject, action)
    }

    /// 场景 A 的编辑器：accepted = {DEVICE:VIEW, DEVICE:MODIFY}，
    /// current = {DEVICE:VIEW, DEVICE:ADD}
    fn scenario_a_editor() -> PermissionEditor {
        PermissionEditor::new(
            RuleSet::from_rules([
                rule(Subject::Device, Action::View),
                rule(Subject::Device, Action::Add),
            ]),
            Some(RuleSet::from_rules([
                rule(Subject::Device, Action::View),
                rule(Subject::Device, Action::Modify),
            ])),
            false,
        )
    }

    #[test]
    fn test_scenario_a_cell_states() {
        let editor = scenario_a_editor();

        assert!(editor.is_subject_visible(Subject::Device));
        // 余量 {DEVICE:ADD} 锁死 VIEW
        assert_eq!(
            editor.cell_state(Subject::Device, Action::View),
            CellState::CheckedDisabled
        );
        // ADD 在上限之外：勾选但禁用
        assert_eq!(
            editor.cell_state(Subject::Device, Action::Add),
            CellState::CheckedDisabled
        );
        // MODIFY 在上限之内且未勾选
        assert_eq!(
            editor.cell_state(Subject::Device, Action::Modify),
            CellState::UncheckedEnabled
        );
        // REMOVE / EXPORT 在上限之外
        assert_eq!(
            editor.cell_state(Subject::Device, Action::Remove),
            CellState::UncheckedDisabled
        );
        assert_eq!(
            editor.cell_state(Subject::Device, Action::Export),
            CellState::UncheckedDisabled
        );
    }

    #[test]
    fn test_scenario_b_toggle_modify() {
        let mut editor = scenario_a_editor();
        let next = editor.toggle(Subject::Device, Action::Modify);
        // VIEW 已在，只追加 MODIFY
        assert!(next.same_rules(&RuleSet::from_rules([
            rule(Subject::Device, Action::View),
            rule(Subject::Device, Action::Add),
            rule(Subject::Device, Action::Modify),
        ])));
    }

    #[test]
    fn test_check_action_without_view_inserts_both() {
        let mut editor = PermissionEditor::new(RuleSet::new(), None, false);
        let next = editor.toggle(Subject::Device, Action::Add);
        assert!(next.same_rules(&RuleSet::from_rules([
            rule(Subject::Device, Action::View),
            rule(Subject::Device, Action::Add),
        ])));
    }

    #[test]
    fn test_check_view_inserts_only_view() {
        let mut editor = PermissionEditor::new(RuleSet::new(), None, false);
        let next = editor.toggle(Subject::Device, Action::View);
        assert!(next.same_rules(&RuleSet::from_rules([rule(
            Subject::Device,
            Action::View
        )])));
    }

    #[test]
    fn test_uncheck_view_cascades() {
        let mut editor = PermissionEditor::new(
            RuleSet::from_rules([
                rule(Subject::Device, Action::View),
                rule(Subject::Device, Action::Add),
                rule(Subject::Device, Action::Export),
                rule(Subject::User, Action::View),
            ]),
            None,
            false,
        );
        let next = editor.toggle(Subject::Device, Action::View);
        // DEVICE 的规则全部移除，其他主体不受影响
        assert!(!next.exists(Some(Subject::Device), None));
        assert!(next.exists(Some(Subject::User), Some(Action::View)));
    }

    #[test]
    fn test_uncheck_non_view_removes_only_itself() {
        let mut editor = PermissionEditor::new(
            RuleSet::from_rules([
                rule(Subject::Device, Action::View),
                rule(Subject::Device, Action::Add),
            ]),
            None,
            false,
        );
        let next = editor.toggle(Subject::Device, Action::Add);
        assert!(next.same_rules(&RuleSet::from_rules([rule(
            Subject::Device,
            Action::View
        )])));
    }

    #[test]
    fn test_exactly_one_notification_per_toggle() {
        let mut editor = PermissionEditor::new(RuleSet::new(), None, false);
        let mut receiver = editor.subscribe();

        editor.toggle(Subject::Device, Action::Add);
        assert!(receiver.has_changed().unwrap());
        let seen = receiver.borrow_and_update().clone();
        assert_eq!(seen.len(), 2);
        // 消费之后没有多余的通知
        assert!(!receiver.has_changed().unwrap());

        // 通知可延后消费：连续两次 toggle 后收到的是最终值
        editor.toggle(Subject::User, Action::View);
        editor.toggle(Subject::Wifi, Action::View);
        let last = receiver.borrow_and_update().clone();
        assert!(last.exists(Some(Subject::Wifi), Some(Action::View)));
    }

    #[test]
    fn test_visibility_requires_actor_view() {
        let editor = PermissionEditor::new(
            RuleSet::new(),
            Some(RuleSet::from_rules([rule(Subject::Device, Action::View)])),
            false,
        );
        assert!(editor.is_subject_visible(Subject::Device));
        assert!(!editor.is_subject_visible(Subject::User));
        // 目录外主体永远不可见
        assert!(!editor.is_subject_visible(Subject::RoleTemplate));
        assert_eq!(editor.visible_subjects(), vec![Subject::Device]);
    }

    #[test]
    fn test_editor_disabled_flag_locks_everything() {
        let editor = PermissionEditor::new(RuleSet::new(), None, true);
        for (_, cells) in editor.matrix() {
            for (_, state) in cells {
                assert!(state.is_disabled());
            }
        }
    }

    #[test]
    fn test_reconcile_resyncs_by_value() {
        let mut editor = scenario_a_editor();
        let external = RuleSet::from_rules([
            rule(Subject::Device, Action::Add),
            rule(Subject::Device, Action::View),
        ]);
        // 同值不同序：不触发替换，集合语义不变
        editor.reconcile(&external);
        assert!(editor.current().same_rules(&external));

        let changed = RuleSet::from_rules([rule(Subject::User, Action::View)]);
        editor.reconcile(&changed);
        assert!(editor.current().same_rules(&changed));
    }

    #[test]
    fn test_sanitized_for_submit_clamps_to_ceiling() {
        let editor = scenario_a_editor();
        let payload = editor.sanitized_for_submit();
        // ADD 在上限之外，提交载荷中被剔除
        assert!(payload.same_rules(&RuleSet::from_rules([rule(
            Subject::Device,
            Action::View
        )])));
    }
}
