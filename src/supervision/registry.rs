use crate::supervision::evaluator::{
    ActionKind, DomainDenylist, Evaluator, NavigationGuard, NothingToSupervise, StaticApproval,
};
use crate::supervision::judge::{ClickJudge, JudgeModel};
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only mapping from action kind to evaluator.
///
/// Kinds without an entry resolve to [`NothingToSupervise`].
#[derive(Clone)]
pub struct EvaluatorRegistry {
    evaluators: HashMap<ActionKind, Arc<dyn Evaluator>>,
    fallback: Arc<dyn Evaluator>,
}

impl EvaluatorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Evaluator for `kind`, or the fallback.
    pub fn lookup(&self, kind: &ActionKind) -> Arc<dyn Evaluator> {
        self.evaluators
            .get(kind)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    pub fn contains(&self, kind: &ActionKind) -> bool {
        self.evaluators.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }

    /// Supervisors for the standard browser action catalogue.
    pub fn browser_defaults(judge: Arc<dyn JudgeModel>, denylist: DomainDenylist) -> Self {
        let approvals = [
            (ActionKind::SearchGoogle, "Approving, google search is safe"),
            (ActionKind::GoBack, ""),
            // TODO: check typed text for data leaking to untrusted sites
            (ActionKind::InputText, ""),
            (ActionKind::SwitchTab, "Switching tabs is safe"),
            (ActionKind::OpenTab, "Opening a new tab is safe"),
            (ActionKind::ExtractContent, "Extracting content is safe"),
            (ActionKind::Done, "Done is safe"),
            (ActionKind::ScrollDown, "Scrolling down is safe"),
            (ActionKind::ScrollUp, "Scrolling up is safe"),
            (ActionKind::SendKeys, "Sending keys is safe"),
            (ActionKind::ScrollToText, "Scrolling to text is safe"),
            (ActionKind::GetDropdownOptions, "Getting dropdown options is safe"),
            (
                ActionKind::SelectDropdownOption,
                "Selecting a dropdown option is safe",
            ),
        ];

        approvals
            .into_iter()
            .fold(Self::builder(), |builder, (kind, rationale)| {
                builder.register(kind, Arc::new(StaticApproval::new(rationale)))
            })
            .register(ActionKind::GoToUrl, Arc::new(NavigationGuard::new(denylist)))
            .register(ActionKind::ClickElement, Arc::new(ClickJudge::new(judge)))
            .build()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    evaluators: HashMap<ActionKind, Arc<dyn Evaluator>>,
    fallback: Option<Arc<dyn Evaluator>>,
}

impl RegistryBuilder {
    /// Register `evaluator` for `kind`, replacing any previous entry.
    pub fn register(mut self, kind: ActionKind, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluators.insert(kind, evaluator);
        self
    }

    pub fn fallback(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.fallback = Some(evaluator);
        self
    }

    pub fn build(self) -> EvaluatorRegistry {
        EvaluatorRegistry {
            evaluators: self.evaluators,
            fallback: self.fallback.unwrap_or_else(|| Arc::new(NothingToSupervise)),
        }
    }
}
