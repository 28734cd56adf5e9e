use crate::error::Result;
use crate::supervision::types::{ChatCompletionMessage, ProposedAction, SupervisionContext, SupervisionVerdict};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Browser action types known to the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    SearchGoogle,
    GoToUrl,
    GoBack,
    ClickElement,
    InputText,
    SwitchTab,
    OpenTab,
    ExtractContent,
    Done,
    ScrollDown,
    ScrollUp,
    SendKeys,
    ScrollToText,
    GetDropdownOptions,
    SelectDropdownOption,
    /// Any action type without a dedicated arm
    Other(String),
}

impl ActionKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "search_google" => ActionKind::SearchGoogle,
            "go_to_url" | "navigate_to_url" => ActionKind::GoToUrl,
            "go_back" => ActionKind::GoBack,
            "click_element" => ActionKind::ClickElement,
            "input_text" => ActionKind::InputText,
            "switch_tab" => ActionKind::SwitchTab,
            "open_tab" => ActionKind::OpenTab,
            "extract_content" => ActionKind::ExtractContent,
            "done" => ActionKind::Done,
            "scroll_down" => ActionKind::ScrollDown,
            "scroll_up" => ActionKind::ScrollUp,
            "send_keys" => ActionKind::SendKeys,
            "scroll_to_text" => ActionKind::ScrollToText,
            "get_dropdown_options" => ActionKind::GetDropdownOptions,
            "select_dropdown_option" => ActionKind::SelectDropdownOption,
            other => ActionKind::Other(other.to_string()),
        }
    }
}

/// Everything an evaluator may look at for one action.
pub struct EvaluationRequest<'a> {
    pub message: &'a ChatCompletionMessage,
    pub action: &'a ProposedAction,
    pub context: &'a SupervisionContext,
    /// Free-form keyword context forwarded by the caller
    pub kwargs: &'a Map<String, Value>,
}

/// Per-action-type supervisor
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, request: &EvaluationRequest<'_>) -> Result<SupervisionVerdict>;
}

/// Approves unconditionally with a fixed rationale.
pub struct StaticApproval {
    rationale: String,
}

impl StaticApproval {
    pub fn new(rationale: impl Into<String>) -> Self {
        Self {
            rationale: rationale.into(),
        }
    }
}

#[async_trait]
impl Evaluator for StaticApproval {
    async fn evaluate(&self, _request: &EvaluationRequest<'_>) -> Result<SupervisionVerdict> {
        Ok(SupervisionVerdict::approve(self.rationale.clone()))
    }
}

pub const NOTHING_TO_SUPERVISE: &str = "Nothing to supervise";

/// Fallback for action types with no registered evaluator.
pub struct NothingToSupervise;

#[async_trait]
impl Evaluator for NothingToSupervise {
    async fn evaluate(&self, _request: &EvaluationRequest<'_>) -> Result<SupervisionVerdict> {
        Ok(SupervisionVerdict::approve(NOTHING_TO_SUPERVISE))
    }
}

/// Domains whose pages need a human before the agent goes there.
#[derive(Debug, Clone, Default)]
pub struct DomainDenylist {
    domains: Vec<String>,
}

impl DomainDenylist {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Matching entry for `host`, including parent-domain matches.
    pub fn matches(&self, host: &str) -> Option<&str> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.domains
            .iter()
            .find(|d| host == **d || host.ends_with(&format!(".{}", d)))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Escalates navigation to denylisted domains.
pub struct NavigationGuard {
    denylist: DomainDenylist,
}

impl NavigationGuard {
    pub fn new(denylist: DomainDenylist) -> Self {
        Self { denylist }
    }
}

#[async_trait]
impl Evaluator for NavigationGuard {
    async fn evaluate(&self, request: &EvaluationRequest<'_>) -> Result<SupervisionVerdict> {
        let Some(raw) = request.action.str_arg("url") else {
            return Ok(SupervisionVerdict::escalate(
                "Escalate as navigation target is missing",
            ));
        };

        let host = match url::Url::parse(raw) {
            Ok(parsed) => parsed.host_str().map(str::to_string),
            Err(e) => {
                tracing::debug!("Unparseable navigation url {:?}: {}", raw, e);
                None
            }
        };

        let Some(host) = host else {
            return Ok(SupervisionVerdict::escalate(format!(
                "Escalate as navigation target '{}' cannot be resolved",
                raw
            )));
        };

        if let Some(domain) = self.denylist.matches(&host) {
            return Ok(SupervisionVerdict::escalate(format!(
                "Escalate as site may be unsafe: {} (listed: {})",
                host, domain
            )));
        }

        Ok(SupervisionVerdict::approve(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervision::types::DecisionKind;
    use serde_json::json;

    async fn run(evaluator: &dyn Evaluator, action: ProposedAction) -> SupervisionVerdict {
        let message = ChatCompletionMessage::with_tool_call("AgentOutput", &json!({}));
        let context = SupervisionContext::default();
        let kwargs = Map::new();
        let request = EvaluationRequest {
            message: &message,
            action: &action,
            context: &context,
            kwargs: &kwargs,
        };
        evaluator.evaluate(&request).await.unwrap()
    }

    fn goto(url: &str) -> ProposedAction {
        let mut args = Map::new();
        args.insert("url".to_string(), json!(url));
        ProposedAction::new("go_to_url", args)
    }

    #[test]
    fn test_action_kind_parse() {
        assert_eq!(ActionKind::parse("click_element"), ActionKind::ClickElement);
        assert_eq!(ActionKind::parse("navigate_to_url"), ActionKind::GoToUrl);
        assert_eq!(
            ActionKind::parse("fly_away"),
            ActionKind::Other("fly_away".to_string())
        );
    }

    #[test]
    fn test_denylist_matches_subdomains() {
        let list = DomainDenylist::new([".Example.com", " bad.org ", ""]);
        assert_eq!(list.matches("example.com"), Some("example.com"));
        assert_eq!(list.matches("shop.example.com."), Some("example.com"));
        assert_eq!(list.matches("notexample.com"), None);
        assert_eq!(list.matches("bad.org"), Some("bad.org"));
    }

    #[tokio::test]
    async fn test_navigation_guard() {
        let guard = NavigationGuard::new(DomainDenylist::new(["smoke-shop.test"]));

        let ok = run(&guard, goto("https://www.amazon.com/dp/1")).await;
        assert!(ok.is_approved());

        let blocked = run(&guard, goto("https://buy.smoke-shop.test/cart")).await;
        assert_eq!(blocked.decision, DecisionKind::Escalate);
        assert!(blocked.explanation.contains("buy.smoke-shop.test"));

        let garbage = run(&guard, goto("not a url")).await;
        assert_eq!(garbage.decision, DecisionKind::Escalate);

        let missing = run(&guard, ProposedAction::new("go_to_url", Map::new())).await;
        assert_eq!(missing.decision, DecisionKind::Escalate);
    }

    #[tokio::test]
    async fn test_static_and_default_approve() {
        let verdict = run(&StaticApproval::new("Done is safe"), ProposedAction::new("done", Map::new())).await;
        assert_eq!(verdict, SupervisionVerdict::approve("Done is safe"));

        let verdict = run(&NothingToSupervise, ProposedAction::new("zzz", Map::new())).await;
        assert_eq!(verdict.explanation, NOTHING_TO_SUPERVISE);
    }
}
