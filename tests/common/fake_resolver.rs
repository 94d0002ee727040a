use std::cell::RefCell;

use workflow_learner::agent::{
    agent_model::Action,
    error::ResolveError,
    resolver::{IntentResolver, ResolutionRequest},
};

struct Rule {
    keyword: String,
    action: Action,
    once: bool,
}

/// Resolver that answers by keyword match on the step goal and records
/// every request it receives.
#[derive(Default)]
pub struct ScriptedResolver {
    rules: RefCell<Vec<Rule>>,
    requests: RefCell<Vec<ResolutionRequest>>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `action` whenever the goal mentions `keyword`.
    pub fn on(self, keyword: &str, action: Action) -> Self {
        self.push(keyword, action, false)
    }

    /// Answer `action` the first time only; later matches fall through to
    /// the next rule.
    pub fn once(self, keyword: &str, action: Action) -> Self {
        self.push(keyword, action, true)
    }

    fn push(self, keyword: &str, action: Action, once: bool) -> Self {
        self.rules.borrow_mut().push(Rule {
            keyword: keyword.to_lowercase(),
            action,
            once,
        });
        self
    }

    pub fn requests(&self) -> Vec<ResolutionRequest> {
        self.requests.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl IntentResolver for ScriptedResolver {
    fn resolve(&self, request: &ResolutionRequest) -> Result<Action, ResolveError> {
        self.requests.borrow_mut().push(request.clone());

        let goal = request.goal.to_lowercase();
        let mut rules = self.rules.borrow_mut();
        let index = rules
            .iter()
            .position(|r| goal.contains(&r.keyword))
            .ok_or_else(|| ResolveError::Unparsable {
                reply: format!("no idea how to '{}'", request.goal),
            })?;

        if rules[index].once {
            Ok(rules.remove(index).action)
        } else {
            Ok(rules[index].action.clone())
        }
    }
}
