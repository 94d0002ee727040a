use std::fmt;

/// What a step acts on.
///
/// A `Selector` comes straight from the scenario text and bypasses the
/// oracle. A `Named` target is a natural-language description that has to be
/// resolved into a selector, optionally narrowed to a containing section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Selector(String),
    Named {
        name: String,
        section: Option<String>,
    },
}

impl Target {
    pub fn selector(selector: impl Into<String>) -> Self {
        Target::Selector(selector.into())
    }

    pub fn named(name: impl Into<String>, section: Option<&str>) -> Self {
        Target::Named {
            name: name.into(),
            section: section.map(|s| s.to_string()),
        }
    }
}

/// A single parsed scenario step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Enter a value into a field
    Fill { target: Target, value: String },

    /// Click an element
    Click { target: Target },

    /// Click the first entry of a named list
    ClickFirstInList {
        list_name: String,
        section: Option<String>,
    },

    /// Block until the named text or element is visible
    Wait { target_name: String },
}

impl Step {
    /// Explicit selector carried by the step, if any.
    pub fn selector(&self) -> Option<&str> {
        match self {
            Step::Fill {
                target: Target::Selector(s),
                ..
            }
            | Step::Click {
                target: Target::Selector(s),
            } => Some(s.as_str()),
            _ => None,
        }
    }

    /// Natural-language name of the element the step refers to.
    pub fn target_name(&self) -> Option<&str> {
        match self {
            Step::Fill {
                target: Target::Named { name, .. },
                ..
            }
            | Step::Click {
                target: Target::Named { name, .. },
            } => Some(name.as_str()),
            Step::ClickFirstInList { list_name, .. } => Some(list_name.as_str()),
            Step::Wait { target_name } => Some(target_name.as_str()),
            _ => None,
        }
    }

    /// Containing-region hint used to scope the element summary.
    pub fn section(&self) -> Option<&str> {
        match self {
            Step::Fill {
                target: Target::Named { section, .. },
                ..
            }
            | Step::Click {
                target: Target::Named { section, .. },
            }
            | Step::ClickFirstInList { section, .. } => section.as_deref(),
            _ => None,
        }
    }

    /// Value to enter for fill steps.
    pub fn fill_value(&self) -> Option<&str> {
        match self {
            Step::Fill { value, .. } => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn is_wait(&self) -> bool {
        matches!(self, Step::Wait { .. })
    }

    /// The single goal handed to the oracle for this step.
    pub fn goal(&self) -> String {
        match self {
            Step::Fill {
                target: Target::Named { name, .. },
                value,
            } => format!("Enter \"{}\" into the \"{}\" field", value, name),
            Step::Fill {
                target: Target::Selector(selector),
                value,
            } => format!("Enter \"{}\" into the field matching {}", value, selector),
            Step::Click {
                target: Target::Named { name, .. },
            } => format!("Click the \"{}\" element", name),
            Step::Click {
                target: Target::Selector(selector),
            } => format!("Click the element matching {}", selector),
            Step::ClickFirstInList { list_name, .. } => {
                format!("Click the first item in the \"{}\" list", list_name)
            }
            Step::Wait { target_name } => format!("Wait until \"{}\" is visible", target_name),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Fill { target, value } => write!(f, "fill {} with \"{}\"", target, value),
            Step::Click { target } => write!(f, "click {}", target),
            Step::ClickFirstInList { list_name, section } => {
                write!(f, "click first item in \"{}\"", list_name)?;
                if let Some(section) = section {
                    write!(f, " under \"{}\"", section)?;
                }
                Ok(())
            }
            Step::Wait { target_name } => write!(f, "wait for \"{}\"", target_name),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Selector(selector) => write!(f, "selector {}", selector),
            Target::Named { name, section: None } => write!(f, "\"{}\"", name),
            Target::Named {
                name,
                section: Some(section),
            } => write!(f, "\"{}\" under \"{}\"", name, section),
        }
    }
}

/// A named scenario and its ordered steps. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,

    /// Website named by a `Given I am on the website "..."` precondition
    pub start_url: Option<String>,

    pub steps: Vec<Step>,
}
