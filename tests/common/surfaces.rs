use workflow_learner::{
    agent::agent_model::Action,
    screen::screen_model::{DomNode, Snapshot},
};

use super::fake_driver::FakeDriver;
use super::fake_resolver::ScriptedResolver;

pub const LOGIN_URL: &str = "https://app.test/login";
pub const DASHBOARD_URL: &str = "https://app.test/dashboard";
pub const SHOP_URL: &str = "https://shop.test/";

pub const SIGN_IN_FEATURE: &str = r##"Feature: Accounts

  Scenario: Sign in
    Given I am on the website "https://app.test/login"
    When I enter "alice@example.com" as "username"
    And I enter "hunter2" as the password field
    And I click the "Sign in" button
    Then I should see "Welcome back"

  Scenario: Search with selectors
    Given I am on the website "https://shop.test/"
    When I enter "phone" into field with selector "#search"
    And I click element with selector "#search-go"
    Then I should see "Phone One"
"##;

// ============================================================================
// Login application
// ============================================================================

pub fn login_surface() -> Snapshot {
    let form = DomNode::new("form")
        .with_attr("id", "login-form")
        .with_children([
            DomNode::new("h2").with_text("Sign in to continue"),
            DomNode::new("input")
                .with_attr("id", "username")
                .with_attr("name", "username")
                .with_attr("placeholder", "Email"),
            DomNode::new("input")
                .with_attr("id", "password")
                .with_attr("name", "password")
                .with_attr("type", "password"),
            DomNode::new("input")
                .with_attr("type", "hidden")
                .with_attr("name", "csrf")
                .with_attr("value", "token-123"),
            DomNode::new("button")
                .with_attr("id", "sign-in")
                .with_text("Sign in"),
        ]);

    Snapshot::new(LOGIN_URL, page(vec![form]))
}

pub fn dashboard_surface() -> Snapshot {
    let main = DomNode::new("div").with_attr("id", "main").with_children([
        DomNode::new("h1").with_text("Welcome back"),
        DomNode::new("button")
            .with_attr("id", "new-report")
            .with_text("New report"),
    ]);

    Snapshot::new(DASHBOARD_URL, page(vec![main]))
}

pub fn login_driver() -> FakeDriver {
    FakeDriver::new()
        .with_surface("login", login_surface())
        .with_surface("dashboard", dashboard_surface())
        .with_click("login", "#sign-in", "dashboard")
}

pub fn login_resolver() -> ScriptedResolver {
    ScriptedResolver::new()
        .on("username", Action::fill("#username", "alice@example.com"))
        .on("password", Action::fill("#password", "hunter2"))
        .on("sign in", Action::click("#sign-in"))
}

// ============================================================================
// Shop application (stable regions plus dynamic content)
// ============================================================================

pub fn nav_belt(search_value: Option<&str>) -> DomNode {
    let mut search = DomNode::new("input")
        .with_attr("id", "search")
        .with_attr("name", "q")
        .with_attr("placeholder", "Search");
    if let Some(value) = search_value {
        search = search.with_attr("value", value);
    }

    DomNode::new("div").with_attr("id", "nav-belt").with_children([
        search,
        DomNode::new("button")
            .with_attr("id", "search-go")
            .with_text("Go"),
    ])
}

/// Promotions that change on every load.
pub fn deals(ids: &[&str]) -> DomNode {
    DomNode::new("div")
        .with_attr("id", "deals")
        .with_children(ids.iter().map(|id| {
            DomNode::new("button")
                .with_attr("id", id)
                .with_text("Add deal")
        }))
}

pub fn shop_home(deal_ids: &[&str]) -> Snapshot {
    Snapshot::new(SHOP_URL, page(vec![nav_belt(None), deals(deal_ids)]))
}

pub fn shop_results() -> Snapshot {
    let results = DomNode::new("ul").with_attr("id", "results").with_children([
        DomNode::new("li").with_child(
            DomNode::new("a")
                .with_attr("id", "result-1")
                .with_attr("href", "/dp/1")
                .with_text("Phone One"),
        ),
        DomNode::new("li").with_child(
            DomNode::new("a")
                .with_attr("id", "result-2")
                .with_attr("href", "/dp/2")
                .with_text("Phone Two"),
        ),
    ]);
    let filters = DomNode::new("div").with_attr("id", "leftNav").with_child(
        DomNode::new("input")
            .with_attr("id", "prime")
            .with_attr("type", "checkbox")
            .with_attr("name", "prime"),
    );

    Snapshot::new(
        "https://shop.test/s?k=phone",
        page(vec![nav_belt(Some("phone")), filters, results]),
    )
}

pub fn shop_driver() -> FakeDriver {
    FakeDriver::new()
        .with_surface("home", shop_home(&["deal-1", "deal-2"]))
        .with_surface("results", shop_results())
        .with_click("home", "#search-go", "results")
}

// ============================================================================
// Helpers
// ============================================================================

pub fn page(body: Vec<DomNode>) -> DomNode {
    DomNode::new("html").with_child(DomNode::new("body").with_children(body))
}

/// Two surfaces that link to each other: a -> b -> a -> ...
pub fn ping_pong_driver() -> FakeDriver {
    let a = Snapshot::new(
        "https://loop.test/",
        page(vec![DomNode::new("button").with_attr("id", "next").with_text("Next")]),
    );
    let b = Snapshot::new(
        "https://loop.test/b",
        page(vec![DomNode::new("button").with_attr("id", "back").with_text("Back")]),
    );

    FakeDriver::new()
        .with_surface("a", a)
        .with_surface("b", b)
        .with_click("a", "#next", "b")
        .with_click("b", "#back", "a")
}
