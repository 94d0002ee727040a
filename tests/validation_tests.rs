use tempfile::tempdir;
use workflow_learner::{
    agent::agent_model::Action,
    controller::{
        learn::{LearningController, LearningReport},
        validate::{DEFAULT_MAX_STEPS, ValidationController, ValidationError},
    },
    graph::store::GraphStore,
    scenario::parser::parse_scenario,
    screen::screen_model::{DomNode, Snapshot},
    state::fingerprint::FingerprintEngine,
};

use crate::common::{
    fake_driver::FakeDriver,
    fake_resolver::ScriptedResolver,
    surfaces::{
        DASHBOARD_URL, LOGIN_URL, SIGN_IN_FEATURE, dashboard_surface, login_driver,
        login_resolver, login_surface, page, ping_pong_driver,
    },
};

mod common;

fn learn_sign_in(store: &GraphStore, engine: &FingerprintEngine) -> LearningReport {
    let scenario = parse_scenario(SIGN_IN_FEATURE, "Sign in").unwrap();
    let resolver = login_resolver();
    let mut driver = login_driver();
    LearningController::new(&mut driver, &resolver, engine, store)
        .learn(&scenario, LOGIN_URL)
        .unwrap()
}

// ============================================================================
// Successful replay
// ============================================================================

#[test]
fn replay_of_learned_workflow_matches_every_state() {
    let dir = tempdir().unwrap();
    let store = GraphStore::new(dir.path());
    let engine = FingerprintEngine::default();
    let learned = learn_sign_in(&store, &engine);

    let mut driver = login_driver();
    let report = ValidationController::new(&mut driver, &engine, &store)
        .validate(LOGIN_URL)
        .unwrap();

    assert_eq!(report.app_name, "app_test_login");
    assert_eq!(report.steps_replayed, 4);
    assert_eq!(report.path.len(), 4);
    assert_eq!(report.path[0], engine.fingerprint(&login_surface()));
    assert_eq!(report.path.last(), Some(&learned.final_state));

    assert_eq!(
        driver.log,
        vec![
            "load https://app.test/login",
            "fill #username=alice@example.com",
            "fill #password=hunter2",
            "click #sign-in",
        ]
    );
}

#[test]
fn replay_finds_graph_learned_from_a_deeper_start_page() {
    let dir = tempdir().unwrap();
    let store = GraphStore::new(dir.path());
    let engine = FingerprintEngine::default();

    let scenario = parse_scenario(SIGN_IN_FEATURE, "Sign in").unwrap();
    let resolver = login_resolver();
    let mut learner = login_driver();
    let learned = LearningController::new(&mut learner, &resolver, &engine, &store)
        .learn(&scenario, "https://app.test")
        .unwrap();

    let mut driver = login_driver();
    let report = ValidationController::new(&mut driver, &engine, &store)
        .validate("https://app.test")
        .unwrap();

    assert_eq!(report.app_name, learned.app_name);
    assert_eq!(report.steps_replayed, 4);
    assert_eq!(driver.log[0], "load https://app.test/login");
}

#[test]
fn replay_never_writes_the_graph() {
    let dir = tempdir().unwrap();
    let store = GraphStore::new(dir.path());
    let engine = FingerprintEngine::default();
    learn_sign_in(&store, &engine);
    let writes = store.writes();

    let mut driver = login_driver();
    ValidationController::new(&mut driver, &engine, &store)
        .validate(LOGIN_URL)
        .unwrap();

    assert_eq!(store.writes(), writes);
}

#[test]
fn dynamic_content_outside_regions_still_validates() {
    let dir = tempdir().unwrap();
    let store = GraphStore::new(dir.path());
    let engine = FingerprintEngine::from_locators(&["form#login-form", "div#main"]).unwrap();
    learn_sign_in(&store, &engine);

    let banner = DomNode::new("div").with_attr("id", "promo").with_child(
        DomNode::new("button")
            .with_attr("id", "promo-42")
            .with_text("Today only"),
    );
    let mut login = login_surface();
    login.root.children[0].children.insert(0, banner);

    let mut driver = FakeDriver::new()
        .with_surface("login", login)
        .with_surface("dashboard", dashboard_surface())
        .with_click("login", "#sign-in", "dashboard");

    let report = ValidationController::new(&mut driver, &engine, &store)
        .validate(LOGIN_URL)
        .unwrap();
    assert_eq!(report.steps_replayed, 4);
}

// ============================================================================
// Divergence
// ============================================================================

#[test]
fn changed_target_state_is_a_mismatch() {
    let dir = tempdir().unwrap();
    let store = GraphStore::new(dir.path());
    let engine = FingerprintEngine::default();
    let learned = learn_sign_in(&store, &engine);

    let redesigned = Snapshot::new(
        DASHBOARD_URL,
        page(vec![
            DomNode::new("h1").with_text("Welcome back"),
            DomNode::new("button").with_attr("id", "export").with_text("Export"),
        ]),
    );
    let mut driver = FakeDriver::new()
        .with_surface("login", login_surface())
        .with_surface("dashboard", redesigned.clone())
        .with_click("login", "#sign-in", "dashboard");

    let result = ValidationController::new(&mut driver, &engine, &store).validate(LOGIN_URL);

    match result {
        Err(ValidationError::StateMismatch {
            step,
            action,
            expected,
            actual,
        }) => {
            assert_eq!(step, 4);
            assert_eq!(action, Action::click("#sign-in"));
            assert_eq!(expected, learned.final_state);
            assert_eq!(actual, engine.fingerprint(&redesigned));
        }
        other => panic!("expected a state mismatch, got {:?}", other),
    }
}

#[test]
fn changed_initial_surface_is_an_initial_mismatch() {
    let dir = tempdir().unwrap();
    let store = GraphStore::new(dir.path());
    let engine = FingerprintEngine::default();
    learn_sign_in(&store, &engine);

    let mut login = login_surface();
    login.root.children[0].children[0].children.push(
        DomNode::new("input")
            .with_attr("id", "remember-me")
            .with_attr("type", "checkbox"),
    );
    let mut driver = FakeDriver::new()
        .with_surface("login", login.clone())
        .with_surface("dashboard", dashboard_surface())
        .with_click("login", "#sign-in", "dashboard");

    let result = ValidationController::new(&mut driver, &engine, &store).validate(LOGIN_URL);

    match result {
        Err(ValidationError::InitialStateMismatch { expected, actual }) => {
            assert_eq!(expected, engine.fingerprint(&login_surface()));
            assert_eq!(actual, engine.fingerprint(&login));
        }
        other => panic!("expected an initial mismatch, got {:?}", other),
    }
    assert_eq!(driver.log, vec!["load https://app.test/login"]);
}

#[test]
fn failing_replay_action_is_reported() {
    let dir = tempdir().unwrap();
    let store = GraphStore::new(dir.path());
    let engine = FingerprintEngine::default();
    learn_sign_in(&store, &engine);

    let mut driver = login_driver().with_broken_selector("#sign-in");
    let result = ValidationController::new(&mut driver, &engine, &store).validate(LOGIN_URL);

    assert!(matches!(
        result,
        Err(ValidationError::Action { step: 4, .. })
    ));
}

// ============================================================================
// Bounds and empty graphs
// ============================================================================

#[test]
fn missing_graph_is_reported_as_empty() {
    let dir = tempdir().unwrap();
    let store = GraphStore::new(dir.path());
    let engine = FingerprintEngine::default();
    let mut driver = login_driver();

    let result = ValidationController::new(&mut driver, &engine, &store).validate(LOGIN_URL);

    assert!(matches!(
        result,
        Err(ValidationError::EmptyGraph { ref app }) if app == "app_test_login"
    ));
    assert!(driver.log.is_empty());
}

#[test]
fn cyclic_graph_stops_at_the_step_limit() {
    let dir = tempdir().unwrap();
    let store = GraphStore::new(dir.path());
    let engine = FingerprintEngine::default();

    let text = "Scenario: Loop\n  Given I am on the website \"https://loop.test/\"\n  When I click \"Next\"\n  And I click \"Back\"\n";
    let scenario = parse_scenario(text, "Loop").unwrap();
    let resolver = ScriptedResolver::new()
        .on("next", Action::click("#next"))
        .on("back", Action::click("#back"));
    let mut learner = ping_pong_driver();
    let learned = LearningController::new(&mut learner, &resolver, &engine, &store)
        .learn(&scenario, "https://loop.test/")
        .unwrap();
    assert_eq!(learned.edges_recorded, 3);

    let mut driver = ping_pong_driver();
    let result = ValidationController::new(&mut driver, &engine, &store)
        .with_max_steps(10)
        .validate("https://loop.test/");

    match result {
        Err(ValidationError::StepLimitExceeded { max_steps, .. }) => assert_eq!(max_steps, 10),
        other => panic!("expected the step limit, got {:?}", other),
    }
    // One load, then nine clicks: the first replayed step is the initial load.
    assert_eq!(driver.log.len(), 10);
}

#[test]
fn default_step_limit() {
    assert_eq!(DEFAULT_MAX_STEPS, 100);
}
