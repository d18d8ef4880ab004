//! End-to-end checks of configuration precedence and navigation decisions,
//! through the public API only.

use proptest::prelude::*;
use serde_yaml::{Mapping, Value};

use surikiosk::config::{FileConfig, FileFormat, parse};
use surikiosk::effective::EffectiveConfig;
use surikiosk::policy::{NavigationDecision, NavigationPolicy, SubstituteKind};
use surikiosk::resolver::{Environment, Overrides, Source, resolve};
use surikiosk::settings::SETTINGS;
use surikiosk::whitelist::Whitelist;

fn from_yaml(yaml: &str) -> FileConfig {
    FileConfig::from_mapping(parse(yaml, FileFormat::Yaml).unwrap())
}

fn resolve_yaml(yaml: &str) -> EffectiveConfig {
    resolve(&Overrides::new(), &Environment::default(), &from_yaml(yaml)).unwrap()
}

fn policy(yaml: &str) -> NavigationPolicy {
    NavigationPolicy::new(resolve_yaml(yaml))
}

const EXAMPLE: &str = r#"
start_url: "http://example.com/"
whitelist: ["example.com"]
"#;

// ── Precedence ───────────────────────────────────────────────────────────

#[test]
fn test_absent_everywhere_gives_declared_default() {
    let config = resolve_yaml("");
    for setting in SETTINGS {
        assert_eq!(
            config.get(setting.key),
            Some(&setting.default.to_value()),
            "default for `{}`",
            setting.key
        );
        assert_eq!(config.origin(setting.key), Some(Source::Default));
    }
}

#[test]
fn test_bogus_enumerated_file_value_falls_back_to_default() {
    let config = resolve_yaml("ssl_mode: bogus\n");
    assert_eq!(config.get("ssl_mode"), Some(&Value::from("strict")));
}

#[test]
fn test_env_binding_beats_file() {
    let env = Environment::from_pairs([("http_proxy", "proxy.env:3128")]);
    let file = from_yaml("proxy_server: proxy.file:8080\n");
    let config = resolve(&Overrides::new(), &env, &file).unwrap();
    assert_eq!(config.get("proxy_server"), Some(&Value::from("proxy.env:3128")));
    assert_eq!(config.origin("proxy_server"), Some(Source::Environment));
}

proptest! {
    #[test]
    fn test_cli_value_always_wins(
        cli in "[a-z]{1,12}",
        env in proptest::option::of("[a-z]{1,12}"),
        file in proptest::option::of("[a-z]{1,12}"),
    ) {
        let mut overrides = Overrides::new();
        overrides.set("proxy_server", Some(cli.clone()));
        let env = Environment::from_pairs(env.map(|v| ("http_proxy".to_string(), v)));
        let mut mapping = Mapping::new();
        if let Some(file) = file {
            mapping.insert(Value::from("proxy_server"), Value::from(file));
        }
        let config = resolve(&overrides, &env, &FileConfig::from_mapping(mapping)).unwrap();
        prop_assert_eq!(config.get("proxy_server"), Some(&Value::from(cli)));
    }

    #[test]
    fn test_file_value_used_without_cli_or_env(timeout in 0i64..100_000) {
        let config = resolve_yaml(&format!("timeout: {timeout}\n"));
        prop_assert_eq!(config.integer("timeout"), timeout);
        prop_assert_eq!(config.origin("timeout"), Some(Source::File));
    }
}

// ── Whitelist and navigation ─────────────────────────────────────────────

#[test]
fn test_whitelist_is_suffix_exact() {
    let whitelist = Whitelist::from_hosts(["example.com"]);
    assert!(whitelist.matches("a.b.example.com"));
    assert!(!whitelist.matches("notexample.com"));
}

#[test]
fn test_whitelisted_navigation_allowed_and_other_denied() {
    let policy = policy(EXAMPLE);
    assert_eq!(
        policy.evaluate_navigation("http://example.com/x"),
        NavigationDecision::Allow
    );
    assert_eq!(
        policy.evaluate_navigation("http://evil.com/x"),
        NavigationDecision::Deny(SubstituteKind::NotFoundPage)
    );
}

#[test]
fn test_failed_load_of_start_page_is_network_down() {
    let policy = policy(EXAMPLE);
    assert_eq!(
        policy.evaluate_load_result("http://example.com/", false),
        Some(NavigationDecision::Deny(SubstituteKind::NetworkDownPage))
    );
    assert_eq!(
        policy.evaluate_load_result("http://example.com/other", false),
        Some(NavigationDecision::Deny(SubstituteKind::NotFoundPage))
    );
    assert_eq!(policy.evaluate_load_result("http://example.com/", true), None);
}

#[test]
fn test_tls_errors_follow_ssl_mode() {
    assert_eq!(
        policy("ssl_mode: ignore\n").evaluate_tls_error("https://example.com/"),
        NavigationDecision::Allow
    );
    assert_eq!(
        policy("").evaluate_tls_error("https://example.com/"),
        NavigationDecision::Deny(SubstituteKind::CertificateErrorPage)
    );
}

proptest! {
    #[test]
    fn test_disabled_whitelist_allows_everything(url in "\\PC{0,40}") {
        let policy = policy("whitelist: false\n");
        prop_assert_eq!(policy.evaluate_navigation(&url), NavigationDecision::Allow);
    }

    #[test]
    fn test_navigation_decision_is_deterministic(host in "[a-z]{1,10}\\.(com|org|net)") {
        let policy = policy(EXAMPLE);
        let url = format!("http://{host}/");
        prop_assert_eq!(policy.evaluate_navigation(&url), policy.evaluate_navigation(&url));
    }
}
