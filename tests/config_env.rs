// tests/config_env.rs
//
// Config resolution through process environment; serialized because env vars
// are process-global.

use std::io::Write;

use serial_test::serial;

use discovery_monitor::config::{
    MonitorConfig, ENV_CACHE_PATH, ENV_CACHE_TTL_SECS, ENV_CONFIG_PATH,
};

fn clear_env() {
    std::env::remove_var(ENV_CONFIG_PATH);
    std::env::remove_var(ENV_CACHE_PATH);
    std::env::remove_var(ENV_CACHE_TTL_SECS);
    std::env::remove_var("GEMINI_API_KEY");
}

#[test]
#[serial]
fn explicit_config_path_is_loaded() {
    clear_env();
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        f,
        r#"
[cache]
ttl_secs = 120

[pipeline]
batch_size = 3

[classifier]
provider = "OpenAI"

[[sources]]
name = "UNAIDS"
url = "https://www.unaids.org/en/feeds/news"
"#
    )
    .unwrap();
    std::env::set_var(ENV_CONFIG_PATH, f.path());

    let cfg = MonitorConfig::load().unwrap();
    assert_eq!(cfg.cache.ttl_secs, 120);
    assert_eq!(cfg.pipeline.batch_size, 3);
    assert_eq!(cfg.pipeline.max_concurrent_batches, 2);
    assert_eq!(cfg.classifier.provider, "openai");
    assert_eq!(cfg.sources.len(), 1);
    clear_env();
}

#[test]
#[serial]
fn missing_explicit_path_is_an_error() {
    clear_env();
    std::env::set_var(ENV_CONFIG_PATH, "/definitely/not/here/monitor.toml");
    assert!(MonitorConfig::load().is_err());
    clear_env();
}

#[test]
#[serial]
fn cache_env_overrides_apply_after_file() {
    clear_env();
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "[cache]\npath = \"from-file.json\"\nttl_secs = 10").unwrap();
    std::env::set_var(ENV_CONFIG_PATH, f.path());
    std::env::set_var(ENV_CACHE_PATH, "/tmp/override/discoveryCache.json");
    std::env::set_var(ENV_CACHE_TTL_SECS, "900");

    let cfg = MonitorConfig::load().unwrap();
    assert_eq!(
        cfg.cache.path,
        std::path::PathBuf::from("/tmp/override/discoveryCache.json")
    );
    assert_eq!(cfg.cache.ttl_secs, 900);

    // unparseable TTL is ignored
    std::env::set_var(ENV_CACHE_TTL_SECS, "soon");
    assert_eq!(MonitorConfig::load().unwrap().cache.ttl_secs, 10);
    clear_env();
}

#[test]
#[serial]
fn env_api_key_enables_classifier() {
    clear_env();
    let cfg = MonitorConfig::from_toml_str("[classifier]\nprovider = \"gemini\"").unwrap();
    assert!(cfg.classifier.resolve_api_key().is_none());

    std::env::set_var("GEMINI_API_KEY", "test-key");
    assert_eq!(cfg.classifier.resolve_api_key().as_deref(), Some("test-key"));
    clear_env();
}
