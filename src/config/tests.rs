use clap::Parser;

use super::*;

#[test]
fn defaults_match_runtime_defaults() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.runtime.cache_ttl, Duration::from_secs(30));
    assert!(settings.runtime.persistence_required);
    assert_eq!(settings.runtime.stale_notice, DEFAULT_STALE_NOTICE);
    assert_eq!(settings.store.backend, StoreBackend::File);
    assert_eq!(settings.store.directory, PathBuf::from(DEFAULT_STORE_DIR));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.runtime.cache_ttl_ms = Some(60_000);
    raw.logging.level = Some("info".to_string());

    let overrides = RuntimeOverrides {
        cache_ttl_ms: Some(5_000),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_runtime_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.runtime.cache_ttl, Duration::from_millis(5_000));
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = RuntimeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_runtime_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn tiny_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.runtime.cache_ttl_ms = Some(5);

    let err = Settings::from_raw(raw).expect_err("ttl too small");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "runtime.cache_ttl_ms",
            ..
        }
    ));
}

#[test]
fn blank_stale_notice_is_rejected() {
    let mut raw = RawSettings::default();
    raw.runtime.stale_notice = Some("   ".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn store_backend_is_parsed() {
    let mut raw = RawSettings::default();
    raw.apply_store_overrides(&StoreOverrides {
        store_backend: Some("Memory".to_string()),
        store_directory: Some(PathBuf::from("/tmp/views")),
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.store.backend, StoreBackend::Memory);
    assert_eq!(settings.store.directory, PathBuf::from("/tmp/views"));

    let mut raw = RawSettings::default();
    raw.store.backend = Some("redis".to_string());
    let err = Settings::from_raw(raw).expect_err("unknown backend");
    assert_eq!(
        err.to_string(),
        "invalid configuration for `store.backend`: unknown backend `redis`, expected memory or file"
    );
}

#[test]
fn parse_demo_arguments() {
    let args = CliArgs::parse_from([
        "vellum",
        "demo",
        "--clicks",
        "5",
        "--cache-ttl-ms",
        "250",
        "--store-backend",
        "memory",
    ]);

    match args.command.expect("demo command") {
        Command::Demo(demo) => {
            assert_eq!(demo.clicks, 5);
            assert_eq!(demo.channel, "demo");
            assert_eq!(demo.overrides.cache_ttl_ms, Some(250));
            assert_eq!(demo.overrides.store.store_backend.as_deref(), Some("memory"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_inspect_arguments() {
    let args = CliArgs::parse_from([
        "vellum",
        "inspect",
        "--store-directory",
        "/var/lib/vellum",
        "1234",
    ]);

    match args.command.expect("inspect command") {
        Command::Inspect(inspect) => {
            assert_eq!(inspect.content_id.as_deref(), Some("1234"));
            assert_eq!(
                inspect.store.store_directory.as_deref(),
                Some(std::path::Path::new("/var/lib/vellum"))
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn no_subcommand_defaults_to_demo() {
    let args = CliArgs::parse_from(["vellum"]);
    let command = args.command.unwrap_or(Command::Demo(DemoArgs::default()));
    assert!(matches!(command, Command::Demo(_)));
}

#[test]
#[serial_test::serial]
fn file_and_environment_layers_apply_in_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("vellum-test.toml");
    std::fs::write(
        &path,
        "[runtime]\ncache_ttl_ms = 9000\nstale_notice = \"from file\"\n\n[store]\nbackend = \"memory\"\n",
    )
    .expect("write config");

    // SAFETY: serialized with every other test that touches the environment.
    unsafe { std::env::set_var("VELLUM__RUNTIME__CACHE_TTL_MS", "4500") };
    let cli = CliArgs {
        config_file: Some(path),
        command: None,
    };
    let loaded = load(&cli);
    unsafe { std::env::remove_var("VELLUM__RUNTIME__CACHE_TTL_MS") };

    let settings = loaded.expect("layered settings load");
    assert_eq!(settings.runtime.cache_ttl, Duration::from_millis(4_500));
    assert_eq!(settings.runtime.stale_notice, "from file");
    assert_eq!(settings.store.backend, StoreBackend::Memory);
}

#[test]
#[serial_test::serial]
fn missing_explicit_config_file_is_an_error() {
    let cli = CliArgs {
        config_file: Some(PathBuf::from("/nonexistent/vellum.toml")),
        command: None,
    };
    assert!(matches!(load(&cli), Err(LoadError::Build(_))));
}
