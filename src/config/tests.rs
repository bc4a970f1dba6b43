use std::io::Write;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_serve_fixtures_in_production_mode() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.site.environment, RenderMode::Production);
    assert_eq!(settings.site.title, "The Howling Mine");
    assert!(matches!(
        settings.content.backend,
        ContentBackend::Fixtures { ref path } if path == std::path::Path::new(DEFAULT_FIXTURES_PATH)
    ));
    assert!(settings.revalidate.secret.is_none());
    assert!(settings.stats.upstream_url.is_none());
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.max_entries.get(), 256);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn sanity_source_requires_project_id() {
    let mut raw = RawSettings::default();
    raw.content.source = Some("sanity".to_string());

    let err = Settings::from_raw(raw).expect_err("missing project id");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "content.sanity.project_id",
            ..
        }
    ));
}

#[test]
fn sanity_source_applies_defaults() {
    let mut raw = RawSettings::default();
    raw.content.source = Some("sanity".to_string());
    raw.content.sanity.project_id = Some("abc123".to_string());
    raw.content.sanity.token = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    match settings.content.backend {
        ContentBackend::Sanity(sanity) => {
            assert_eq!(sanity.dataset, "production");
            assert_eq!(sanity.api_version, "2024-01-01");
            assert!(sanity.use_cdn);
            assert!(sanity.token.is_none());
        }
        other => panic!("unexpected backend {other:?}"),
    }
}

#[test]
fn unknown_environment_is_rejected() {
    let mut raw = RawSettings::default();
    raw.site.environment = Some("staging".to_string());

    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "site.environment",
            ..
        })
    ));
}

#[test]
fn zero_cache_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.max_entries = Some(0);

    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "cache.max_entries",
            ..
        })
    ));
}

#[test]
fn stats_url_must_be_http() {
    let mut raw = RawSettings::default();
    raw.stats.upstream_url = Some("ftp://stats.example".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn config_file_layers_under_cli_overrides() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    writeln!(
        file,
        "[server]\nport = 8080\n\n[site]\nenvironment = \"development\"\n\n[stats]\nupstream_url = \"https://stats.example.test/api\"\n"
    )
    .expect("write config");

    let path = file.path().to_string_lossy().into_owned();
    let args = CliArgs::parse_from([
        "howling-mine",
        "--config-file",
        path.as_str(),
        "serve",
        "--server-port",
        "9090",
    ]);
    let settings = load(&args).expect("settings");

    assert_eq!(settings.server.addr.port(), 9090);
    assert_eq!(settings.site.environment, RenderMode::Development);
    assert_eq!(
        settings.stats.upstream_url.as_ref().map(Url::as_str),
        Some("https://stats.example.test/api")
    );
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["howling-mine"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_routes_arguments() {
    let args = CliArgs::parse_from([
        "howling-mine",
        "routes",
        "--fixtures-path",
        "/tmp/content.json",
    ]);

    match args.command.expect("routes command") {
        Command::Routes(routes) => {
            assert_eq!(
                routes.content.fixtures_path.as_deref(),
                Some(std::path::Path::new("/tmp/content.json"))
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "howling-mine",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--site-environment",
        "development",
        "--content-source",
        "sanity",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.site_environment.as_deref(),
                Some("development")
            );
            assert_eq!(
                serve.overrides.content.content_source.as_deref(),
                Some("sanity")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
