use clap::Parser;
use gozlem_cli::commands::{Cli, Command};
use gozlem_cli::config::{
    CURRENT_VERSION, CredentialSource, GozlemConfig, config_info, load_config, migrate,
    save_config,
};
use gozlem_core::models::domain::{Domain, Locale};
use gozlem_service::config::ServiceConfig;
use uuid::Uuid;

fn sample(dir: &std::path::Path) -> GozlemConfig {
    GozlemConfig {
        config_version: 0,
        region: "eu-central-1".to_string(),
        bucket: "gozlem-test".to_string(),
        author_id: Uuid::new_v4(),
        queue_path: dir.join("queue.json"),
        service: ServiceConfig {
            locale: Locale::En,
            ..Default::default()
        },
        created_at: "2025-03-14T09:00:00Z".parse().unwrap(),
        credentials: CredentialSource::Inline {
            access_key_id: "AKIAEXAMPLEKEY1234".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
        },
    }
}

#[test]
fn save_then_load_stamps_current_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");
    let config = sample(dir.path());

    save_config(&path, &config).unwrap();
    let loaded = load_config(&path).unwrap();

    assert_eq!(loaded.config_version, CURRENT_VERSION);
    assert_eq!(loaded.service.locale, Locale::En);
    assert_eq!(loaded.author_id, config.author_id);
    assert!(!path.with_extension("json.tmp").exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn v0_config_gains_service_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let v0 = serde_json::json!({
        "region": "eu-central-1",
        "bucket": "gozlem-test",
        "author_id": Uuid::new_v4(),
        "queue_path": dir.path().join("queue.json"),
        "created_at": "2025-03-14T09:00:00Z",
        "credentials": { "type": "profile", "profile_name": "school" }
    });
    std::fs::write(&path, v0.to_string()).unwrap();

    let loaded = load_config(&path).unwrap();
    assert_eq!(loaded.config_version, 1);
    assert_eq!(loaded.service, ServiceConfig::default());
    assert_eq!(
        loaded.credentials,
        CredentialSource::Profile {
            profile_name: "school".to_string()
        }
    );
}

#[test]
fn newer_config_is_rejected() {
    let err = migrate(serde_json::json!({ "config_version": 99 }), 99).unwrap_err();
    assert!(err.to_string().contains("newer than this build"));
}

#[test]
fn migrate_requires_an_object() {
    assert!(migrate(serde_json::json!([1, 2]), 0).is_err());
}

#[test]
fn missing_config_points_at_init() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(&dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("gozlem init"));
}

#[test]
fn info_redacts_inline_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let info = config_info(&path, &sample(dir.path()));
    assert_eq!(info.credential_type, "inline");
    assert_eq!(info.access_key_hint.as_deref(), Some("AKIA...1234"));

    let rendered = serde_json::to_string(&info).unwrap();
    assert!(!rendered.contains("secret"));
}

#[test]
fn cli_parses_repeated_domains_and_legacy_tags() {
    let child = Uuid::new_v4();
    let cli = Cli::try_parse_from([
        "gozlem",
        "--offline",
        "submit",
        "--child",
        &child.to_string(),
        "--note",
        "Kule yaptı",
        "--domain",
        "math",
        "--domain",
        "fine_motor",
    ])
    .unwrap();

    assert!(cli.offline);
    match cli.command {
        Command::Submit { domains, .. } => {
            assert_eq!(domains, vec![Domain::Math, Domain::MotorHealth]);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn submit_requires_a_domain() {
    let child = Uuid::new_v4().to_string();
    let parsed = Cli::try_parse_from(["gozlem", "submit", "--child", &child, "--note", "x"]);
    assert!(parsed.is_err());
}
