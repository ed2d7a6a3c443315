use std::time::Duration;

use recordkeeper::persist::Persistor;
use recordkeeper::settings::Settings;

#[test]
fn missing_file_gives_defaults() {
    let settings = Settings::load("no_such_recordkeeper_config").expect("defaults");
    assert_eq!(settings.database, None);
    assert!(settings.auto_commit);
    assert_eq!(settings.query_timeout(), Duration::from_secs(30));
}

#[test]
fn file_overrides_defaults_and_opens_database() {
    let dir = std::env::temp_dir();
    let base = dir.join("recordkeeper_settings_test");
    let database = dir.join("recordkeeper_settings_test.db");
    let _ = std::fs::remove_file(&database);
    std::fs::write(
        base.with_extension("toml"),
        format!(
            "database = \"{}\"\nquery_timeout_ms = 500\nauto_commit = false\nlog = \"debug\"\n",
            database.display().to_string().replace('\\', "/")
        ),
    )
    .expect("write config");

    let settings = Settings::load(base.to_str().unwrap()).expect("settings");
    assert_eq!(settings.query_timeout_ms, 500);
    assert!(!settings.auto_commit);
    assert_eq!(settings.log, "debug");

    let persistor = Persistor::from_settings(&settings).expect("persistor");
    assert!(!persistor.is_auto_commit());
    persistor.execute_batch("create table t (id integer);").expect("schema");
    persistor.commit().expect("commit");
    drop(persistor);
    assert!(database.exists());

    let _ = std::fs::remove_file(base.with_extension("toml"));
    let _ = std::fs::remove_file(&database);
}
