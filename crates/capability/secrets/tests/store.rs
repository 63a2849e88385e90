use sites_secrets::{SecretRefs, Secrets, SecretsError, SecretsStore, names};
use std::path::PathBuf;

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sites-secrets-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("mkdir");
    dir
}

#[test]
fn ensure_generates_once_and_never_rewrites() {
    let dir = temp_dir();
    let store = SecretsStore::new(dir.join("config").join("secrets.yaml"));

    let first = store.ensure().expect("ensure");
    assert!(first.created);
    let before = std::fs::read_to_string(store.path()).expect("read");

    let second = store.ensure().expect("ensure");
    assert!(!second.created);
    let after = std::fs::read_to_string(store.path()).expect("read");
    assert_eq!(before, after);
    assert_eq!(second.refs, SecretRefs::default());

    let secrets = store.load().expect("load");
    assert_eq!(secrets.api_encryption_key.len(), 64);
    assert!(secrets.api_encryption_key.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(secrets.ota_password.len(), 12);
    assert!(secrets.ota_password.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(secrets.wifi_ssid, "YourWiFiNetwork");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn existing_file_is_left_untouched() {
    let dir = temp_dir();
    let path = dir.join("secrets.yaml");
    let mut secrets = Secrets::generate();
    secrets.wifi_ssid = "site-net".to_string();
    let text = serde_yaml::to_string(&secrets).expect("yaml");
    std::fs::write(&path, &text).expect("write");

    let store = SecretsStore::new(&path);
    let handle = store.ensure().expect("ensure");
    assert!(!handle.created);
    assert_eq!(std::fs::read_to_string(&path).expect("read"), text);
    assert_eq!(store.load().expect("load").wifi_ssid, "site-net");
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn truncated_file_is_reported_not_accepted() {
    let dir = temp_dir();
    let path = dir.join("secrets.yaml");
    std::fs::write(&path, "").expect("write");
    let store = SecretsStore::new(&path);
    let err = store.ensure().expect_err("empty file");
    assert!(matches!(err, SecretsError::Malformed { .. }));

    std::fs::write(&path, "wifi_ssid: site-net\n").expect("write");
    let err = store.ensure().expect_err("partial file");
    assert!(matches!(err, SecretsError::Malformed { .. }));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn creation_leaves_no_temp_files_behind() {
    let dir = temp_dir();
    let store = SecretsStore::new(dir.join("secrets.yaml"));
    store.ensure().expect("ensure");
    let names: Vec<String> = std::fs::read_dir(&dir)
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["secrets.yaml".to_string()]);
    let _ = std::fs::remove_dir_all(dir);
}

#[cfg(unix)]
#[test]
fn secrets_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;
    let dir = temp_dir();
    let store = SecretsStore::new(dir.join("secrets.yaml"));
    store.ensure().expect("ensure");
    let mode = std::fs::metadata(store.path()).expect("meta").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn debug_output_is_redacted() {
    let secrets = Secrets::generate();
    let printed = format!("{secrets:?}");
    assert!(!printed.contains(&secrets.api_encryption_key));
    assert!(!printed.contains(&secrets.ota_password));
    assert!(printed.contains("***"));
}

#[test]
fn reference_names_match_file_keys() {
    let refs = SecretRefs::default();
    assert_eq!(refs.api_encryption_key, names::API_ENCRYPTION_KEY);
    assert_eq!(refs.mqtt_broker, "mqtt_broker");
}
