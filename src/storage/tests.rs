use super::store::{ConfigStore, keys};

fn open_temp_store() -> (ConfigStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::open(dir.path().to_str().unwrap()).unwrap();
    (store, dir)
}

#[test]
fn get_returns_none_for_absent_key() {
    let (store, _dir) = open_temp_store();
    assert!(store.get("nothing_here").unwrap().is_none());
    assert!(!store.exists("nothing_here").unwrap());
}

#[test]
fn set_then_get_round_trips() {
    let (store, _dir) = open_temp_store();
    store.set(keys::MQTT_BROKER, "broker.local").unwrap();
    assert!(store.exists(keys::MQTT_BROKER).unwrap());
    assert_eq!(
        store.get(keys::MQTT_BROKER).unwrap().as_deref(),
        Some("broker.local")
    );
}

#[test]
fn u16_values_round_trip() {
    let (store, _dir) = open_temp_store();
    store.set_u16(keys::MQTT_PORT, 1883).unwrap();
    assert_eq!(store.get_u16(keys::MQTT_PORT).unwrap(), Some(1883));
}

#[test]
fn invalid_u16_value_is_reported() {
    let (store, _dir) = open_temp_store();
    store.set(keys::MQTT_PORT, "not-a-port").unwrap();
    assert!(store.get_u16(keys::MQTT_PORT).is_err());
}

#[test]
fn remove_is_idempotent() {
    let (store, _dir) = open_temp_store();
    store.set("k", "v").unwrap();
    store.remove("k").unwrap();
    store.remove("k").unwrap();
    assert!(!store.exists("k").unwrap());
}

#[test]
fn wifi_credentials_lifecycle() {
    let (store, _dir) = open_temp_store();
    assert!(!store.wifi_credentials_preserved().unwrap());
    assert!(store.wifi_credentials().is_err());

    store.save_wifi_credentials("home-net", "hunter2").unwrap();
    assert!(store.wifi_credentials_preserved().unwrap());
    let (ssid, passphrase) = store.wifi_credentials().unwrap();
    assert_eq!(ssid, "home-net");
    assert_eq!(passphrase, "hunter2");

    store.erase_wifi_credentials().unwrap();
    assert!(!store.wifi_credentials_preserved().unwrap());
    assert!(store.wifi_credentials().is_err());
}

#[test]
fn values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_str().unwrap().to_string();
    {
        let store = ConfigStore::open(&path).unwrap();
        store.set(keys::MQTT_USERNAME, "homepost").unwrap();
    }
    let store = ConfigStore::open(&path).unwrap();
    assert_eq!(
        store.get(keys::MQTT_USERNAME).unwrap().as_deref(),
        Some("homepost")
    );
}
