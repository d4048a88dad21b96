//! Command library persistence against real temp files

use ir_core::{CommandLibrary, NameValue};
use serde_json::json;
use std::time::Duration;
use tempfile::tempdir;

#[tokio::test]
async fn missing_file_is_written_immediately() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("library.json");
    assert!(!path.exists());

    let library = CommandLibrary::load(&path).await;
    assert!(path.exists());
    assert_eq!(library.device_count(), 0);

    let contents = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(parsed["version"], 1);
    assert_eq!(parsed["devices"], json!({}));
}

#[tokio::test]
async fn store_round_trips_through_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("library.json");

    {
        let library = CommandLibrary::load(&path).await;
        library
            .add_command("Living Room TV", "power", 38, 33, 1, vec![9000, 4500, 560])
            .await
            .unwrap();
        library
            .add_command("Living Room TV", "volume up", 40, 50, 2, vec![600, 300])
            .await
            .unwrap();
    }

    let reloaded = CommandLibrary::load(&path).await;
    assert_eq!(reloaded.device_count(), 1);
    assert_eq!(reloaded.command_count(), 2);

    let power = reloaded.get_command("Living Room TV", "power").unwrap();
    assert_eq!(power.freq_khz, 38);
    assert_eq!(power.duty, 33);
    assert_eq!(power.repeat, 1);
    assert_eq!(power.raw, vec![9000, 4500, 560]);
    assert!(!power.learned_at.is_empty());

    let volume = reloaded.get_command("Living Room TV", "volume up").unwrap();
    assert_eq!(volume.freq_khz, 40);
    assert_eq!(volume.raw, vec![600, 300]);
}

#[tokio::test]
async fn corrupt_file_starts_empty_without_a_rewrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("library.json");
    std::fs::write(&path, "{ not json at all").unwrap();

    let library = CommandLibrary::load(&path).await;
    assert_eq!(library.device_count(), 0);

    // The broken file is left for inspection until something changes.
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "{ not json at all");

    library.add_device("tv").await.unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert!(parsed["devices"]["tv"].is_object());
}

#[tokio::test]
async fn add_device_is_idempotent_and_keeps_created_at() {
    let dir = tempdir().unwrap();
    let library = CommandLibrary::load(dir.path().join("library.json")).await;

    library.add_device("tv").await.unwrap();
    let first = library.list_devices();
    assert_eq!(first.len(), 1);
    let original_created_at = first[0].created_at.clone();

    tokio::time::sleep(Duration::from_millis(10)).await;
    library.add_device("tv").await.unwrap();

    let second = library.list_devices();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].created_at, original_created_at);
}

#[tokio::test]
async fn deleting_a_device_cascades_to_its_commands() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("library.json");
    let library = CommandLibrary::load(&path).await;

    library
        .add_command("tv", "power", 38, 33, 1, vec![100, 200])
        .await
        .unwrap();
    library
        .add_command("tv", "mute", 38, 33, 1, vec![300, 400])
        .await
        .unwrap();

    assert!(library.delete_device("tv").await.unwrap());
    assert_eq!(library.device_count(), 0);
    assert!(library.get_command("tv", "power").is_none());

    let reloaded = CommandLibrary::load(&path).await;
    assert_eq!(reloaded.device_count(), 0);
}

#[tokio::test]
async fn delete_reports_absent_entries() {
    let dir = tempdir().unwrap();
    let library = CommandLibrary::load(dir.path().join("library.json")).await;

    assert!(!library.delete_device("ghost").await.unwrap());
    assert!(!library.delete_command("ghost", "power").await.unwrap());

    library
        .add_command("tv", "power", 38, 33, 1, vec![100])
        .await
        .unwrap();
    assert!(!library.delete_command("tv", "mute").await.unwrap());
    assert!(library.delete_command("tv", "power").await.unwrap());

    // The emptied device record stays behind.
    assert_eq!(library.device_count(), 1);
    assert!(library.list_commands("tv").is_empty());
}

#[tokio::test]
async fn names_normalize_at_every_entry_point() {
    let dir = tempdir().unwrap();
    let library = CommandLibrary::load(dir.path().join("library.json")).await;

    library
        .add_command("  Living\t Room  TV ", " power   on ", 38, 33, 1, vec![100])
        .await
        .unwrap();

    let devices = library.list_devices();
    assert_eq!(devices[0].name, "Living Room TV");

    assert!(library.get_command("Living Room TV", "power on").is_some());
    assert!(library.get_command("Living  Room   TV", "power on").is_some());
    assert!(library
        .delete_command("Living Room TV", "  power on  ")
        .await
        .unwrap());
}

#[tokio::test]
async fn invalid_names_are_rejected() {
    let dir = tempdir().unwrap();
    let library = CommandLibrary::load(dir.path().join("library.json")).await;

    let err = library.add_device("   ").await.unwrap_err();
    assert!(err.is_invalid_name());

    let err = library
        .add_command("tv", "power!", 38, 33, 1, vec![100])
        .await
        .unwrap_err();
    assert!(err.is_invalid_name());

    assert!(library.get_command("tv", "power!").is_none());
    assert_eq!(library.device_count(), 0);
}

#[tokio::test]
async fn numeric_names_coerce_to_strings() {
    let dir = tempdir().unwrap();
    let library = CommandLibrary::load(dir.path().join("library.json")).await;

    let channel: NameValue = serde_json::from_value(json!(123)).unwrap();
    library
        .add_command("tv", &channel.into_string(), 38, 33, 1, vec![100])
        .await
        .unwrap();

    assert!(library.get_command("tv", "123").is_some());

    let same: NameValue = serde_json::from_value(json!("123")).unwrap();
    assert!(library.get_command("tv", &same.into_string()).is_some());
}
