//! Integration tests for on-disk cart snapshots.
//!
//! Each test uses a fresh temporary directory and builds separate
//! controllers over it, the way separate runs of the storefront would.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use shahi_core::cart::snapshot;
use shahi_core::{CartLine, Identity, ProductId, UserId};
use shahi_integration_tests::{RecordingMirror, product};
use shahi_storefront::cart::{CartController, FileSnapshotStore, SnapshotStore};

fn user(id: &str) -> Identity {
    Identity::User(UserId::new(id))
}

#[tokio::test]
async fn test_cart_restored_by_a_new_controller() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut cart =
            CartController::new(FileSnapshotStore::new(dir.path()), RecordingMirror::new());
        cart.set_identity(user("a"));
        cart.add_item(product("p1", "Paracetamol 500mg", 1000)).unwrap();
        cart.add_item(product("p2", "Cough Syrup", 1550)).unwrap();
        cart.update_quantity(&ProductId::new("p2"), 3).unwrap();
        cart.flush().await;
    }

    let mut cart = CartController::new(FileSnapshotStore::new(dir.path()), RecordingMirror::new());
    cart.set_identity(user("a"));

    assert_eq!(cart.state().count(), 4);
    assert_eq!(cart.state().total(), Decimal::new(5650, 2));
    let names: Vec<_> = cart
        .state()
        .lines()
        .iter()
        .map(|line| line.product.name.as_str())
        .collect();
    assert_eq!(names, ["Paracetamol 500mg", "Cough Syrup"]);
}

#[tokio::test]
async fn test_snapshot_file_is_versioned_json() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());
    let mut cart = CartController::new(store.clone(), RecordingMirror::new());

    cart.set_identity(user("a"));
    cart.add_item(product("p1", "Cetirizine", 450)).unwrap();
    cart.flush().await;

    let raw = store.load("cart_a").unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["version"], 1);
    assert_eq!(value["lines"][0]["product"]["id"], "p1");
    assert_eq!(value["lines"][0]["quantity"], 1);
}

#[tokio::test]
async fn test_legacy_array_snapshot_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());

    let legacy = serde_json::to_string(&vec![CartLine::new(
        product("p1", "Vitamin C", 700),
        2,
    )])
    .unwrap();
    store.save("cart_a", &legacy).unwrap();

    let mut cart = CartController::new(store.clone(), RecordingMirror::new());
    cart.set_identity(user("a"));
    assert_eq!(cart.state().count(), 2);
    assert_eq!(cart.state().total(), Decimal::new(1400, 2));

    // Loading rewrites it in the current format
    let raw = store.load("cart_a").unwrap().unwrap();
    assert_eq!(snapshot::decode(&raw).unwrap().len(), 1);
    assert!(raw.contains("\"version\""));
}

#[tokio::test]
async fn test_web_storefront_cart_moves_to_current_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());

    let web_cart = serde_json::to_string(&vec![
        CartLine::new(product("p1", "Vitamin C", 700), 2),
        CartLine::new(product("p2", "Zinc", 350), 1),
    ])
    .unwrap();
    store.save("shahiMedicalsCart_a", &web_cart).unwrap();

    {
        let mut cart = CartController::new(store.clone(), RecordingMirror::new());
        cart.set_identity(user("a"));
        assert_eq!(cart.state().count(), 3);
    }

    assert_eq!(store.load("shahiMedicalsCart_a").unwrap(), None);
    assert!(!dir.path().join("shahiMedicalsCart_a.json").exists());

    // A later run reads the migrated snapshot
    let mut cart = CartController::new(store, RecordingMirror::new());
    cart.set_identity(user("a"));
    assert_eq!(cart.state().total(), Decimal::new(1750, 2));
}

#[tokio::test]
async fn test_corrupt_snapshot_becomes_empty_cart() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());
    store.save("cart_a", "{not json").unwrap();

    let mut cart = CartController::new(store, RecordingMirror::new());
    cart.set_identity(user("a"));
    assert!(cart.state().is_empty());

    cart.add_item(product("p1", "ORS Sachet", 200)).unwrap();
    assert_eq!(cart.state().count(), 1);
    cart.flush().await;
}

#[tokio::test]
async fn test_signing_out_keeps_snapshot_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());
    let mut cart = CartController::new(store.clone(), RecordingMirror::new());

    cart.set_identity(user("a"));
    cart.add_item(product("p1", "ORS Sachet", 200)).unwrap();
    cart.set_identity(Identity::Anonymous);
    cart.clear_cart();
    cart.flush().await;

    assert!(cart.state().is_empty());
    let lines = snapshot::decode(&store.load("cart_a").unwrap().unwrap()).unwrap();
    assert_eq!(lines.len(), 1);
}
