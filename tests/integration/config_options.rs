//! Integration tests for config and options mediation

use edgesync::controller::MemoryGateway;
use edgesync::error::{GatewayError, SyncError};
use edgesync::options::schema::EdgeDevConfig;
use edgesync::options::{render_document, ConfigOptionsMediator};
use serde_json::json;

use crate::integration::test_utils::{device_with, image};

const DEVICE_CONFIG: &str = r#"{
    "id": {"uuid": "dev-1", "version": "4"},
    "configItems": [{"key": "timer.reboot.no.network", "value": "600"}],
    "base": [{
        "uuidandversion": {"uuid": "a", "version": "1"},
        "baseOsVersion": "6.1.0",
        "contentTreeUuid": "tree-a",
        "activate": true
    }],
    "productName": "edge"
}"#;

#[test]
fn test_set_config_pushes_canonical_form() {
    let gateway = MemoryGateway::new(device_with(vec![]), vec![]);
    let mediator = ConfigOptionsMediator::new(&gateway);

    mediator.set_config(DEVICE_CONFIG.as_bytes()).unwrap();

    let pushed = gateway.pushed_config("dev-1").unwrap();
    let expected = EdgeDevConfig::from_json(DEVICE_CONFIG.as_bytes())
        .unwrap()
        .to_canonical()
        .unwrap();
    assert_eq!(pushed, expected);

    let decoded = EdgeDevConfig::from_canonical(&pushed).unwrap();
    assert_eq!(decoded.base[0].base_os_version, "6.1.0");
    assert_eq!(decoded.product_name, "edge");
}

#[test]
fn test_set_config_rejects_unknown_fields() {
    let gateway = MemoryGateway::new(device_with(vec![]), vec![]);
    let mediator = ConfigOptionsMediator::new(&gateway);

    let payload = br#"{"id": {"uuid": "dev-1", "version": "1"}, "bogus": 1}"#;
    let result = mediator.set_config(payload);

    assert!(matches!(result, Err(SyncError::Validation(_))));
    assert!(gateway.pushed_config("dev-1").is_none());
    assert_eq!(gateway.fetch_count(), 0);
}

#[test]
fn test_set_config_rejects_malformed_json() {
    let gateway = MemoryGateway::new(device_with(vec![]), vec![]);
    let mediator = ConfigOptionsMediator::new(&gateway);

    assert!(matches!(
        mediator.set_config(b"{\"id\": "),
        Err(SyncError::Validation(_))
    ));
    assert!(gateway.pushed_config("dev-1").is_none());
}

#[test]
fn test_get_config_reflects_device_state() {
    let mut device = device_with(vec![image("a", "6.1.0", true)]);
    device.reboot();
    device.set_config_item("debug.enable.ssh", "true");
    let gateway = MemoryGateway::new(device, vec![]);
    let mediator = ConfigOptionsMediator::new(&gateway);

    let bytes = mediator.get_config(false).unwrap();
    let config = EdgeDevConfig::from_json(&bytes).unwrap();

    assert_eq!(config.id.uuid, "dev-1");
    assert_eq!(config.base.len(), 1);
    assert_eq!(config.reboot.unwrap().counter, 1);
    assert_eq!(config.config_items[0].key, "debug.enable.ssh");

    let pretty = mediator.get_config(true).unwrap();
    assert!(String::from_utf8(pretty).unwrap().contains('\n'));
    // Reading never commits
    assert_eq!(gateway.commit_count(), 0);
}

#[test]
fn test_device_and_global_options_are_independent() {
    let gateway = MemoryGateway::new(device_with(vec![]), vec![]);
    let mediator = ConfigOptionsMediator::new(&gateway);

    mediator
        .set_options(br#"{"EveOptions": {"timeout": 30}}"#)
        .unwrap();
    mediator
        .set_global_options(br#"{"ControllerOptions": ["a", "b"]}"#)
        .unwrap();

    assert_eq!(
        mediator.get_options().unwrap(),
        json!({"EveOptions": {"timeout": 30}})
    );
    assert_eq!(
        mediator.get_global_options().unwrap(),
        json!({"ControllerOptions": ["a", "b"]})
    );
    assert_eq!(gateway.commit_count(), 0);
}

#[test]
fn test_set_options_rejects_malformed_json() {
    let gateway = MemoryGateway::new(device_with(vec![]), vec![]);
    let mediator = ConfigOptionsMediator::new(&gateway);

    assert!(matches!(
        mediator.set_options(b"{"),
        Err(SyncError::Validation(_))
    ));
    assert!(matches!(
        mediator.set_global_options(b"[1,"),
        Err(SyncError::Validation(_))
    ));
    assert!(gateway.device().unwrap().options().is_null());
}

#[test]
fn test_options_need_reachable_controller() {
    let gateway = MemoryGateway::new(device_with(vec![]), vec![]);
    gateway.set_offline(true);
    let mediator = ConfigOptionsMediator::new(&gateway);

    assert!(matches!(
        mediator.get_options(),
        Err(SyncError::Gateway(GatewayError::Connection(_)))
    ));
}

#[test]
fn test_render_document_uses_four_spaces() {
    let rendered = render_document(&json!({"a": {"b": 1}})).unwrap();
    assert_eq!(rendered, "{\n    \"a\": {\n        \"b\": 1\n    }\n}");
}
