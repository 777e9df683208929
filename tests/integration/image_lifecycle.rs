//! Integration tests for base-OS image update, retry and removal

use edgesync::controller::MemoryGateway;
use edgesync::error::{GatewayError, SyncError};
use edgesync::image::{
    ImageLifecycleManager, ImageSettings, RemoveRequest, UpdateRequest, VersionPattern,
};
use std::fs;
use tempfile::TempDir;

use crate::integration::test_utils::{
    device_with, files_under, image, FailingResolver, RecordingFetcher, StaticResolver,
};

fn settings_with_pattern(pattern: &str) -> ImageSettings {
    ImageSettings {
        version_pattern: VersionPattern::new(pattern).unwrap(),
        ..Default::default()
    }
}

#[test]
fn test_remove_activates_remaining_image() {
    let a = image("a", "v1", false);
    let b = image("b", "v2", true);
    let gateway = MemoryGateway::new(
        device_with(vec![a.clone(), b.clone()]),
        vec![a.clone(), b.clone()],
    );
    let resolver = StaticResolver::new(a.clone());
    let fetcher = RecordingFetcher::default();
    let manager = ImageLifecycleManager::new(&gateway, &resolver, &fetcher, ImageSettings::default());

    let outcome = manager
        .remove(&RemoveRequest {
            image: "oci://lfedge/eve:anything".to_string(),
            version: "v2".to_string(),
            scratch_dir: TempDir::new().unwrap().path().to_path_buf(),
        })
        .unwrap();

    assert_eq!(outcome.removed, vec!["b".to_string()]);
    assert_eq!(gateway.commit_count(), 1);
    let attached = gateway.device().unwrap().attached_base_os_configs().to_vec();
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].id(), "a");
    assert!(attached[0].activate);
}

#[test]
fn test_remove_rejects_unknown_scheme_without_io() {
    let scratch = TempDir::new().unwrap();
    let gateway = MemoryGateway::new(device_with(vec![]), vec![]);
    let resolver = StaticResolver::new(image("a", "v1", false));
    let fetcher = RecordingFetcher::default();
    let manager = ImageLifecycleManager::new(&gateway, &resolver, &fetcher, ImageSettings::default());

    for reference in [
        "ftp://mirror.example.com/rootfs-6.1.0.img",
        "ftp:mirror/rootfs-6.1.0.img",
        "FTP:mirror/rootfs-6.1.0.img",
    ] {
        let result = manager.remove(&RemoveRequest {
            image: reference.to_string(),
            version: String::new(),
            scratch_dir: scratch.path().to_path_buf(),
        });
        assert!(
            matches!(result, Err(SyncError::UnsupportedScheme(ref s)) if s == "ftp"),
            "{reference}"
        );
    }

    assert_eq!(fetcher.call_count(), 0);
    assert_eq!(gateway.fetch_count(), 0);
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn test_failed_download_leaves_no_files() {
    let scratch = TempDir::new().unwrap();
    let gateway = MemoryGateway::new(device_with(vec![]), vec![]);
    let resolver = StaticResolver::new(image("a", "v1", false));
    let fetcher = RecordingFetcher::failing();
    let manager = ImageLifecycleManager::new(&gateway, &resolver, &fetcher, ImageSettings::default());

    let result = manager.remove(&RemoveRequest {
        image: "https://images.example.com/eve/rootfs-6.1.0.img".to_string(),
        version: String::new(),
        scratch_dir: scratch.path().to_path_buf(),
    });

    assert!(matches!(result, Err(SyncError::Download(_))));
    assert_eq!(fetcher.call_count(), 1);
    assert!(files_under(scratch.path()).is_empty());
    assert_eq!(gateway.commit_count(), 0);
}

#[test]
fn test_downloaded_artifact_removed_after_success() {
    let scratch = TempDir::new().unwrap();
    let a = image("a", "6.1.0", true);
    let b = image("b", "6.0.0", false);
    let gateway = MemoryGateway::new(
        device_with(vec![a.clone(), b.clone()]),
        vec![a.clone(), b.clone()],
    );
    let resolver = StaticResolver::new(a.clone());
    let fetcher = RecordingFetcher::default();
    let manager = ImageLifecycleManager::new(&gateway, &resolver, &fetcher, ImageSettings::default());

    let outcome = manager
        .remove(&RemoveRequest {
            image: "https://images.example.com/eve/rootfs-6.1.0.img".to_string(),
            version: String::new(),
            scratch_dir: scratch.path().to_path_buf(),
        })
        .unwrap();

    assert_eq!(outcome.version, "6.1.0");
    assert_eq!(outcome.activated.as_deref(), Some("b"));
    let (_, dest) = fetcher.calls.lock()[0].clone();
    assert!(dest.starts_with(scratch.path().join("tmp")));
    assert!(dest.ends_with("rootfs-6.1.0.img"));
    assert!(files_under(scratch.path()).is_empty());
}

#[test]
fn test_correction_file_from_download_wins() {
    let scratch = TempDir::new().unwrap();
    let a = image("a", "7.2.1", true);
    let gateway = MemoryGateway::new(device_with(vec![a.clone()]), vec![a.clone()]);
    let resolver = StaticResolver::new(a.clone());
    let fetcher = RecordingFetcher {
        correction: Some("7.2.1".to_string()),
        ..Default::default()
    };
    let manager = ImageLifecycleManager::new(&gateway, &resolver, &fetcher, ImageSettings::default());

    // The file name alone would fail the version pattern
    let outcome = manager
        .remove(&RemoveRequest {
            image: "http://ci.example.com/artifacts/eve-image.qcow2".to_string(),
            version: String::new(),
            scratch_dir: scratch.path().to_path_buf(),
        })
        .unwrap();

    assert_eq!(outcome.version, "7.2.1");
    assert!(gateway.device().unwrap().attached_base_os_configs().is_empty());
}

#[test]
fn test_local_file_version_from_name() {
    let dir = TempDir::new().unwrap();
    let rootfs = dir.path().join("rootfs-6.1.0-amd64.qcow2");
    fs::write(&rootfs, b"rootfs").unwrap();

    let a = image("a", "6.1.0-amd64", true);
    let b = image("b", "6.0.0-amd64", false);
    let gateway = MemoryGateway::new(
        device_with(vec![a.clone(), b.clone()]),
        vec![a.clone(), b.clone()],
    );
    let resolver = StaticResolver::new(a.clone());
    let fetcher = RecordingFetcher::default();
    let manager = ImageLifecycleManager::new(
        &gateway,
        &resolver,
        &fetcher,
        settings_with_pattern(r"\d+\.\d+\.\d+-\w+"),
    );

    let outcome = manager
        .remove(&RemoveRequest {
            image: format!("file://{}", rootfs.display()),
            version: String::new(),
            scratch_dir: dir.path().to_path_buf(),
        })
        .unwrap();

    assert_eq!(outcome.version, "6.1.0-amd64");
    assert_eq!(outcome.removed, vec!["a".to_string()]);
    assert_eq!(fetcher.call_count(), 0);
}

#[test]
fn test_pattern_mismatch_aborts_before_controller() {
    let dir = TempDir::new().unwrap();
    let rootfs = dir.path().join("image.qcow2");
    fs::write(&rootfs, b"rootfs").unwrap();

    let a = image("a", "6.1.0", true);
    let gateway = MemoryGateway::new(device_with(vec![a.clone()]), vec![a.clone()]);
    let resolver = StaticResolver::new(a.clone());
    let fetcher = RecordingFetcher::default();
    let manager = ImageLifecycleManager::new(
        &gateway,
        &resolver,
        &fetcher,
        settings_with_pattern(r"\d+\.\d+\.\d+-\w+"),
    );

    let result = manager.remove(&RemoveRequest {
        image: rootfs.display().to_string(),
        version: String::new(),
        scratch_dir: dir.path().to_path_buf(),
    });

    assert!(matches!(result, Err(SyncError::PatternMismatch { ref name, .. }) if name == "image"));
    assert_eq!(gateway.fetch_count(), 0);
    assert_eq!(gateway.device().unwrap().attached_base_os_configs().len(), 1);
}

#[test]
fn test_remove_commit_failure_keeps_state() {
    let a = image("a", "v1", false);
    let b = image("b", "v2", true);
    let gateway = MemoryGateway::new(
        device_with(vec![a.clone(), b.clone()]),
        vec![a.clone(), b.clone()],
    );
    gateway.fail_next_commit();
    let resolver = StaticResolver::new(a.clone());
    let fetcher = RecordingFetcher::default();
    let manager = ImageLifecycleManager::new(&gateway, &resolver, &fetcher, ImageSettings::default());

    let result = manager.remove(&RemoveRequest {
        image: "docker://lfedge/eve".to_string(),
        version: "v2".to_string(),
        scratch_dir: TempDir::new().unwrap().path().to_path_buf(),
    });

    assert!(matches!(
        result,
        Err(SyncError::Gateway(GatewayError::Transport(_)))
    ));
    assert_eq!(gateway.device().unwrap().attached_base_os_configs().len(), 2);
}

#[test]
fn test_update_sets_active_image() {
    let candidate = image("n", "6.2.0", false);
    let mut device = device_with(vec![]);
    device.set_base_os_retry_counter(5);
    let gateway = MemoryGateway::new(device, vec![candidate.clone()]);
    let resolver = StaticResolver::new(candidate.clone());
    let fetcher = RecordingFetcher::default();
    let manager = ImageLifecycleManager::new(&gateway, &resolver, &fetcher, ImageSettings::default());

    manager
        .update(&UpdateRequest {
            image: "docker://lfedge/eve:6.2.0".to_string(),
            version: String::new(),
            registry: "remote".to_string(),
            activate: true,
            use_extra_drive: false,
        })
        .unwrap();

    let device = gateway.device().unwrap();
    assert_eq!(device.base_os_content_tree(), "tree-n");
    assert_eq!(device.base_os_version(), "6.2.0");
    assert_eq!(device.base_os_retry_counter(), 0);
    assert!(device.base_os_activate());
    assert!(device.attached_base_os_configs().is_empty());
    assert_eq!(resolver.seen_registry.lock().as_deref(), Some(""));
    assert_eq!(gateway.commit_count(), 1);
}

#[test]
fn test_update_extra_drive_appends_inactive() {
    let current = image("a", "6.1.0", true);
    let candidate = image("n", "6.2.0", true);
    let gateway = MemoryGateway::new(device_with(vec![current.clone()]), vec![current.clone()]);
    let resolver = StaticResolver::new(candidate.clone());
    let fetcher = RecordingFetcher::default();
    let settings = ImageSettings {
        registry_ip: "192.168.0.5".to_string(),
        registry_port: 5050,
        ..Default::default()
    };
    let manager = ImageLifecycleManager::new(&gateway, &resolver, &fetcher, settings);
    let request = UpdateRequest {
        image: "docker://lfedge/eve:6.2.0".to_string(),
        registry: "local".to_string(),
        use_extra_drive: true,
        ..Default::default()
    };

    manager.update(&request).unwrap();
    manager.update(&request).unwrap();

    let device = gateway.device().unwrap();
    let attached = device.attached_base_os_configs();
    assert_eq!(attached.len(), 2);
    assert_eq!(attached[1].id(), "n");
    assert!(!attached[1].activate);
    assert_eq!(attached.iter().filter(|c| c.activate).count(), 1);
    assert_eq!(device.base_os_content_tree(), "");
    assert_eq!(
        resolver.seen_registry.lock().as_deref(),
        Some("192.168.0.5:5050")
    );
}

#[test]
fn test_update_resolver_failure_commits_nothing() {
    let gateway = MemoryGateway::new(device_with(vec![]), vec![]);
    let fetcher = RecordingFetcher::default();
    let manager =
        ImageLifecycleManager::new(&gateway, &FailingResolver, &fetcher, ImageSettings::default());

    let result = manager.update(&UpdateRequest {
        image: "docker://lfedge/eve:missing".to_string(),
        ..Default::default()
    });

    assert!(matches!(result, Err(SyncError::Resolve { .. })));
    assert_eq!(gateway.fetch_count(), 1);
    assert_eq!(gateway.commit_count(), 0);
}

#[test]
fn test_retry_increments_by_one() {
    let mut device = device_with(vec![]);
    device.set_base_os_retry_counter(2);
    let gateway = MemoryGateway::new(device, vec![]);
    let resolver = FailingResolver;
    let fetcher = RecordingFetcher::default();
    let manager = ImageLifecycleManager::new(&gateway, &resolver, &fetcher, ImageSettings::default());

    assert_eq!(manager.retry().unwrap(), 3);
    assert_eq!(manager.retry().unwrap(), 4);
    assert_eq!(gateway.device().unwrap().base_os_retry_counter(), 4);
    assert_eq!(gateway.commit_count(), 2);
}

#[test]
fn test_update_leaves_at_most_one_active() {
    for use_extra_drive in [true, false] {
        let a = image("a", "6.0.0", true);
        let b = image("b", "6.1.0", true);
        let candidate = image("n", "6.2.0", true);
        let gateway = MemoryGateway::new(device_with(vec![a.clone(), b.clone()]), vec![a, b]);
        let resolver = StaticResolver::new(candidate);
        let fetcher = RecordingFetcher::default();
        let manager =
            ImageLifecycleManager::new(&gateway, &resolver, &fetcher, ImageSettings::default());

        manager
            .update(&UpdateRequest {
                image: "docker://lfedge/eve:6.2.0".to_string(),
                activate: true,
                use_extra_drive,
                ..Default::default()
            })
            .unwrap();

        let device = gateway.device().unwrap();
        let active: Vec<_> = device
            .attached_base_os_configs()
            .iter()
            .filter(|c| c.activate)
            .map(|c| c.id().to_string())
            .collect();
        assert_eq!(active, vec!["a".to_string()], "use_extra_drive={use_extra_drive}");
    }
}
