//! Integration tests for mount management and request routing.
//!
//! Policy checks are verified with a spy transport that records every call
//! it receives; a rejected request must leave the spy untouched.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use osjs_vfs::vfs::backends::local_storage;
use osjs_vfs::vfs::{DEFAULT_MODULE, LocalTransport, MountHooks, StaticHooks, WebTransport};
use osjs_vfs::{
    FileMetadata, FreeSpace, ModuleFilter, MountFlow, MountManager, MountpointParams,
    MountpointSnapshot, NewMount, RequestOptions, TransportRegistry, VfsConfig, VfsError,
    VfsRequest, VfsResult, VfsTransport,
};

// ============================================================================
// Spy transport
// ============================================================================

#[derive(Debug, Clone)]
struct Call {
    op: &'static str,
    args: Vec<String>,
    options: RequestOptions,
    mount: MountpointSnapshot,
}

struct Spy {
    name: &'static str,
    calls: Mutex<Vec<Call>>,
}

impl Spy {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn record(
        &self,
        op: &'static str,
        args: &[&str],
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) {
        self.calls.lock().push(Call {
            op,
            args: args.iter().map(|a| a.to_string()).collect(),
            options: options.clone(),
            mount: mount.clone(),
        });
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl VfsTransport for Spy {
    fn name(&self) -> &str {
        self.name
    }

    async fn scandir(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<Vec<FileMetadata>> {
        self.record("scandir", &[path], options, mount);
        Ok(Vec::new())
    }

    async fn read(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<Vec<u8>> {
        self.record("read", &[path], options, mount);
        Ok(Vec::new())
    }

    async fn free_space(
        &self,
        root: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<FreeSpace> {
        self.record("freeSpace", &[root], options, mount);
        Ok(FreeSpace::Unlimited)
    }

    async fn write(
        &self,
        path: &str,
        _data: &[u8],
        _mime: Option<&str>,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        self.record("write", &[path], options, mount);
        Ok(true)
    }

    async fn unlink(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        self.record("unlink", &[path], options, mount);
        Ok(true)
    }

    async fn copy(
        &self,
        src: &str,
        dest: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        self.record("copy", &[src, dest], options, mount);
        Ok(true)
    }

    async fn rename(
        &self,
        src: &str,
        dest: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        self.record("move", &[src, dest], options, mount);
        Ok(true)
    }

    async fn mkdir(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        self.record("mkdir", &[path], options, mount);
        Ok(true)
    }

    async fn upload(
        &self,
        dest: &str,
        name: &str,
        _data: &[u8],
        _mime: Option<&str>,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        self.record("upload", &[dest, name], options, mount);
        Ok(true)
    }

    async fn trash(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        self.record("trash", &[path], options, mount);
        Ok(true)
    }

    async fn untrash(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        self.record("untrash", &[path], options, mount);
        Ok(true)
    }

    async fn empty_trash(
        &self,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        self.record("emptyTrash", &[], options, mount);
        Ok(true)
    }
}

// ============================================================================
// Shared test setup
// ============================================================================

/// Route library logs to the test harness; `RUST_LOG=osjs_vfs=debug` to see them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn manager_with(toml: &str, spy: &Arc<Spy>) -> MountManager {
    init_tracing();
    let config = VfsConfig::from_toml_str(toml).unwrap();
    let transports = TransportRegistry::new().with(spy.clone());
    MountManager::new(config, transports)
}

fn opts() -> RequestOptions {
    RequestOptions::new()
}

fn mutating_requests(path: &str) -> Vec<VfsRequest> {
    vec![
        VfsRequest::Write {
            path: format!("{path}/a.txt"),
            data: b"x".to_vec(),
            mime: None,
        },
        VfsRequest::Unlink {
            path: format!("{path}/a.txt"),
        },
        VfsRequest::Mkdir {
            path: format!("{path}/dir"),
        },
        VfsRequest::Move {
            src: format!("{path}/a.txt"),
            dest: format!("{path}/b.txt"),
        },
        VfsRequest::Upload {
            dest: path.to_string(),
            name: "u.bin".into(),
            data: vec![1],
            mime: None,
        },
        VfsRequest::Trash {
            path: format!("{path}/a.txt"),
        },
        VfsRequest::Untrash {
            path: format!("{path}/a.txt"),
        },
        VfsRequest::EmptyTrash {
            root: path.to_string(),
        },
    ]
}

// ============================================================================
// Registry properties
// ============================================================================

#[tokio::test]
async fn duplicate_add_fails_without_mutating_registry() {
    let spy = Spy::new("Spy");
    let mm = manager_with("", &spy);
    mm.init().unwrap();

    let first = mm.add(NewMount::new("Share", "Spy")).unwrap();
    let before = mm.get_modules(ModuleFilter::default()).len();

    let err = mm
        .add(NewMount::new("Share", "Spy").with_read_only(true))
        .unwrap_err();
    assert!(matches!(err, VfsError::AlreadyMounted(ref n) if n == "Share"));
    assert_eq!(err.code(), "ERR_VFSMODULE_ALREADY_MOUNTED");

    assert_eq!(mm.get_modules(ModuleFilter::default()).len(), before);
    let current = mm.get_module("Share").unwrap();
    assert!(Arc::ptr_eq(&first, &current));
    assert!(!current.is_read_only());
}

#[tokio::test]
async fn resolution_returns_owner_or_default() {
    let spy = Spy::new("Spy");
    let mm = manager_with(
        "[mountpoints.home]\ntransport = \"Spy\"\n[mountpoints.docs]\ntransport = \"Spy\"",
        &spy,
    );
    mm.init().unwrap();

    assert_eq!(mm.get_module_from_path("home:///a", true).as_deref(), Some("home"));
    assert_eq!(mm.get_module_from_path("docs:///", false).as_deref(), Some("docs"));
    assert_eq!(mm.get_module_from_path("ftp:///nope", true).as_deref(), Some(DEFAULT_MODULE));
    assert_eq!(mm.get_module_from_path("ftp:///nope", false), None);

    // `homework` must not be captured by `home`
    assert_eq!(mm.get_module_from_path("homework:///a", false), None);
}

#[tokio::test]
async fn first_registered_wins_on_overlap() {
    let spy = Spy::new("Spy");
    let mm = manager_with("[mountpoints.docs]\ntransport = \"Spy\"", &spy);
    mm.register_builtin(
        MountpointParams::new("archive", "Spy").with_scheme("docs"),
        false,
    )
    .unwrap();
    mm.init().unwrap();

    assert_eq!(mm.get_module_from_path("docs:///a", false).as_deref(), Some("archive"));
}

#[tokio::test]
async fn disabled_mountpoints_are_skipped_by_resolution() {
    struct Disabled;

    #[async_trait]
    impl MountHooks for Disabled {
        fn enabled(&self) -> bool {
            false
        }
    }

    let spy = Spy::new("Spy");
    let mm = manager_with("[mountpoints.docs]\ntransport = \"Spy\"", &spy);
    mm.register_builtin(
        MountpointParams::new("off", "Spy")
            .with_scheme("docs")
            .with_hooks(Arc::new(Disabled)),
        false,
    )
    .unwrap();
    mm.init().unwrap();

    assert_eq!(mm.get_module_from_path("docs:///a", false).as_deref(), Some("docs"));
    assert!(mm.get_modules(ModuleFilter::default()).iter().all(|e| e.name != "off"));
    // lookup by name ignores the enabled state
    assert!(mm.get_module("off").is_some());
}

// ============================================================================
// Read-only policy
// ============================================================================

#[tokio::test]
async fn read_only_rejects_mutations_before_transport() {
    let spy = Spy::new("Spy");
    let mm = manager_with("[mountpoints.home]\ntransport = \"Spy\"\nread_only = true", &spy);
    mm.init().unwrap();

    for request in mutating_requests("home:///") {
        let op = request.operation();
        let result = mm.request(request, &opts()).await;
        assert!(
            matches!(result, Err(VfsError::ReadOnly)),
            "{op} should be rejected, got {result:?}"
        );
    }
    assert!(spy.calls().is_empty());

    // reads still reach the transport
    mm.request(
        VfsRequest::Scandir {
            path: "home:///".into(),
        },
        &opts(),
    )
    .await
    .unwrap();
    mm.request(
        VfsRequest::FreeSpace {
            root: "home:///".into(),
        },
        &opts(),
    )
    .await
    .unwrap();
    assert_eq!(spy.calls().len(), 2);
}

#[tokio::test]
async fn read_only_copy_depends_on_destination() {
    let spy = Spy::new("Spy");
    let mm = manager_with("[mountpoints.home]\ntransport = \"Spy\"\nread_only = true", &spy);
    mm.init().unwrap();
    mm.add(NewMount::new("Cloud", "Spy")).unwrap();

    assert!(mm.get_module("home").unwrap().is_internal());
    assert!(!mm.get_module("Cloud").unwrap().is_internal());

    // internal -> non-internal is allowed
    let copy_out = VfsRequest::Copy {
        src: "home:///a.txt".into(),
        dest: "cloud:///a.txt".into(),
    };
    mm.request(copy_out, &opts()).await.unwrap();
    let calls = spy.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].op, "copy");
    assert_eq!(calls[0].args, vec!["home:///a.txt", "cloud:///a.txt"]);

    // internal -> internal is a read-only violation
    let copy_within = VfsRequest::Copy {
        src: "home:///a.txt".into(),
        dest: "home:///b.txt".into(),
    };
    let err = mm.request(copy_within, &opts()).await.unwrap_err();
    assert!(matches!(err, VfsError::ReadOnly));
    assert_eq!(err.code(), "ERR_VFSMODULE_READONLY");
    assert_eq!(spy.calls().len(), 1);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn remove_unregisters_and_falls_back_to_default() {
    let spy = Spy::new("Spy");
    let mm = manager_with("[mountpoints.User]\ntransport = \"Spy\"", &spy);
    mm.init().unwrap();
    mm.add(NewMount::new("Share", "Spy")).unwrap();

    let mut events = mm.events().subscribe("vfs.unmount");
    assert!(mm.remove("Share").unwrap().await.unwrap());

    assert!(mm.get_module("Share").is_none());
    assert_eq!(mm.get_module_from_path("share:///x", true).as_deref(), Some("User"));
    assert_eq!(
        mm.get_module_object_from_path("share:///x", true).unwrap().name(),
        "User"
    );
    assert_eq!(events.try_recv().unwrap().payload, MountFlow::unmounted("Share"));

    // gone now
    assert!(matches!(mm.remove("Share"), Err(VfsError::NotMounted(_))));
}

#[tokio::test]
async fn add_emits_mount_event() {
    let spy = Spy::new("Spy");
    let mm = manager_with("", &spy);
    mm.init().unwrap();
    let mut events = mm.events().subscribe("vfs.*");

    mm.add(NewMount::new("Share", "Spy")).unwrap();
    let msg = events.recv().await.unwrap();
    assert_eq!(msg.subject, "vfs.mount");
    assert_eq!(msg.payload.name(), "Share");
}

#[tokio::test]
async fn unmounted_dynamic_mount_rejects_requests() {
    let spy = Spy::new("Spy");
    let mm = manager_with("", &spy);
    mm.init().unwrap();
    let mount = mm.add(NewMount::new("Share", "Spy")).unwrap();

    assert!(mount.unmount().await.unwrap());
    assert!(!mount.mounted());
    // the entry stays registered
    assert!(mm.get_module("Share").is_some());

    let result = mm
        .request(
            VfsRequest::Read {
                path: "share:///a".into(),
            },
            &opts(),
        )
        .await;
    assert!(matches!(result, Err(VfsError::NotMounted(n)) if n == "Share"));
    assert!(spy.calls().is_empty());
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn dispatch_passes_args_options_and_snapshot() {
    let test = Spy::new("Test");
    let mm = manager_with(
        "[mountpoints.home]\ntransport = \"Test\"\ndescription = \"Home\"",
        &test,
    );
    mm.init().unwrap();
    let mount = mm.get_module("home").unwrap();

    let options = RequestOptions::new().with("showHidden", true);
    mount
        .request(
            VfsRequest::Scandir {
                path: "home:///docs".into(),
            },
            &options,
        )
        .await
        .unwrap();

    let calls = test.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.op, "scandir");
    assert_eq!(call.args, vec!["home:///docs"]);
    assert_eq!(call.options, options);
    assert_eq!(&call.mount, mount.snapshot().as_ref());
    assert_eq!(call.mount.description, "Home");
    assert_eq!(call.mount.root, "home:///");

    let json = serde_json::to_value(&call.mount).unwrap();
    assert_eq!(json["transport"], "Test");
    assert_eq!(json["internal"], true);
}

#[tokio::test]
async fn unknown_transport_and_unsupported_verbs() {
    let spy = Spy::new("Spy");
    let mm = manager_with(
        "[mountpoints.home]\ntransport = \"Spy\"\n[mountpoints.lost]\ntransport = \"Gone\"",
        &spy,
    );
    mm.init().unwrap();

    let err = mm
        .request(
            VfsRequest::Read {
                path: "lost:///a".into(),
            },
            &opts(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ERR_VFSMODULE_INVALID_TYPE");

    let err = mm
        .request(
            VfsRequest::Find {
                path: "home:///".into(),
                query: "a".into(),
            },
            &opts(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, VfsError::Unavailable));
}

// ============================================================================
// End-to-end
// ============================================================================

#[tokio::test]
async fn home_and_onedrive_scenario() {
    let spy = Spy::new("Spy");
    let mm = manager_with("[mountpoints.home]\ntransport = \"Spy\"", &spy);
    mm.register_builtin(
        MountpointParams::new("onedrive", "Spy").with_internal(false),
        false,
    )
    .unwrap();
    mm.init().unwrap();

    assert_eq!(mm.get_module("home").unwrap().root(), "home:///");
    assert_eq!(mm.get_module("onedrive").unwrap().root(), "onedrive:///");
    assert!(mm.is_internal("home:///a"));
    assert!(!mm.is_internal("onedrive:///a"));

    assert_eq!(mm.get_module_from_path("home:///a/b.txt", true).as_deref(), Some("home"));
    assert_eq!(mm.get_module_from_path("onedrive:///x.png", true).as_deref(), Some("onedrive"));
    assert_eq!(mm.get_module_from_path("ftp:///nope", true).as_deref(), Some("User"));

    // re-register home as read-only
    let _ = mm.remove("home").unwrap().await;
    mm.register_builtin(
        MountpointParams::new("home", "Spy")
            .with_internal(true)
            .with_read_only(true)
            .with_hooks(Arc::new(StaticHooks)),
        false,
    )
    .unwrap();
    assert_eq!(mm.get_module_property("home", "readOnly"), Some(true.into()));

    let write = VfsRequest::Write {
        path: "home:///a/b.txt".into(),
        data: b"data".to_vec(),
        mime: Some("text/plain".into()),
    };
    let err = mm.request(write, &opts()).await.unwrap_err();
    assert!(matches!(err, VfsError::ReadOnly));
    assert!(spy.calls().iter().all(|c| c.op != "write"));
}

// ============================================================================
// Shipped backends through the manager
// ============================================================================

#[tokio::test]
async fn internal_and_web_transports() {
    let dir = tempfile::tempdir().unwrap();
    let transports = TransportRegistry::new()
        .with(Arc::new(LocalTransport::new(dir.path())))
        .with(Arc::new(WebTransport));
    let config = VfsConfig::from_toml_str(
        "[mountpoints.home]\n[mountpoints.web]\ntransport = \"Web\"",
    )
    .unwrap();
    let mm = MountManager::new(config, transports);
    mm.init().unwrap();

    mm.request(
        VfsRequest::Write {
            path: "home:///notes/a.txt".into(),
            data: b"hi".to_vec(),
            mime: None,
        },
        &opts(),
    )
    .await
    .unwrap();
    let data = mm
        .request(
            VfsRequest::Read {
                path: "home:///notes/a.txt".into(),
            },
            &opts(),
        )
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(data, b"hi");
    assert!(dir.path().join("home/notes/a.txt").exists());

    // the web transport rewrote its mountpoint
    let web = mm.get_module("web").unwrap();
    assert!(web.is_read_only());
    assert_eq!(
        mm.get_module_from_path("https://example.org/a.png", false).as_deref(),
        Some("web")
    );
    let url = mm
        .request(
            VfsRequest::Url {
                path: "https://example.org/a.png".into(),
            },
            &opts(),
        )
        .await
        .unwrap()
        .into_url()
        .unwrap();
    assert_eq!(url, "https://example.org/a.png");
}

#[tokio::test]
async fn local_storage_self_registers() {
    let config = VfsConfig::from_toml_str("[local_storage]\nenabled = true").unwrap();
    let mm = MountManager::new(config, TransportRegistry::new());
    let store = Arc::new(local_storage::MemoryStore::new());
    let (_transport, mount) = local_storage::install(&mm, store).unwrap();

    // queued until init
    assert!(mm.get_module("LocalStorage").is_none());
    mm.init().unwrap();
    assert!(Arc::ptr_eq(&mount, &mm.get_module("LocalStorage").unwrap()));
    assert!(!mount.is_internal());
    assert_eq!(mount.root(), "localstorage:///");

    let mut events = mm.events().subscribe("vfs.*");
    mm.request(
        VfsRequest::Mkdir {
            path: "localstorage:///docs".into(),
        },
        &opts(),
    )
    .await
    .unwrap();
    assert_eq!(events.try_recv().unwrap().payload, MountFlow::mounted("LocalStorage"));

    let entries = mm
        .request(
            VfsRequest::Scandir {
                path: "localstorage:///".into(),
            },
            &opts(),
        )
        .await
        .unwrap()
        .into_entries()
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "localstorage:///docs");
    // only announced once
    assert!(events.try_recv().is_none());

    assert!(mm.remove("LocalStorage").unwrap().await.unwrap());
    assert_eq!(events.try_recv().unwrap().payload, MountFlow::unmounted("LocalStorage"));
}

#[tokio::test]
async fn local_storage_disabled_by_default() {
    let mm = MountManager::new(VfsConfig::default(), TransportRegistry::new());
    local_storage::install(&mm, Arc::new(local_storage::MemoryStore::new())).unwrap();
    mm.init().unwrap();

    assert!(mm.get_module("LocalStorage").is_some());
    assert_eq!(mm.get_module_from_path("localstorage:///a", false), None);
    assert!(mm.get_modules(ModuleFilter::default()).is_empty());
}
