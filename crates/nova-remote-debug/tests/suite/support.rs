use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use nova_remote_debug::{
    AttentionError, DebugSession, FileDescriptor, FileRegistry, RecordingSink, RemoteDebugClient,
    RemoteDebugServices, SessionEvent, SessionHub, WindowAttention, WindowHandle,
};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::runtime::Handle;

/// A transport stand-in that reports `Disconnected` back through the hub, the
/// way a real connection does once it has been torn down.
#[derive(Default)]
pub struct LoopbackSession {
    hub: OnceLock<Weak<SessionHub>>,
    disconnects: AtomicUsize,
}

impl LoopbackSession {
    pub fn attach(&self, hub: &Arc<SessionHub>) {
        let _ = self.hub.set(Arc::downgrade(hub));
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl DebugSession for LoopbackSession {
    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if let Some(hub) = self.hub.get().and_then(Weak::upgrade) {
            hub.emit(SessionEvent::Disconnected);
        }
    }
}

/// Project rooted in a temporary asset directory.
pub struct TempProject {
    dir: TempDir,
    registered: Mutex<Vec<PathBuf>>,
}

impl TempProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
            registered: Mutex::new(Vec::new()),
        }
    }

    pub fn write_script(&self, relative: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create script dir");
        }
        std::fs::write(&path, "print('hello')\n").expect("write script");
        path
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn registered(&self) -> Vec<PathBuf> {
        self.registered.lock().clone()
    }
}

impl FileRegistry for TempProject {
    fn asset_root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    fn register_file(&self, path: &Path) -> FileDescriptor {
        self.registered.lock().push(path.to_path_buf());
        FileDescriptor {
            path: path.to_path_buf(),
        }
    }
}

#[derive(Default)]
pub struct BackgroundWindow {
    pub requests: AtomicUsize,
}

impl WindowAttention for BackgroundWindow {
    fn main_window(&self) -> Option<WindowHandle> {
        Some(WindowHandle(0x10))
    }

    fn is_foreground(&self, _window: WindowHandle) -> Result<bool, AttentionError> {
        Ok(false)
    }

    fn request_attention(&self, _window: WindowHandle) -> Result<(), AttentionError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Harness {
    pub client: RemoteDebugClient,
    pub session: Arc<LoopbackSession>,
    pub project: Arc<TempProject>,
    pub sink: Arc<RecordingSink>,
    pub window: Arc<BackgroundWindow>,
}

/// Build a client on the current tokio runtime with fake collaborators.
pub fn harness() -> Harness {
    let session = Arc::new(LoopbackSession::default());
    let project = Arc::new(TempProject::new());
    let sink = Arc::new(RecordingSink::new());
    let window = Arc::new(BackgroundWindow::default());

    let client = RemoteDebugClient::new(
        RemoteDebugServices {
            session: session.clone(),
            files: project.clone(),
            sink: sink.clone(),
            attention: window.clone(),
        },
        Handle::current(),
    );
    session.attach(client.hub());

    Harness {
        client,
        session,
        project,
        sink,
        window,
    }
}
