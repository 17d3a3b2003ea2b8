use nova_remote_debug::hardening::{self, OptionalModules};
use nova_remote_debug::plugins::{
    find_optional_capability, CrashReporter, ModuleLocator, UsageTelemetry,
};
use nova_remote_debug::{LoggingConfig, PluginConfig, RemoteDebugConfig};

#[test]
fn nonexistent_module_is_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let locator = ModuleLocator::in_dir(dir.path());

    assert!(find_optional_capability::<dyn CrashReporter>(&locator, "nova_crash_reporter").is_none());
    assert!(
        find_optional_capability::<dyn UsageTelemetry>(&locator, "nova_usage_telemetry").is_none()
    );
}

#[test]
fn corrupt_module_is_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let locator = ModuleLocator::in_dir(dir.path());
    let candidate = locator.candidate("nova_crash_reporter").expect("candidate");
    std::fs::write(&candidate, [0u8; 64]).expect("write candidate");

    assert!(find_optional_capability::<dyn CrashReporter>(&locator, "nova_crash_reporter").is_none());
}

#[test]
fn hardening_without_modules_still_initializes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = RemoteDebugConfig {
        logging: LoggingConfig {
            stderr: false,
            ..LoggingConfig::default()
        },
        plugins: PluginConfig {
            search_dir: Some(dir.path().to_path_buf()),
            crash_reporter: None,
            usage_telemetry: Some("nova_usage_telemetry".to_owned()),
        },
    };

    let modules: OptionalModules = hardening::init(&config);

    assert!(modules.crash_reporter.is_none());
    assert!(modules.usage_telemetry.is_none());
}
