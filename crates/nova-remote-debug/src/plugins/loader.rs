//! Runtime probing of optional capability modules.
//!
//! Nothing here is allowed to fail loudly: a module that is missing, broken or
//! incompatible simply means the capability is absent.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::ffi::c_void;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};

use super::capabilities::{
    CrashReporter, OptionalCapability, UsageTelemetry, PLUGIN_ABI_SYMBOL, PLUGIN_ABI_VERSION,
};
use crate::error::CapabilityLoadError;

/// A capability kind that can be looked up in a module.
///
/// Implemented for the trait objects of the capability contracts.
pub trait Capability: OptionalCapability + 'static {
    /// Human readable kind, used in logs.
    const KIND: &'static str;
    /// The single entry point a module exports for this capability.
    const ENTRY_SYMBOL: &'static [u8];
}

impl Capability for dyn CrashReporter {
    const KIND: &'static str = "crash reporter";
    const ENTRY_SYMBOL: &'static [u8] = b"nova_remote_debug_crash_reporter";
}

impl Capability for dyn UsageTelemetry {
    const KIND: &'static str = "usage telemetry";
    const ENTRY_SYMBOL: &'static [u8] = b"nova_remote_debug_usage_telemetry";
}

/// Where optional modules are looked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleLocator {
    dir: Option<PathBuf>,
}

impl Default for ModuleLocator {
    fn default() -> Self {
        Self::next_to_executable()
    }
}

impl ModuleLocator {
    /// Modules live beside the running executable.
    pub fn next_to_executable() -> Self {
        let dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self { dir }
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Platform file name for logical module `name`, e.g. `libfoo.so` or `foo.dll`.
    pub fn candidate(&self, name: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        Some(dir.join(format!("{DLL_PREFIX}{name}{DLL_SUFFIX}")))
    }
}

/// A capability instance together with the library that provides its code.
pub struct LoadedCapability<C: ?Sized + Capability> {
    // Field order matters: the instance must be dropped before its library is unloaded.
    instance: Box<C>,
    path: PathBuf,
    _library: Library,
}

impl<C: ?Sized + Capability> LoadedCapability<C> {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<C: ?Sized + Capability> Deref for LoadedCapability<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.instance
    }
}

impl<C: ?Sized + Capability> DerefMut for LoadedCapability<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.instance
    }
}

impl<C: ?Sized + Capability> fmt::Debug for LoadedCapability<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedCapability")
            .field("kind", &C::KIND)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

type AbiVersionFn = unsafe extern "C" fn() -> u32;
type EntryFn = unsafe extern "C" fn() -> *mut c_void;

fn symbol_name(symbol: &[u8]) -> String {
    String::from_utf8_lossy(symbol).into_owned()
}

fn check_abi_version(found: u32, path: &Path) -> Result<(), CapabilityLoadError> {
    if found == PLUGIN_ABI_VERSION {
        return Ok(());
    }
    Err(CapabilityLoadError::AbiMismatch {
        path: path.to_path_buf(),
        found,
        supported: PLUGIN_ABI_VERSION,
    })
}

/// Call a module entry point and initialize the instance it hands over.
///
/// The instance is dropped again if `initialize()` fails or panics.
fn instantiate<C: ?Sized + Capability>(
    entry: EntryFn,
    path: &Path,
) -> Result<Box<C>, CapabilityLoadError> {
    // SAFETY: entry points follow the `export_capability!` contract; a panic
    // inside the constructor is turned into null there.
    let raw = std::panic::catch_unwind(AssertUnwindSafe(|| unsafe { entry() })).map_err(|_| {
        CapabilityLoadError::Panicked {
            path: path.to_path_buf(),
        }
    })?;
    if raw.is_null() {
        return Err(CapabilityLoadError::NullInstance {
            path: path.to_path_buf(),
        });
    }

    // SAFETY: a non-null entry-point result is a `Box<Box<C>>` leaked with `Box::into_raw`.
    let mut instance: Box<C> = *unsafe { Box::from_raw(raw.cast::<Box<C>>()) };

    match std::panic::catch_unwind(AssertUnwindSafe(|| instance.initialize())) {
        Ok(Ok(())) => Ok(instance),
        Ok(Err(source)) => Err(CapabilityLoadError::Initialize {
            path: path.to_path_buf(),
            source,
        }),
        Err(_) => Err(CapabilityLoadError::Panicked {
            path: path.to_path_buf(),
        }),
    }
}

/// Load capability `C` from the module at `path`.
pub fn try_load_capability<C: ?Sized + Capability>(
    path: &Path,
) -> Result<LoadedCapability<C>, CapabilityLoadError> {
    if !path.is_file() {
        return Err(CapabilityLoadError::Missing {
            path: path.to_path_buf(),
        });
    }

    // SAFETY: loading runs the module's initializers. Optional modules are
    // shipped alongside the host and trusted to the same degree as the host.
    let library = unsafe { Library::new(path) }.map_err(|source| CapabilityLoadError::Library {
        path: path.to_path_buf(),
        source,
    })?;

    let found = {
        // SAFETY: the ABI symbol is declared by `export_capability!` with this signature.
        let abi: Symbol<AbiVersionFn> = unsafe { library.get(PLUGIN_ABI_SYMBOL) }.map_err(|_| {
            CapabilityLoadError::MissingSymbol {
                path: path.to_path_buf(),
                symbol: symbol_name(PLUGIN_ABI_SYMBOL),
            }
        })?;
        // SAFETY: see above.
        unsafe { abi() }
    };
    check_abi_version(found, path)?;

    let instance = {
        // SAFETY: entry points are declared by `export_capability!` with this signature.
        let entry: Symbol<EntryFn> = unsafe { library.get(C::ENTRY_SYMBOL) }.map_err(|_| {
            CapabilityLoadError::MissingSymbol {
                path: path.to_path_buf(),
                symbol: symbol_name(C::ENTRY_SYMBOL),
            }
        })?;
        instantiate::<C>(*entry, path)?
    };

    Ok(LoadedCapability {
        instance,
        path: path.to_path_buf(),
        _library: library,
    })
}

/// Look for the optional module `name` and load capability `C` from it.
///
/// Returns `None` when the module is absent or unusable for any reason. The
/// reason is logged at `debug` level only.
pub fn find_optional_capability<C: ?Sized + Capability>(
    locator: &ModuleLocator,
    name: &str,
) -> Option<LoadedCapability<C>> {
    let Some(path) = locator.candidate(name) else {
        tracing::debug!(
            target = "nova.remote_debug",
            module = name,
            kind = C::KIND,
            "no module directory available; optional capability disabled"
        );
        return None;
    };

    absent_on_failure(name, &path, try_load_capability::<C>(&path))
}

fn absent_on_failure<C: ?Sized + Capability>(
    name: &str,
    path: &Path,
    loaded: Result<LoadedCapability<C>, CapabilityLoadError>,
) -> Option<LoadedCapability<C>> {
    match loaded {
        Ok(loaded) => {
            tracing::info!(
                target = "nova.remote_debug",
                module = name,
                kind = C::KIND,
                path = %path.display(),
                "loaded optional capability"
            );
            Some(loaded)
        }
        Err(err) => {
            tracing::debug!(
                target = "nova.remote_debug",
                module = name,
                kind = C::KIND,
                error = %err,
                "optional capability unavailable"
            );
            None
        }
    }
}
