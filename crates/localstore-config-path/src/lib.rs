//! Locates the per-user directories localstore keeps its data under.

use std::{ffi::OsString, path::PathBuf};

/// Directory name created under the user's config directory.
pub const APPLICATION_DIR: &str = "localstore";

fn absolute_path(path: OsString) -> Option<PathBuf> {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        Some(path)
    } else {
        None
    }
}

fn non_empty(value: OsString) -> Option<OsString> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Resolves a config directory from raw `XDG_CONFIG_HOME` and `HOME` values.
///
/// A relative `XDG_CONFIG_HOME` is ignored, as the XDG base directory
/// specification requires.
pub fn resolve_config_dir(xdg_config_home: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    xdg_config_home
        .and_then(absolute_path)
        .or_else(|| home.and_then(non_empty).map(|h| PathBuf::from(h).join(".config")))
}

#[cfg(unix)]
mod unix {
    use std::env;
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        env::var_os("HOME").and_then(super::non_empty).map(PathBuf::from)
    }

    pub fn config_dir() -> Option<PathBuf> {
        super::resolve_config_dir(env::var_os("XDG_CONFIG_HOME"), env::var_os("HOME"))
    }
}

#[cfg(unix)]
pub use unix::{config_dir, home_dir};

#[cfg(target_os = "windows")]
mod windows {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    use std::path::PathBuf;
    use std::ptr;
    use std::slice;

    use winapi::shared::winerror;
    use winapi::um::{combaseapi, knownfolders, shlobj, shtypes, winbase, winnt};

    fn known_folder(folder_id: shtypes::REFKNOWNFOLDERID) -> Option<PathBuf> {
        // SAFETY: the buffer returned by SHGetKnownFolderPath is NUL terminated and
        // owned by us until CoTaskMemFree.
        unsafe {
            let mut path_ptr: winnt::PWSTR = ptr::null_mut();
            let result = shlobj::SHGetKnownFolderPath(folder_id, 0, ptr::null_mut(), &mut path_ptr);
            if result == winerror::S_OK {
                let len = winbase::lstrlenW(path_ptr) as usize;
                let wide = slice::from_raw_parts(path_ptr, len);
                let path: OsString = OsStringExt::from_wide(wide);
                combaseapi::CoTaskMemFree(path_ptr as *mut winapi::ctypes::c_void);
                Some(PathBuf::from(path))
            } else {
                combaseapi::CoTaskMemFree(path_ptr as *mut winapi::ctypes::c_void);
                None
            }
        }
    }

    pub fn home_dir() -> Option<PathBuf> {
        known_folder(&knownfolders::FOLDERID_Profile)
    }

    pub fn config_dir() -> Option<PathBuf> {
        known_folder(&knownfolders::FOLDERID_RoamingAppData)
    }
}

#[cfg(target_os = "windows")]
pub use windows::{config_dir, home_dir};

/// `<config_dir>/localstore`, the base every namespace directory lives under.
pub fn application_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(APPLICATION_DIR))
}
