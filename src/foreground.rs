//! Foreground application identification and the sensitivity policy.
//!
//! Substitution strategy depends on which application owns the focused
//! window: clipboard paste for ordinary applications, character-by-character
//! typing for sensitive ones (credential managers and the like, which refuse
//! or log clipboard content). The verdict is recomputed per substitution
//! because focus can move between invocations.

use tracing::debug;

/// Port resolving the executable that owns the current foreground window.
pub trait ForegroundApp {
    /// File name (with extension, e.g. `"notepad.exe"`) of the process that
    /// owns the focused window. `None` on any OS-level failure: no visible
    /// window, access denied, process already gone. Callers treat `None` as
    /// "unknown".
    fn active_executable_name(&mut self) -> Option<String>;
}

/// Foreground resolver backed by the OS window manager.
///
/// On Windows the foreground window is mapped to its owning process and the
/// executable path is read from the process handle; when the handle cannot
/// be opened (elevated processes), the process table is consulted instead.
pub struct SystemForeground {
    #[cfg_attr(not(windows), allow(dead_code))]
    system: sysinfo::System,
}

impl SystemForeground {
    pub fn new() -> Self {
        Self {
            system: sysinfo::System::new(),
        }
    }
}

impl Default for SystemForeground {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(windows)]
impl ForegroundApp for SystemForeground {
    fn active_executable_name(&mut self) -> Option<String> {
        let pid = platform::foreground_process_id()?;
        let name = platform::executable_file_name(pid).or_else(|| self.name_from_process_table(pid));
        debug!(pid, ?name, "resolved foreground executable");
        name
    }
}

#[cfg(windows)]
impl SystemForeground {
    fn name_from_process_table(&mut self, pid: u32) -> Option<String> {
        use sysinfo::{Pid, ProcessesToUpdate};

        let pid = Pid::from_u32(pid);
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        self.system
            .process(pid)
            .map(|process| process.name().to_string_lossy().into_owned())
    }
}

#[cfg(not(windows))]
impl ForegroundApp for SystemForeground {
    fn active_executable_name(&mut self) -> Option<String> {
        debug!("foreground window queries are not supported on this platform");
        None
    }
}

#[cfg(windows)]
mod platform {
    use std::path::Path;
    use winapi::shared::minwindef::{DWORD, FALSE, MAX_PATH};
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::processthreadsapi::OpenProcess;
    use winapi::um::psapi::GetModuleFileNameExW;
    use winapi::um::winnt::{PROCESS_QUERY_INFORMATION, PROCESS_VM_READ};
    use winapi::um::winuser::{GetForegroundWindow, GetWindowThreadProcessId};

    pub(super) fn foreground_process_id() -> Option<u32> {
        let mut pid: DWORD = 0;
        unsafe {
            let window = GetForegroundWindow();
            if window.is_null() {
                return None;
            }
            GetWindowThreadProcessId(window, &mut pid);
        }
        (pid != 0).then_some(pid)
    }

    pub(super) fn executable_file_name(pid: u32) -> Option<String> {
        let mut buffer = [0u16; MAX_PATH + 1];
        let len = unsafe {
            let handle = OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, FALSE, pid);
            if handle.is_null() {
                return None;
            }
            let len = GetModuleFileNameExW(
                handle,
                std::ptr::null_mut(),
                buffer.as_mut_ptr(),
                buffer.len() as DWORD,
            );
            CloseHandle(handle);
            len as usize
        };
        if len == 0 {
            return None;
        }
        let path = String::from_utf16_lossy(&buffer[..len]);
        Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

/// Verdict on whether an application refuses clipboard-borne content.
///
/// The engine treats this as an opaque boolean; what makes an application
/// sensitive is entirely the policy's business.
pub trait SensitivityPolicy {
    fn is_sensitive(&self, executable_name: &str) -> bool;
}

/// Policy matching executable file names against a configured list,
/// case-insensitively. An empty (unknown) name is never sensitive.
#[derive(Debug, Clone, Default)]
pub struct ProcessNameList {
    names: Vec<String>,
}

impl ProcessNameList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.into().to_lowercase())
                .collect(),
        }
    }
}

impl SensitivityPolicy for ProcessNameList {
    fn is_sensitive(&self, executable_name: &str) -> bool {
        if executable_name.is_empty() {
            return false;
        }
        let lowered = executable_name.to_lowercase();
        self.names.iter().any(|name| *name == lowered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_name_list_matches_case_insensitively() {
        let policy = ProcessNameList::new(["KeePass.exe", "1password.exe"]);
        assert!(policy.is_sensitive("keepass.exe"));
        assert!(policy.is_sensitive("KEEPASS.EXE"));
        assert!(policy.is_sensitive("1Password.exe"));
        assert!(!policy.is_sensitive("notepad.exe"));
    }

    #[test]
    fn test_unknown_executable_is_not_sensitive() {
        let policy = ProcessNameList::new(["keepass.exe"]);
        assert!(!policy.is_sensitive(""));
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let policy = ProcessNameList::default();
        assert!(!policy.is_sensitive("keepass.exe"));
        assert!(!policy.is_sensitive(""));
    }

    #[test]
    fn test_system_foreground_creation() {
        let mut foreground = SystemForeground::new();
        // must never panic, whatever the window state is
        let _ = foreground.active_executable_name();
    }
}
