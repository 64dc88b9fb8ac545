//! Curated dangerous-API patterns.

/// Qualifying type/namespace prefixes whose use is flagged.
///
/// Grouped by concern: filesystem mutation, process control, reflection,
/// native interop, OS/registry management, unrestricted networking, SQL.
pub const DEFAULT_DANGEROUS_TYPES: &[&str] = &[
    // filesystem
    "System.IO.File",
    "System.IO.Directory",
    "shutil.",
    "os.",
    // processes
    "System.Diagnostics.Process",
    "subprocess.",
    "signal.",
    // reflection and dynamic loading
    "System.Reflection",
    "importlib.",
    // native interop
    "System.Runtime.InteropServices",
    "ctypes.",
    // OS and registry management
    "System.Security",
    "System.Management",
    "Microsoft.Win32",
    "winreg.",
    // networking
    "System.Net.WebClient",
    "System.Net.Http.HttpClient",
    "System.Net.Sockets",
    "socket.",
    "urllib.",
    "requests.",
    "http.client.",
    // SQL
    "System.Data.SqlClient",
    "sqlite3.",
];

/// Method-name fragments whose appearance in an invocation is flagged.
///
/// Matching is ordinal and case-sensitive, so `Delete` matches
/// `File.Delete(x)` but not `undelete(x)`.
pub const DEFAULT_DANGEROUS_METHODS: &[&str] = &[
    "Delete",
    "Kill",
    "Start",
    "Execute",
    "Run",
    "Format",
    "WriteAllText",
    "WriteAllBytes",
    "WriteAllLines",
    "Remove",
    "Move",
    "Copy",
    "Create",
    "OpenWrite",
    "DownloadFile",
    "UploadFile",
    "ExecuteNonQuery",
    "ShellExecute",
    "CreateProcess",
    "Invoke",
    "GetProcAddress",
    "LoadLibrary",
    "SetWindowsHook",
    "rmtree",
    "unlink",
    "popen",
    "urlopen",
    "executescript",
];

/// The pattern sets a [`Scanner`](crate::Scanner) checks against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPolicy {
    dangerous_types: Vec<String>,
    dangerous_methods: Vec<String>,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_DANGEROUS_TYPES, DEFAULT_DANGEROUS_METHODS)
    }
}

impl ScanPolicy {
    /// Creates a policy from explicit pattern sets.
    pub fn new(types: &[&str], methods: &[&str]) -> Self {
        Self {
            dangerous_types: types.iter().map(|s| s.to_string()).collect(),
            dangerous_methods: methods.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Adds a type prefix to the policy.
    pub fn with_type(mut self, prefix: impl Into<String>) -> Self {
        self.dangerous_types.push(prefix.into());
        self
    }

    /// Adds a method fragment to the policy.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.dangerous_methods.push(method.into());
        self
    }

    /// Returns the first type prefix that `text` starts with.
    pub fn matching_type(&self, text: &str) -> Option<&str> {
        self.dangerous_types
            .iter()
            .find(|prefix| text.starts_with(prefix.as_str()))
            .map(String::as_str)
    }

    /// Returns the first method fragment contained in `text`.
    pub fn matching_method(&self, text: &str) -> Option<&str> {
        self.dangerous_methods
            .iter()
            .find(|method| text.contains(method.as_str()))
            .map(String::as_str)
    }

    pub fn dangerous_types(&self) -> &[String] {
        &self.dangerous_types
    }

    pub fn dangerous_methods(&self) -> &[String] {
        &self.dangerous_methods
    }
}
