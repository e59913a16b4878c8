use super::literal::parse_keyword_strings;

/// Identity reported by `os.uname()` on the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub sysname: String,
    pub nodename: String,
    pub release: String,
    pub version: String,
    pub machine: String,
}

impl DeviceInfo {
    /// Parse the named-tuple text printed for `os.uname()`.
    ///
    /// Returns `None` when no `version` field is present.
    pub fn from_uname(text: &str) -> Option<Self> {
        let mut info = DeviceInfo::default();
        let mut has_version = false;

        for (key, value) in parse_keyword_strings(text) {
            match key.as_str() {
                "sysname" => info.sysname = value,
                "nodename" => info.nodename = value,
                "release" => info.release = value,
                "version" => {
                    info.version = value;
                    has_version = true;
                }
                "machine" => info.machine = value,
                _ => {}
            }
        }

        has_version.then_some(info)
    }
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MicroPython {} on {}", self.version, self.machine)
    }
}
