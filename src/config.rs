use camino::Utf8PathBuf;

use crate::manifest;

/// Runtime settings of the command line front end.
///
/// Settings start from defaults and can be overridden through `HIGHWAY_*`
/// environment variables or the builder methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Where the highway manifest is written. `None` disables the export.
    pub manifest: Option<Utf8PathBuf>,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Version string shown in verbose output.
    pub version: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest: Some(Utf8PathBuf::from(manifest::DEFAULT_PATH)),
            log_filter: String::from("highway=info"),
            version: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_vars(crate::invocation::unicode_vars(std::env::vars_os()))
    }

    /// Recognized variables:
    /// * `HIGHWAY_MANIFEST` - manifest path, `off` or empty disables it
    /// * `HIGHWAY_LOG` - default log filter
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut settings = Self::default();

        for (key, value) in vars {
            match key.as_ref() {
                "HIGHWAY_MANIFEST" => {
                    let value = value.into();
                    settings.manifest = match value.trim() {
                        "" | "off" => None,
                        path => Some(Utf8PathBuf::from(path)),
                    };
                }
                "HIGHWAY_LOG" => settings.log_filter = value.into(),
                _ => {}
            }
        }

        settings
    }

    pub fn manifest(mut self, path: Option<impl Into<Utf8PathBuf>>) -> Self {
        self.manifest = path.map(Into::into);
        self
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}
