//! Configuration resolution.
//!
//! [`ConfigResolver`] merges, in increasing precedence, the built-in
//! defaults, the global (home directory) document, the local (working
//! directory) document and the caller's overrides, then validates the
//! result into an [`EffectiveConfig`].

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use tracing::{debug, trace};

use crate::config::{CONFIG_FILE_NAME, ConfigLayer, ConfigValues, EffectiveConfig, OutputFormat};
use crate::error::ConfigError;

/// Merges configuration sources into one validated [`EffectiveConfig`].
///
/// # Examples
///
/// ```no_run
/// use pw_core::{ConfigLayer, ConfigResolver};
/// use camino::Utf8Path;
///
/// # fn example() -> Result<(), pw_core::ConfigError> {
/// let resolver = ConfigResolver::discover(Utf8Path::new("/work"));
/// let overrides = ConfigLayer {
///     format: Some("svg".to_owned()),
///     ..ConfigLayer::default()
/// };
/// let config = resolver.resolve(&overrides)?;
/// println!("watching {}", config.watch_dir);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    defaults: ConfigValues,
    global_file: Option<Utf8PathBuf>,
    local_file: Option<Utf8PathBuf>,
    home_dir: Option<Utf8PathBuf>,
    search_path: Option<OsString>,
}

impl ConfigResolver {
    /// Creates a resolver with no persisted files, no home directory and no
    /// program search path.
    #[must_use]
    pub fn new(defaults: ConfigValues) -> Self {
        Self {
            defaults,
            global_file: None,
            local_file: None,
            home_dir: None,
            search_path: None,
        }
    }

    /// Creates a resolver for the current user and `working_dir`.
    ///
    /// Uses the built-in defaults for `working_dir`, the global document in
    /// the home directory, the local document in `working_dir`, and `PATH`
    /// for program lookup.
    #[must_use]
    pub fn discover(working_dir: &Utf8Path) -> Self {
        let home_dir = dirs::home_dir().and_then(|home| Utf8PathBuf::from_path_buf(home).ok());
        let global_file = home_dir.as_ref().map(|home| home.join(CONFIG_FILE_NAME));

        Self {
            defaults: ConfigValues::defaults(working_dir),
            global_file,
            local_file: Some(local_config_path(working_dir)),
            home_dir,
            search_path: std::env::var_os("PATH"),
        }
    }

    /// Sets the global-scope document location.
    #[must_use]
    pub fn with_global_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.global_file = Some(path.into());
        self
    }

    /// Sets the local-scope document location.
    #[must_use]
    pub fn with_local_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.local_file = Some(path.into());
        self
    }

    /// Sets the directory that `~/` in path values expands to.
    #[must_use]
    pub fn with_home_dir(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.home_dir = Some(path.into());
        self
    }

    /// Sets the search path used to locate bare program names.
    #[must_use]
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Returns the built-in defaults.
    #[must_use]
    pub fn defaults(&self) -> &ConfigValues {
        &self.defaults
    }

    /// Returns the local-scope document location, if any.
    #[must_use]
    pub fn local_file(&self) -> Option<&Utf8Path> {
        self.local_file.as_deref()
    }

    /// Merges every source without validating the result.
    ///
    /// Missing files are skipped; malformed files are a
    /// [`ConfigError::Parse`].
    pub fn merge(&self, overrides: &ConfigLayer) -> Result<ConfigValues, ConfigError> {
        let mut values = self.defaults.clone();

        for path in [&self.global_file, &self.local_file].into_iter().flatten() {
            if let Some(layer) = load_layer(path)? {
                values.apply(&layer);
            }
        }

        values.apply(overrides);
        Ok(values)
    }

    /// Merges every source and validates the result.
    pub fn resolve(&self, overrides: &ConfigLayer) -> Result<EffectiveConfig, ConfigError> {
        let values = self.merge(overrides)?;
        self.validate(values)
    }

    /// Validates merged values into an [`EffectiveConfig`].
    ///
    /// Checks run in a fixed order (interpreter, renderer, watch directory,
    /// output directory, format, extension) and the first failure is
    /// returned.
    pub fn validate(&self, values: ConfigValues) -> Result<EffectiveConfig, ConfigError> {
        let interpreter = self.require_program("java", &values.interpreter)?;
        let renderer = self.require_program("plantuml", &values.renderer)?;
        let watch_dir = self.require_dir("watchdir", &values.watch_dir)?;
        let output_dir = self.require_dir("outputdir", &values.output_dir)?;
        let format: OutputFormat = values.format.parse()?;
        let extension = normalize_extension(&values.extension)?;

        Ok(EffectiveConfig {
            verbose: values.verbose,
            interpreter,
            renderer,
            watch_dir,
            extension,
            output_dir,
            format,
            recursive: values.recursive,
        })
    }

    fn require_program(
        &self,
        field: &'static str,
        path: &Utf8Path,
    ) -> Result<Utf8PathBuf, ConfigError> {
        let path = self.expand_home(path);
        self.locate_program(&path)
            .ok_or_else(|| ConfigError::validation(field, path.as_str(), "file not found"))
    }

    fn require_dir(
        &self,
        field: &'static str,
        path: &Utf8Path,
    ) -> Result<Utf8PathBuf, ConfigError> {
        let path = self.expand_home(path);
        if !path.exists() {
            return Err(ConfigError::validation(field, path.as_str(), "directory does not exist"));
        }
        if !path.is_dir() {
            return Err(ConfigError::validation(field, path.as_str(), "not a directory"));
        }
        Ok(path)
    }

    /// Expands a leading `~` component against the home directory.
    fn expand_home(&self, path: &Utf8Path) -> Utf8PathBuf {
        match (&self.home_dir, path.strip_prefix("~")) {
            (Some(home), Ok(rest)) if rest.as_str().is_empty() => home.clone(),
            (Some(home), Ok(rest)) => home.join(rest),
            _ => path.to_owned(),
        }
    }

    /// Finds an existing file for `path`, searching the program search path
    /// when `path` is a bare name.
    fn locate_program(&self, path: &Utf8Path) -> Option<Utf8PathBuf> {
        if path.is_file() {
            return Some(path.to_owned());
        }
        if !is_bare_name(path) {
            return None;
        }

        let search_path = self.search_path.as_ref()?;
        std::env::split_paths(search_path)
            .filter_map(|dir| Utf8PathBuf::from_path_buf(dir).ok())
            .flat_map(|dir| program_candidates(dir, path))
            .find(|candidate| candidate.is_file())
            .inspect(|found| {
                trace!(program = %path, found = %found, "Located program on search path");
            })
    }
}

/// Returns the local-scope document location for `working_dir`.
#[must_use]
pub fn local_config_path(working_dir: &Utf8Path) -> Utf8PathBuf {
    working_dir.join(CONFIG_FILE_NAME)
}

/// Result of [`write_default_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The document was written to this path.
    Written(Utf8PathBuf),
    /// A file already existed at this path and was left untouched.
    AlreadyExists(Utf8PathBuf),
}

/// Writes `values` as a configuration document to `path`.
///
/// An existing file is never overwritten.
pub fn write_default_config(
    path: &Utf8Path,
    values: &ConfigValues,
) -> Result<WriteOutcome, ConfigError> {
    let write_error = |source: io::Error| ConfigError::Write {
        path: path.to_owned(),
        source,
    };

    let document = values.to_document().map_err(|e| write_error(io::Error::other(e)))?;

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Ok(WriteOutcome::AlreadyExists(path.to_owned()));
        }
        Err(e) => return Err(write_error(e)),
    };
    file.write_all(document.as_bytes()).map_err(write_error)?;

    debug!(path = %path, "Wrote default configuration");
    Ok(WriteOutcome::Written(path.to_owned()))
}

/// Reads one persisted layer; a missing file yields `None`.
fn load_layer(path: &Utf8Path) -> Result<Option<ConfigLayer>, ConfigError> {
    if !path.is_file() {
        trace!(path = %path, "No configuration file");
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;
    let layer = ConfigLayer::from_json(path, &content)?;

    debug!(path = %path, "Loaded configuration file");
    Ok(Some(layer))
}

fn normalize_extension(extension: &str) -> Result<String, ConfigError> {
    let trimmed = extension.strip_prefix('.').unwrap_or(extension);
    if trimmed.is_empty() {
        return Err(ConfigError::validation(
            "extension",
            extension,
            "extension must not be empty",
        ));
    }
    if trimmed.contains(['/', '\\']) {
        return Err(ConfigError::validation(
            "extension",
            extension,
            "extension must not contain path separators",
        ));
    }
    Ok(trimmed.to_owned())
}

fn is_bare_name(path: &Utf8Path) -> bool {
    let mut components = path.components();
    matches!(components.next(), Some(Utf8Component::Normal(_))) && components.next().is_none()
}

fn program_candidates(dir: Utf8PathBuf, name: &Utf8Path) -> impl Iterator<Item = Utf8PathBuf> {
    let plain = dir.join(name);
    let with_exe = (!std::env::consts::EXE_EXTENSION.is_empty() && name.extension().is_none())
        .then(|| plain.with_extension(std::env::consts::EXE_EXTENSION));
    std::iter::once(plain).chain(with_exe)
}
