//! Configuration structures for plantuml-watch.
//!
//! Configuration moves through three shapes:
//!
//! - [`ConfigLayer`] - a partial set of keys, as read from one persisted
//!   document or built from command-line overrides
//! - [`ConfigValues`] - a complete but unvalidated set of keys; the built-in
//!   defaults and the result of merging layers over them
//! - [`EffectiveConfig`] - the validated, immutable settings of one watch
//!   session
//!
//! Persisted documents are flat JSON objects:
//!
//! ```json
//! {
//!   "verbose": false,
//!   "java": "/usr/bin/java",
//!   "plantuml": "~/lib/plantuml.jar",
//!   "watchdir": ".",
//!   "extension": "pu",
//!   "outputdir": ".",
//!   "format": "png"
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted configuration document in both scopes.
pub const CONFIG_FILE_NAME: &str = ".plantumlwatch";

/// Image format produced by the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Portable Network Graphics.
    #[default]
    Png,
    /// Scalable Vector Graphics.
    Svg,
}

impl OutputFormat {
    /// All supported formats, in the order they are listed to users.
    pub const ALL: [Self; 2] = [Self::Png, Self::Svg];

    /// Returns the format name, which is also the output file extension.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }

    /// Returns the renderer flag selecting this format (`-tpng`, `-tsvg`).
    #[must_use]
    pub fn render_flag(self) -> String {
        format!("-t{}", self.as_str())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| ConfigError::validation("format", s, "expected one of png, svg"))
    }
}

/// A partial configuration layer.
///
/// Each present key replaces the same key of the layers below it; absent
/// keys leave them untouched. Unknown keys in a persisted document are
/// ignored. When a document sets both `java` and `interpreter` (or both
/// `plantuml` and `renderer`), the first name of the pair wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "LayerDocument")]
pub struct ConfigLayer {
    /// Pass the verbosity flag to the renderer.
    pub verbose: Option<bool>,

    /// Runtime used to execute the renderer.
    pub interpreter: Option<Utf8PathBuf>,

    /// Renderer artifact or executable.
    pub renderer: Option<Utf8PathBuf>,

    /// Root of the watched tree.
    pub watch_dir: Option<Utf8PathBuf>,

    /// Source file extension, without the leading dot.
    pub extension: Option<String>,

    /// Output directory.
    pub output_dir: Option<Utf8PathBuf>,

    /// Output format name.
    pub format: Option<String>,

    /// Watch subdirectories as well.
    pub recursive: Option<bool>,
}

/// The key set of a persisted document, before alternate names are folded.
#[derive(Deserialize, Default)]
#[serde(default)]
struct LayerDocument {
    verbose: Option<bool>,
    java: Option<Utf8PathBuf>,
    interpreter: Option<Utf8PathBuf>,
    plantuml: Option<Utf8PathBuf>,
    renderer: Option<Utf8PathBuf>,
    watchdir: Option<Utf8PathBuf>,
    extension: Option<String>,
    outputdir: Option<Utf8PathBuf>,
    format: Option<String>,
    recursive: Option<bool>,
}

impl From<LayerDocument> for ConfigLayer {
    fn from(document: LayerDocument) -> Self {
        Self {
            verbose: document.verbose,
            interpreter: document.java.or(document.interpreter),
            renderer: document.plantuml.or(document.renderer),
            watch_dir: document.watchdir,
            extension: document.extension,
            output_dir: document.outputdir,
            format: document.format,
            recursive: document.recursive,
        }
    }
}

impl ConfigLayer {
    /// Parses a layer from a JSON document.
    ///
    /// `path` is only used to name the file in the error.
    pub fn from_json(path: &Utf8Path, content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Returns `true` if the layer defines no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A complete, unvalidated set of configuration values.
///
/// The built-in defaults are a `ConfigValues`, and so is the result of
/// merging every layer over them. Serializes to the persisted document
/// format.
///
/// # Examples
///
/// ```
/// use pw_core::{ConfigLayer, ConfigValues};
/// use camino::Utf8Path;
///
/// let mut values = ConfigValues::defaults(Utf8Path::new("/work"));
/// values.apply(&ConfigLayer {
///     format: Some("svg".to_owned()),
///     ..ConfigLayer::default()
/// });
/// assert_eq!(values.format, "svg");
/// assert_eq!(values.extension, "pu");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValues {
    /// Pass the verbosity flag to the renderer.
    pub verbose: bool,

    /// Runtime used to execute the renderer.
    #[serde(rename = "java")]
    pub interpreter: Utf8PathBuf,

    /// Renderer artifact or executable.
    #[serde(rename = "plantuml")]
    pub renderer: Utf8PathBuf,

    /// Root of the watched tree.
    #[serde(rename = "watchdir")]
    pub watch_dir: Utf8PathBuf,

    /// Source file extension, without the leading dot.
    pub extension: String,

    /// Output directory.
    #[serde(rename = "outputdir")]
    pub output_dir: Utf8PathBuf,

    /// Output format name.
    pub format: String,

    /// Watch subdirectories as well.
    pub recursive: bool,
}

impl ConfigValues {
    /// Default interpreter.
    pub const DEFAULT_INTERPRETER: &'static str = "java";
    /// Default renderer.
    pub const DEFAULT_RENDERER: &'static str = "plantuml.jar";
    /// Default source extension.
    pub const DEFAULT_EXTENSION: &'static str = "pu";

    /// Returns the built-in defaults, watching and writing to `working_dir`.
    #[must_use]
    pub fn defaults(working_dir: &Utf8Path) -> Self {
        Self {
            verbose: false,
            interpreter: Utf8PathBuf::from(Self::DEFAULT_INTERPRETER),
            renderer: Utf8PathBuf::from(Self::DEFAULT_RENDERER),
            watch_dir: working_dir.to_owned(),
            extension: Self::DEFAULT_EXTENSION.to_owned(),
            output_dir: working_dir.to_owned(),
            format: OutputFormat::default().as_str().to_owned(),
            recursive: true,
        }
    }

    /// Overwrites every key that `layer` defines (shallow merge).
    pub fn apply(&mut self, layer: &ConfigLayer) {
        if let Some(verbose) = layer.verbose {
            self.verbose = verbose;
        }
        if let Some(interpreter) = &layer.interpreter {
            self.interpreter.clone_from(interpreter);
        }
        if let Some(renderer) = &layer.renderer {
            self.renderer.clone_from(renderer);
        }
        if let Some(watch_dir) = &layer.watch_dir {
            self.watch_dir.clone_from(watch_dir);
        }
        if let Some(extension) = &layer.extension {
            self.extension.clone_from(extension);
        }
        if let Some(output_dir) = &layer.output_dir {
            self.output_dir.clone_from(output_dir);
        }
        if let Some(format) = &layer.format {
            self.format.clone_from(format);
        }
        if let Some(recursive) = layer.recursive {
            self.recursive = recursive;
        }
    }

    /// Renders these values as a persisted configuration document.
    pub fn to_document(&self) -> Result<String, serde_json::Error> {
        let mut document = serde_json::to_string_pretty(self)?;
        document.push('\n');
        Ok(document)
    }
}

/// The resolved, validated settings for one watch session.
///
/// Produced by [`ConfigResolver::resolve`](crate::ConfigResolver::resolve).
/// Every field is always present; the directories and files it names
/// existed when it was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    /// Pass the verbosity flag to the renderer.
    pub verbose: bool,
    /// Runtime used to execute the renderer.
    pub interpreter: Utf8PathBuf,
    /// Renderer artifact or executable.
    pub renderer: Utf8PathBuf,
    /// Root of the watched tree.
    pub watch_dir: Utf8PathBuf,
    /// Source file extension, without the leading dot.
    pub extension: String,
    /// Output directory.
    pub output_dir: Utf8PathBuf,
    /// Output format.
    pub format: OutputFormat,
    /// Watch subdirectories as well.
    pub recursive: bool,
}

impl EffectiveConfig {
    /// Returns the suffix source files must end with, e.g. `.pu`.
    #[must_use]
    pub fn source_suffix(&self) -> String {
        format!(".{}", self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let values = ConfigValues::defaults(Utf8Path::new("/work"));
        assert!(!values.verbose);
        assert_eq!(values.interpreter, "java");
        assert_eq!(values.renderer, "plantuml.jar");
        assert_eq!(values.watch_dir, "/work");
        assert_eq!(values.output_dir, "/work");
        assert_eq!(values.extension, "pu");
        assert_eq!(values.format, "png");
        assert!(values.recursive);
    }

    #[test]
    fn test_apply_overwrites_only_present_keys() {
        let mut values = ConfigValues::defaults(Utf8Path::new("/work"));
        values.apply(&ConfigLayer {
            verbose: Some(true),
            watch_dir: Some(Utf8PathBuf::from("/diagrams")),
            ..ConfigLayer::default()
        });

        assert!(values.verbose);
        assert_eq!(values.watch_dir, "/diagrams");
        assert_eq!(values.output_dir, "/work");
        assert_eq!(values.renderer, "plantuml.jar");
    }

    #[test]
    fn test_layer_accepts_key_aliases() {
        let layer = ConfigLayer::from_json(
            Utf8Path::new("cfg"),
            r#"{"interpreter": "/usr/bin/java", "renderer": "/opt/plantuml.jar"}"#,
        )
        .unwrap();
        assert_eq!(layer.interpreter.as_deref(), Some(Utf8Path::new("/usr/bin/java")));
        assert_eq!(layer.renderer.as_deref(), Some(Utf8Path::new("/opt/plantuml.jar")));
    }

    #[test]
    fn test_layer_prefers_primary_key_over_alternate() {
        let layer = ConfigLayer::from_json(
            Utf8Path::new("cfg"),
            r#"{"java": "/usr/bin/java", "interpreter": "/opt/jdk/bin/java",
                "renderer": "/opt/other.jar", "plantuml": "/opt/plantuml.jar"}"#,
        )
        .unwrap();
        assert_eq!(layer.interpreter.as_deref(), Some(Utf8Path::new("/usr/bin/java")));
        assert_eq!(layer.renderer.as_deref(), Some(Utf8Path::new("/opt/plantuml.jar")));
    }

    #[test]
    fn test_layer_ignores_unknown_keys() {
        let layer = ConfigLayer::from_json(
            Utf8Path::new("cfg"),
            r#"{"format": "svg", "theme": "dark", "nested": {"a": 1}}"#,
        )
        .unwrap();
        assert_eq!(layer.format.as_deref(), Some("svg"));
        assert!(layer.verbose.is_none());
    }

    #[test]
    fn test_layer_rejects_malformed_document() {
        let err = ConfigLayer::from_json(Utf8Path::new("/tmp/.plantumlwatch"), "{ not json")
            .unwrap_err();
        assert!(err.is_parse());
        assert_eq!(err.path().map(|p| p.as_str()), Some("/tmp/.plantumlwatch"));
    }

    #[test]
    fn test_layer_rejects_wrong_value_type() {
        let err =
            ConfigLayer::from_json(Utf8Path::new("cfg"), r#"{"verbose": "yes"}"#).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_empty_layer() {
        assert!(ConfigLayer::default().is_empty());
        let layer = ConfigLayer::from_json(Utf8Path::new("cfg"), "{}").unwrap();
        assert!(layer.is_empty());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("svg".parse::<OutputFormat>().unwrap(), OutputFormat::Svg);

        let err = "PNG".parse::<OutputFormat>().unwrap_err();
        assert_eq!(err.field(), Some("format"));
        assert!(err.to_string().contains("'PNG'"));
    }

    #[test]
    fn test_output_format_flag() {
        assert_eq!(OutputFormat::Png.render_flag(), "-tpng");
        assert_eq!(OutputFormat::Svg.render_flag(), "-tsvg");
        assert_eq!(OutputFormat::Svg.to_string(), "svg");
    }

    #[test]
    fn test_document_round_trips_through_layer() {
        let values = ConfigValues::defaults(Utf8Path::new("/work"));
        let document = values.to_document().unwrap();
        assert!(document.contains(r#""java": "java""#));
        assert!(document.contains(r#""watchdir": "/work""#));

        let layer = ConfigLayer::from_json(Utf8Path::new("cfg"), &document).unwrap();
        let mut merged = ConfigValues::defaults(Utf8Path::new("/elsewhere"));
        merged.apply(&layer);
        assert_eq!(merged, values);
    }

    #[test]
    fn test_source_suffix() {
        let config = EffectiveConfig {
            verbose: false,
            interpreter: Utf8PathBuf::from("/usr/bin/java"),
            renderer: Utf8PathBuf::from("/opt/plantuml.jar"),
            watch_dir: Utf8PathBuf::from("/work"),
            extension: "puml".to_owned(),
            output_dir: Utf8PathBuf::from("/work"),
            format: OutputFormat::Svg,
            recursive: true,
        };
        assert_eq!(config.source_suffix(), ".puml");
    }
}
