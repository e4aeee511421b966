//! Renderer command construction.
//!
//! The invocation is an explicit argument list handed to the process
//! launcher; nothing is ever passed through a shell.
//!
//! ```text
//! <interpreter> [-jar] <renderer> [-v] -t<format> <source>
//! ```
//!
//! `-jar` is present when the renderer is a `.jar` archive.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use pw_core::{EffectiveConfig, OutputFormat};
use smallvec::SmallVec;

/// Renderer flag enabling verbose output.
pub const VERBOSE_FLAG: &str = "-v";

/// Interpreter flag loading an executable archive.
pub const JAR_FLAG: &str = "-jar";

/// One renderer invocation for one source file.
///
/// Built fresh per accepted event and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderInvocation {
    /// Program to execute.
    pub executable: Utf8PathBuf,
    /// Arguments, in order.
    pub arguments: SmallVec<[String; 6]>,
    /// The source file being rendered (also the last argument).
    pub source_file: Utf8PathBuf,
}

impl RenderInvocation {
    /// Builds the invocation rendering `source_file` under `config`.
    ///
    /// Deterministic and side-effect free.
    ///
    /// # Examples
    ///
    /// ```
    /// use pw_core::{EffectiveConfig, OutputFormat};
    /// use pw_watcher::RenderInvocation;
    /// use camino::{Utf8Path, Utf8PathBuf};
    ///
    /// let config = EffectiveConfig {
    ///     verbose: false,
    ///     interpreter: Utf8PathBuf::from("/usr/bin/java"),
    ///     renderer: Utf8PathBuf::from("/opt/plantuml.jar"),
    ///     watch_dir: Utf8PathBuf::from("/work"),
    ///     extension: "pu".to_owned(),
    ///     output_dir: Utf8PathBuf::from("/work"),
    ///     format: OutputFormat::Svg,
    ///     recursive: true,
    /// };
    ///
    /// let invocation = RenderInvocation::build(&config, Utf8Path::new("/work/seq.pu"));
    /// assert_eq!(
    ///     invocation.to_string(),
    ///     "/usr/bin/java -jar /opt/plantuml.jar -tsvg /work/seq.pu"
    /// );
    /// ```
    #[must_use]
    pub fn build(config: &EffectiveConfig, source_file: &Utf8Path) -> Self {
        let mut arguments = SmallVec::new();

        if is_archive(&config.renderer) {
            arguments.push(JAR_FLAG.to_owned());
        }
        arguments.push(config.renderer.to_string());
        if config.verbose {
            arguments.push(VERBOSE_FLAG.to_owned());
        }
        arguments.push(config.format.render_flag());
        arguments.push(source_file.to_string());

        Self {
            executable: config.interpreter.clone(),
            arguments,
            source_file: source_file.to_owned(),
        }
    }
}

impl fmt::Display for RenderInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable.as_str())?;
        for argument in &self.arguments {
            write!(f, " {argument}")?;
        }
        Ok(())
    }
}

fn is_archive(renderer: &Utf8Path) -> bool {
    renderer
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
}

/// Returns the file the renderer is expected to produce for `source_file`.
///
/// Only the trailing `"." + extension` is replaced; earlier occurrences of
/// the same text in the path are kept. A path without that suffix gets the
/// format extension appended.
///
/// # Examples
///
/// ```
/// use pw_core::OutputFormat;
/// use pw_watcher::command::output_path;
/// use camino::Utf8Path;
///
/// let out = output_path(Utf8Path::new("a.pu/b.pu"), "pu", OutputFormat::Png);
/// assert_eq!(out.as_str(), "a.pu/b.png");
/// ```
#[must_use]
pub fn output_path(source_file: &Utf8Path, extension: &str, format: OutputFormat) -> Utf8PathBuf {
    let source = source_file.as_str();
    let stem = source
        .strip_suffix(extension)
        .and_then(|rest| rest.strip_suffix('.'))
        .unwrap_or(source);
    Utf8PathBuf::from(format!("{stem}.{}", format.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(verbose: bool, renderer: &str) -> EffectiveConfig {
        EffectiveConfig {
            verbose,
            interpreter: Utf8PathBuf::from("/usr/bin/java"),
            renderer: Utf8PathBuf::from(renderer),
            watch_dir: Utf8PathBuf::from("/work"),
            extension: "pu".to_owned(),
            output_dir: Utf8PathBuf::from("/work"),
            format: OutputFormat::Png,
            recursive: true,
        }
    }

    #[test]
    fn test_build_jar_renderer() {
        let invocation =
            RenderInvocation::build(&config(false, "/opt/plantuml.jar"), Utf8Path::new("d.pu"));

        assert_eq!(invocation.executable, "/usr/bin/java");
        assert_eq!(
            invocation.arguments.as_slice(),
            ["-jar", "/opt/plantuml.jar", "-tpng", "d.pu"]
        );
        assert_eq!(invocation.source_file, "d.pu");
    }

    #[test]
    fn test_build_non_jar_renderer() {
        let invocation =
            RenderInvocation::build(&config(false, "/opt/render.py"), Utf8Path::new("d.pu"));
        assert_eq!(invocation.arguments.as_slice(), ["/opt/render.py", "-tpng", "d.pu"]);
    }

    #[test]
    fn test_verbose_flag_toggles() {
        let quiet = RenderInvocation::build(&config(false, "p.jar"), Utf8Path::new("d.pu"));
        let verbose = RenderInvocation::build(&config(true, "p.jar"), Utf8Path::new("d.pu"));

        assert!(!quiet.arguments.iter().any(|a| a == VERBOSE_FLAG));
        assert_eq!(verbose.arguments.as_slice(), ["-jar", "p.jar", "-v", "-tpng", "d.pu"]);
    }

    #[test]
    fn test_source_is_last_argument() {
        let invocation =
            RenderInvocation::build(&config(true, "p.jar"), Utf8Path::new("dir with space/d.pu"));
        assert_eq!(invocation.arguments.last().map(String::as_str), Some("dir with space/d.pu"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let config = config(true, "/opt/plantuml.jar");
        let source = Utf8Path::new("/work/seq.pu");
        assert_eq!(
            RenderInvocation::build(&config, source),
            RenderInvocation::build(&config, source)
        );
    }

    #[test]
    fn test_display() {
        let invocation =
            RenderInvocation::build(&config(true, "/opt/plantuml.jar"), Utf8Path::new("d.pu"));
        insta::assert_snapshot!(
            invocation.to_string(),
            @"/usr/bin/java -jar /opt/plantuml.jar -v -tpng d.pu"
        );
    }

    #[test]
    fn test_output_path_replaces_trailing_extension_only() {
        assert_eq!(
            output_path(Utf8Path::new("diagram.pu"), "pu", OutputFormat::Png),
            "diagram.png"
        );
        assert_eq!(
            output_path(Utf8Path::new("/x.pu/y.pu.d/diagram.pu"), "pu", OutputFormat::Svg),
            "/x.pu/y.pu.d/diagram.svg"
        );
        assert_eq!(
            output_path(Utf8Path::new("pu.pu"), "pu", OutputFormat::Png),
            "pu.png"
        );
    }

    #[test]
    fn test_output_path_without_suffix_appends() {
        assert_eq!(
            output_path(Utf8Path::new("notes.txt"), "pu", OutputFormat::Png),
            "notes.txt.png"
        );
    }
}
