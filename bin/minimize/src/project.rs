use std::{
    io,
    path::{Path, PathBuf},
};

use minimize::BoxError;
use serde::Deserialize;

/// The loaded project with all paths made absolute.
pub struct Configuration {
    pub settings: Settings,
    pub entries: Vec<Entry>,
}

impl Configuration {
    pub fn load(project: Option<&Path>) -> Result<Self, BoxError> {
        let default_cfg = || PathBuf::from("./Minimize.toml");
        let base = project.map(Path::to_path_buf).unwrap_or_else(default_cfg);

        let contents = std::fs::read_to_string(&base)?;
        let dir = base
            .parent()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;

        Self::from_toml(&contents, dir)
    }

    pub fn from_toml(contents: &str, dir: &Path) -> Result<Self, BoxError> {
        let Project {
            minimize: settings,
            mut entries,
        } = toml::from_str(contents)?;

        for entry in &mut entries {
            entry.absolute_paths(dir);
        }

        Ok(Configuration { settings, entries })
    }
}

#[derive(Deserialize)]
pub struct Project {
    #[serde(default)]
    pub minimize: Settings,
    #[serde(rename = "entry", default)]
    pub entries: Vec<Entry>,
}

/// The `[minimize]` table.
#[derive(Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub disabled: bool,
    /// Forwarded to the minifier, merged over its defaults.
    #[serde(default)]
    pub options: serde_json::Value,
}

#[derive(Deserialize)]
pub struct Entry {
    pub input: PathBuf,
    #[serde(rename = "output")]
    pub outputs: Vec<Output>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Output {
    pub file: PathBuf,
    pub banner: Option<String>,
    /// Read when the chunk is rendered, in place of `banner`.
    pub banner_file: Option<PathBuf>,
    pub footer: Option<String>,
    #[serde(default, deserialize_with = "SourcemapSetting::deserialize")]
    pub sourcemap: Sourcemap,
    #[serde(default = "minimize_by_default")]
    pub minimize: bool,
}

fn minimize_by_default() -> bool {
    true
}

impl Entry {
    pub fn absolute_paths(&mut self, base: &Path) {
        self.input = base.join(&self.input);
        for output in &mut self.outputs {
            output.file = base.join(&output.file);
            if let Some(banner) = &mut output.banner_file {
                *banner = base.join(&banner);
            }
        }
    }

    /// The chunk name, the input's file stem.
    pub fn name(&self) -> String {
        self.input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Sourcemap {
    #[default]
    Off,
    /// A `.map` file next to the output, referenced from the code.
    File,
    /// A `.map` file without a reference.
    Hidden,
    /// A base64 data URL at the end of the code.
    Inline,
}

impl Sourcemap {
    pub fn requested(self) -> bool {
        self != Sourcemap::Off
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SourcemapSetting {
    Enabled(bool),
    Mode(SourcemapMode),
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
enum SourcemapMode {
    Inline,
    Hidden,
}

impl SourcemapSetting {
    fn deserialize<'de, D: serde::de::Deserializer<'de>>(de: D) -> Result<Sourcemap, D::Error> {
        deserialize_into::<D, Sourcemap, Self>(de)
    }
}

impl From<SourcemapSetting> for Sourcemap {
    fn from(value: SourcemapSetting) -> Self {
        match value {
            SourcemapSetting::Enabled(false) => Sourcemap::Off,
            SourcemapSetting::Enabled(true) => Sourcemap::File,
            SourcemapSetting::Mode(SourcemapMode::Inline) => Sourcemap::Inline,
            SourcemapSetting::Mode(SourcemapMode::Hidden) => Sourcemap::Hidden,
        }
    }
}

fn deserialize_into<'de, D, A, B>(de: D) -> Result<A, D::Error>
where
    D: serde::de::Deserializer<'de>,
    B: serde::Deserialize<'de>,
    A: From<B>,
{
    B::deserialize(de).map(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PROJECT: &str = r#"
[minimize]
disabled = false

[minimize.options]
compress = { drop_console = false }

[[entry]]
input = "src/index.js"

[[entry.output]]
file = "dist/index.min.js"
banner = "/*! demo v1.0.0 | MIT licensed */"
sourcemap = true

[[entry.output]]
file = "dist/index.js"
banner-file = "BANNER.txt"
sourcemap = "inline"
minimize = false
"#;

    #[test]
    fn project_file_is_read() {
        let config = Configuration::from_toml(PROJECT, Path::new("/work")).unwrap();

        assert!(!config.settings.disabled);
        assert_eq!(
            config.settings.options,
            json!({ "compress": { "drop_console": false } })
        );

        let [entry] = &config.entries[..] else {
            panic!("expected a single entry");
        };
        assert_eq!(entry.input, Path::new("/work/src/index.js"));
        assert_eq!(entry.name(), "index");

        let [min, plain] = &entry.outputs[..] else {
            panic!("expected two outputs");
        };
        assert_eq!(min.file, Path::new("/work/dist/index.min.js"));
        assert_eq!(min.sourcemap, Sourcemap::File);
        assert!(min.minimize);
        assert_eq!(min.footer, None);

        assert_eq!(plain.banner_file.as_deref(), Some(Path::new("/work/BANNER.txt")));
        assert_eq!(plain.sourcemap, Sourcemap::Inline);
        assert!(!plain.minimize);
    }

    #[test]
    fn defaults_apply_to_sparse_projects() {
        let config = Configuration::from_toml(
            "[[entry]]\ninput = \"a.js\"\n[[entry.output]]\nfile = \"a.min.js\"\n",
            Path::new("/work"),
        )
        .unwrap();

        assert!(!config.settings.disabled);
        assert!(config.settings.options.is_null());
        assert_eq!(config.entries[0].outputs[0].sourcemap, Sourcemap::Off);
    }

    #[test]
    fn unknown_sourcemap_mode_is_rejected() {
        let result = Configuration::from_toml(
            "[[entry]]\ninput = \"a.js\"\n[[entry.output]]\nfile = \"b.js\"\nsourcemap = \"eval\"\n",
            Path::new("/work"),
        );

        assert!(result.is_err());
    }
}
