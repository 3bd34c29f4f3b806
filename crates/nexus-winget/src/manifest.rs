//! Small, local decoders over WinGet manifest YAML: treat upstream payloads
//! as schemaless and narrow at the surface rather than carrying an untyped
//! bag through the core.

use nexus_core::NexusError;
use serde_yaml::Value;

/// One parsed manifest file, narrowed only to the fields request handlers
/// actually branch on. `ManifestKind` is inferred from the filename suffix:
/// a single version/locale/installer manifest document.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub kind: ManifestKind,
    raw: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Version,
    Locale,
    Installer,
}

impl ManifestKind {
    /// Infer from a manifest file's name, e.g. `Microsoft.VisualStudioCode.yaml`
    /// (version), `....locale.en-US.yaml` (locale), `....installer.yaml` (installer).
    #[must_use]
    pub fn from_filename(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains(".installer.") {
            Self::Installer
        } else if lower.contains(".locale.") {
            Self::Locale
        } else {
            Self::Version
        }
    }
}

impl Manifest {
    /// Parse raw YAML bytes into a [`Manifest`] tagged by `filename`'s kind.
    ///
    /// # Errors
    /// [`NexusError::InvalidManifest`] if `bytes` is not valid YAML.
    pub fn parse(filename: &str, bytes: &[u8]) -> Result<Self, NexusError> {
        let raw: Value = serde_yaml::from_slice(bytes).map_err(|e| {
            NexusError::InvalidManifest(serde_json::Error::io(std::io::Error::other(e.to_string())))
        })?;
        Ok(Self {
            kind: ManifestKind::from_filename(filename),
            raw,
        })
    }

    #[must_use]
    pub fn package_identifier(&self) -> Option<&str> {
        self.str_field("PackageIdentifier")
    }

    #[must_use]
    pub fn package_version(&self) -> Option<&str> {
        self.str_field("PackageVersion")
    }

    /// `DefaultLocale`: present only on version manifests.
    #[must_use]
    pub fn default_locale(&self) -> Option<&str> {
        self.str_field("DefaultLocale")
    }

    /// `Channel`: optionally present on version manifests.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.str_field("Channel")
    }

    /// `Installers`: present only on installer manifests, as a sequence.
    #[must_use]
    pub fn installers(&self) -> Vec<&Value> {
        self.raw
            .get("Installers")
            .and_then(Value::as_sequence)
            .map(|seq| seq.iter().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }
}
