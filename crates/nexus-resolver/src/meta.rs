//! `UpstreamMeta`: the normalized shape every ecosystem's metadata fetch
//! narrows down to. Narrow with small, local decoders; never carry an
//! untyped bag through the core.

use serde_json::Value;

/// Published-version metadata for one package, normalized across ecosystems.
#[derive(Debug, Clone)]
pub struct UpstreamMeta {
    /// Every published version string, in no particular order.
    pub versions: Vec<String>,
    /// The ecosystem's "default" tag/version, if it has one (npm/JSR
    /// `dist-tags.latest`, cdnjs `version`, jsDelivr's newest GitHub tag).
    pub latest: Option<String>,
    /// The raw metadata payload, kept around so request handlers can pull
    /// ecosystem-specific fields (npm `browser`/`main`/`module`, JSR
    /// `exports`, cdnjs `filename`) without a second fetch.
    pub raw: Value,
}
