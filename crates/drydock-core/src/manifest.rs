//! Versioned precache manifest
//!
//! The manifest is the static, ordered list of resource locations to store
//! proactively at install time. Changing the list requires advancing the
//! generation name; no generation is ever reused.

use url::Url;

/// Classification of a manifest entry by its location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryClass {
    /// Origin-relative path; precache is required-best-effort
    Local,
    /// Absolute URL on another host; precache is optional
    Remote,
}

/// One manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub location: String,
    pub class: EntryClass,
}

impl ManifestEntry {
    /// Classify a location by whether it carries a network scheme
    pub fn new(location: impl Into<String>) -> Self {
        let location = location.into();
        let class = if location.starts_with("http://") || location.starts_with("https://") {
            EntryClass::Remote
        } else {
            EntryClass::Local
        };
        Self { location, class }
    }

    /// Resolve this entry to the absolute URL to fetch.
    ///
    /// Local entries resolve against the application origin; remote entries
    /// are already absolute.
    pub fn resolve(&self, origin: &Url) -> Result<Url, url::ParseError> {
        match self.class {
            EntryClass::Local => origin.join(&self.location),
            EntryClass::Remote => Url::parse(&self.location),
        }
    }
}

/// The versioned precache manifest for one generation
#[derive(Debug, Clone)]
pub struct Manifest {
    pub generation: String,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(
        generation: impl Into<String>,
        locations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            generation: generation.into(),
            entries: locations.into_iter().map(ManifestEntry::new).collect(),
        }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// The entries to populate at install time.
    ///
    /// Remote entries are included only when `include_remote` is set;
    /// whether cross-origin resources are precached at all is deployment
    /// configuration, not controller behavior.
    pub fn precache_targets(&self, include_remote: bool) -> impl Iterator<Item = &ManifestEntry> {
        self.entries
            .iter()
            .filter(move |e| include_remote || e.class == EntryClass::Local)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
