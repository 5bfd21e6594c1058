/// Encoding profile presets
///
/// Renditions are described upstream by profile name only. The registry maps
/// those names to the resolution and framerate the transcoder used, so the
/// classifier request can carry pixel counts and frame rates.
use crate::config::types::{Result, VerifyError, VideoProfile};
use std::collections::BTreeMap;

/// Profile preset registry
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, VideoProfile>,
}

impl ProfileRegistry {
    /// Create registry with the standard broadcast ladder
    pub fn new() -> Self {
        let mut registry = Self {
            profiles: BTreeMap::new(),
        };

        registry.register(VideoProfile::new("P720p60fps16x9", "1280x720", 60));
        registry.register(VideoProfile::new("P720p30fps16x9", "1280x720", 30));
        registry.register(VideoProfile::new("P720p25fps16x9", "1280x720", 25));
        registry.register(VideoProfile::new("P720p30fps4x3", "960x720", 30));
        registry.register(VideoProfile::new("P576p30fps16x9", "1024x576", 30));
        registry.register(VideoProfile::new("P576p25fps16x9", "1024x576", 25));
        registry.register(VideoProfile::new("P360p30fps16x9", "640x360", 30));
        registry.register(VideoProfile::new("P360p25fps16x9", "640x360", 25));
        registry.register(VideoProfile::new("P360p30fps4x3", "480x360", 30));
        registry.register(VideoProfile::new("P240p30fps16x9", "426x240", 30));
        registry.register(VideoProfile::new("P240p25fps16x9", "426x240", 25));
        registry.register(VideoProfile::new("P240p30fps4x3", "320x240", 30));
        registry.register(VideoProfile::new("P144p30fps16x9", "256x144", 30));
        registry.register(VideoProfile::new("P144p25fps16x9", "256x144", 25));

        registry
    }

    /// Register (or replace) a profile
    pub fn register(&mut self, profile: VideoProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    /// Look up a profile by name
    pub fn get(&self, name: &str) -> Option<&VideoProfile> {
        self.profiles.get(name)
    }

    /// Look up a profile by name, failing with the list of valid names
    pub fn resolve(&self, name: &str) -> Result<VideoProfile> {
        self.get(name).cloned().ok_or_else(|| {
            VerifyError::InvalidEvidence(format!(
                "unknown profile '{}'; valid profiles are: {}",
                name,
                self.names().join(", ")
            ))
        })
    }

    /// All registered profile names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VideoProfile> {
        self.profiles.values()
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}
