//! User-Agent composition.
//!
//! Produces the fixed shape
//! `Meteor/<version> OS/<platform> (<type>; <release>; <arch>;)`.

use crate::config::{HostInfo, ReleaseContext};

/// Version component when no usable version can be resolved.
pub const CHECKOUT: &str = "checkout";

/// Placeholder release value meaning "no version here, keep looking".
const NONE_VERSION: &str = "none";

/// Compose the User-Agent string. Pure; identical inputs yield identical
/// output.
pub fn compose(
    host: &HostInfo,
    release: Option<&ReleaseContext>,
    tools_version: Option<&str>,
) -> String {
    format!(
        "Meteor/{} OS/{} ({}; {}; {};)",
        resolve_version(release, tools_version),
        host.platform,
        host.os_type,
        host.os_release,
        host.arch,
    )
}

fn resolve_version(release: Option<&ReleaseContext>, tools_version: Option<&str>) -> String {
    let Some(release) = release else {
        // No release context: the tool's own version, or the sentinel when
        // the local lookup failed.
        return tools_version.unwrap_or(CHECKOUT).to_string();
    };

    if release.release_version != NONE_VERSION {
        release.release_version.clone()
    } else if release.app_release_version != NONE_VERSION {
        release.app_release_version.clone()
    } else {
        CHECKOUT.to_string()
    }
}
