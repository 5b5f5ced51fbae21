//! Turns a loaded `Ini` document into a validated [`ConfigFile`].
//!
//! This is the single place where INI key names are mapped to struct fields.
//! Values are checked for type and range here; the URL template itself is
//! validated when the tile server is built.

use std::path::PathBuf;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::coord::MAX_ZOOM;
use crate::provider::ImageType;

fn invalid_value(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_zoom(section: &str, key: &str, value: &str) -> Result<u8, ConfigFileError> {
    match value.trim().parse::<u8>() {
        Ok(zoom) if zoom <= MAX_ZOOM => Ok(zoom),
        _ => Err(invalid_value(
            section,
            key,
            value,
            &format!("must be an integer between 0 and {}", MAX_ZOOM),
        )),
    }
}

fn parse_positive<T>(section: &str, key: &str, value: &str, reason: &str) -> Result<T, ConfigFileError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(invalid_value(section, key, value, reason)),
    }
}

/// Overlays the recognised keys of `ini` onto the defaults.
///
/// Unknown sections and keys are ignored.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [tileserver] section
    if let Some(section) = ini.section(Some("tileserver")) {
        if let Some(v) = section.get("name") {
            let v = v.trim();
            if !v.is_empty() {
                config.tileserver.name = v.to_string();
            }
        }
        if let Some(v) = section.get("url") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid_value(
                    "tileserver",
                    "url",
                    v,
                    "must be a URL template containing {z}, {x} and {y}",
                ));
            }
            config.tileserver.url = v.to_string();
        }
        if let Some(v) = section.get("zmin") {
            config.tileserver.min_zoom = parse_zoom("tileserver", "zmin", v)?;
        }
        if let Some(v) = section.get("zmax") {
            config.tileserver.max_zoom = parse_zoom("tileserver", "zmax", v)?;
        }
        if config.tileserver.min_zoom > config.tileserver.max_zoom {
            return Err(invalid_value(
                "tileserver",
                "zmin",
                &config.tileserver.min_zoom.to_string(),
                "must not be greater than zmax",
            ));
        }
        if let Some(v) = section.get("parallel") {
            config.tileserver.parallel =
                parse_positive("tileserver", "parallel", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("image_type") {
            config.tileserver.image_type = v
                .parse::<ImageType>()
                .map_err(|_| invalid_value("tileserver", "image_type", v, "must be 'png' or 'jpeg'"))?;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("location") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.location = expand_tilde(v);
            }
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("backlog") {
            config.download.backlog =
                parse_positive("download", "backlog", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("timeout") {
            config.download.timeout = parse_positive(
                "download",
                "timeout",
                v,
                "must be a positive integer (seconds)",
            )?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

/// Expands a leading `~/` to the user's home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
