use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{TunnelError, TunnelResult};

/// Name of the helper binary as installed into the user-data `bin/` folder and as searched for
/// on `PATH`, without a platform-specific extension.
const HELPER_BIN_STEM: &str = "gproxy-tunnel-helper";

/// Where the helper release assets are published; the `{platform}` segment is filled in by
/// `release_asset_name`.
const HELPER_RELEASE_BASE_URL: &str = "https://dl.gproxy.leenhawk.com/tunnel-helper";

fn helper_exe_name() -> &'static str {
    if cfg!(windows) {
        "gproxy-tunnel-helper.exe"
    } else {
        HELPER_BIN_STEM
    }
}

/// Platform-qualified name of the release asset the helper is downloaded as.
fn release_asset_name() -> TunnelResult<&'static str> {
    if cfg!(target_os = "macos") {
        Ok("gproxy-tunnel-helper-macos.tar.gz")
    } else if cfg!(windows) {
        Ok("gproxy-tunnel-helper-windows.exe")
    } else if cfg!(target_os = "linux") {
        Ok("gproxy-tunnel-helper-linux")
    } else {
        Err(TunnelError::UnsupportedPlatform)
    }
}

/// Searches, in order, the app's bundled resources directory, the user-data `bin/` folder, and
/// the system `PATH` for the helper binary. Returns the first hit.
pub fn locate_helper(bundled_resources_dir: Option<&Path>, data_dir: &Path) -> Option<PathBuf> {
    let exe_name = helper_exe_name();

    if let Some(bundled) = bundled_resources_dir {
        let candidate = bundled.join(exe_name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    let in_data_dir = bin_dir(data_dir).join(exe_name);
    if in_data_dir.is_file() {
        return Some(in_data_dir);
    }

    which_on_path(exe_name)
}

fn bin_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("bin")
}

fn which_on_path(exe_name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(exe_name))
        .find(|candidate| candidate.is_file())
}

/// Downloads the platform-appropriate helper release into `data_dir/bin`, extracting it if the
/// asset is an archive, and marks it executable. Returns the installed path.
pub async fn download_helper(client: &wreq::Client, data_dir: &Path) -> TunnelResult<PathBuf> {
    let asset_name = release_asset_name()?;
    let url = format!("{HELPER_RELEASE_BASE_URL}/{asset_name}");

    let resp = client
        .get(&url)
        .header("accept", "application/octet-stream")
        .header("user-agent", concat!("gproxy-tunnel/", env!("CARGO_PKG_VERSION")))
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(TunnelError::ApiStatus(
            resp.status().as_u16(),
            format!("downloading tunnel helper asset {asset_name}"),
        ));
    }
    let bytes = resp.bytes().await?;

    let bin_dir = bin_dir(data_dir);
    std::fs::create_dir_all(&bin_dir)?;
    let dest = bin_dir.join(helper_exe_name());

    let binary = if asset_name.ends_with(".tar.gz") {
        extract_binary_from_tar_gz(&bytes)?
    } else {
        bytes.to_vec()
    };

    let temp = temp_install_path(&bin_dir);
    std::fs::write(&temp, &binary)?;
    make_executable(&temp)?;
    std::fs::rename(&temp, &dest)?;

    Ok(dest)
}

fn extract_binary_from_tar_gz(bytes: &[u8]) -> TunnelResult<Vec<u8>> {
    let decoder = flate2::read::GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_path_buf();
        let is_helper = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name == HELPER_BIN_STEM)
            .unwrap_or(false);
        if is_helper {
            let mut out = Vec::new();
            entry.read_to_end(&mut out)?;
            return Ok(out);
        }
    }
    Err(TunnelError::Other(format!(
        "tar.gz archive did not contain a {HELPER_BIN_STEM} entry"
    )))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> TunnelResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> TunnelResult<()> {
    Ok(())
}

fn temp_install_path(bin_dir: &Path) -> PathBuf {
    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    bin_dir.join(format!(".gproxy-tunnel-helper-{pid}-{nanos}.new"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_helper_finds_nothing_when_absent() {
        let dir = std::env::temp_dir().join(format!("gproxy-tunnel-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        assert!(locate_helper(None, &dir).is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn locate_helper_prefers_bundled_over_data_dir() {
        let root = std::env::temp_dir().join(format!("gproxy-tunnel-test-bundled-{}", std::process::id()));
        let bundled = root.join("bundled");
        let data_dir = root.join("data");
        std::fs::create_dir_all(&bundled).unwrap();
        std::fs::create_dir_all(bin_dir(&data_dir)).unwrap();
        std::fs::write(bundled.join(helper_exe_name()), b"bundled").unwrap();
        std::fs::write(bin_dir(&data_dir).join(helper_exe_name()), b"installed").unwrap();

        let found = locate_helper(Some(&bundled), &data_dir).unwrap();
        assert_eq!(found, bundled.join(helper_exe_name()));
        let _ = std::fs::remove_dir_all(&root);
    }
}
