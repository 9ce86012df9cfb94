// src/client/mod.rs

//! Client runtime: list, resolve, install, uninstall, patch
//!
//! One [`Client`] drives the whole pipeline against a configured
//! repository: fetch the channel index, resolve requests to concrete
//! versions, download and verify archives, extract, merge components into
//! the prefix, patch relocation metadata and run post-install hooks.

pub mod build_order;
pub mod config;
pub mod http;
pub mod patcher;
pub mod registry;
pub mod resolver;
pub mod srcinfo;
pub mod xcompile;

use crate::arch::{is_arch_dependent_lib, map_arch_str, Arch, INDEP_LIBDIR, SHARE_DIR};
use crate::components::{is_optional_component, postinst_path, INSTALL_COMPONENTS};
use crate::error::{Error, Result};
use crate::filesystem::copy_dir_contents;
use crate::fingerprint::{is_pkg_path, Fingerprint};
use crate::hash::{file_matches_sha256, verify_file_sha256};
use crate::manifest::{load_sdk_info, Index, IndexEntry};
use config::Config;
use http::{join_url, HttpTransport, Transport};
use patcher::patch_lib_files;
use registry::Registry;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::warn;

/// Client runtime state: configuration plus cache, registry and transport
pub struct Client {
    pub config: Config,
    cache_dir: PathBuf,
    registry_path: PathBuf,
    transport: Box<dyn Transport>,
}

impl Client {
    /// Construct a client with the default cache/registry paths under the
    /// configuration directory and an HTTP transport.
    pub fn new(config: Config) -> Result<Self> {
        let cache_dir = config::cache_dir();
        fs::create_dir_all(&cache_dir)
            .map_err(|e| Error::Filesystem(format!("create {}: {e}", cache_dir.display())))?;
        Ok(Self {
            config,
            cache_dir,
            registry_path: config::registry_path(),
            transport: Box::new(HttpTransport::new()?),
        })
    }

    /// Construct a client over an explicit transport and state paths.
    pub fn with_transport(
        config: Config,
        transport: Box<dyn Transport>,
        cache_dir: PathBuf,
        registry_path: PathBuf,
    ) -> Self {
        Self {
            config,
            cache_dir,
            registry_path,
            transport,
        }
    }

    /// Fetch and parse the channel index, probing the current and the
    /// legacy repository layouts in that order.
    pub fn load_index(&self) -> Result<Index> {
        if self.config.root_url.is_empty() {
            return Err(Error::Config("repo URL not configured".to_string()));
        }
        let root = self.config.root_url.trim_end_matches('/');
        let channel = &self.config.channel;
        let urls = [
            format!("{root}/channels/{channel}/index.json"),
            format!("{root}/repo/channels/{channel}/index.json"),
        ];

        let mut last_err: Option<Error> = None;
        for url in &urls {
            match self.transport.fetch(url) {
                Ok(bytes) => {
                    return serde_json::from_slice(&bytes).map_err(|e| {
                        Error::InvalidInput(format!("malformed index at {url}: {e}"))
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(Error::Transport(format!(
            "failed to fetch index.json: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// List packages available for `arch`, newest version per name
    pub fn list_packages(&self, arch: &str) -> Result<()> {
        let index = self.load_index()?;

        let mut by_name: BTreeMap<&str, Vec<&IndexEntry>> = BTreeMap::new();
        for entry in index.packages.iter().filter(|e| e.arch == arch) {
            by_name.entry(&entry.name).or_default().push(entry);
        }
        if by_name.is_empty() {
            println!("no packages for {arch}");
            return Ok(());
        }

        for list in by_name.values_mut() {
            sort_semver_desc(list);
        }
        for list in by_name.values() {
            let latest = list[0];
            println!(
                "{}\t{}\tAPI: {}\t{}",
                latest.name, latest.version, latest.ohos_api, latest.url
            );
        }
        Ok(())
    }

    /// Resolve requested names/constraints for `arch` against the channel
    /// index and the local SDK's API version.
    pub fn resolve_dependencies(
        &self,
        requested: &[String],
        arch: &str,
    ) -> Result<BTreeMap<String, IndexEntry>> {
        let index = self.load_index()?;
        let sdk = load_sdk_info(&self.config.ohos_sdk)?;
        resolver::resolve(&index, requested, arch, &sdk.api_version)
    }

    /// Install into the SDK sysroot (`<sdk>/native/sysroot/usr`)
    pub fn install_to_sdk(&self, requests: &[String], no_confirm: bool) -> Result<()> {
        if self.config.ohos_sdk.as_os_str().is_empty() {
            return Err(Error::Config("SDK path not configured".to_string()));
        }
        let prefix = self.config.ohos_sdk.join("native/sysroot/usr");
        if !prefix.is_dir() {
            return Err(Error::Config(format!(
                "invalid SDK directory tree: directory '{}' not found",
                prefix.display()
            )));
        }
        self.install_impl(requests, &prefix, no_confirm, true)
    }

    /// Install into an explicit absolute prefix
    pub fn install(&self, requests: &[String], prefix: &Path, no_confirm: bool) -> Result<()> {
        self.install_impl(requests, prefix, no_confirm, false)
    }

    fn install_impl(
        &self,
        requests: &[String],
        prefix: &Path,
        no_confirm: bool,
        to_sdk: bool,
    ) -> Result<()> {
        let sdk = load_sdk_info(&self.config.ohos_sdk)?;
        if self.config.root_url.is_empty() {
            return Err(Error::Config("repo URL not configured".to_string()));
        }
        if requests.is_empty() {
            return Err(Error::InvalidInput("empty install list".to_string()));
        }

        // classify requests: a local .pkg path pins "name == version" and
        // remembers the file; a bare name targets the default architecture
        let mut batch_arch = String::new();
        let mut local_paths: HashMap<String, PathBuf> = HashMap::new();
        let mut specs: Vec<String> = Vec::new();

        for request in requests {
            let (spec, arch) = if is_pkg_path(request) {
                let fp = Fingerprint::parse_from_path(request)?;
                if fp.api != sdk.api_version {
                    return Err(Error::InvalidInput(format!(
                        "API version mismatch with the local SDK: '{}' vs '{}'",
                        fp.api, sdk.api_version
                    )));
                }
                let arch = map_arch_str(&fp.arch)?;
                local_paths.insert(fp.name.clone(), PathBuf::from(request));
                (format!("{} == {}", fp.name, fp.version), arch)
            } else {
                (request.clone(), map_arch_str(&config::default_arch(&self.config))?)
            };

            if batch_arch.is_empty() {
                batch_arch = arch;
            } else if arch != batch_arch {
                return Err(Error::InvalidInput(format!(
                    "different archs in one installation: '{arch}' vs '{batch_arch}'"
                )));
            }
            specs.push(spec);
        }

        println!("Resolving dependencies...");
        let index = self.load_index()?;
        let chosen = resolver::resolve(&index, &specs, &batch_arch, &sdk.api_version)?;

        if !no_confirm {
            println!("About to install ({batch_arch}, API {}):", sdk.api_version);
            for (name, entry) in &chosen {
                println!(" - {name} ({})", entry.version);
            }
            println!("--------------------------");
            println!("Install prefix: {}", prefix.display());
            println!("--------------------------");
            if !confirm("Installation is irreversible. Check the prefix before proceeding. (y/[n]) ")? {
                println!("Installation aborted.");
                return Ok(());
            }
        }

        let registry = if to_sdk {
            None
        } else {
            Some(Registry::open(&self.registry_path)?)
        };

        for (name, entry) in &chosen {
            println!("Preparing {name} {}", entry.version);

            let pkg_path = match local_paths.get(name) {
                Some(path) => {
                    println!(" - using local file: {}", path.display());
                    path.clone()
                }
                None => self.download(entry)?,
            };

            println!("Extracting {name} {}", entry.version);
            let tmp_dir = self.extract_and_merge(&pkg_path, name, &entry.version, prefix)?;

            println!("Patching libraries of package '{name}'");
            let arch = Arch::parse(&entry.arch)?;
            let arch_libdir = prefix.join(arch.dep_libdir());
            patch_lib_files(&arch_libdir, &arch_libdir, prefix)?;

            let share_dir = prefix.join(SHARE_DIR);
            if share_dir.is_dir() {
                patch_lib_files(&share_dir, &share_dir, prefix)?;
            }

            if has_arch_dep_lib_in_indep_dir(prefix)? {
                warn!(
                    "arch-dependent libraries are installed under the arch-independent \
                     library directory; this may break the SDK when mixing architectures"
                );
                let indep_libdir = prefix.join(INDEP_LIBDIR);
                patch_lib_files(&indep_libdir, &indep_libdir, prefix)?;
            }

            if let Some(script) = postinst_path(&tmp_dir) {
                println!("Executing post-installation script...");
                run_postinst(&script, prefix)?;
            }

            println!("Cleaning temporary files...");
            let _ = fs::remove_dir_all(&tmp_dir);

            if let Some(registry) = &registry {
                registry.insert(name, &entry.version, &entry.arch, prefix, &prefix.join(name))?;
            }

            println!("Installed {name} {} -> {}\n", entry.version, prefix.display());
        }

        println!("\nFinished installation: {} packages installed\n", chosen.len());
        Ok(())
    }

    /// Fetch an archive into the cache, re-downloading once when a cached
    /// copy fails its checksum. Returns the verified archive path.
    fn download(&self, entry: &IndexEntry) -> Result<PathBuf> {
        let url = join_url(&self.config.root_url, &entry.url);
        let basename = entry.url.rsplit('/').next().unwrap_or(&entry.url);
        let dest = self.cache_dir.join(basename);

        let mut should_download = !dest.exists();
        if !should_download && !file_matches_sha256(&dest, &entry.sha256)? {
            println!("cached archive for '{}' failed its checksum; re-downloading", entry.name);
            if let Err(e) = fs::remove_file(&dest) {
                warn!("failed to remove stale cache entry {}: {e}", dest.display());
            }
            should_download = true;
        }

        if should_download {
            println!(" - downloading {url}");
            self.transport.download(&url, &dest)?;
        }

        verify_file_sha256(&dest, &entry.sha256)?;
        Ok(dest)
    }

    /// Extract the archive under `<prefix>/.<name>-<version>.tmp` and merge
    /// its components into the prefix. Returns the tmp directory, which the
    /// caller removes after the post-install hook.
    fn extract_and_merge(
        &self,
        pkg_path: &Path,
        name: &str,
        version: &str,
        prefix: &Path,
    ) -> Result<PathBuf> {
        let tmp_dir = prefix.join(format!(".{name}-{version}.tmp"));

        fs::create_dir_all(prefix)
            .map_err(|e| Error::Filesystem(format!("create {}: {e}", prefix.display())))?;
        let _ = fs::remove_dir_all(&tmp_dir);
        crate::archive::extract_archive(pkg_path, &tmp_dir)?;

        for component in INSTALL_COMPONENTS {
            let src = tmp_dir.join(component);
            let dst = prefix.join(component);
            if !src.is_dir() {
                if !is_optional_component(component) {
                    warn!("package '{name}' doesn't have component '{component}'");
                }
                continue;
            }
            println!(" - copying {} -> {}", src.display(), dst.display());
            copy_dir_contents(&src, &dst).map_err(|e| {
                Error::Filesystem(format!("failed to merge component '{component}': {e}"))
            })?;
        }
        Ok(tmp_dir)
    }

    /// Remove an installed package from a prefix, using the registry
    pub fn uninstall(&self, name: &str, prefix: &Path) -> Result<()> {
        let registry = Registry::open(&self.registry_path)?;
        let installed = registry.get(name, prefix)?.ok_or_else(|| {
            Error::NotFound(format!("{name} not installed in {}", prefix.display()))
        })?;

        let link = prefix.join(name);
        if let Ok(target) = fs::read_link(&link) {
            if target == installed.path {
                let _ = fs::remove_file(&link);
            }
        }
        if installed.path.exists() {
            fs::remove_dir_all(&installed.path).map_err(|e| {
                Error::Filesystem(format!("remove {}: {e}", installed.path.display()))
            })?;
        }
        registry.delete(name, prefix)?;
        println!("uninstalled {name} from {}", prefix.display());
        Ok(())
    }

    /// Re-run relocation patching over an existing prefix so its metadata
    /// refers to `new_prefix`.
    pub fn patch_prefix(&self, tgt_prefix: &Path, new_prefix: &Path) -> Result<()> {
        let arch = Arch::parse(&self.config.cur_arch).map_err(|e| {
            Error::Config(format!("{e}; reconfigure your default architecture with 'config'"))
        })?;
        let dep_rel = arch.dep_libdir();

        patch_lib_files(&tgt_prefix.join(&dep_rel), &new_prefix.join(&dep_rel), new_prefix)?;
        patch_lib_files(
            &tgt_prefix.join(SHARE_DIR),
            &new_prefix.join(SHARE_DIR),
            new_prefix,
        )?;
        patch_lib_files(
            &tgt_prefix.join(INDEP_LIBDIR),
            &new_prefix.join(INDEP_LIBDIR),
            new_prefix,
        )?;
        Ok(())
    }

    /// Cross-compile the named packages for `arch` from source
    pub fn xcompile(&self, names: &[String], arch: &str) -> Result<()> {
        xcompile::xcompile(&self.config, names, arch)
    }
}

/// Sort index entries by semver descending (unparseable versions last)
fn sort_semver_desc(entries: &mut [&IndexEntry]) {
    use crate::version::parse_tolerant;
    entries.sort_by_cached_key(|e| {
        std::cmp::Reverse(
            parse_tolerant(&e.version).unwrap_or_else(|_| semver::Version::new(0, 0, 0)),
        )
    });
}

/// True when a regular file directly under `<prefix>/lib` is an
/// arch-dependent library. Subdirectories (python-style layouts) don't
/// count.
fn has_arch_dep_lib_in_indep_dir(prefix: &Path) -> Result<bool> {
    let libdir = prefix.join(INDEP_LIBDIR);
    if !libdir.is_dir() {
        return Ok(false);
    }
    let entries = fs::read_dir(&libdir)
        .map_err(|e| Error::Filesystem(format!("read dir {}: {e}", libdir.display())))?;
    for entry in entries {
        let entry = entry
            .map_err(|e| Error::Filesystem(format!("read dir {}: {e}", libdir.display())))?;
        if entry.path().is_dir() {
            continue;
        }
        if is_arch_dependent_lib(&entry.path()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Run the post-install hook with the prefix as its sole argument,
/// printing its combined output in delimited form. Non-zero exit is fatal.
fn run_postinst(script: &Path, prefix: &Path) -> Result<()> {
    let output = Command::new(script)
        .arg(prefix)
        .output()
        .map_err(|e| Error::Subprocess(format!("run {}: {e}", script.display())))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        return Err(Error::Subprocess(format!(
            "post-install hook '{}' exited with {}; output: {combined}",
            script.display(),
            output.status
        )));
    }

    println!("##################################");
    if combined.trim().is_empty() {
        println!("(empty output)");
    } else {
        print!("{combined}");
        if !combined.ends_with('\n') {
            println!();
        }
    }
    println!("##################################");
    Ok(())
}

/// Prompt on stdout and read one line; only an exact `y`/`Y` confirms.
fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    std::io::stdout()
        .flush()
        .map_err(|e| Error::Filesystem(format!("flush stdout: {e}")))?;

    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(|e| Error::Filesystem(format!("read confirmation: {e}")))?;
    Ok(matches!(input.trim(), "y" | "Y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap as Map;
    use std::sync::Mutex;

    /// In-memory transport for exercising the client without a network
    struct MapTransport {
        responses: Mutex<Map<String, Vec<u8>>>,
    }

    impl MapTransport {
        fn new(responses: Map<String, Vec<u8>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    impl Transport for MapTransport {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.responses
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Transport(format!("HTTP 404 fetching {url}")))
        }
    }

    fn client_with(responses: Map<String, Vec<u8>>, dir: &Path) -> Client {
        let config = Config {
            root_url: "https://repo.example.com".to_string(),
            cur_arch: "aarch64".to_string(),
            ohos_sdk: dir.join("sdk"),
            channel: "stable".to_string(),
            pkg_src_repo: None,
        };
        Client::with_transport(
            config,
            Box::new(MapTransport::new(responses)),
            dir.join("cache"),
            dir.join("installed.db"),
        )
    }

    fn empty_index_json() -> Vec<u8> {
        let index = Index {
            repo: "repo".to_string(),
            channel: "stable".to_string(),
            generated: Utc::now(),
            packages: Vec::new(),
        };
        serde_json::to_vec(&index).unwrap()
    }

    #[test]
    fn test_load_index_primary_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut responses = Map::new();
        responses.insert(
            "https://repo.example.com/channels/stable/index.json".to_string(),
            empty_index_json(),
        );
        let client = client_with(responses, dir.path());
        let index = client.load_index().unwrap();
        assert_eq!(index.channel, "stable");
    }

    #[test]
    fn test_load_index_falls_back_to_legacy_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut responses = Map::new();
        responses.insert(
            "https://repo.example.com/repo/channels/stable/index.json".to_string(),
            empty_index_json(),
        );
        let client = client_with(responses, dir.path());
        assert!(client.load_index().is_ok());
    }

    #[test]
    fn test_load_index_both_layouts_missing() {
        let dir = tempfile::tempdir().unwrap();
        let client = client_with(Map::new(), dir.path());
        assert!(matches!(client.load_index(), Err(Error::Transport(_))));
    }

    #[test]
    fn test_load_index_requires_root_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = client_with(Map::new(), dir.path());
        client.config.root_url = String::new();
        assert!(matches!(client.load_index(), Err(Error::Config(_))));
    }

    #[test]
    fn test_arch_dep_lib_in_indep_dir() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path();
        assert!(!has_arch_dep_lib_in_indep_dir(prefix).unwrap());

        fs::create_dir_all(prefix.join("lib/python3.11")).unwrap();
        fs::write(prefix.join("lib/libfoo.la"), "x").unwrap();
        // arch-dependent libraries inside a subdirectory are tolerated
        fs::write(prefix.join("lib/python3.11/native.so"), "x").unwrap();
        assert!(!has_arch_dep_lib_in_indep_dir(prefix).unwrap());

        fs::write(prefix.join("lib/libstray.so"), "x").unwrap();
        assert!(has_arch_dep_lib_in_indep_dir(prefix).unwrap());
    }
}
