//! Resolution of the Java runtime and the RSP server distribution.
use crate::config::LauncherConfig;
use crate::error::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable overriding the server home.
pub const SERVER_LOCATION_ENV: &str = "RSP_SERVER_LOCATION";

/// System property the RSP server reads its listen port from.
pub const PORT_PROPERTY: &str = "rsp.server.port";

#[cfg(windows)]
const JAVA_BINARY: &str = "java.exe";
#[cfg(not(windows))]
const JAVA_BINARY: &str = "java";

/// Everything needed to spawn the RSP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runtime {
    /// Java executable
    pub java: PathBuf,
    /// Server home, used as the working directory
    pub server_home: PathBuf,
    /// `<home>/bin/felix.jar`
    pub launcher_jar: PathBuf,
}

impl Runtime {
    /// Resolves the runtime from the process environment and `config`.
    pub fn resolve(config: &LauncherConfig) -> Result<Self> {
        let server_home = server_home(
            std::env::var_os(SERVER_LOCATION_ENV),
            config.server_location.as_deref(),
            default_server_home().as_deref(),
        )?;
        let java = find_java(
            config.java_home.as_deref(),
            std::env::var_os("JAVA_HOME"),
            std::env::var_os("PATH"),
        )?;
        Self::new(java, server_home)
    }

    /// Builds a runtime from explicit locations, checking the launcher jar.
    pub fn new(java: PathBuf, server_home: PathBuf) -> Result<Self> {
        let launcher_jar = launcher_jar(&server_home);
        if !launcher_jar.is_file() {
            return Err(Error::Resolution(format!(
                "RSP server launcher not found at {}",
                launcher_jar.display()
            )));
        }
        Ok(Self {
            java,
            server_home,
            launcher_jar,
        })
    }

    /// Command line arguments for the Java process.
    pub fn launch_args(&self, jvm_args: &[String], port: u16) -> Vec<OsString> {
        let mut args: Vec<OsString> = jvm_args.iter().map(OsString::from).collect();
        args.push(format!("-D{}={}", PORT_PROPERTY, port).into());
        args.push("-jar".into());
        args.push(self.launcher_jar.clone().into_os_string());
        args
    }
}

/// `<home>/bin/felix.jar`
pub fn launcher_jar(server_home: &Path) -> PathBuf {
    server_home.join("bin").join("felix.jar")
}

/// The `server` directory next to the running executable.
fn default_server_home() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join("server"))
}

/// Picks the server home: environment override, then configuration, then
/// the bundled default.
pub fn server_home(
    env_override: Option<OsString>,
    configured: Option<&Path>,
    bundled: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(location) = env_override.filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(location));
    }
    configured
        .or(bundled)
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::Resolution("Cannot determine RSP server location".to_string()))
}

/// Locates the Java executable.
///
/// Checks `<java_home>/bin` for the configured home, then `JAVA_HOME`, then
/// every directory of `PATH` in order.
pub fn find_java(
    configured_home: Option<&Path>,
    java_home_env: Option<OsString>,
    path_env: Option<OsString>,
) -> Result<PathBuf> {
    let env_home = java_home_env
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);

    for home in configured_home.map(Path::to_path_buf).into_iter().chain(env_home) {
        let java = home.join("bin").join(JAVA_BINARY);
        if java.is_file() {
            return Ok(java);
        }
        tracing::warn!(java_home = %home.display(), "No java executable in Java home");
    }

    if let Some(path) = path_env {
        if let Some(java) = std::env::split_paths(&path)
            .map(|dir| dir.join(JAVA_BINARY))
            .find(|candidate| candidate.is_file())
        {
            return Ok(java);
        }
    }

    Err(Error::Resolution(
        "Java runtime not found; set javaHome or JAVA_HOME".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;

    fn fake_java_home(temp: &TempDir, name: &str) -> PathBuf {
        let home = temp.child(name);
        home.child("bin").child(JAVA_BINARY).touch().unwrap();
        home.path().to_path_buf()
    }

    #[test]
    fn test_env_override_wins() {
        let home = server_home(
            Some(OsString::from("/env/server")),
            Some(Path::new("/configured")),
            Some(Path::new("/bundled")),
        )
        .unwrap();
        assert_eq!(home, PathBuf::from("/env/server"));

        let home = server_home(
            Some(OsString::new()),
            Some(Path::new("/configured")),
            Some(Path::new("/bundled")),
        )
        .unwrap();
        assert_eq!(home, PathBuf::from("/configured"));

        let home = server_home(None, None, Some(Path::new("/bundled"))).unwrap();
        assert_eq!(home, PathBuf::from("/bundled"));

        assert!(matches!(
            server_home(None, None, None),
            Err(Error::Resolution(_))
        ));
    }

    #[test]
    fn test_configured_java_home_first() {
        let temp = TempDir::new().unwrap();
        let configured = fake_java_home(&temp, "configured");
        let env = fake_java_home(&temp, "env");

        let java = find_java(Some(&configured), Some(env.into_os_string()), None).unwrap();
        assert_eq!(java, configured.join("bin").join(JAVA_BINARY));
    }

    #[test]
    fn test_java_from_path() {
        let temp = TempDir::new().unwrap();
        let bin = temp.child("jdk").child("bin");
        bin.child(JAVA_BINARY).touch().unwrap();
        let path = std::env::join_paths([temp.child("empty").path(), bin.path()]).unwrap();

        let java = find_java(Some(&temp.child("missing").to_path_buf()), None, Some(path)).unwrap();
        assert_eq!(java, bin.path().join(JAVA_BINARY));
    }

    #[test]
    fn test_java_not_found() {
        assert!(matches!(
            find_java(None, None, None),
            Err(Error::Resolution(_))
        ));
    }

    #[test]
    fn test_missing_launcher_jar() {
        let temp = TempDir::new().unwrap();
        let result = Runtime::new(PathBuf::from("java"), temp.path().to_path_buf());
        assert!(matches!(result, Err(Error::Resolution(_))));
    }

    #[test]
    fn test_launch_args() {
        let temp = TempDir::new().unwrap();
        temp.child("bin").child("felix.jar").touch().unwrap();
        let runtime = Runtime::new(PathBuf::from("java"), temp.path().to_path_buf()).unwrap();

        let args = runtime.launch_args(&["-Xmx512m".to_string()], 27511);
        assert_eq!(
            args,
            vec![
                OsString::from("-Xmx512m"),
                OsString::from("-Drsp.server.port=27511"),
                OsString::from("-jar"),
                runtime.launcher_jar.clone().into_os_string(),
            ]
        );
    }
}
