use super::LineSink;
use super::ports::is_reachable;
use super::runtime::Runtime;
use crate::error::{Error, Result};
use async_process::{Child, Command, ExitStatus, Stdio};
use futures_lite::io::{AsyncBufReadExt, AsyncRead, BufReader};
use futures_lite::stream::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// The backing RSP server child process.
///
/// The child is killed when this value is dropped. Its stdout and stderr are
/// pumped line by line into the sinks given at spawn time, from tasks that
/// live as long as the pipes stay open.
pub struct RspServerProcess {
    child: Child,
    port: u16,
    pumps: Vec<JoinHandle<()>>,
}

impl RspServerProcess {
    /// Spawns `java … -jar felix.jar` listening on `port`.
    pub fn spawn(
        runtime: &Runtime,
        jvm_args: &[String],
        port: u16,
        stdout_sink: LineSink,
        stderr_sink: LineSink,
    ) -> Result<Self> {
        let mut command = Command::new(&runtime.java);
        command
            .args(runtime.launch_args(jvm_args, port))
            .current_dir(&runtime.server_home)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| Error::Process(format!("Failed to start RSP server: {}", e)))?;
        tracing::info!(pid = child.id(), port = port, "RSP server process spawned");

        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(pump_lines(stdout, stdout_sink));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(pump_lines(stderr, stderr_sink));
        }

        Ok(Self { child, port, pumps })
    }

    /// Port the server was told to listen on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// OS process id.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Exit status if the process has already exited.
    pub fn try_status(&mut self) -> Result<Option<ExitStatus>> {
        self.child
            .try_status()
            .map_err(|e| Error::Process(format!("Failed to query RSP server status: {}", e)))
    }

    /// Waits until the server accepts connections on `host`.
    ///
    /// Fails early with [`Error::Process`] if the child exits first, and with
    /// [`Error::StartupTimeout`] once `timeout` elapses. The child keeps
    /// running on timeout.
    pub async fn wait_until_reachable(
        &mut self,
        host: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if is_reachable(host, self.port).await {
                return Ok(());
            }
            if let Some(status) = self.try_status()? {
                return Err(Error::Process(format!(
                    "RSP server exited before opening port {}: {}",
                    self.port, status
                )));
            }
            if Instant::now() + poll_interval > deadline {
                return Err(Error::StartupTimeout(format!(
                    "RSP server did not open port {} within {:?}",
                    self.port, timeout
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Waits up to `grace` for the process to exit on its own, then kills it.
    ///
    /// Call this after the server was asked to shut down. A zero `grace`
    /// kills right away.
    pub async fn stop(&mut self, grace: Duration) -> Result<()> {
        if grace.is_zero() || self.try_status()?.is_some() {
            return self.kill().await;
        }

        match tokio::time::timeout(grace, self.child.status()).await {
            Ok(Ok(status)) => {
                tracing::info!(port = self.port, %status, "RSP server process exited");
                Ok(())
            }
            Ok(Err(e)) => Err(Error::Process(format!(
                "Failed to wait for RSP server: {}",
                e
            ))),
            Err(_) => {
                tracing::warn!(
                    port = self.port,
                    grace = ?grace,
                    "RSP server did not exit after shutdown, killing it"
                );
                self.kill().await
            }
        }
    }

    /// Kills the process and waits for it to exit.
    pub async fn kill(&mut self) -> Result<()> {
        if self.try_status()?.is_some() {
            return Ok(());
        }

        self.child
            .kill()
            .map_err(|e| Error::Process(format!("Failed to kill RSP server: {}", e)))?;
        let status = self
            .child
            .status()
            .await
            .map_err(|e| Error::Process(format!("Failed to wait for RSP server: {}", e)))?;
        tracing::info!(port = self.port, %status, "RSP server process exited");

        for pump in self.pumps.drain(..) {
            pump.abort();
        }
        Ok(())
    }
}

fn pump_lines<R>(reader: R, sink: LineSink) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next().await {
            match line {
                Ok(line) => sink(&line),
                Err(e) => {
                    tracing::warn!(error = %e, "Stopped reading RSP server output");
                    break;
                }
            }
        }
    })
}
