use std::process::Command;

/// Open `url` with the configured command, falling back to the system default.
pub fn open_url(url: &str, open_command: Option<&str>) {
    if let Some(cmd) = open_command {
        match Command::new(cmd).arg(url).spawn() {
            Ok(_) => return,
            Err(err) => tracing::warn!(command = cmd, "failed to launch browser: {}", err),
        }
    }
    if let Err(err) = open::that(url) {
        tracing::warn!(%url, "failed to open link: {}", err);
    }
}
