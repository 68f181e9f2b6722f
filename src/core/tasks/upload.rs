use crate::command;
use crate::config::{render_option, SectionView};
use crate::context::Reporter;
use crate::error::{Error, Result};
use crate::log_status;
use crate::paths;
use crate::registry::TaskDescriptor;
use crate::shell;
use crate::state::SharedState;
use crate::task::{Task, TaskCore, TaskInit};

pub const KEY: &str = "upload";
const PROGRAM: &str = "rsync";

pub struct UploadOpts;

impl UploadOpts {
    pub const SSH_PORT: &'static str = "ssh_port";
    pub const SSH_PORT_DEFAULT: u16 = 22;
    pub const SOURCE_DIR: &'static str = "source_dir";
    pub const USER: &'static str = "user";
    pub const SERVER: &'static str = "server";
    pub const REMOTE_PATH: &'static str = "remote_path";
    pub const RSYNC_OPTIONS: &'static str = "rsync_options";
}

pub fn load() -> Result<Vec<TaskDescriptor>> {
    Ok(vec![TaskDescriptor::new(
        KEY,
        "Synchronize the built site to a remote host with rsync",
        factory,
    )])
}

fn factory(init: TaskInit) -> Box<dyn Task> {
    Box::new(UploadTask::new(init))
}

pub struct UploadTask {
    core: TaskCore,
    ssh_port: u16,
    source_dir: String,
    user: String,
    server: String,
    remote_path: String,
    rsync_options: String,
}

impl UploadTask {
    pub fn new(init: TaskInit) -> Self {
        Self {
            core: TaskCore::new(init),
            ssh_port: UploadOpts::SSH_PORT_DEFAULT,
            source_dir: String::new(),
            user: String::new(),
            server: String::new(),
            remote_path: String::new(),
            rsync_options: String::new(),
        }
    }

    /// `user@server:path`, or `server:path` without a user.
    pub fn destination(&self) -> String {
        if self.user.is_empty() {
            format!("{}:{}", self.server, self.remote_path)
        } else {
            format!("{}@{}:{}", self.user, self.server, self.remote_path)
        }
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-e".to_string(), format!("ssh -p {}", self.ssh_port)];
        args.extend(shell::split_words(&self.rsync_options));
        args.push(self.source_dir.clone());
        args.push(self.destination());
        args
    }
}

fn trimmed(section: SectionView<'_>, option: &str) -> Result<String> {
    Ok(section
        .get(option)?
        .map(|v| v.trim().to_string())
        .unwrap_or_default())
}

impl Task for UploadTask {
    fn key(&self) -> &'static str {
        KEY
    }

    fn name(&self) -> &'static str {
        "UploadTask"
    }

    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn load_task_config(&mut self, section: SectionView<'_>) -> Result<()> {
        if let Some(port) = section.get(UploadOpts::SSH_PORT)? {
            let port = port.trim();
            if !port.is_empty() {
                self.ssh_port = port.parse().map_err(|_| {
                    Error::config_invalid_value(
                        section.name(),
                        UploadOpts::SSH_PORT,
                        Some(port.to_string()),
                        "expected a port number",
                    )
                })?;
            }
        }
        let source = trimmed(section, UploadOpts::SOURCE_DIR)?;
        // Remote paths are never sanitized; only the local source is.
        self.source_dir = if source.is_empty() {
            source
        } else {
            paths::sanitize_keep_trailing_slash(&source)
        };
        self.user = trimmed(section, UploadOpts::USER)?;
        self.server = trimmed(section, UploadOpts::SERVER)?;
        self.remote_path = trimmed(section, UploadOpts::REMOTE_PATH)?;
        self.rsync_options = trimmed(section, UploadOpts::RSYNC_OPTIONS)?;
        Ok(())
    }

    fn run(&mut self, reporter: &mut Reporter, _state: &mut SharedState) -> Result<()> {
        reporter.verbose("Starting Upload Task.");
        for (option, value) in [
            (UploadOpts::SOURCE_DIR, self.source_dir.is_empty()),
            (UploadOpts::SERVER, self.server.is_empty()),
        ] {
            if value {
                self.core.error(format!("{} is not configured", option));
            }
        }
        if !self.core.errors().is_empty() {
            return Ok(());
        }

        let args = self.args();
        reporter.debug(format!(
            "command: {}",
            command::command_line(PROGRAM, &args)
        ));
        log_status!("upload", "Syncing {} to {}", self.source_dir, self.destination());
        let outcome = command::capture(PROGRAM, &args, None)?;
        if !outcome.success() {
            self.core.error(outcome.failure_message());
        }
        Ok(())
    }

    fn debug_entries(&self) -> Vec<(String, String)> {
        vec![
            (UploadOpts::SSH_PORT.to_string(), self.ssh_port.to_string()),
            (UploadOpts::SOURCE_DIR.to_string(), self.source_dir.clone()),
            (UploadOpts::USER.to_string(), self.user.clone()),
            (UploadOpts::SERVER.to_string(), self.server.clone()),
            (UploadOpts::REMOTE_PATH.to_string(), self.remote_path.clone()),
            (
                UploadOpts::RSYNC_OPTIONS.to_string(),
                self.rsync_options.clone(),
            ),
        ]
    }

    fn default_entries(&self) -> Vec<String> {
        vec![
            render_option(
                UploadOpts::SSH_PORT,
                &UploadOpts::SSH_PORT_DEFAULT.to_string(),
            ),
            render_option(UploadOpts::SOURCE_DIR, ""),
            render_option(UploadOpts::USER, ""),
            render_option(UploadOpts::SERVER, ""),
            render_option(UploadOpts::REMOTE_PATH, ""),
            render_option(UploadOpts::RSYNC_OPTIONS, ""),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigDocument;
    use crate::context::Verbosity;
    use crate::error::ErrorCode;
    use std::sync::Arc;

    fn task(text: &str, tag: &str) -> UploadTask {
        let config = Arc::new(ConfigDocument::parse(text).unwrap());
        UploadTask::new(TaskInit::new(config, tag))
    }

    #[test]
    fn builds_rsync_arguments() {
        let mut task = task(
            "[upload]\nssh_port = 2222\nsource_dir = /srv/out/\nuser = deploy\nserver = example.org\nremote_path = /var/www\nrsync_options = -avz --delete\n",
            KEY,
        );
        task.load_config().unwrap();
        assert_eq!(
            task.args(),
            vec![
                "-e",
                "ssh -p 2222",
                "-avz",
                "--delete",
                "/srv/out/",
                "deploy@example.org:/var/www"
            ]
        );
    }

    #[test]
    fn tag_with_task_option_reads_its_own_section() {
        let mut task = task(
            "[mirror]\ntask = upload\nsource_dir = /srv/out\nserver = mirror.example.org\nremote_path = /www\n",
            "mirror",
        );
        task.load_config().unwrap();
        assert_eq!(task.destination(), "mirror.example.org:/www");
        assert_eq!(task.args()[1], "ssh -p 22");
        assert!(task
            .default_config()
            .unwrap()
            .starts_with("[mirror]\ntask = upload\nssh_port = 22\n"));
    }

    #[test]
    fn bad_port_is_a_config_error() {
        let mut task = task("[upload]\nssh_port = ssh\n", KEY);
        let err = task.load_config().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn missing_server_is_a_task_error() {
        let mut task = task("[upload]\nsource_dir = /srv/out\n", KEY);
        task.execute(&mut Reporter::capture(Verbosity::Normal), &mut SharedState::new())
            .unwrap();
        assert_eq!(task.core().status(), Some(1));
        assert_eq!(task.core().errors(), &["server is not configured".to_string()]);
    }
}
