//! Entry point for the **vswitch-headless** daemon.
//!
//! Runs a [`GridSwitcher`] against an in-memory output and feeds it the
//! commands received on the Unix socket.  While a slide is in flight the
//! main thread ticks frames at ~60 Hz; otherwise it sleeps until the next
//! command arrives.
//!
//! ```text
//! vswitch-headless [--grid 3x3] [--output 1920x1080]
//! ```

use log::{debug, error, info};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use vswitch::command::Command;
use vswitch::config::Config;
use vswitch::events::Channel;
use vswitch::grid::WorkspaceGrid;
use vswitch::headless::HeadlessOutput;
use vswitch::ipc::listener::UnixSocketListener;
use vswitch::switcher::GridSwitcher;
use vswitch::traits::{CommandSource, Compositor};

const FRAME: Duration = Duration::from_millis(16);

/// Default socket path for the command listener.
fn default_socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    format!("{}/vswitch.sock", runtime)
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/vswitch`).
fn config_dir() -> std::path::PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    std::path::PathBuf::from(base).join("vswitch")
}

/// Try to load the config from `$XDG_CONFIG_HOME/vswitch/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

/// Parse `WxH`.
fn parse_dims(s: &str) -> Option<(i32, i32)> {
    let (w, h) = s.split_once('x')?;
    let w: i32 = w.trim().parse().ok()?;
    let h: i32 = h.trim().parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

/// Value of `--flag WxH` on the command line, or `default`.
fn dims_arg(flag: &str, default: (i32, i32)) -> (i32, i32) {
    let args: Vec<String> = std::env::args().collect();
    let Some(value) = args
        .iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
    else {
        return default;
    };
    parse_dims(value).unwrap_or_else(|| {
        error!("{} expects WxH, got {:?}", flag, value);
        std::process::exit(2);
    })
}

//  Main

fn main() {
    env_logger::init();

    let config = load_config();
    let (cols, rows) = dims_arg("--grid", (3, 3));
    let output = dims_arg("--output", (1920, 1080));

    let host = HeadlessOutput::realtime(WorkspaceGrid::new(cols, rows), output);
    host.subscribe(Channel::ViewWorkspaceChanged);
    let mut switcher = GridSwitcher::new(host.clone(), &config);
    if let Err(e) = switcher.init() {
        error!("failed to set up bindings: {}", e);
        std::process::exit(1);
    }

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_command_sources(cmd_tx);

    run_event_loop(&mut switcher, &host, cmd_rx);
}

//  Event loop

fn run_event_loop(
    switcher: &mut GridSwitcher<HeadlessOutput>,
    host: &HeadlessOutput,
    cmd_rx: mpsc::Receiver<Command>,
) {
    info!("vswitch running on {}", host.current_workspace());
    loop {
        let received = if host.has_frame_hook() {
            cmd_rx.recv_timeout(FRAME)
        } else {
            cmd_rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        };

        match received {
            Ok(cmd) => {
                let handled = switcher.on_activator(cmd);
                debug!("{} handled: {}", cmd, handled);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if host.has_frame_hook() {
            switcher.on_frame();
            for event in host.take_emitted() {
                info!("{} carried {} -> {}", event.view, event.from, event.to);
            }
        }
    }
    info!("all command sources closed, exiting");
}

//  Helpers

fn spawn_command_sources(tx: mpsc::Sender<Command>) {
    let path = default_socket_path();
    std::thread::spawn(move || {
        let mut source = UnixSocketListener::new(&path);
        if let Err(e) = source.run(tx) {
            error!("socket listener error: {}", e);
        }
    });
}
