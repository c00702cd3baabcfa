//! Device sessions: command channel to one physical bulb.
//!
//! A [`Session`] owns two TCP connections toward the bulb's control port:
//! a persistent write connection for commands and a listen connection
//! (see [`crate::push`]) for asynchronous state pushes. Commands are
//! line-delimited JSON (`{"id":N,"method":...,"params":[...]}\r\n`);
//! the bulb does not acknowledge on the write channel, so `id` is
//! client-side bookkeeping only.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use log::debug;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::Mutex;

use crate::config::SessionConfig;
use crate::device::DeviceRecord;
use crate::errors::Error;
use crate::history::{MessageHistory, MessageType};
use crate::payload::CommandPayload;
use crate::push::{NotificationCallback, PushChannel};
use crate::range::{
    bright_check_range, ct_check_range, hue_check_range, percent_check_range, sat_check_range,
};
use crate::registry::SharedRecord;
use crate::types::{
    AdjustAction, AdjustProp, CronType, Effect, FlowAction, FlowExpression, PowerOnMode, RgbValue,
    Scene,
};

type Result<T> = std::result::Result<T, Error>;

/// Per-call options shared by most verbs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandOptions {
    /// Transition effect; the session default when `None`.
    pub effect: Option<Effect>,
    /// Transition duration in milliseconds; the session default when `None`.
    pub duration_ms: Option<u64>,
    /// Target the background lamp of a combo fixture (`bg_` verbs).
    pub background: bool,
}

impl CommandOptions {
    pub fn background() -> Self {
        CommandOptions {
            background: true,
            ..Self::default()
        }
    }
}

/// What happened to a verb call.
///
/// All three variants carry the constructed payload; dry-run and live
/// paths build it through the same code, so the JSON body written to the
/// wire is byte-identical to the one returned here (modulo the `id`).
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// The payload was written to the wire.
    Sent(CommandPayload),
    /// Dry-run session: constructed and validated, nothing written.
    DryRun(CommandPayload),
    /// No-op short-circuit: the cached state already matches the request.
    Skipped(CommandPayload),
}

impl CommandOutcome {
    pub fn payload(&self) -> &CommandPayload {
        match self {
            CommandOutcome::Sent(p) | CommandOutcome::DryRun(p) | CommandOutcome::Skipped(p) => p,
        }
    }

    pub fn was_sent(&self) -> bool {
        matches!(self, CommandOutcome::Sent(_))
    }
}

/// A control session bound to one bulb.
///
/// Command calls from one caller are written in call order: every write
/// serializes on the session's write connection. The cached record is
/// updated only after a confirmed write; push notifications remain the
/// authoritative state source.
///
/// # Example
///
/// ```no_run
/// use std::net::Ipv4Addr;
/// use yee_rs::{CommandOptions, DeviceRecord, Session, SessionConfig};
///
/// # async fn control() -> Result<(), yee_rs::Error> {
/// let mut record = DeviceRecord::new("0x1234", Ipv4Addr::new(192, 168, 0, 201));
/// record.power = true;
/// let session = Session::connect(record, SessionConfig::default()).await?;
/// session.set_bright(70, &CommandOptions::default()).await?;
/// # Ok(())
/// # }
/// ```
pub struct Session {
    record: SharedRecord,
    config: SessionConfig,
    addr: SocketAddr,
    cmd_id: AtomicU64,
    writer: Mutex<Option<TcpStream>>,
    push: PushChannel,
    history: Arc<StdMutex<MessageHistory>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a session for a caller-supplied record.
    ///
    /// With [`SessionConfig::dry_run`] set, no socket is opened and all
    /// verbs return their payload without touching the network.
    pub async fn connect(record: DeviceRecord, config: SessionConfig) -> Result<Self> {
        Self::bind(Arc::new(StdMutex::new(record)), config).await
    }

    pub(crate) async fn bind(record: SharedRecord, config: SessionConfig) -> Result<Self> {
        let addr = {
            let rec = record.lock().unwrap();
            SocketAddr::from((rec.ip, rec.port))
        };

        let writer = if config.dry_run {
            None
        } else {
            Some(open_stream(addr, config.write_local_port, config.write_timeout).await?)
        };

        let history = Arc::new(StdMutex::new(MessageHistory::new()));
        let push = PushChannel::new();
        if !config.dry_run {
            push.start(
                Arc::clone(&record),
                Arc::clone(&history),
                addr,
                config.listen_local_port,
                config.write_timeout,
                config.listen_timeout,
            );
        }

        Ok(Session {
            record,
            config,
            addr,
            cmd_id: AtomicU64::new(1),
            writer: Mutex::new(writer),
            push,
            history,
        })
    }

    /// Snapshot of the cached device record.
    pub fn device(&self) -> DeviceRecord {
        self.record.lock().unwrap().clone()
    }

    /// Number of commands successfully written so far.
    pub fn commands_sent(&self) -> u64 {
        self.cmd_id.load(Ordering::SeqCst) - 1
    }

    /// Snapshot of the session's wire-traffic history.
    pub fn history(&self) -> MessageHistory {
        self.history.lock().unwrap().clone()
    }

    /// Fatal listen-channel failure, if the reconnect budget was exceeded.
    pub fn listen_error(&self) -> Option<String> {
        self.push.last_error()
    }

    /// Subscribe to push notifications; returns a token for
    /// [`Session::unsubscribe`].
    pub fn subscribe(&self, callback: NotificationCallback) -> u64 {
        self.push.subscribe(callback)
    }

    pub fn unsubscribe(&self, token: u64) -> bool {
        self.push.unsubscribe(token)
    }

    /// Re-open the write connection after a failure.
    ///
    /// Failed writes are never retried automatically (a duplicated light
    /// command has a visible physical effect); callers reconnect and
    /// resend deliberately.
    pub async fn reconnect_write(&self) -> Result<()> {
        let mut guard = self.writer.lock().await;
        *guard = None;
        let stream =
            open_stream(self.addr, self.config.write_local_port, self.config.write_timeout).await?;
        *guard = Some(stream);
        debug!("write channel reconnected to {}", self.addr);
        Ok(())
    }

    /// Tear the session down: close both channels.
    pub async fn close(&self) {
        self.push.stop();
        let mut guard = self.writer.lock().await;
        if let Some(mut stream) = guard.take() {
            let _ = stream.shutdown().await;
        }
    }

    // ---- verbs ----------------------------------------------------------

    /// `set_ct_abx`: set the color temperature (1700 - 6500 K).
    pub async fn set_ct_abx(&self, ct: u16, opts: &CommandOptions) -> Result<CommandOutcome> {
        self.ensure_power(true)?;
        ct_check_range(ct)?;

        let (effect, duration) = self.transition(opts);
        let payload = CommandPayload::new(
            "set_ct_abx",
            vec![json!(ct), effect, duration],
            opts.background,
        );
        let outcome = self.dispatch(payload).await?;
        if outcome.was_sent() && !opts.background {
            self.record.lock().unwrap().ct = Some(ct);
        }
        Ok(outcome)
    }

    /// `set_rgb`: set an RGB color, packed or as separate channels.
    pub async fn set_rgb(&self, color: RgbValue, opts: &CommandOptions) -> Result<CommandOutcome> {
        self.ensure_power(true)?;
        let packed = color.packed()?;

        let (effect, duration) = self.transition(opts);
        let payload = CommandPayload::new(
            "set_rgb",
            vec![json!(packed), effect, duration],
            opts.background,
        );
        let outcome = self.dispatch(payload).await?;
        if outcome.was_sent() && !opts.background {
            self.record.lock().unwrap().rgb = Some(packed);
        }
        Ok(outcome)
    }

    /// `set_hsv`: set a hue (0 - 359) and saturation (0 - 100).
    pub async fn set_hsv(&self, hue: u16, sat: u8, opts: &CommandOptions) -> Result<CommandOutcome> {
        self.ensure_power(true)?;
        hue_check_range(hue)?;
        sat_check_range(sat)?;

        let (effect, duration) = self.transition(opts);
        let payload = CommandPayload::new(
            "set_hsv",
            vec![json!(hue), json!(sat), effect, duration],
            opts.background,
        );
        let outcome = self.dispatch(payload).await?;
        if outcome.was_sent() && !opts.background {
            let mut rec = self.record.lock().unwrap();
            rec.hue = Some(hue);
            rec.sat = Some(sat);
        }
        Ok(outcome)
    }

    /// `set_bright`: set the brightness (1 - 100).
    pub async fn set_bright(&self, bright: u8, opts: &CommandOptions) -> Result<CommandOutcome> {
        self.ensure_power(true)?;
        bright_check_range(bright)?;

        let (effect, duration) = self.transition(opts);
        let payload = CommandPayload::new(
            "set_bright",
            vec![json!(bright), effect, duration],
            opts.background,
        );
        let outcome = self.dispatch(payload).await?;
        if outcome.was_sent() && !opts.background {
            self.record.lock().unwrap().bright = bright;
        }
        Ok(outcome)
    }

    /// `set_power on`: turn the lamp on.
    ///
    /// Short-circuits to a no-op when the cached state is already on;
    /// the check uses local state only and can be stale if the device
    /// changed outside this session since the last push.
    pub async fn turn_on(
        &self,
        mode: Option<PowerOnMode>,
        opts: &CommandOptions,
    ) -> Result<CommandOutcome> {
        self.set_power(true, mode, opts).await
    }

    /// `set_power off`: turn the lamp off. Symmetric to [`Session::turn_on`].
    pub async fn turn_off(&self, opts: &CommandOptions) -> Result<CommandOutcome> {
        self.set_power(false, None, opts).await
    }

    async fn set_power(
        &self,
        on: bool,
        mode: Option<PowerOnMode>,
        opts: &CommandOptions,
    ) -> Result<CommandOutcome> {
        let (effect, duration) = self.transition(opts);
        let mode = mode.unwrap_or(self.config.default_power_mode);
        let payload = CommandPayload::new(
            "set_power",
            vec![
                json!(if on { "on" } else { "off" }),
                effect,
                duration,
                json!(mode.value()),
            ],
            opts.background,
        );

        // The cached main-lamp power says nothing about the background lamp.
        if !opts.background && self.record.lock().unwrap().power == on {
            debug!("power already {}, skipping wire command", if on { "on" } else { "off" });
            return Ok(CommandOutcome::Skipped(payload));
        }

        let outcome = self.dispatch(payload).await?;
        if outcome.was_sent() && !opts.background {
            self.record.lock().unwrap().power = on;
        }
        Ok(outcome)
    }

    /// `toggle`: flip the power state.
    pub async fn toggle(&self, opts: &CommandOptions) -> Result<CommandOutcome> {
        let payload = CommandPayload::new("toggle", vec![], opts.background);
        let outcome = self.dispatch(payload).await?;
        if outcome.was_sent() && !opts.background {
            let mut rec = self.record.lock().unwrap();
            rec.power = !rec.power;
        }
        Ok(outcome)
    }

    /// `set_default`: persist the current state as the power-on default.
    pub async fn set_default(&self, opts: &CommandOptions) -> Result<CommandOutcome> {
        self.ensure_power(true)?;
        let payload = CommandPayload::new("set_default", vec![], opts.background);
        self.dispatch(payload).await
    }

    /// `start_cf`: start a color flow.
    ///
    /// `repeat` is the total number of steps to run (0 = infinite);
    /// structured flows are validated step by step before anything is
    /// written.
    pub async fn start_cf(
        &self,
        repeat: u32,
        action: FlowAction,
        flow: FlowExpression,
        opts: &CommandOptions,
    ) -> Result<CommandOutcome> {
        self.ensure_power(true)?;
        let expr = flow.encode()?;

        let payload = CommandPayload::new(
            "start_cf",
            vec![json!(repeat), json!(action.value()), json!(expr)],
            opts.background,
        );
        let outcome = self.dispatch(payload).await?;
        if outcome.was_sent() && !opts.background {
            let mut rec = self.record.lock().unwrap();
            rec.flowing = true;
            rec.flow_params = Some(expr);
        }
        Ok(outcome)
    }

    /// `stop_cf`: stop a running color flow.
    pub async fn stop_cf(&self, opts: &CommandOptions) -> Result<CommandOutcome> {
        let payload = CommandPayload::new("stop_cf", vec![], opts.background);
        let outcome = self.dispatch(payload).await?;
        if outcome.was_sent() && !opts.background {
            let mut rec = self.record.lock().unwrap();
            rec.flowing = false;
            rec.flow_params = None;
        }
        Ok(outcome)
    }

    /// `set_scene`: apply a composite scene (works from any power state).
    pub async fn set_scene(&self, scene: &Scene, opts: &CommandOptions) -> Result<CommandOutcome> {
        let params = scene.params()?;
        let payload = CommandPayload::new("set_scene", params, opts.background);
        self.dispatch(payload).await
    }

    /// `cron_add`: schedule a timer job after `delay_mins` minutes.
    pub async fn cron_add(&self, job: CronType, delay_mins: u32) -> Result<CommandOutcome> {
        self.ensure_power(true)?;
        let payload = CommandPayload::new(
            "cron_add",
            vec![json!(job.value()), json!(delay_mins)],
            false,
        );
        self.dispatch(payload).await
    }

    /// `cron_get`: query the pending timer job.
    pub async fn cron_get(&self, job: CronType) -> Result<CommandOutcome> {
        let payload = CommandPayload::new("cron_get", vec![json!(job.value())], false);
        self.dispatch(payload).await
    }

    /// `cron_del`: cancel the pending timer job.
    pub async fn cron_del(&self, job: CronType) -> Result<CommandOutcome> {
        let payload = CommandPayload::new("cron_del", vec![json!(job.value())], false);
        self.dispatch(payload).await
    }

    /// `set_adjust`: adjust a property without an explicit target value.
    pub async fn set_adjust(
        &self,
        action: AdjustAction,
        prop: AdjustProp,
        opts: &CommandOptions,
    ) -> Result<CommandOutcome> {
        if prop == AdjustProp::Color && action != AdjustAction::Circle {
            return Err(Error::InvalidAdjust);
        }

        let payload = CommandPayload::new(
            "set_adjust",
            vec![json!(action.to_string()), json!(prop.to_string())],
            opts.background,
        );
        self.dispatch(payload).await
    }

    /// `adjust_bright`: change brightness by a percentage (-100 - 100).
    pub async fn adjust_bright(
        &self,
        percentage: i8,
        opts: &CommandOptions,
    ) -> Result<CommandOutcome> {
        self.adjust("adjust_bright", percentage, opts).await
    }

    /// `adjust_ct`: change color temperature by a percentage (-100 - 100).
    pub async fn adjust_ct(&self, percentage: i8, opts: &CommandOptions) -> Result<CommandOutcome> {
        self.adjust("adjust_ct", percentage, opts).await
    }

    /// `adjust_color`: change color by a percentage (-100 - 100).
    pub async fn adjust_color(
        &self,
        percentage: i8,
        opts: &CommandOptions,
    ) -> Result<CommandOutcome> {
        self.adjust("adjust_color", percentage, opts).await
    }

    async fn adjust(
        &self,
        method: &str,
        percentage: i8,
        opts: &CommandOptions,
    ) -> Result<CommandOutcome> {
        percent_check_range(percentage)?;
        let duration = opts.duration_ms.unwrap_or(self.config.effect_duration_ms);
        let payload = CommandPayload::new(
            method,
            vec![json!(percentage), json!(duration)],
            opts.background,
        );
        self.dispatch(payload).await
    }

    /// `set_name`: store a name on the device.
    pub async fn set_name(&self, name: &str) -> Result<CommandOutcome> {
        let payload = CommandPayload::new("set_name", vec![json!(name)], false);
        let outcome = self.dispatch(payload).await?;
        if outcome.was_sent() {
            self.record.lock().unwrap().name = Some(name.to_string());
        }
        Ok(outcome)
    }

    /// Escape hatch: send a raw `{method, params}` command unvalidated.
    pub async fn send_command(&self, method: &str, params: Vec<Value>) -> Result<CommandOutcome> {
        let payload = CommandPayload::new(method, params, false);
        self.dispatch(payload).await
    }

    // ---- internals ------------------------------------------------------

    fn ensure_power(&self, required: bool) -> Result<()> {
        let powered = self.record.lock().unwrap().power;
        if powered != required {
            return Err(Error::PowerPrecondition { required });
        }
        Ok(())
    }

    fn transition(&self, opts: &CommandOptions) -> (Value, Value) {
        let effect = opts.effect.unwrap_or(self.config.default_effect);
        let duration = opts.duration_ms.unwrap_or(self.config.effect_duration_ms);
        (json!(effect.to_string()), json!(duration))
    }

    async fn dispatch(&self, payload: CommandPayload) -> Result<CommandOutcome> {
        if self.config.dry_run {
            debug!("dry-run payload: {:?}", payload);
            return Ok(CommandOutcome::DryRun(payload));
        }
        self.write_payload(&payload).await?;
        Ok(CommandOutcome::Sent(payload))
    }

    /// Write one command line; fails fast when the socket is not open.
    async fn write_payload(&self, payload: &CommandPayload) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let stream = guard.as_mut().ok_or(Error::NotConnected)?;
        let line = payload.encode_line(self.cmd_id.load(Ordering::SeqCst))?;

        let result = tokio::time::timeout(self.config.write_timeout, async {
            stream.write_all(line.as_bytes()).await?;
            stream.flush().await
        })
        .await;

        match result {
            Err(_) => {
                *guard = None;
                self.history
                    .lock()
                    .unwrap()
                    .record_error("write timed out");
                Err(Error::timeout("write"))
            }
            Ok(Err(e)) => {
                *guard = None;
                self.history.lock().unwrap().record_error(&e.to_string());
                Err(Error::socket("write", e))
            }
            Ok(Ok(())) => {
                self.cmd_id.fetch_add(1, Ordering::SeqCst);
                self.history
                    .lock()
                    .unwrap()
                    .record(MessageType::Send, &payload.to_value());
                debug!("wrote payload {}", line.trim_end());
                Ok(())
            }
        }
    }
}

/// Open a TCP connection to `addr`, optionally bound to a local source
/// port, within `timeout`.
pub(crate) async fn open_stream(
    addr: SocketAddr,
    local_port: Option<u16>,
    timeout: Duration,
) -> Result<TcpStream> {
    let connect = async {
        match local_port {
            Some(port) => {
                let socket = TcpSocket::new_v4().map_err(|e| Error::socket("socket", e))?;
                socket
                    .bind(SocketAddr::from(([0, 0, 0, 0], port)))
                    .map_err(|e| Error::socket("bind", e))?;
                socket
                    .connect(addr)
                    .await
                    .map_err(|e| Error::socket("connect", e))
            }
            None => TcpStream::connect(addr)
                .await
                .map_err(|e| Error::socket("connect", e)),
        }
    };

    tokio::time::timeout(timeout, connect)
        .await
        .map_err(|_| Error::timeout("connect"))?
}
